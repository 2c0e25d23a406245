//! Shared types for the congruence generator closure search.
//!
//! A modulus n comes with an ordered list of 2x2 integer generator matrices.
//! This crate owns that data model, the group arithmetic the search runs on
//! (`GroupArithmetic`, with the SL2(Z/MZ) implementation in [`sl2`]), and the
//! loader for generator files written by the SageMath generation tooling.

pub mod arith;
pub mod group;
pub mod loader;
pub mod sl2;

pub use group::GroupArithmetic;
pub use loader::{
    generator_file_name, load_generators, load_generators_as, parse_generators,
    parse_generators_as, GeneratorFormat, LoadError,
};
pub use sl2::{Mat2, Sl2Mod};

/// One generator: a 2x2 integer matrix stored row-major as `[a, b, c, d]`.
pub type Generator = [i64; 4];

/// The ordered, immutable generator list for one modulus.
///
/// Generators are addressed by their index; the search never reorders or
/// mutates the set once a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSet {
    modulus: u64,
    generators: Vec<Generator>,
}

impl GeneratorSet {
    pub fn new(modulus: u64, generators: Vec<Generator>) -> Self {
        Self {
            modulus,
            generators,
        }
    }

    /// The modulus n this set was generated for.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Generator> {
        self.generators.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Generator> {
        self.generators.iter()
    }

}

impl std::ops::Index<usize> for GeneratorSet {
    type Output = Generator;

    fn index(&self, index: usize) -> &Generator {
        &self.generators[index]
    }
}
