//! Arithmetic fixtures for unit tests.

use gamma_core::{Generator, GeneratorSet, GroupArithmetic};

/// Z/m under addition; a generator's value is its first entry.
pub(crate) struct Cyclic {
    pub m: i64,
    pub targets: Vec<i64>,
}

impl Cyclic {
    pub fn new(m: i64, targets: &[i64]) -> Self {
        Cyclic {
            m,
            targets: targets.to_vec(),
        }
    }
}

impl GroupArithmetic for Cyclic {
    type Element = i64;

    fn modulus(&self) -> u64 {
        self.m as u64
    }

    fn identity(&self) -> i64 {
        0
    }

    fn lift(&self, g: &Generator) -> i64 {
        g[0].rem_euclid(self.m)
    }

    fn multiply(&self, a: &i64, b: &i64) -> i64 {
        (a + b).rem_euclid(self.m)
    }

    fn invert(&self, a: &i64) -> i64 {
        (-a).rem_euclid(self.m)
    }

    fn predicate(&self, e: &i64) -> bool {
        self.targets.contains(e)
    }
}

pub(crate) fn cyclic_set(m: u64, values: &[i64]) -> GeneratorSet {
    GeneratorSet::new(m, values.iter().map(|&v| [v, 0, 0, 0]).collect())
}
