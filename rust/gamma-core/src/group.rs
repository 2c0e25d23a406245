//! The group arithmetic seam between the search engine and the matrix group.

use crate::Generator;

/// Pure group operations for one modulus.
///
/// An implementation is built for a single modulus and shared read-only by
/// every worker of a run, so all methods take `&self` and must be free of
/// side effects. `Element` is the exact working representation; generators
/// are lifted into it once per run.
pub trait GroupArithmetic: Sync {
    type Element: Clone + Send + Sync;

    /// The modulus n the arithmetic is reduced under.
    fn modulus(&self) -> u64;

    fn identity(&self) -> Self::Element;

    /// Lift a stored generator into the working representation.
    fn lift(&self, generator: &Generator) -> Self::Element;

    fn multiply(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;

    fn invert(&self, a: &Self::Element) -> Self::Element;

    /// The membership test a classified generator has to reach.
    fn predicate(&self, element: &Self::Element) -> bool;

    /// Canonical key of the generator's symmetry class.
    ///
    /// Two generators with equal keys must share their classification
    /// outcome. `None` opts out of class pruning entirely.
    fn symmetry_key(&self, _generator: &Generator) -> Option<Generator> {
        None
    }
}
