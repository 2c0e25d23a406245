//! SL2(Z/MZ) arithmetic with the elementary-matrix predicate.
//!
//! Entries are kept reduced into `[0, M)` where `M = n^k` (k = 1 unless the
//! caller asks for a higher power). Reduction keeps every entry below 2^63,
//! so products of two entries are exact in i128.

use serde::{Deserialize, Serialize};

use crate::arith::{det_mod, mod_dot, reduce, reduction_modulus};
use crate::group::GroupArithmetic;
use crate::loader::LoadError;
use crate::{Generator, GeneratorSet};

/// A reduced 2x2 matrix `[[a, b], [c, d]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mat2 {
    pub a: i128,
    pub b: i128,
    pub c: i128,
    pub d: i128,
}

impl Mat2 {
    pub fn identity(m: i128) -> Self {
        Mat2 {
            a: reduce(1, m),
            b: 0,
            c: 0,
            d: reduce(1, m),
        }
    }

    pub fn from_generator(g: &Generator, m: i128) -> Self {
        Mat2 {
            a: reduce(g[0] as i128, m),
            b: reduce(g[1] as i128, m),
            c: reduce(g[2] as i128, m),
            d: reduce(g[3] as i128, m),
        }
    }

    /// Back to i64 storage. Entries are below `M <= i64::MAX`.
    pub fn to_generator(&self) -> Generator {
        [self.a as i64, self.b as i64, self.c as i64, self.d as i64]
    }

    pub fn mul(&self, rhs: &Mat2, m: i128) -> Self {
        Mat2 {
            a: mod_dot(self.a, rhs.a, self.b, rhs.c, m),
            b: mod_dot(self.a, rhs.b, self.b, rhs.d, m),
            c: mod_dot(self.c, rhs.a, self.d, rhs.c, m),
            d: mod_dot(self.c, rhs.b, self.d, rhs.d, m),
        }
    }

    /// Inverse of a determinant-one matrix: its adjugate.
    pub fn inverse(&self, m: i128) -> Self {
        Mat2 {
            a: self.d,
            b: reduce(-self.b, m),
            c: reduce(-self.c, m),
            d: self.a,
        }
    }

    pub fn det(&self, m: i128) -> i128 {
        det_mod(&self.to_generator(), m)
    }

    /// Upper or lower unitriangular: `[[1, x], [0, 1]]` or `[[1, 0], [x, 1]]`.
    pub fn is_elementary(&self, m: i128) -> bool {
        let one = reduce(1, m);
        self.a == one && self.d == one && (self.b == 0 || self.c == 0)
    }
}

/// SL2 over Z/MZ for one modulus n, with `M = n^power`.
#[derive(Debug, Clone, Copy)]
pub struct Sl2Mod {
    modulus: u64,
    reduction: i128,
}

impl Sl2Mod {
    /// Arithmetic reduced modulo n itself.
    pub fn new(n: u64) -> Option<Self> {
        Self::with_power(n, 1)
    }

    /// Arithmetic reduced modulo n^power. `None` if n is zero, the power is
    /// zero, or n^power does not fit in 63 bits.
    pub fn with_power(n: u64, power: u32) -> Option<Self> {
        let reduction = reduction_modulus(n, power)?;
        Some(Sl2Mod {
            modulus: n,
            reduction,
        })
    }

    /// The reduction modulus M.
    pub fn reduction(&self) -> i128 {
        self.reduction
    }

    /// Check every generator has determinant 1 modulo M.
    ///
    /// Files are validated modulo n only; for `M = n^k` with `k > 1` the
    /// adjugate is an inverse only if this holds as well.
    pub fn validate(&self, set: &GeneratorSet) -> Result<(), LoadError> {
        let one = reduce(1, self.reduction);
        for (index, g) in set.iter().enumerate() {
            let det = det_mod(g, self.reduction);
            if det != one {
                return Err(LoadError::NotInGroup {
                    index,
                    det,
                    modulus: self.reduction as u64,
                });
            }
        }
        Ok(())
    }
}

impl GroupArithmetic for Sl2Mod {
    type Element = Mat2;

    fn modulus(&self) -> u64 {
        self.modulus
    }

    fn identity(&self) -> Mat2 {
        Mat2::identity(self.reduction)
    }

    fn lift(&self, generator: &Generator) -> Mat2 {
        Mat2::from_generator(generator, self.reduction)
    }

    fn multiply(&self, a: &Mat2, b: &Mat2) -> Mat2 {
        a.mul(b, self.reduction)
    }

    fn invert(&self, a: &Mat2) -> Mat2 {
        a.inverse(self.reduction)
    }

    fn predicate(&self, element: &Mat2) -> bool {
        element.is_elementary(self.reduction)
    }

    /// Generators equal mod M share a key. Nothing coarser: pairing `g`
    /// with `g^-1` reverses multiplier order, and the anchor-first search
    /// is not symmetric under that.
    fn symmetry_key(&self, generator: &Generator) -> Option<Generator> {
        Some(self.lift(generator).to_generator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Random SL2(Z/mZ) element built from elementary factors.
    fn random_sl2(rng: &mut StdRng, arith: &Sl2Mod) -> Mat2 {
        let m = arith.reduction() as i64;
        let mut acc = arith.identity();
        for _ in 0..4 {
            let x = rng.gen_range(0..m);
            let upper = arith.lift(&[1, x, 0, 1]);
            let y = rng.gen_range(0..m);
            let lower = arith.lift(&[1, 0, y, 1]);
            acc = arith.multiply(&arith.multiply(&acc, &upper), &lower);
        }
        acc
    }

    #[test]
    fn test_identity_and_inverse() {
        let arith = Sl2Mod::new(7).unwrap();
        let g = arith.lift(&[2, 3, 1, 2]);
        assert_eq!(g.det(arith.reduction()), 1);
        let prod = arith.multiply(&g, &arith.invert(&g));
        assert_eq!(prod, arith.identity());
        let prod = arith.multiply(&arith.identity(), &g);
        assert_eq!(prod, g);
    }

    #[test]
    fn test_group_laws_random() {
        let mut rng = StdRng::seed_from_u64(42);
        for &(n, k) in &[(5u64, 1u32), (12, 1), (7, 2), (1_000_003, 2)] {
            let arith = Sl2Mod::with_power(n, k).unwrap();
            for _ in 0..50 {
                let x = random_sl2(&mut rng, &arith);
                let y = random_sl2(&mut rng, &arith);
                let z = random_sl2(&mut rng, &arith);
                let left = arith.multiply(&arith.multiply(&x, &y), &z);
                let right = arith.multiply(&x, &arith.multiply(&y, &z));
                assert_eq!(left, right, "associativity mod {}^{}", n, k);
                assert_eq!(x.det(arith.reduction()), 1);
                assert_eq!(arith.multiply(&x, &arith.invert(&x)), arith.identity());
            }
        }
    }

    #[test]
    fn test_lift_reduces_negative_entries() {
        let arith = Sl2Mod::new(5).unwrap();
        let g = arith.lift(&[-1, 0, 0, -1]);
        assert_eq!(g, Mat2 { a: 4, b: 0, c: 0, d: 4 });
    }

    #[test]
    fn test_elementary_predicate() {
        let arith = Sl2Mod::new(6).unwrap();
        assert!(arith.predicate(&arith.lift(&[1, 4, 0, 1])));
        assert!(arith.predicate(&arith.lift(&[1, 0, 5, 1])));
        assert!(arith.predicate(&arith.lift(&[7, 0, 0, 13])));
        assert!(!arith.predicate(&arith.lift(&[1, 1, 1, 2])));
        assert!(!arith.predicate(&arith.lift(&[5, 0, 0, 5])));
    }

    #[test]
    fn test_predicate_closed_under_inversion() {
        let arith = Sl2Mod::new(11).unwrap();
        for x in 0..11 {
            let upper = arith.lift(&[1, x, 0, 1]);
            assert!(arith.predicate(&arith.invert(&upper)));
        }
    }

    #[test]
    fn test_symmetry_key_groups_only_duplicates() {
        let arith = Sl2Mod::new(7).unwrap();
        let g = [2, 3, 1, 2];
        let inv = arith.invert(&arith.lift(&g)).to_generator();
        assert_ne!(arith.symmetry_key(&g), arith.symmetry_key(&inv));
        assert_eq!(arith.symmetry_key(&g), arith.symmetry_key(&[9, -4, 8, 2]));
        assert_ne!(arith.symmetry_key(&g), arith.symmetry_key(&[1, 1, 0, 1]));
    }

    #[test]
    fn test_validate_uses_reduction_modulus() {
        // det 8 is 1 mod 7 but not mod 49; the adjugate is then no inverse.
        let set = GeneratorSet::new(7, vec![[1, 7, 0, 1], [2, 0, 0, 4]]);
        assert!(Sl2Mod::new(7).unwrap().validate(&set).is_ok());

        let square = Sl2Mod::with_power(7, 2).unwrap();
        let g = square.lift(&[2, 0, 0, 4]);
        assert_ne!(square.multiply(&g, &square.invert(&g)), square.identity());
        match square.validate(&set) {
            Err(LoadError::NotInGroup {
                index,
                det,
                modulus,
            }) => {
                assert_eq!(index, 1);
                assert_eq!(det, 8);
                assert_eq!(modulus, 49);
            }
            other => panic!("unexpected {:?}", other),
        }

        // Determinant 1 over Z passes at every power.
        let sl2z = GeneratorSet::new(7, vec![[1, 7, 0, 1], [8, 7, 9, 8]]);
        assert!(square.validate(&sl2z).is_ok());
    }

    #[test]
    fn test_square_modulus_separates_congruence_generators() {
        // [[1, 3], [0, 1]] and [[1, 0], [3, 1]] are both the identity mod 3
        // but stay distinct mod 9.
        let level = Sl2Mod::new(3).unwrap();
        assert_eq!(level.lift(&[1, 3, 0, 1]), level.identity());
        let square = Sl2Mod::with_power(3, 2).unwrap();
        assert_ne!(square.lift(&[1, 3, 0, 1]), square.identity());
        assert_eq!(square.reduction(), 9);
    }

    #[test]
    fn test_invalid_modulus() {
        assert!(Sl2Mod::new(0).is_none());
        assert!(Sl2Mod::with_power(u64::MAX, 3).is_none());
    }
}
