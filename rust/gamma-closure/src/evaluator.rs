//! Product/inverse arrangement search for a single candidate.
//!
//! For a candidate y and multipliers `m_0 .. m_{L-1}` the evaluator forms
//! every product with y inserted at one of the L + 1 positions and any subset
//! of the multipliers inverted, and asks the predicate about each one. The
//! first multiplier is the anchor: it is taken from `successful[cursor..]`
//! so anchors already exhausted at this strategy are never retried. The
//! remaining L - 1 multipliers range over every multiset of `successful`.

use gamma_core::{GeneratorSet, GroupArithmetic};
use serde::{Deserialize, Serialize};

use crate::combinations::for_each_multiset;
use crate::escalation::Strategy;

/// Generators lifted into the working representation, with inverses
/// precomputed. Built once per run and shared read-only by every task.
pub struct LiftedSet<'a, A: GroupArithmetic> {
    arith: &'a A,
    elements: Vec<A::Element>,
    inverses: Vec<A::Element>,
}

impl<'a, A: GroupArithmetic> LiftedSet<'a, A> {
    pub fn new(arith: &'a A, set: &GeneratorSet) -> Self {
        let elements: Vec<A::Element> = set.iter().map(|g| arith.lift(g)).collect();
        let inverses = elements.iter().map(|e| arith.invert(e)).collect();
        LiftedSet {
            arith,
            elements,
            inverses,
        }
    }

    pub fn arith(&self) -> &'a A {
        self.arith
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn factor(&self, index: usize, inverted: bool) -> &A::Element {
        if inverted {
            &self.inverses[index]
        } else {
            &self.elements[index]
        }
    }
}

/// The product that satisfied the predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrangement {
    /// Slot of the candidate among the `level + 1` factors.
    pub candidate_position: usize,
    /// Bit i set: multiplier i was inverted.
    pub inversion_mask: u32,
    /// Generator indices of the multipliers, anchor first.
    pub multipliers: Vec<usize>,
    pub candidate_inverted: bool,
}

/// Outcome of testing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub products_tested: u64,
    pub hit: Option<Arrangement>,
}

/// Whether the candidate satisfies the predicate on its own.
pub fn evaluate_single<A: GroupArithmetic>(lifted: &LiftedSet<'_, A>, candidate: usize) -> bool {
    lifted.arith.predicate(&lifted.elements[candidate])
}

/// Try every arrangement of `candidate` with one multiplier list.
fn check_combination<A: GroupArithmetic>(
    lifted: &LiftedSet<'_, A>,
    candidate: usize,
    multipliers: &[usize],
    invert_candidate: bool,
    products_tested: &mut u64,
) -> Option<Arrangement> {
    let arith = lifted.arith;
    let level = multipliers.len();
    let orientations: &[bool] = if invert_candidate {
        &[false, true]
    } else {
        &[false]
    };

    for &candidate_inverted in orientations {
        let y = lifted.factor(candidate, candidate_inverted);
        for candidate_position in 0..=level {
            for inversion_mask in 0..(1u32 << level) {
                let mut product = arith.identity();
                let mut next = 0;
                for slot in 0..=level {
                    if slot == candidate_position {
                        product = arith.multiply(&product, y);
                        continue;
                    }
                    let inverted = (inversion_mask >> next) & 1 == 1;
                    product = arith.multiply(&product, lifted.factor(multipliers[next], inverted));
                    next += 1;
                }

                *products_tested += 1;
                if arith.predicate(&product) {
                    return Some(Arrangement {
                        candidate_position,
                        inversion_mask,
                        multipliers: multipliers.to_vec(),
                        candidate_inverted,
                    });
                }
            }
        }
    }
    None
}

/// Search all multiplier lists for `candidate` under `strategy`.
///
/// `successful` is the round's snapshot; anchors come from
/// `successful[anchor_cursor..]`. Returns on the first satisfying product.
pub fn evaluate_candidate<A: GroupArithmetic>(
    lifted: &LiftedSet<'_, A>,
    candidate: usize,
    successful: &[usize],
    anchor_cursor: usize,
    strategy: Strategy,
) -> Evaluation {
    let level = strategy.level();
    let invert_candidate = strategy.inverts_candidate();
    let mut products_tested = 0u64;
    let mut multipliers = vec![0usize; level];

    for &anchor in successful.iter().skip(anchor_cursor) {
        multipliers[0] = anchor;

        let hit = if level == 1 {
            check_combination(
                lifted,
                candidate,
                &multipliers,
                invert_candidate,
                &mut products_tested,
            )
        } else {
            let mut found = None;
            for_each_multiset(successful.len(), level - 1, |rest| {
                for (slot, &r) in rest.iter().enumerate() {
                    multipliers[slot + 1] = successful[r];
                }
                found = check_combination(
                    lifted,
                    candidate,
                    &multipliers,
                    invert_candidate,
                    &mut products_tested,
                );
                found.is_some()
            });
            found
        };

        if hit.is_some() {
            return Evaluation {
                products_tested,
                hit,
            };
        }
    }

    Evaluation {
        products_tested,
        hit: None,
    }
}
