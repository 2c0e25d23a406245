//! Outcome-equivalence classes of generators.
//!
//! Generators whose symmetry keys agree share their classification outcome,
//! so combination rounds only test each class's representative (its lowest
//! index) and the result is propagated to the other members.

use std::collections::HashMap;

use gamma_core::{GeneratorSet, GroupArithmetic};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassFlag {
    Untested,
    Successful,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceClass {
    representative: usize,
    members: Vec<usize>,
    flag: ClassFlag,
}

impl EquivalenceClass {
    pub fn representative(&self) -> usize {
        self.representative
    }

    /// Members in ascending index order, representative first.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn flag(&self) -> ClassFlag {
        self.flag
    }
}

/// Partition of all generator indices into equivalence classes.
#[derive(Debug, Clone)]
pub struct EquivalenceClasses {
    classes: Vec<EquivalenceClass>,
    class_of: Vec<usize>,
}

impl EquivalenceClasses {
    /// Group generators by the arithmetic's symmetry key. Falls back to
    /// singletons when the arithmetic offers no key.
    pub fn build<A: GroupArithmetic>(arith: &A, set: &GeneratorSet) -> Self {
        let mut classes: Vec<EquivalenceClass> = Vec::new();
        let mut class_of = Vec::with_capacity(set.len());
        let mut by_key = HashMap::new();

        for (index, generator) in set.iter().enumerate() {
            let Some(key) = arith.symmetry_key(generator) else {
                log::debug!("No symmetry key for generator {}, pruning disabled", index);
                return Self::singletons(set.len());
            };
            let class = *by_key.entry(key).or_insert_with(|| {
                classes.push(EquivalenceClass {
                    representative: index,
                    members: Vec::new(),
                    flag: ClassFlag::Untested,
                });
                classes.len() - 1
            });
            classes[class].members.push(index);
            class_of.push(class);
        }

        EquivalenceClasses { classes, class_of }
    }

    /// Every generator in its own class.
    pub fn singletons(len: usize) -> Self {
        EquivalenceClasses {
            classes: (0..len)
                .map(|i| EquivalenceClass {
                    representative: i,
                    members: vec![i],
                    flag: ClassFlag::Untested,
                })
                .collect(),
            class_of: (0..len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_of(&self, index: usize) -> &EquivalenceClass {
        &self.classes[self.class_of[index]]
    }

    pub fn is_representative(&self, index: usize) -> bool {
        self.class_of(index).representative == index
    }

    /// Record the outcome of `index`'s class.
    ///
    /// Returns `true` if this call set the flag. The first writer wins;
    /// a later conflicting outcome means the symmetry relation was not
    /// outcome-preserving, which is a bug in the arithmetic.
    pub fn resolve(&mut self, index: usize, flag: ClassFlag) -> bool {
        let class = &mut self.classes[self.class_of[index]];
        match class.flag {
            ClassFlag::Untested => {
                class.flag = flag;
                true
            }
            current => {
                debug_assert!(
                    current == flag || flag == ClassFlag::Untested,
                    "class of generator {} already {:?}, got {:?}",
                    index,
                    current,
                    flag
                );
                false
            }
        }
    }

    /// Count classes carrying `flag`.
    pub fn count(&self, flag: ClassFlag) -> usize {
        self.classes.iter().filter(|c| c.flag == flag).count()
    }
}
