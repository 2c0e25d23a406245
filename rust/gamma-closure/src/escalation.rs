//! Combination strategies and the escalation table between them.
//!
//! A run walks the table one step at a time. It stays on a step while rounds
//! make progress and moves along when a round classifies nothing. The table
//! decides where a stall leads: the next step, back to the start (cycling
//! tables), or failure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest multiplication level a table may reach. Arrangement masks are
/// `u32`, and the work per candidate grows like `(L + 1) * 2^L * |S|^L`.
pub const MAX_LEVEL: usize = 16;

/// How a candidate is combined with already-successful generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "level", rename_all = "snake_case")]
pub enum Strategy {
    /// The candidate times `level` multipliers, each possibly inverted,
    /// with the candidate in any position.
    Multiply(usize),
    /// As `Multiply`, and the candidate itself is also tried inverted.
    InvertedCandidate(usize),
}

impl Strategy {
    /// Number of multipliers combined with the candidate.
    pub fn level(&self) -> usize {
        match *self {
            Strategy::Multiply(level) | Strategy::InvertedCandidate(level) => level,
        }
    }

    pub fn inverts_candidate(&self) -> bool {
        matches!(self, Strategy::InvertedCandidate(_))
    }

    /// Products evaluated for one (candidate, multiplier list) pair.
    pub fn arrangements(&self) -> u64 {
        let level = self.level() as u64;
        let per_orientation = (level + 1) << level;
        if self.inverts_candidate() {
            2 * per_orientation
        } else {
            per_orientation
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Multiply(level) => write!(f, "MULT{}", level),
            Strategy::InvertedCandidate(level) => write!(f, "MULT{}_INV", level),
        }
    }
}

/// Which escalation table a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationPolicy {
    /// `MULT1 -> MULT2 -> ... -> MULT{ceiling}`, then fail.
    #[default]
    Ladder,
    /// `MULT1 -> ... -> MULT{ceiling} -> MULT{ceiling}_INV -> MULT1 -> ...`,
    /// failing once a whole cycle stalls.
    Cycle,
}

impl std::str::FromStr for EscalationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ladder" => Ok(EscalationPolicy::Ladder),
            "cycle" => Ok(EscalationPolicy::Cycle),
            other => Err(format!("unknown escalation policy '{}'", other)),
        }
    }
}

/// The escalation policy as data: an ordered list of strategies and whether
/// running off the end wraps around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationTable {
    steps: Vec<Strategy>,
    wraps: bool,
}

impl EscalationTable {
    /// Strictly increasing levels `1..=ceiling`.
    pub fn ladder(ceiling: usize) -> Self {
        let ceiling = ceiling.clamp(1, MAX_LEVEL);
        EscalationTable {
            steps: (1..=ceiling).map(Strategy::Multiply).collect(),
            wraps: false,
        }
    }

    /// Levels `1..=ceiling` followed by the inverted-candidate variant of
    /// the top level, wrapping back to level 1.
    pub fn cycle(ceiling: usize) -> Self {
        let ceiling = ceiling.clamp(1, MAX_LEVEL);
        let mut steps: Vec<Strategy> = (1..=ceiling).map(Strategy::Multiply).collect();
        steps.push(Strategy::InvertedCandidate(ceiling));
        EscalationTable { steps, wraps: true }
    }

    pub fn from_policy(policy: EscalationPolicy, ceiling: usize) -> Self {
        match policy {
            EscalationPolicy::Ladder => Self::ladder(ceiling),
            EscalationPolicy::Cycle => Self::cycle(ceiling),
        }
    }

    pub fn steps(&self) -> &[Strategy] {
        &self.steps
    }

    pub fn wraps(&self) -> bool {
        self.wraps
    }

    pub fn strategy(&self, step: usize) -> Strategy {
        self.steps[step]
    }

    /// Highest level any step reaches.
    pub fn ceiling(&self) -> usize {
        self.steps.iter().map(Strategy::level).max().unwrap_or(1)
    }

    /// Where to go after a zero-progress round on `step`.
    ///
    /// `stalled` counts consecutive zero-progress rounds including this one.
    /// `None` means the run has failed: either a non-wrapping table ran out
    /// of steps, or every step of a wrapping table stalled in a row.
    pub fn on_stall(&self, step: usize, stalled: usize) -> Option<usize> {
        if stalled >= self.steps.len() {
            return None;
        }
        if step + 1 < self.steps.len() {
            Some(step + 1)
        } else if self.wraps {
            Some(0)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_transitions() {
        let table = EscalationTable::ladder(2);
        assert_eq!(
            table.steps(),
            &[Strategy::Multiply(1), Strategy::Multiply(2)]
        );
        assert_eq!(table.on_stall(0, 1), Some(1));
        assert_eq!(table.on_stall(1, 1), None);
        assert_eq!(table.on_stall(1, 2), None);
        assert_eq!(table.ceiling(), 2);
    }

    #[test]
    fn test_ladder_ceiling_one_fails_immediately() {
        let table = EscalationTable::ladder(1);
        assert_eq!(table.on_stall(0, 1), None);
    }

    #[test]
    fn test_cycle_transitions() {
        let table = EscalationTable::cycle(2);
        assert_eq!(
            table.steps(),
            &[
                Strategy::Multiply(1),
                Strategy::Multiply(2),
                Strategy::InvertedCandidate(2)
            ]
        );
        assert!(table.wraps());
        assert_eq!(table.on_stall(0, 1), Some(1));
        assert_eq!(table.on_stall(1, 2), Some(2));
        // Progress on step 2 earlier, then a stall there: wrap to level 1.
        assert_eq!(table.on_stall(2, 1), Some(0));
        // A full cycle without progress.
        assert_eq!(table.on_stall(2, 3), None);
        assert_eq!(table.on_stall(0, 3), None);
    }

    #[test]
    fn test_ceiling_clamped() {
        assert_eq!(EscalationTable::ladder(0).steps().len(), 1);
        assert_eq!(EscalationTable::ladder(100).ceiling(), MAX_LEVEL);
    }

    #[test]
    fn test_arrangement_counts() {
        assert_eq!(Strategy::Multiply(1).arrangements(), 4);
        assert_eq!(Strategy::Multiply(2).arrangements(), 12);
        assert_eq!(Strategy::InvertedCandidate(2).arrangements(), 24);
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(Strategy::Multiply(2).to_string(), "MULT2");
        assert_eq!(Strategy::InvertedCandidate(2).to_string(), "MULT2_INV");
        assert_eq!("cycle".parse::<EscalationPolicy>(), Ok(EscalationPolicy::Cycle));
        assert!("spiral".parse::<EscalationPolicy>().is_err());
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&Strategy::InvertedCandidate(2)).unwrap();
        assert_eq!(json, r#"{"kind":"inverted_candidate","level":2}"#);
        let back: Strategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Strategy::InvertedCandidate(2));
    }
}
