//! Per-modulus outcomes and per-generator statistics.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ClosureConfig;
use crate::error::ClassifyError;
use crate::escalation::Strategy;
use crate::evaluator::Arrangement;

/// How a generator ended up classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Witness {
    /// Satisfies the predicate on its own.
    Direct,
    /// Satisfies it in combination with already-successful generators.
    Combination {
        strategy: Strategy,
        arrangement: Arrangement,
    },
    /// Shares an equivalence class with `source`, which was classified.
    Propagated { source: usize },
    /// Not classified when the run stopped.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorStat {
    pub index: usize,
    /// Products evaluated with this generator as the candidate, summed over
    /// every round it took part in.
    pub products_tested: u64,
    pub witness: Witness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// No generator satisfies the predicate alone.
    NoInitialSuccess,
    /// The escalation table ran out while generators remained.
    LevelExhausted { strategy: Strategy },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoInitialSuccess => write!(f, "no initial success"),
            FailureReason::LevelExhausted { strategy } => {
                write!(f, "exhausted at {}", strategy)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// One barrier-synchronized round as seen at its boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    /// `None` for the initial single-generator pass.
    pub strategy: Option<Strategy>,
    pub anchor_cursor: usize,
    /// Candidates submitted (class representatives only).
    pub candidates: usize,
    pub tasks: usize,
    /// Generators moved to successful, propagated class members included.
    pub new_successes: usize,
    pub successful_after: usize,
    pub remaining_after: usize,
    pub products_tested: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub initial_pass_secs: f64,
    pub class_build_secs: f64,
    pub combining_secs: f64,
    pub total_secs: f64,
}

impl PhaseTimings {
    pub(crate) fn from_durations(
        initial_pass: Duration,
        class_build: Duration,
        combining: Duration,
        total: Duration,
    ) -> Self {
        PhaseTimings {
            initial_pass_secs: initial_pass.as_secs_f64(),
            class_build_secs: class_build.as_secs_f64(),
            combining_secs: combining.as_secs_f64(),
            total_secs: total.as_secs_f64(),
        }
    }
}

/// Final classification of one modulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulusOutcome {
    pub modulus: u64,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    pub total_generators: usize,
    pub successful: usize,
    pub remaining: usize,
    pub classes: usize,
    /// Strategy of the last combination round, if any ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_strategy: Option<Strategy>,
    /// Highest multiplication level any round used (0: initial pass only).
    pub max_level: usize,
    pub products_tested: u64,
    pub rounds: Vec<RoundRecord>,
    pub timings: PhaseTimings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stats: Vec<GeneratorStat>,
}

impl ModulusOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// The failure as an error value, for callers that propagate it.
    pub fn error(&self) -> Option<ClassifyError> {
        match self.failure? {
            FailureReason::NoInitialSuccess => Some(ClassifyError::NoInitialSuccess {
                modulus: self.modulus,
            }),
            FailureReason::LevelExhausted { strategy } => Some(ClassifyError::LevelExhausted {
                modulus: self.modulus,
                strategy,
                remaining: self.remaining,
            }),
        }
    }
}

impl fmt::Display for ModulusOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.failure {
            None => "SUCCEEDED".to_string(),
            Some(reason) => format!("FAILED ({})", reason),
        };
        let strategy = self
            .final_strategy
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:>5} {:>7} {:>7} {:>9} {:>6} {:>10} {:>9.3}s  {}",
            self.modulus,
            self.total_generators,
            self.classes,
            format!("{}/{}", self.successful, self.total_generators),
            self.rounds.len(),
            strategy,
            self.timings.total_secs,
            status
        )
    }
}

/// A modulus skipped because its generators could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub modulus: u64,
    pub message: String,
}

/// Everything a driver run produced, written as the JSON report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub config: ClosureConfig,
    pub outcomes: Vec<ModulusOutcome>,
    pub load_failures: Vec<LoadFailure>,
}

impl RunSummary {
    pub fn new(config: ClosureConfig) -> Self {
        RunSummary {
            config,
            outcomes: Vec::new(),
            load_failures: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}
