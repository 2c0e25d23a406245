//! gamma-closure: round-based parallel closure search over the generators
//! of Gamma(n).
//!
//! A generator is classified once it satisfies the target predicate, either
//! on its own or as part of a product with generators already classified.
//! Starting from the direct matches, rounds of combination tests grow the
//! successful set; when a round makes no progress the multiplication level
//! escalates. A modulus succeeds when every generator is classified.
//!
//! Rounds run on a caller-owned worker pool and are barrier-synchronized:
//! the successful set only changes between rounds.

pub mod combinations;
pub mod config;
pub mod equivalence;
pub mod error;
pub mod escalation;
pub mod evaluator;
pub mod pool;
pub mod report;
pub mod scheduler;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::{ClassifierOptions, ClosureConfig};
pub use equivalence::{ClassFlag, EquivalenceClasses};
pub use error::{ClassifyError, ConfigError};
pub use escalation::{EscalationPolicy, EscalationTable, Strategy};
pub use pool::{SequentialExecutor, TaskExecutor, WorkerPool};
pub use report::{FailureReason, ModulusOutcome, RunStatus, RunSummary, Witness};
pub use state::{classify, ClassificationRun, ClassificationState, Phase};
