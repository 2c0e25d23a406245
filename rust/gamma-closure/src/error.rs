use std::path::PathBuf;

use gamma_core::LoadError;

use crate::escalation::Strategy;

/// Per-modulus failures. None of them stop a multi-modulus run.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Gamma({modulus}): no generator satisfies the predicate on its own")]
    NoInitialSuccess { modulus: u64 },

    #[error("Gamma({modulus}): {remaining} generators unclassified after exhausting {strategy}")]
    LevelExhausted {
        modulus: u64,
        strategy: Strategy,
        remaining: usize,
    },

    #[error("Gamma({modulus}): failed to load generators: {source}")]
    Load {
        modulus: u64,
        #[source]
        source: LoadError,
    },

    #[error("Gamma({modulus}): {modulus}^{power} does not fit in 63 bits")]
    ModulusTooLarge { modulus: u64, power: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
