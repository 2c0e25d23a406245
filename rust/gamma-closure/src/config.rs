//! Run configuration.
//!
//! Defaults match the search as it is normally run: 16 workers, batches of
//! 32 candidates, a strictly increasing level ladder capped at 2, class
//! pruning on, arithmetic mod n^2. Every Gamma(n) generator is the identity
//! mod n, so the search only has content from power 2 up. A JSON file can override any subset of fields and command
//! line flags override the file.

use std::path::Path;

use gamma_core::{load_generators_as, GeneratorFormat, GeneratorSet, Sl2Mod};
use serde::{Deserialize, Serialize};

use crate::error::{ClassifyError, ConfigError};
use crate::escalation::{EscalationPolicy, EscalationTable, MAX_LEVEL};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosureConfig {
    /// Worker threads in the pool.
    pub threads: usize,
    /// Candidates per task.
    pub batch_size: usize,
    pub policy: EscalationPolicy,
    /// Highest multiplication level.
    pub ceiling: usize,
    /// Test one representative per equivalence class.
    pub pruning: bool,
    /// Arithmetic is reduced modulo n^modulus_power.
    pub modulus_power: u32,
    /// Encoding of the generator files.
    pub format: GeneratorFormat,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            threads: 16,
            batch_size: 32,
            policy: EscalationPolicy::Ladder,
            ceiling: 2,
            pruning: true,
            modulus_power: 2,
            format: GeneratorFormat::Gamma,
        }
    }
}

/// What the classifier needs from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierOptions {
    pub batch_size: usize,
    pub escalation: EscalationTable,
    pub pruning: bool,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        ClosureConfig::default().classifier_options()
    }
}

impl ClosureConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ClosureConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.ceiling == 0 || self.ceiling > MAX_LEVEL {
            return Err(ConfigError::Invalid(format!(
                "ceiling must be in 1..={}, got {}",
                MAX_LEVEL, self.ceiling
            )));
        }
        if self.modulus_power == 0 {
            return Err(ConfigError::Invalid(
                "modulus_power must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn escalation_table(&self) -> EscalationTable {
        EscalationTable::from_policy(self.policy, self.ceiling)
    }

    /// Arithmetic for modulus `n` and its generators read from `dir`,
    /// checked against the reduction modulus n^modulus_power.
    pub fn load_modulus(
        &self,
        dir: impl AsRef<Path>,
        n: u64,
    ) -> Result<(Sl2Mod, GeneratorSet), ClassifyError> {
        let arith = Sl2Mod::with_power(n, self.modulus_power).ok_or(
            ClassifyError::ModulusTooLarge {
                modulus: n,
                power: self.modulus_power,
            },
        )?;
        let set = load_generators_as(dir, n, self.format)
            .map_err(|source| ClassifyError::Load { modulus: n, source })?;
        arith
            .validate(&set)
            .map_err(|source| ClassifyError::Load { modulus: n, source })?;
        Ok((arith, set))
    }

    pub fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions {
            batch_size: self.batch_size,
            escalation: self.escalation_table(),
            pruning: self.pruning,
        }
    }
}
