//! Generator file loading.
//!
//! The SageMath generation script writes `gamma_{n}_generators.txt`: one
//! integer per line, four consecutive lines per matrix in row-major order.
//! Entries may also be separated by commas and arbitrary whitespace.
//!
//! Two encodings exist. [`GeneratorFormat::Gamma`] files hold the matrices
//! X of Gamma(n) themselves. [`GeneratorFormat::Tilde`] files hold
//! `Y = (X - I) / n`, one fixed-width comma-separated row per matrix; they
//! are mapped back to `X = I + nY` on load.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::arith::{det_mod, reduce};
use crate::{Generator, GeneratorSet};

/// How matrices are encoded in a generator file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorFormat {
    #[default]
    Gamma,
    Tilde,
}

impl FromStr for GeneratorFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gamma" => Ok(GeneratorFormat::Gamma),
            "tilde" => Ok(GeneratorFormat::Tilde),
            other => Err(format!("unknown generator format '{}'", other)),
        }
    }
}

/// `X = I + nY`, or `None` on i64 overflow.
pub fn from_tilde(y: &Generator, n: u64) -> Option<Generator> {
    let n = i64::try_from(n).ok()?;
    Some([
        y[0].checked_mul(n)?.checked_add(1)?,
        y[1].checked_mul(n)?,
        y[2].checked_mul(n)?,
        y[3].checked_mul(n)?.checked_add(1)?,
    ])
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("entry {position} ('{token}') is not a 64-bit integer")]
    Parse { position: usize, token: String },

    #[error("{entries} entries is not a multiple of 4")]
    Truncated { entries: usize },

    #[error("no generators for modulus {modulus}")]
    Empty { modulus: u64 },

    #[error("generator {index} has determinant {det} mod {modulus}, expected 1")]
    NotInGroup { index: usize, det: i128, modulus: u64 },

    #[error("modulus must be at least 1")]
    ZeroModulus,

    #[error("generator {index} overflows 64 bits after I + n*Y")]
    Overflow { index: usize },
}

/// File name the generation tooling uses for modulus n.
pub fn generator_file_name(n: u64) -> String {
    format!("gamma_{}_generators.txt", n)
}

/// Load and validate the Gamma(n) generators for modulus `n` from `dir`.
pub fn load_generators(dir: impl AsRef<Path>, n: u64) -> Result<GeneratorSet, LoadError> {
    load_generators_as(dir, n, GeneratorFormat::Gamma)
}

/// Load generators stored in `format`.
pub fn load_generators_as(
    dir: impl AsRef<Path>,
    n: u64,
    format: GeneratorFormat,
) -> Result<GeneratorSet, LoadError> {
    let path = dir.as_ref().join(generator_file_name(n));
    let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
        path: path.clone(),
        source,
    })?;
    let set = parse_generators_as(&text, n, format)?;
    log::debug!(
        "Loaded {} generators ({:?}) from {}",
        set.len(),
        format,
        path.display()
    );
    Ok(set)
}

/// Parse Gamma(n) generator text for modulus `n`.
///
/// Every matrix must have determinant 1 modulo n.
pub fn parse_generators(text: &str, n: u64) -> Result<GeneratorSet, LoadError> {
    parse_generators_as(text, n, GeneratorFormat::Gamma)
}

/// Parse generator text in `format`, returning the Gamma(n) matrices.
pub fn parse_generators_as(
    text: &str,
    n: u64,
    format: GeneratorFormat,
) -> Result<GeneratorSet, LoadError> {
    if n == 0 {
        return Err(LoadError::ZeroModulus);
    }

    let entries = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(position, token)| {
            token.parse::<i64>().map_err(|_| LoadError::Parse {
                position,
                token: token.to_string(),
            })
        })
        .collect::<Result<Vec<i64>, LoadError>>()?;

    if entries.len() % 4 != 0 {
        return Err(LoadError::Truncated {
            entries: entries.len(),
        });
    }
    if entries.is_empty() {
        return Err(LoadError::Empty { modulus: n });
    }

    let m = n as i128;
    let mut generators: Vec<Generator> = entries
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect();
    if format == GeneratorFormat::Tilde {
        for (index, g) in generators.iter_mut().enumerate() {
            *g = from_tilde(g, n).ok_or(LoadError::Overflow { index })?;
        }
    }

    for (index, g) in generators.iter().enumerate() {
        let det = det_mod(g, m);
        if det != reduce(1, m) {
            return Err(LoadError::NotInGroup {
                index,
                det,
                modulus: n,
            });
        }
    }

    Ok(GeneratorSet::new(n, generators))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_line_per_entry() {
        let text = "1\n3\n0\n1\n1\n0\n3\n1\n";
        let set = parse_generators(text, 3).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[0], [1, 3, 0, 1]);
        assert_eq!(set[1], [1, 0, 3, 1]);
    }

    #[test]
    fn test_parse_comma_separated_rows() {
        let text = "  -5,   2, -3,   1\n 1, 0, 4, 1\n";
        let set = parse_generators(text, 2).unwrap();
        assert_eq!(set[0], [-5, 2, -3, 1]);
        assert_eq!(set.modulus(), 2);
    }

    #[test]
    fn test_parse_rejects_bad_token() {
        let err = parse_generators("1\n2\nx\n4\n", 5).unwrap_err();
        assert!(matches!(err, LoadError::Parse { position: 2, .. }));
    }

    #[test]
    fn test_parse_rejects_truncated() {
        let err = parse_generators("1 0 0 1 1 2", 5).unwrap_err();
        assert!(matches!(err, LoadError::Truncated { entries: 6 }));
    }

    #[test]
    fn test_parse_rejects_empty() {
        let err = parse_generators("\n\n", 5).unwrap_err();
        assert!(matches!(err, LoadError::Empty { modulus: 5 }));
    }

    #[test]
    fn test_parse_rejects_non_unit_determinant() {
        let err = parse_generators("1 0 0 1\n2 0 0 1\n", 5).unwrap_err();
        assert!(matches!(
            err,
            LoadError::NotInGroup {
                index: 1,
                det: 2,
                modulus: 5
            }
        ));
    }

    #[test]
    fn test_parse_rejects_zero_modulus() {
        assert!(matches!(
            parse_generators("1 0 0 1", 0),
            Err(LoadError::ZeroModulus)
        ));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(generator_file_name(4));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "1\n4\n0\n1\n-3\n4\n-4\n5").unwrap();
        drop(file);

        let set = load_generators(dir.path(), 4).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[1], [-3, 4, -4, 5]);
    }

    #[test]
    fn test_parse_tilde_rows() {
        // Y = (X - I) / 3 for X = [[1, 3], [0, 1]] and [[4, 3], [9, 7]].
        let text = "               0,                1,                0,                0\n\
                    1, 1, 3, 2\n";
        let set = parse_generators_as(text, 3, GeneratorFormat::Tilde).unwrap();
        assert_eq!(set[0], [1, 3, 0, 1]);
        assert_eq!(set[1], [4, 3, 9, 7]);

        // The same rows read as Gamma matrices are not in the group.
        assert!(matches!(
            parse_generators(text, 3),
            Err(LoadError::NotInGroup { index: 0, .. })
        ));
    }

    #[test]
    fn test_tilde_overflow() {
        let text = format!("{} 0 0 0", i64::MAX / 2);
        assert!(matches!(
            parse_generators_as(&text, 5, GeneratorFormat::Tilde),
            Err(LoadError::Overflow { index: 0 })
        ));
        assert_eq!(from_tilde(&[0, 1, 0, 0], 7), Some([1, 7, 0, 1]));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("tilde".parse::<GeneratorFormat>(), Ok(GeneratorFormat::Tilde));
        assert_eq!("gamma".parse::<GeneratorFormat>(), Ok(GeneratorFormat::Gamma));
        assert!("sage".parse::<GeneratorFormat>().is_err());
    }

    #[test]
    fn test_load_tilde_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(generator_file_name(5)), "0, 1, 0, 0\n0, 0, 1, 0\n")
            .unwrap();
        let set = load_generators_as(dir.path(), 5, GeneratorFormat::Tilde).unwrap();
        assert_eq!(set[0], [1, 5, 0, 1]);
        assert_eq!(set[1], [1, 0, 5, 1]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_generators(dir.path(), 9).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("gamma_9_generators.txt"));
    }
}
