use thiserror::Error;

/// Construction-time and configuration-resolution failures.
///
/// Covers allocating the block windows and resolving a configuration
/// surface into concrete parameters. It never appears on the `read()`
/// hot path — wire errors are dropped-and-counted, session-fatal errors
/// flip `alive()`, and neither is reported as a `Result`.
#[derive(Debug, Error)]
pub enum FecError {
    #[error("source block size (N) must be non-zero")]
    ZeroSourceBlockSize,
    #[error("repair block size (M) must be non-zero for the LDPC-Staircase scheme")]
    ZeroRepairBlockSize,
    #[error("symbol size (S) must be non-zero")]
    ZeroSymbolSize,
    #[error("LDPC-Staircase N1 must be at least 1 and at most N ({n})")]
    InvalidN1 { n: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}
