//! Reader configuration surface.
//!
//! A serde-deserializable, all-`Option`, TOML-sourced `ReaderConfigInput`
//! is resolved into a strict `ReaderConfig`, with invalid combinations
//! (zero `N`, zero `M` for a scheme that needs repair symbols, an
//! out-of-range `N1`, an unknown scheme name) rejected at `resolve()`
//! time rather than deep inside the reader.

use crate::error::FecError;
use serde::Deserialize;

/// Default source/repair block sizes and symbol size.
const DEFAULT_N: usize = 10;
const DEFAULT_M: usize = 5;
const DEFAULT_SYMBOL_SIZE: usize = 200;

/// LDPC-Staircase defaults: a fixed PRNG seed and a conservative `N1`,
/// so the equation structure is reproducible across runs.
const DEFAULT_PRNG_SEED: u64 = 1_297_501_556;
const DEFAULT_N1: usize = 7;

/// Block erasure code selection. Fixed per reader instance at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    ReedSolomon,
    LdpcStaircase { prng_seed: u64, n1: usize },
}

/// How the reader determines the session's expected `source_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceIdPolicy {
    /// Latch on the first source packet observed.
    LatchFirst,
    /// The expected source id is already known, e.g. from signaling.
    Fixed(u32),
}

/// Resolved, validated reader configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    pub scheme: Scheme,
    pub n: usize,
    pub m: usize,
    pub symbol_size: usize,
    pub source_id_policy: SourceIdPolicy,
}

/// TOML-sourced configuration input. Every field is optional so that a
/// deployment only needs to override what differs from the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReaderConfigInput {
    pub scheme: Option<String>,
    pub n: Option<usize>,
    pub m: Option<usize>,
    pub symbol_size: Option<usize>,
    pub prng_seed: Option<u64>,
    pub n1: Option<usize>,
    pub source_id: Option<u32>,
}

impl ReaderConfigInput {
    pub fn resolve(&self) -> Result<ReaderConfig, FecError> {
        let n = self.n.unwrap_or(DEFAULT_N);
        let m = self.m.unwrap_or(DEFAULT_M);
        let symbol_size = self.symbol_size.unwrap_or(DEFAULT_SYMBOL_SIZE);

        if n == 0 {
            return Err(FecError::ZeroSourceBlockSize);
        }
        if symbol_size == 0 {
            return Err(FecError::ZeroSymbolSize);
        }

        let scheme = match self.scheme.as_deref().unwrap_or("reed_solomon") {
            "reed_solomon" => Scheme::ReedSolomon,
            "ldpc_staircase" => {
                if m == 0 {
                    return Err(FecError::ZeroRepairBlockSize);
                }
                let n1 = self.n1.unwrap_or_else(|| DEFAULT_N1.min(n));
                if n1 == 0 || n1 > n {
                    return Err(FecError::InvalidN1 { n });
                }
                Scheme::LdpcStaircase {
                    prng_seed: self.prng_seed.unwrap_or(DEFAULT_PRNG_SEED),
                    n1,
                }
            }
            other => return Err(FecError::InvalidConfig(format!("unknown scheme: {other}"))),
        };

        let source_id_policy = match self.source_id {
            Some(id) => SourceIdPolicy::Fixed(id),
            None => SourceIdPolicy::LatchFirst,
        };

        Ok(ReaderConfig {
            scheme,
            n,
            m,
            symbol_size,
            source_id_policy,
        })
    }
}

/// Convenience loader: parses TOML text and resolves it in one step.
pub fn load_toml(text: &str) -> Result<ReaderConfig, FecError> {
    let input: ReaderConfigInput = toml::from_str(text)?;
    input.resolve()
}
