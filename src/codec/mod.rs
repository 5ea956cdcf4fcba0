//! Block erasure codec adaptor.
//!
//! A thin façade over an external erasure codec. Two scheme variants
//! expose identical operations; they differ only in configuration. The
//! codec choice is fixed per reader instance.

mod ldpc_staircase;
mod reed_solomon;

pub use ldpc_staircase::LdpcStaircaseCodec;
pub use reed_solomon::ReedSolomonCodec;

use crate::config::Scheme;
use crate::error::FecError;

/// Per-block decode telemetry, rolled up into `ReaderStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecStats {
    pub symbols_received: u64,
    pub decode_attempts: u64,
    pub decode_failures: u64,
    pub symbols_repaired: u64,
}

/// Contract for a pluggable block erasure codec.
///
/// Decoding is a single, destructive, batch operation per block: the
/// first `repair` call after enough symbols are registered triggers one
/// internal pass; later calls in the same block are served from a cached
/// output table.
pub trait BlockCodec {
    /// Registers an available symbol at `index` (`0..N+M`). Panics if
    /// `payload.len()` does not match the configured symbol size, or if
    /// `index` was already set this block — both are programmer errors
    /// in the caller, not recoverable wire conditions.
    fn set(&mut self, index: usize, payload: &[u8]);

    /// Returns a reconstructed payload for source position `index` if
    /// recoverable from the currently registered symbols, else `None`.
    fn repair(&mut self, index: usize) -> Option<&[u8]>;

    /// Discards all registered symbols and re-initializes for the next
    /// block. Must be called between blocks.
    fn reset(&mut self);

    fn stats(&self) -> CodecStats;
}

/// Builds the configured codec backend.
pub fn from_scheme(scheme: &Scheme, n: usize, m: usize, symbol_size: usize) -> Result<Box<dyn BlockCodec>, FecError> {
    match *scheme {
        Scheme::ReedSolomon => Ok(Box::new(ReedSolomonCodec::new(n, m, symbol_size)?)),
        Scheme::LdpcStaircase { prng_seed, n1 } => {
            Ok(Box::new(LdpcStaircaseCodec::new(n, m, symbol_size, prng_seed, n1)?))
        }
    }
}
