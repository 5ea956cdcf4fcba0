//! Reed-Solomon (GF(2^8), `m=8`) block codec backend.
//!
//! Backed by the `reed-solomon-erasure` crate. This adaptor is
//! decode-only: the engine only ever receives symbols and reconstructs
//! missing ones, it never encodes.

use super::{BlockCodec, CodecStats};
use crate::error::FecError;
use reed_solomon_erasure::galois_8::ReedSolomon;

pub struct ReedSolomonCodec {
    n: usize,
    symbol_size: usize,
    rs: ReedSolomon,
    shards: Vec<Option<Vec<u8>>>,
    /// Whether slot `i` was registered via `set` this block, as opposed
    /// to filled in by reconstruction — used only to count repairs.
    received: Vec<bool>,
    packets_received: usize,
    /// Cleared on every `set`, so the next `repair` call performs a
    /// fresh decode attempt; set once a decode has been tried so later
    /// `repair` calls in the same pass reuse the cached table.
    decode_attempted: bool,
    stats: CodecStats,
}

impl ReedSolomonCodec {
    pub fn new(n: usize, m: usize, symbol_size: usize) -> Result<Self, FecError> {
        if n == 0 {
            return Err(FecError::ZeroSourceBlockSize);
        }
        if symbol_size == 0 {
            return Err(FecError::ZeroSymbolSize);
        }
        let rs = ReedSolomon::new(n, m)
            .map_err(|e| FecError::InvalidConfig(format!("reed-solomon setup: {e}")))?;
        Ok(Self {
            n,
            symbol_size,
            rs,
            shards: vec![None; n + m],
            received: vec![false; n + m],
            packets_received: 0,
            decode_attempted: false,
            stats: CodecStats::default(),
        })
    }
}

impl BlockCodec for ReedSolomonCodec {
    fn set(&mut self, index: usize, payload: &[u8]) {
        assert!(
            index < self.shards.len(),
            "reed-solomon codec: index out of bounds: index={index}, size={}",
            self.shards.len()
        );
        assert_eq!(
            payload.len(),
            self.symbol_size,
            "reed-solomon codec: invalid payload size: size={}, expected={}",
            payload.len(),
            self.symbol_size
        );
        assert!(
            self.shards[index].is_none(),
            "reed-solomon codec: can't overwrite buffer: index={index}"
        );

        self.shards[index] = Some(payload.to_vec());
        self.received[index] = true;
        self.packets_received += 1;
        self.decode_attempted = false;
        self.stats.symbols_received += 1;
    }

    fn repair(&mut self, index: usize) -> Option<&[u8]> {
        if self.shards[index].is_none() && !self.decode_attempted {
            self.decode_attempted = true;
            self.stats.decode_attempts += 1;

            if self.packets_received >= self.n && self.rs.reconstruct(&mut self.shards).is_ok() {
                for i in 0..self.n {
                    if !self.received[i] && self.shards[i].is_some() {
                        self.stats.symbols_repaired += 1;
                    }
                }
            } else {
                self.stats.decode_failures += 1;
            }
        }

        self.shards[index].as_deref()
    }

    fn reset(&mut self) {
        for slot in self.shards.iter_mut() {
            *slot = None;
        }
        for r in self.received.iter_mut() {
            *r = false;
        }
        self.packets_received = 0;
        self.decode_attempted = false;
    }

    fn stats(&self) -> CodecStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(byte: u8, size: usize) -> Vec<u8> {
        vec![byte; size]
    }

    #[test]
    fn full_source_set_needs_no_repair() {
        let mut c = ReedSolomonCodec::new(4, 2, 8).unwrap();
        for i in 0..4 {
            c.set(i, &symbol(i as u8, 8));
        }
        // Nothing missing: repair on a present index just returns it.
        assert_eq!(c.repair(0), Some(symbol(0, 8).as_slice()));
    }

    #[test]
    fn reconstructs_missing_source_symbol_from_parity() {
        let mut c = ReedSolomonCodec::new(4, 2, 8).unwrap();
        // Encode 4 data shards + 2 parity out of band, simulating a real
        // sender, then drop shard 1 on the receive side.
        let data: Vec<Vec<u8>> = (0..4u8).map(|i| symbol(i, 8)).collect();
        let rs = ReedSolomon::new(4, 2).unwrap();
        let mut full: Vec<Vec<u8>> = data.clone();
        full.push(vec![0; 8]);
        full.push(vec![0; 8]);
        rs.encode(&mut full).unwrap();

        c.set(0, &full[0]);
        // shard 1 missing
        c.set(2, &full[2]);
        c.set(3, &full[3]);
        c.set(4, &full[4]);
        c.set(5, &full[5]);

        let repaired = c.repair(1).expect("should reconstruct shard 1").to_vec();
        assert_eq!(repaired, full[1]);
        assert_eq!(c.stats().symbols_repaired, 1);
    }

    #[test]
    fn too_few_symbols_yields_no_repair() {
        let mut c = ReedSolomonCodec::new(4, 2, 8).unwrap();
        c.set(0, &symbol(0, 8));
        c.set(1, &symbol(1, 8));
        // Only 2 of 4 data shards and no parity: below N, never attempts.
        assert_eq!(c.repair(2), None);
        assert_eq!(c.stats().decode_failures, 1);
    }

    #[test]
    fn repair_is_cached_within_a_block() {
        let mut c = ReedSolomonCodec::new(4, 2, 8).unwrap();
        c.set(0, &symbol(0, 8));
        c.set(1, &symbol(1, 8));
        let _ = c.repair(2);
        let _ = c.repair(3);
        // Both missing-index lookups should only have triggered one decode
        // attempt, since nothing new was `set` in between.
        assert_eq!(c.stats().decode_attempts, 1);
    }

    #[test]
    fn reset_clears_registered_symbols() {
        let mut c = ReedSolomonCodec::new(4, 2, 8).unwrap();
        c.set(0, &symbol(0, 8));
        c.reset();
        // Re-setting the same index after reset must not panic.
        c.set(0, &symbol(9, 8));
    }

    #[test]
    #[should_panic(expected = "can't overwrite")]
    fn double_set_at_same_index_panics() {
        let mut c = ReedSolomonCodec::new(4, 2, 8).unwrap();
        c.set(0, &symbol(0, 8));
        c.set(0, &symbol(1, 8));
    }

    #[test]
    #[should_panic(expected = "invalid payload size")]
    fn wrong_payload_size_panics() {
        let mut c = ReedSolomonCodec::new(4, 2, 8).unwrap();
        c.set(0, &symbol(0, 4));
    }
}
