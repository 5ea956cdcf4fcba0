//! LDPC-Staircase block codec backend.
//!
//! Repair symbol `j`'s parity equation XORs together `n1` pseudo-randomly
//! chosen source symbols, repair symbol `j` itself, and (the staircase
//! term) repair symbol `j-1` for `j>0`. That structure is built once at
//! construction — it's a property of the scheme's parameters, not of any
//! particular block's data — and reused for every block.
//!
//! Decoding solves the resulting linear system over GF(2) by Gaussian
//! elimination: each received symbol is a known variable, each repair
//! equation is a row, and row-reduction (XOR of whole `S`-byte symbol
//! buffers, valid because the code is linear over GF(2) regardless of
//! vector width) recovers any missing source symbol whose column ends
//! up as a fully-resolved pivot.

use super::{BlockCodec, CodecStats};
use crate::error::FecError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

pub struct LdpcStaircaseCodec {
    n: usize,
    symbol_size: usize,
    /// One entry per repair row: the global slot indices (`0..n+m`)
    /// participating in that row's parity equation.
    equations: Vec<Vec<usize>>,
    symbols: Vec<Option<Vec<u8>>>,
    packets_received: usize,
    decode_attempted: bool,
    /// Source indices solved by the most recent decode pass.
    solved: Vec<Option<Vec<u8>>>,
    stats: CodecStats,
}

impl LdpcStaircaseCodec {
    pub fn new(n: usize, m: usize, symbol_size: usize, prng_seed: u64, n1: usize) -> Result<Self, FecError> {
        if n == 0 {
            return Err(FecError::ZeroSourceBlockSize);
        }
        if m == 0 {
            return Err(FecError::ZeroRepairBlockSize);
        }
        if symbol_size == 0 {
            return Err(FecError::ZeroSymbolSize);
        }
        if n1 == 0 || n1 > n {
            return Err(FecError::InvalidN1 { n });
        }

        let mut rng = StdRng::seed_from_u64(prng_seed);
        let mut equations = Vec::with_capacity(m);
        for j in 0..m {
            let mut chosen = HashSet::with_capacity(n1);
            while chosen.len() < n1 {
                chosen.insert(rng.random_range(0..n));
            }
            let mut support: Vec<usize> = chosen.into_iter().collect();
            support.sort_unstable();
            if j > 0 {
                support.push(n + j - 1);
            }
            support.push(n + j);
            equations.push(support);
        }

        Ok(Self {
            n,
            symbol_size,
            equations,
            symbols: vec![None; n + m],
            packets_received: 0,
            decode_attempted: false,
            solved: vec![None; n],
            stats: CodecStats::default(),
        })
    }

    /// Runs Gauss-Jordan elimination over GF(2) to solve for every
    /// currently-missing source symbol reachable from the registered
    /// symbols and the fixed parity structure. Populates `self.solved`.
    fn try_decode(&mut self) {
        self.decode_attempted = true;
        self.stats.decode_attempts += 1;

        if self.packets_received < self.n {
            self.stats.decode_failures += 1;
            return;
        }

        // Assign a matrix column to every unknown (missing) slot.
        let mut col_of_idx = vec![None; self.symbols.len()];
        let mut idx_of_col = Vec::new();
        for (idx, sym) in self.symbols.iter().enumerate() {
            if sym.is_none() {
                col_of_idx[idx] = Some(idx_of_col.len());
                idx_of_col.push(idx);
            }
        }
        let k = idx_of_col.len();
        if k == 0 {
            return;
        }
        let words = k.div_ceil(64);

        // Build one row per repair equation: the bit-vector of unknown
        // columns it touches, and the RHS accumulated from known terms.
        let mut rows: Vec<(Vec<u64>, Vec<u8>)> = Vec::with_capacity(self.equations.len());
        for eq in &self.equations {
            let mut bits = vec![0u64; words];
            let mut rhs = vec![0u8; self.symbol_size];
            for &idx in eq {
                if let Some(col) = col_of_idx[idx] {
                    bits[col / 64] |= 1u64 << (col % 64);
                } else if let Some(val) = &self.symbols[idx] {
                    for b in 0..self.symbol_size {
                        rhs[b] ^= val[b];
                    }
                }
            }
            rows.push((bits, rhs));
        }

        let mut row_for_col: Vec<Option<usize>> = vec![None; k];
        let mut next_free = 0usize;
        for col in 0..k {
            let word = col / 64;
            let bit = 1u64 << (col % 64);
            let Some(found) = (next_free..rows.len()).find(|&r| rows[r].0[word] & bit != 0) else {
                continue;
            };
            rows.swap(next_free, found);
            let (pivot_bits, pivot_rhs) = rows[next_free].clone();
            for r in 0..rows.len() {
                if r != next_free && rows[r].0[word] & bit != 0 {
                    for w in 0..words {
                        rows[r].0[w] ^= pivot_bits[w];
                    }
                    for b in 0..self.symbol_size {
                        rows[r].1[b] ^= pivot_rhs[b];
                    }
                }
            }
            row_for_col[col] = Some(next_free);
            next_free += 1;
        }

        let mut any_solved = false;
        for (col, row) in row_for_col.into_iter().enumerate() {
            let Some(r) = row else { continue };
            let popcount: u32 = rows[r].0.iter().map(|w| w.count_ones()).sum();
            if popcount != 1 {
                // Still entangled with other unresolved unknowns.
                continue;
            }
            let idx = idx_of_col[col];
            if idx < self.n {
                self.solved[idx] = Some(rows[r].1.clone());
                self.stats.symbols_repaired += 1;
                any_solved = true;
            }
        }

        if !any_solved {
            self.stats.decode_failures += 1;
        }
    }
}

impl BlockCodec for LdpcStaircaseCodec {
    fn set(&mut self, index: usize, payload: &[u8]) {
        assert!(
            index < self.symbols.len(),
            "ldpc-staircase codec: index out of bounds: index={index}, size={}",
            self.symbols.len()
        );
        assert_eq!(
            payload.len(),
            self.symbol_size,
            "ldpc-staircase codec: invalid payload size: size={}, expected={}",
            payload.len(),
            self.symbol_size
        );
        assert!(
            self.symbols[index].is_none(),
            "ldpc-staircase codec: can't overwrite buffer: index={index}"
        );

        self.symbols[index] = Some(payload.to_vec());
        self.packets_received += 1;
        self.decode_attempted = false;
        self.stats.symbols_received += 1;
    }

    fn repair(&mut self, index: usize) -> Option<&[u8]> {
        if self.symbols[index].is_some() {
            return self.symbols[index].as_deref();
        }
        if !self.decode_attempted {
            self.try_decode();
        }
        self.solved[index].as_deref()
    }

    fn reset(&mut self) {
        for s in self.symbols.iter_mut() {
            *s = None;
        }
        for s in self.solved.iter_mut() {
            *s = None;
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

    /// Drives a codec through an encode (computed directly from the
    /// public parity structure) and a receive side missing `lost`
    /// source indices, returning the codec after a repair scan.
    fn encode_and_drop(n: usize, m: usize, size: usize, seed: u64, n1: usize, lost: &[usize]) -> LdpcStaircaseCodec {
        let mut encoder = LdpcStaircaseCodec::new(n, m, size, seed, n1).unwrap();
        let source: Vec<Vec<u8>> = (0..n).map(|i| symbol(i as u8, size)).collect();

        // Derive repair symbols directly from the same equations: each
        // repair[j] = XOR(source neighbors) XOR repair[j-1].
        let mut repair: Vec<Vec<u8>> = Vec::with_capacity(m);
        for (j, eq) in encoder.equations.iter().enumerate() {
            let mut acc = vec![0u8; size];
            for &idx in eq {
                if idx == n + j {
                    continue; // this is the symbol being defined
                }
                let val = if idx < n {
                    &source[idx]
                } else {
                    &repair[idx - n]
                };
                for b in 0..size {
                    acc[b] ^= val[b];
                }
            }
            repair.push(acc);
        }

        let mut decoder = LdpcStaircaseCodec::new(n, m, size, seed, n1).unwrap();
        for i in 0..n {
            if !lost.contains(&i) {
                decoder.set(i, &source[i]);
            }
        }
        for j in 0..m {
            decoder.set(n + j, &repair[j]);
        }
        let _ = encoder; // only used to share the equation structure above
        decoder
    }

    #[test]
    fn recovers_single_lost_source_symbol() {
        let mut c = encode_and_drop(6, 3, 8, 42, 2, &[2]);
        let original = symbol(2, 8);
        assert_eq!(c.repair(2), Some(original.as_slice()));
        assert_eq!(c.stats().symbols_repaired, 1);
    }

    #[test]
    fn recovers_up_to_m_lost_symbols() {
        let mut c = encode_and_drop(8, 4, 8, 7, 3, &[1, 3, 5]);
        assert_eq!(c.repair(1), Some(symbol(1, 8).as_slice()));
        assert_eq!(c.repair(3), Some(symbol(3, 8).as_slice()));
        assert_eq!(c.repair(5), Some(symbol(5, 8).as_slice()));
    }

    #[test]
    fn insufficient_total_symbols_yields_no_repair() {
        let mut c = LdpcStaircaseCodec::new(6, 3, 8, 1, 2).unwrap();
        c.set(0, &symbol(0, 8));
        c.set(1, &symbol(1, 8));
        assert_eq!(c.repair(2), None);
        assert_eq!(c.stats().decode_failures, 1);
    }

    #[test]
    fn decode_is_cached_within_a_block() {
        let mut c = encode_and_drop(6, 3, 8, 9, 2, &[0, 1]);
        let _ = c.repair(0);
        let _ = c.repair(1);
        assert_eq!(c.stats().decode_attempts, 1);
    }

    #[test]
    fn reset_allows_reuse_across_blocks() {
        let mut c = encode_and_drop(6, 3, 8, 9, 2, &[0]);
        assert!(c.repair(0).is_some());
        c.reset();
        c.set(0, &symbol(99, 8));
        assert_eq!(c.repair(0), Some(symbol(99, 8).as_slice()));
    }

    #[test]
    #[should_panic(expected = "can't overwrite")]
    fn double_set_panics() {
        let mut c = LdpcStaircaseCodec::new(6, 3, 8, 1, 2).unwrap();
        c.set(0, &symbol(0, 8));
        c.set(0, &symbol(1, 8));
    }

    #[test]
    fn rejects_n1_larger_than_n() {
        assert!(LdpcStaircaseCodec::new(4, 2, 8, 1, 5).is_err());
    }
}
