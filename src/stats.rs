//! Reader-level observability snapshot.
//!
//! Pure bookkeeping: reading it never changes delivery order or codec
//! behavior. A flat, serializable struct returned by value from a
//! `stats()` accessor.

use crate::codec::CodecStats;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    pub blocks_completed: u64,
    pub packets_emitted: u64,
    pub packets_dropped_stale: u64,
    pub packets_dropped_duplicate: u64,
    pub packets_dropped_unparseable: u64,
    pub packets_dropped_bad_seqnum: u64,
    pub repairs_attempted: u64,
    pub repairs_succeeded: u64,
    pub repairs_failed: u64,
    pub source_queue_depth: usize,
    pub repair_queue_depth: usize,
}

impl ReaderStats {
    /// Codec counters are cumulative for the codec's whole lifetime, so
    /// this overwrites rather than accumulates.
    pub(crate) fn sync_from_codec(&mut self, codec: CodecStats) {
        self.repairs_attempted = codec.decode_attempts;
        self.repairs_succeeded = codec.symbols_repaired;
        self.repairs_failed = codec.decode_failures;
    }
}
