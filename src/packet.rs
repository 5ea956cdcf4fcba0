//! Packet data model: the parts of an RTP/FEC packet this crate cares about.
//!
//! The transport, the RTP parser/composer, and the packet allocator all
//! live outside this crate; this module only defines the shape the core
//! needs to see.

use bytes::Bytes;
use std::rc::Rc;

/// RTP header fields the core reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub source_id: u32,
    pub seqnum: u16,
    pub marker: bool,
    pub payload_type: u8,
}

/// FEC header fields the core reads.
///
/// Present on every source and repair packet. `symbol_id` ranges over
/// `0..source_block_length` for source symbols and
/// `source_block_length..source_block_length + repair_count` for repair
/// symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FecHeader {
    pub block_number: u16,
    pub symbol_id: u16,
    pub source_block_length: u16,
}

/// A packet as seen by the FEC reader.
///
/// Opaque to everything except the accessors below; the wire bytes in
/// [`Packet::data`] are what a repaired packet's `data()` is re-parsed
/// from by the caller if it needs more than RTP/FEC headers.
#[derive(Debug, Clone)]
pub struct Packet {
    data: Bytes,
    rtp: Option<RtpHeader>,
    fec: Option<FecHeader>,
    /// The FEC symbol payload view: the fixed-size `S`-byte block that
    /// participates in the erasure code. Empty when `fec` is `None`.
    payload: Bytes,
}

impl Packet {
    pub fn new(data: Bytes, rtp: Option<RtpHeader>, fec: Option<FecHeader>, payload: Bytes) -> Self {
        Self {
            data,
            rtp,
            fec,
            payload,
        }
    }

    pub fn rtp(&self) -> Option<&RtpHeader> {
        self.rtp.as_ref()
    }

    pub fn fec(&self) -> Option<&FecHeader> {
        self.fec.as_ref()
    }

    /// The symbol payload participating in the erasure code.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Raw wire bytes, e.g. for re-parsing application headers.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Shared packet handle. Windows and queues hold strong references;
/// no cycles are possible since neither holds a back-reference to the
/// reader.
pub type PacketHandle = Rc<Packet>;

/// Upstream packet source: non-blocking, returns `None` when nothing is
/// currently available. The source reader MUST return packets with both
/// RTP and FEC headers populated; the repair reader MUST return packets
/// with the FEC header populated. Violating this is an adjacent-code bug
/// and is asserted against, not handled gracefully.
pub trait PacketReader {
    fn read(&mut self) -> Option<PacketHandle>;
}

/// Reconstructs headers from a repaired payload buffer.
///
/// Returns the freshly parsed packet directly, or `None` on malformed
/// input, rather than mutating an out-parameter and returning a status
/// bool.
pub trait PacketParser {
    fn parse(&self, data: Bytes) -> Option<Packet>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Packet {
        Packet::new(
            Bytes::from_static(b"wire-bytes"),
            Some(RtpHeader {
                source_id: 7,
                seqnum: 100,
                marker: false,
                payload_type: 96,
            }),
            Some(FecHeader {
                block_number: 100,
                symbol_id: 0,
                source_block_length: 10,
            }),
            Bytes::from_static(b"payload"),
        )
    }

    #[test]
    fn accessors_expose_headers() {
        let p = sample();
        assert_eq!(p.rtp().unwrap().source_id, 7);
        assert_eq!(p.fec().unwrap().block_number, 100);
        assert_eq!(p.payload(), b"payload");
        assert_eq!(p.data(), b"wire-bytes");
    }

    #[test]
    fn missing_headers_are_none() {
        let p = Packet::new(Bytes::from_static(b"x"), None, None, Bytes::new());
        assert!(p.rtp().is_none());
        assert!(p.fec().is_none());
    }
}
