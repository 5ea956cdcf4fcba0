//! Repaired-packet validation.

use crate::packet::Packet;
use crate::seq16;

/// Outcome of validating a packet the codec just reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Passed all checks; safe to place in the window.
    Accept,
    /// Failed a soft check (no RTP header, or wrong seqnum); drop it and
    /// keep going.
    Drop,
    /// `source_id` does not match the session's latched source id. The
    /// caller must transition to the terminal `Dead` state.
    SourceMismatch,
}

/// Checks, in order, whether a repaired packet is acceptable at window
/// position `p` of the block starting at `cur_block_sn`.
///
/// 1. Has an RTP header.
/// 2. `rtp.source_id == expected_source_id`.
/// 3. `rtp.seqnum == (cur_block_sn + p) mod 2^16`.
pub fn validate_repaired(pkt: &Packet, expected_source_id: u32, cur_block_sn: u16, p: usize) -> Verdict {
    let Some(rtp) = pkt.rtp() else {
        return Verdict::Drop;
    };

    if rtp.source_id != expected_source_id {
        return Verdict::SourceMismatch;
    }

    let expected_seqnum = cur_block_sn.wrapping_add(p as u16);
    if rtp.seqnum != expected_seqnum {
        return Verdict::Drop;
    }

    Verdict::Accept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{FecHeader, RtpHeader};
    use bytes::Bytes;

    fn rtp_packet(source_id: u32, seqnum: u16) -> Packet {
        Packet::new(
            Bytes::new(),
            Some(RtpHeader {
                source_id,
                seqnum,
                marker: false,
                payload_type: 96,
            }),
            Some(FecHeader {
                block_number: 0,
                symbol_id: 0,
                source_block_length: 10,
            }),
            Bytes::new(),
        )
    }

    #[test]
    fn accepts_matching_packet() {
        let p = rtp_packet(7, 103);
        assert_eq!(validate_repaired(&p, 7, 100, 3), Verdict::Accept);
    }

    #[test]
    fn rejects_missing_rtp_header() {
        let p = Packet::new(Bytes::new(), None, None, Bytes::new());
        assert_eq!(validate_repaired(&p, 7, 100, 0), Verdict::Drop);
    }

    #[test]
    fn flags_foreign_source_id() {
        let p = rtp_packet(8, 100);
        assert_eq!(validate_repaired(&p, 7, 100, 0), Verdict::SourceMismatch);
    }

    #[test]
    fn drops_unexpected_seqnum() {
        let p = rtp_packet(7, 999);
        assert_eq!(validate_repaired(&p, 7, 100, 3), Verdict::Drop);
    }

    #[test]
    fn wraps_around_boundary() {
        // cur_block_sn near the top of the ring, p pushes it past u16::MAX.
        let p = rtp_packet(7, 2);
        assert_eq!(validate_repaired(&p, 7, 65530, 8), Verdict::Accept);
    }
}
