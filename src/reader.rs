//! Reader/decoder core: the dual-queue state machine that aligns source
//! and repair streams onto a common block boundary, drives the codec,
//! and emits a contiguous, in-order sequence of source packets.

use bytes::Bytes;
use std::rc::Rc;

use crate::codec::{self, BlockCodec};
use crate::config::{ReaderConfig, SourceIdPolicy};
use crate::error::FecError;
use crate::packet::{Packet, PacketHandle, PacketParser, PacketReader};
use crate::queue::PacketQueue;
use crate::seq16;
use crate::stats::ReaderStats;
use crate::validate::{self, Verdict};

pub struct Reader {
    source_queue: PacketQueue,
    repair_queue: PacketQueue,
    source_window: crate::window::BlockWindow,
    repair_window: crate::window::BlockWindow,
    codec: Box<dyn BlockCodec>,
    source_reader: Box<dyn PacketReader>,
    repair_reader: Box<dyn PacketReader>,
    parser: Box<dyn PacketParser>,

    n: usize,
    m: usize,

    started: bool,
    alive: bool,
    cur_block_sn: u16,
    next_packet: usize,
    can_repair: bool,

    source_id: Option<u32>,

    stats: ReaderStats,
}

impl Reader {
    pub fn new(
        config: &ReaderConfig,
        source_reader: Box<dyn PacketReader>,
        repair_reader: Box<dyn PacketReader>,
        parser: Box<dyn PacketParser>,
    ) -> Result<Self, FecError> {
        let codec = codec::from_scheme(&config.scheme, config.n, config.m, config.symbol_size)?;
        let source_id = match config.source_id_policy {
            SourceIdPolicy::Fixed(id) => Some(id),
            SourceIdPolicy::LatchFirst => None,
        };

        Ok(Self {
            source_queue: PacketQueue::new(),
            repair_queue: PacketQueue::new(),
            source_window: crate::window::BlockWindow::new(config.n),
            repair_window: crate::window::BlockWindow::new(config.m),
            codec,
            source_reader,
            repair_reader,
            parser,
            n: config.n,
            m: config.m,
            started: false,
            alive: true,
            cur_block_sn: 0,
            next_packet: 0,
            can_repair: false,
            source_id,
            stats: ReaderStats::default(),
        })
    }

    /// Construction always fully initializes the windows, so this is
    /// always `true` for a `Reader` that exists; kept as a state query
    /// for callers that want a belt-and-suspenders check alongside a
    /// successful construction.
    pub fn valid(&self) -> bool {
        true
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    pub fn stats(&self) -> ReaderStats {
        let mut s = self.stats;
        s.source_queue_depth = self.source_queue.size();
        s.repair_queue_depth = self.repair_queue.size();
        s
    }

    /// Returns the next source packet in delivery order, or `None` if
    /// none is currently available.
    pub fn read(&mut self) -> Option<PacketHandle> {
        if !self.alive {
            return None;
        }

        self.refill();

        let pkt = if !self.started {
            self.read_unstarted()
        } else {
            self.read_started()
        };

        // A call that flips `alive` to false must not also hand back the
        // packet that was in flight when it did — the session is dead as
        // of this call, so nothing from it is deliverable.
        if !self.alive {
            return None;
        }
        pkt
    }

    /// Before alignment, pass packets straight through until the head of
    /// the source queue is the first symbol of a block.
    fn read_unstarted(&mut self) -> Option<PacketHandle> {
        let head = self.source_queue.head();

        // Latch `source_id` on the first source packet ever observed, not
        // just on the one that happens to carry the alignment symbol —
        // a stream that starts mid-block still passes packets through
        // here first.
        if let Some(head) = head {
            if self.source_id.is_none() {
                let rtp = head.rtp().expect("source packet missing RTP header");
                self.source_id = Some(rtp.source_id);
            }
        }

        let head_symbol_id = head.map(|p| p.fec().expect("source packet missing FEC header").symbol_id);

        if head_symbol_id != Some(0) {
            let pkt = self.source_queue.read()?;
            self.stats.packets_emitted += 1;
            return Some(pkt);
        }

        let head = self.source_queue.head().unwrap();
        let rtp = head.rtp().expect("source packet missing RTP header");
        self.cur_block_sn = rtp.seqnum;
        self.drop_repair_before_current_block();
        self.started = true;
        tracing::debug!(cur_block_sn = self.cur_block_sn, "aligned to block boundary");

        self.read_started()
    }

    fn drop_repair_before_current_block(&mut self) {
        while let Some(head) = self.repair_queue.head() {
            let b = head.fec().expect("repair packet missing FEC header").block_number;
            if seq16::lt(b, self.cur_block_sn) {
                self.repair_queue.read();
                self.stats.packets_dropped_stale += 1;
            } else {
                break;
            }
        }
    }

    /// Main loop: checks for a block-advance at the top before trying to
    /// emit, so a block that's exhausted its window always rolls over to
    /// the next one instead of returning early. Still at most one packet
    /// returned per call.
    fn read_started(&mut self) -> Option<PacketHandle> {
        loop {
            self.refill();
            self.drain_source();
            self.drain_repair();

            if self.next_packet == self.n {
                self.advance_block();
                continue;
            }

            if let Some(pkt) = self.next_in_window() {
                self.stats.packets_emitted += 1;
                return Some(pkt);
            }

            if self.source_queue.size() == 0 {
                return None;
            }
            // `next_in_window` found nothing from `next_packet..N` and the
            // source queue still holds data (necessarily a future block,
            // since this block's packets were just drained) — force the
            // advance on the next iteration.
            self.next_packet = self.n;
        }
    }

    /// Tries the current slot directly; failing that, attempts repair
    /// once and scans forward for the first present slot.
    fn next_in_window(&mut self) -> Option<PacketHandle> {
        if let Some(pkt) = self.source_window.get(self.next_packet) {
            let pkt = pkt.clone();
            self.next_packet += 1;
            return Some(pkt);
        }

        self.try_repair();

        for p in self.next_packet..self.n {
            if let Some(pkt) = self.source_window.get(p) {
                let pkt = pkt.clone();
                self.next_packet = p + 1;
                return Some(pkt);
            }
        }

        None
    }

    /// Refills both queues up to 2x their window size.
    fn refill(&mut self) {
        while self.source_queue.size() <= 2 * self.n {
            match self.source_reader.read() {
                Some(pkt) => {
                    assert!(pkt.rtp().is_some(), "source packet missing RTP header");
                    assert!(pkt.fec().is_some(), "source packet missing FEC header");
                    self.source_queue.write(pkt);
                }
                None => break,
            }
        }

        while self.repair_queue.size() <= 2 * self.m {
            match self.repair_reader.read() {
                Some(pkt) => {
                    assert!(pkt.fec().is_some(), "repair packet missing FEC header");
                    self.repair_queue.write(pkt);
                }
                None => break,
            }
        }
    }

    /// Drains queued source packets belonging to the current or an
    /// earlier block into the source window, dropping stale and
    /// duplicate arrivals as it goes. Stops at the first packet that
    /// belongs to a future block.
    fn drain_source(&mut self) {
        loop {
            let Some(head) = self.source_queue.head() else {
                break;
            };
            let b = head.fec().expect("source packet missing FEC header").block_number;

            if seq16::le(self.cur_block_sn.wrapping_add(self.n as u16), b) {
                break; // future block; leave queued.
            }

            let pkt = self.source_queue.read().expect("head was just peeked");

            if seq16::lt(b, self.cur_block_sn) {
                self.stats.packets_dropped_stale += 1;
                tracing::trace!(block_number = b, cur_block_sn = self.cur_block_sn, "dropping stale source packet");
                continue;
            }

            assert_eq!(b, self.cur_block_sn, "source packet block_number outside drain window");

            let rtp = pkt.rtp().expect("source packet missing RTP header");
            let fec = pkt.fec().unwrap();
            let p = fec.symbol_id as usize;
            assert!(p < self.n, "source packet symbol_id out of range: p={p}, n={}", self.n);

            let expected_seqnum = self.cur_block_sn.wrapping_add(p as u16);
            assert_eq!(rtp.seqnum, expected_seqnum, "source packet seqnum does not match block placement");

            if self.source_window.get(p).is_some() {
                self.stats.packets_dropped_duplicate += 1;
                tracing::trace!(p, "dropping duplicate source packet");
                continue;
            }

            self.source_window.set(p, pkt);
            self.can_repair = true;
        }
    }

    /// Same as `drain_source`, for the repair queue and window.
    fn drain_repair(&mut self) {
        loop {
            let Some(head) = self.repair_queue.head() else {
                break;
            };
            let b = head.fec().expect("repair packet missing FEC header").block_number;

            if seq16::le(self.cur_block_sn.wrapping_add(self.n as u16), b) {
                break;
            }

            let pkt = self.repair_queue.read().expect("head was just peeked");

            if seq16::lt(b, self.cur_block_sn) {
                self.stats.packets_dropped_stale += 1;
                tracing::trace!(block_number = b, cur_block_sn = self.cur_block_sn, "dropping stale repair packet");
                continue;
            }

            assert_eq!(b, self.cur_block_sn, "repair packet block_number outside drain window");

            let fec = pkt.fec().unwrap();
            assert_eq!(
                fec.source_block_length as usize, self.n,
                "repair packet source_block_length does not match N"
            );
            let p = (fec.symbol_id as usize)
                .checked_sub(self.n)
                .expect("repair packet symbol_id below source_block_length");
            assert!(p < self.m, "repair packet symbol_id out of range: p={p}, m={}", self.m);

            if self.repair_window.get(p).is_some() {
                self.stats.packets_dropped_duplicate += 1;
                tracing::trace!(p, "dropping duplicate repair packet");
                continue;
            }

            self.repair_window.set(p, pkt);
            self.can_repair = true;
        }
    }

    /// Attempts to reconstruct missing source symbols from whatever's
    /// currently registered with the codec. Does not require new *source*
    /// symbols since the last attempt — any new symbol (source or repair)
    /// sets `can_repair` and re-arms this.
    fn try_repair(&mut self) {
        if !self.can_repair {
            return;
        }

        for i in 0..self.n {
            if let Some(pkt) = self.source_window.get(i) {
                self.codec.set(i, pkt.payload());
            }
        }
        for i in 0..self.m {
            if let Some(pkt) = self.repair_window.get(i) {
                self.codec.set(self.n + i, pkt.payload());
            }
        }

        let expected_source_id = self.source_id.expect("source_id must be latched before repair runs");

        for i in 0..self.n {
            if self.source_window.get(i).is_some() {
                continue;
            }
            let Some(buf) = self.codec.repair(i) else {
                continue;
            };
            let Some(parsed) = self.parser.parse(Bytes::copy_from_slice(buf)) else {
                self.stats.packets_dropped_unparseable += 1;
                tracing::debug!(p = i, "dropping unparseable repaired packet");
                continue;
            };

            match validate::validate_repaired(&parsed, expected_source_id, self.cur_block_sn, i) {
                Verdict::Accept => {
                    self.source_window.set(i, Rc::new(parsed));
                }
                Verdict::Drop => {
                    self.stats.packets_dropped_bad_seqnum += 1;
                    tracing::debug!(p = i, "dropping repaired packet with unexpected seqnum");
                }
                Verdict::SourceMismatch => {
                    self.alive = false;
                    tracing::debug!(p = i, "repaired packet carries a foreign source_id, session dead");
                    self.stats.sync_from_codec(self.codec.stats());
                    self.codec.reset();
                    self.can_repair = false;
                    return;
                }
            }
        }

        self.stats.sync_from_codec(self.codec.stats());
        self.codec.reset();
        self.can_repair = false;
    }

    /// Rolls the windows over to the next block boundary.
    fn advance_block(&mut self) {
        self.source_window.clear_all();
        self.repair_window.clear_all();
        self.cur_block_sn = self.cur_block_sn.wrapping_add(self.n as u16);
        self.next_packet = 0;
        self.can_repair = false;
        self.stats.blocks_completed += 1;
        tracing::debug!(cur_block_sn = self.cur_block_sn, "advanced to next block");
    }
}
