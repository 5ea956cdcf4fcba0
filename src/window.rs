//! Fixed-size per-block slot array, one per symbol position.

use crate::packet::PacketHandle;

/// Ordered sequence of `len` optional packet handles for one block.
///
/// `len` is fixed at construction (`N` for the source window, `M` for the
/// repair window) and never changes per block.
#[derive(Debug)]
pub struct BlockWindow {
    slots: Vec<Option<PacketHandle>>,
}

impl BlockWindow {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PacketHandle> {
        self.slots[index].as_ref()
    }

    /// Places a packet at `index`. The caller must ensure the slot is
    /// currently empty — at most one packet handle per `(block, index)`
    /// position, enforced by the caller dropping duplicates rather than
    /// overwriting silently.
    pub fn set(&mut self, index: usize, pkt: PacketHandle) {
        self.slots[index] = Some(pkt);
    }

    /// Clears every slot, atomically from the caller's point of view
    /// (no partial-window state is observable between calls).
    pub fn clear_all(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;
    use bytes::Bytes;

    fn pkt() -> PacketHandle {
        PacketHandle::new(Packet::new(Bytes::new(), None, None, Bytes::new()))
    }

    #[test]
    fn starts_empty() {
        let w = BlockWindow::new(4);
        assert_eq!(w.len(), 4);
        for i in 0..4 {
            assert!(w.get(i).is_none());
        }
    }

    #[test]
    fn set_and_get() {
        let mut w = BlockWindow::new(2);
        let p = pkt();
        w.set(1, p.clone());
        assert!(w.get(0).is_none());
        assert!(std::rc::Rc::ptr_eq(w.get(1).unwrap(), &p));
    }

    #[test]
    fn clear_all_empties_every_slot() {
        let mut w = BlockWindow::new(3);
        w.set(0, pkt());
        w.set(2, pkt());
        w.clear_all();
        for i in 0..3 {
            assert!(w.get(i).is_none());
        }
    }
}
