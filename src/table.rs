use std::time::Instant;

use thiserror::Error;

/// One entry in the in-flight table (§3). `id`/`sent_at` are only
/// meaningful while `in_use`.
#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    in_use: bool,
    id: u16,
    sent_at: Option<Instant>,
}

/// Whether a response id matched a slot when released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Found,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("in-flight table has no free slot within the current limit")]
pub struct Full;

/// Fixed-capacity-but-growable set of outstanding-query slots keyed by
/// transaction id (§4.B). Capacity never shrinks, even when the active
/// `limit` is lowered, so that queries already in flight above the new
/// limit are never stranded (§3, §9).
pub struct InFlightTable {
    slots: Vec<Slot>,
    limit: usize,
    outstanding: usize,
}

impl InFlightTable {
    pub fn new(limit: usize) -> Self {
        Self {
            slots: vec![Slot::default(); limit],
            limit,
            outstanding: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Reserves the lowest-index free slot within `0..limit` for `id`,
    /// stamping `now` as its send time. Slots at or above `limit` are
    /// off-bounds for new reservations even if physically free — they
    /// exist only to hold queries stranded by a prior `resize` down.
    pub fn reserve(&mut self, id: u16, now: Instant) -> Result<(), Full> {
        let bound = self.limit.min(self.slots.len());
        let slot = self.slots[..bound].iter_mut().find(|s| !s.in_use).ok_or(Full)?;
        slot.in_use = true;
        slot.id = id;
        slot.sent_at = Some(now);
        self.outstanding += 1;
        Ok(())
    }

    /// Releases the first slot holding `id`. A response (or a retraction
    /// of a just-failed send) that does not match any in-use slot is
    /// reported as `NotFound` — a stray, per §4.F/§7.
    pub fn release(&mut self, id: u16) -> ReleaseOutcome {
        match self.slots.iter_mut().find(|s| s.in_use && s.id == id) {
            Some(slot) => {
                slot.in_use = false;
                slot.sent_at = None;
                self.outstanding -= 1;
                ReleaseOutcome::Found
            }
            None => ReleaseOutcome::NotFound,
        }
    }

    /// Releases every slot whose age is at least `timeout`, returning
    /// the ids that expired. `now` is captured once by the caller (§4.F)
    /// so every slot in a given call is judged against the same instant.
    pub fn expire(&mut self, now: Instant, timeout: std::time::Duration) -> Vec<u16> {
        let mut expired = Vec::new();
        for slot in self.slots.iter_mut() {
            if !slot.in_use {
                continue;
            }
            let sent_at = slot.sent_at.expect("in_use slot always has sent_at");
            if now.saturating_duration_since(sent_at) >= timeout {
                expired.push(slot.id);
                slot.in_use = false;
                slot.sent_at = None;
                self.outstanding -= 1;
            }
        }
        expired
    }

    /// Grows capacity if `new_limit` exceeds it, and sets the active
    /// admission limit to `new_limit` (which may be lower than before —
    /// only the underlying capacity is monotonic, per §4.B/§9).
    pub fn resize(&mut self, new_limit: usize) {
        if new_limit > self.slots.len() {
            self.slots.resize(new_limit, Slot::default());
        }
        self.limit = new_limit;
    }
}
