//! Tick-keyed queue of pending calls.
//!
//! Calls are ordered by target tick and, within a tick, by registration
//! order. The queue only stores and orders callbacks; firing them is up to
//! the clock, which pops them one by one so a callback may cancel or add
//! entries while a pass is in progress.

use std::collections::{BTreeMap, HashMap};

use super::beat_clock::BeatClock;

/// Deferred callback; receives the clock that fired it.
pub type Callback = Box<dyn FnOnce(&mut BeatClock)>;

/// Handle for a registered call, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

#[derive(Default)]
pub struct DelayedCallQueue {
    calls: BTreeMap<(u64, u64), Callback>,
    index: HashMap<CallId, u64>,
    next_seq: u64,
}

impl DelayedCallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to fire once the clock reaches `tick`
    pub fn push(&mut self, tick: u64, callback: Callback) -> CallId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = CallId(seq);
        self.calls.insert((tick, seq), callback);
        self.index.insert(id, tick);
        id
    }

    /// Remove a pending call. Returns false if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, id: CallId) -> bool {
        match self.index.remove(&id) {
            Some(tick) => self.calls.remove(&(tick, id.0)).is_some(),
            None => false,
        }
    }

    pub fn contains(&self, id: CallId) -> bool {
        self.index.contains_key(&id)
    }

    /// Keys of every call due at or before `tick`, in firing order
    pub(crate) fn due(&self, tick: u64) -> Vec<(u64, u64)> {
        self.calls.range(..=(tick, u64::MAX)).map(|(key, _)| *key).collect()
    }

    /// Take a call out by key, if it is still pending
    pub(crate) fn take(&mut self, key: (u64, u64)) -> Option<Callback> {
        let callback = self.calls.remove(&key)?;
        self.index.remove(&CallId(key.1));
        Some(callback)
    }

    /// Move every pending call `offset` ticks later
    pub fn shift(&mut self, offset: u64) {
        if offset == 0 {
            return;
        }
        let calls = std::mem::take(&mut self.calls);
        self.calls = calls
            .into_iter()
            .map(|((tick, seq), callback)| ((tick + offset, seq), callback))
            .collect();
        for tick in self.index.values_mut() {
            *tick += offset;
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Earliest tick with a pending call
    pub fn next_tick(&self) -> Option<u64> {
        self.calls.keys().next().map(|(tick, _)| *tick)
    }
}

impl std::fmt::Debug for DelayedCallQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedCallQueue")
            .field("pending", &self.calls.len())
            .field("next_tick", &self.next_tick())
            .finish()
    }
}
