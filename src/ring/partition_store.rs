use crate::ring::key_range::{Key, KeyRange, NodeId, HASH_SIZE};
use std::sync::Mutex;

#[derive(Debug, PartialEq)]
pub(crate) enum PutOutcome {
    Inserted,
    AlreadyPresent(String),
}

#[derive(Debug, PartialEq)]
pub(crate) enum RemoveOutcome {
    Removed(String),
    NotFound,
}

/// A `(key, value)` pair moved between stores.
pub type Entry = (Key, String);

/// SplitOff is what a node hands to a joining node: the upper part of its range and the entries
/// that lived there.
#[derive(Debug)]
pub(crate) struct SplitOff {
    pub(crate) kept: KeyRange,
    pub(crate) handed_off: KeyRange,
    pub(crate) entries: Vec<Entry>,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub(crate) enum SplitError {
    #[error("id {0} already exists")]
    DuplicateId(NodeId),
    #[error("key {0} is not owned by this node")]
    NotOwned(Key),
}

/// HandOff is a node's whole range and data, drained for a leave.
#[derive(Debug)]
pub(crate) struct HandOff {
    pub(crate) range: KeyRange,
    pub(crate) entries: Vec<Entry>,
}

/// PartitionStore is a node's slice of the key space. The slots cover all of `[0, HASH_SIZE)` but
/// only slots in the owned range are meaningful; anything outside is a stale leftover.
///
/// The owned range sits under the same lock as the slots, so range changes and the matching data
/// movement (split for a join, hand-off for a leave) happen as one step.
pub(crate) struct PartitionStore {
    id: NodeId,
    state: Mutex<PartitionState>,
}

struct PartitionState {
    // None until the node joins, and again once it hands its range away.
    owned: Option<KeyRange>,
    slots: Vec<Option<String>>,
}

impl PartitionState {
    /// Removes and returns every entry in `range`, in clockwise key order.
    fn drain(&mut self, range: KeyRange) -> Vec<Entry> {
        range
            .keys()
            .filter_map(|key| self.slots[key.as_index()].take().map(|value| (key, value)))
            .collect()
    }
}

impl PartitionStore {
    pub(crate) fn new(id: NodeId, owned: Option<KeyRange>) -> Self {
        PartitionStore {
            id,
            state: Mutex::new(PartitionState {
                owned,
                slots: vec![None; HASH_SIZE as usize],
            }),
        }
    }

    pub(crate) fn owned_range(&self) -> Option<KeyRange> {
        self.lock().owned
    }

    pub(crate) fn is_in_range(&self, key: Key) -> bool {
        self.lock().owned.map_or(false, |range| range.contains(key))
    }

    pub(crate) fn get(&self, key: Key) -> Option<String> {
        self.lock().slots[key.as_index()].clone()
    }

    /// Inserts unless the key is occupied. Occupied keys are never overwritten.
    pub(crate) fn put(&self, key: Key, value: String) -> PutOutcome {
        let mut state = self.lock();
        let slot = &mut state.slots[key.as_index()];
        if let Some(existing) = slot.as_ref() {
            return PutOutcome::AlreadyPresent(existing.clone());
        }

        *slot = Some(value);
        PutOutcome::Inserted
    }

    pub(crate) fn remove(&self, key: Key) -> RemoveOutcome {
        match self.lock().slots[key.as_index()].take() {
            Some(value) => RemoveOutcome::Removed(value),
            None => RemoveOutcome::NotFound,
        }
    }

    /// Gives up `[at, end]` to a joining node with id `at`: drains that sub-range and shrinks the
    /// owned range to `[id, at - 1]`.
    pub(crate) fn split_off(&self, at: NodeId) -> Result<SplitOff, SplitError> {
        if at == self.id {
            return Err(SplitError::DuplicateId(at));
        }

        let mut state = self.lock();
        let owned = state.owned.ok_or(SplitError::NotOwned(at))?;
        let (kept, handed_off) = owned.split_at(at).ok_or(SplitError::NotOwned(at))?;

        let entries = state.drain(handed_off);
        state.owned = Some(kept);

        Ok(SplitOff {
            kept,
            handed_off,
            entries,
        })
    }

    /// Drains the whole owned range for a leave. Afterwards this store owns nothing.
    pub(crate) fn hand_off_all(&self) -> Option<HandOff> {
        let mut state = self.lock();
        let range = state.owned.take()?;
        let entries = state.drain(range);

        Some(HandOff { range, entries })
    }

    /// Takes in a transfer: the owned range becomes `[id, end]` and the entries are stored.
    pub(crate) fn absorb(&self, end: Key, entries: Vec<Entry>) -> KeyRange {
        let mut state = self.lock();
        let range = KeyRange::new(self.id, end);
        state.owned = Some(range);
        for (key, value) in entries {
            state.slots[key.as_index()] = Some(value);
        }

        range
    }

    /// Seeds entries without touching the owned range. Used for the bootstrap's initial data.
    pub(crate) fn seed(&self, entries: Vec<Entry>) {
        let mut state = self.lock();
        for (key, value) in entries {
            state.slots[key.as_index()] = Some(value);
        }
    }

    /// Present entries in key order.
    pub(crate) fn entries(&self) -> Vec<Entry> {
        self.lock()
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let value = slot.as_ref()?;
                let key = Key::new(index as u32).ok()?;
                Some((key, value.clone()))
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PartitionState> {
        self.state.lock().expect("PartitionStore mutex guard poison")
    }
}
