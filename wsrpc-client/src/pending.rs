//! Pending request table.
//!
//! Correlates replies with the calls that produced them. Identifiers come
//! from a per-table counter, so every table owns its own id space; pick
//! distinct bases with [`PendingTable::with_id_base`] when several tables
//! must never hand out the same identifier.
//!
//! Entries live in one insertion-ordered hash map. Allocation, registration
//! and resolution are O(1) on average no matter how many entries are live
//! or how many calls came before, and resolution may happen in any order.
//!
//! The table never expires entries on its own. Outstanding-call limits and
//! timeouts belong to the caller, which removes entries with
//! [`PendingTable::cancel`] or [`PendingTable::pop_oldest`].

use crate::error::PendingError;
use hashlink::LinkedHashMap;
use wsrpc_protocol::RequestId;

/// Outstanding calls keyed by correlation identifier.
#[derive(Debug)]
pub struct PendingTable<V> {
    /// Last identifier handed out.
    last_id: u64,
    entries: LinkedHashMap<RequestId, V>,
}

impl<V> PendingTable<V> {
    /// Creates an empty table whose first identifier is 1.
    pub fn new() -> Self {
        Self::with_id_base(0)
    }

    /// Creates an empty table whose first identifier is `base + 1`.
    pub fn with_id_base(base: u64) -> Self {
        Self {
            last_id: base,
            entries: LinkedHashMap::new(),
        }
    }

    /// Like [`PendingTable::with_id_base`], preallocating room for
    /// `capacity` live entries.
    pub fn with_capacity(base: u64, capacity: usize) -> Self {
        Self {
            last_id: base,
            entries: LinkedHashMap::with_capacity(capacity),
        }
    }

    /// Returns an identifier greater than every one allocated before.
    ///
    /// Does not register anything. Fails once the id space above the base
    /// is used up; identifiers are never reused.
    pub fn allocate_id(&mut self) -> Result<RequestId, PendingError> {
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or(PendingError::IdsExhausted)?;
        Ok(RequestId(self.last_id))
    }

    /// Last identifier handed out by [`PendingTable::allocate_id`].
    pub fn last_id(&self) -> RequestId {
        RequestId(self.last_id)
    }

    /// Registers a pending entry.
    ///
    /// Fails without touching the existing entry if `id` is already live.
    pub fn add(&mut self, id: RequestId, value: V) -> Result<(), PendingError> {
        if self.entries.contains_key(&id) {
            return Err(PendingError::DuplicateId(id));
        }
        self.entries.insert(id, value);
        tracing::trace!("pending add id={} live={}", id, self.entries.len());
        Ok(())
    }

    /// Allocates an identifier and registers `value` under it.
    pub fn register(&mut self, value: V) -> Result<RequestId, PendingError> {
        let id = self.allocate_id()?;
        self.add(id, value)?;
        Ok(id)
    }

    /// Resolves `id`, removing and returning its value.
    ///
    /// An identifier resolves at most once; later lookups fail with
    /// [`PendingError::NotFound`].
    pub fn get(&mut self, id: RequestId) -> Result<V, PendingError> {
        let value = self
            .entries
            .remove(&id)
            .ok_or(PendingError::NotFound(id))?;
        tracing::trace!("pending resolve id={} live={}", id, self.entries.len());
        Ok(value)
    }

    /// Removes `id` early, e.g. on cancellation or timeout.
    ///
    /// Unknown or already resolved identifiers return `None`.
    pub fn cancel(&mut self, id: RequestId) -> Option<V> {
        let value = self.entries.remove(&id);
        if value.is_some() {
            tracing::trace!("pending cancel id={} live={}", id, self.entries.len());
        }
        value
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (RequestId, &V)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    /// Longest-waiting live entry.
    pub fn oldest(&self) -> Option<(RequestId, &V)> {
        self.entries.front().map(|(id, value)| (*id, value))
    }

    /// Removes the longest-waiting live entry.
    pub fn pop_oldest(&mut self) -> Option<(RequestId, V)> {
        self.entries.pop_front()
    }

    /// Removes every live entry, oldest first. The id counter keeps going.
    pub fn drain(&mut self) -> Vec<(RequestId, V)> {
        let drained: Vec<_> = std::iter::from_fn(|| self.entries.pop_front()).collect();
        if !drained.is_empty() {
            tracing::trace!("pending drained {} entries", drained.len());
        }
        drained
    }
}

impl<V> Default for PendingTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
