//! Fixed-capacity record arena.
//!
//! A `Pool` reserves all of its storage up front and refuses to grow: once
//! `capacity` records are live, `create` fails with
//! [`GraphError::PoolExhausted`] instead of reallocating. Released slots go
//! back on the free list and are reused by later creates under a new
//! generation, so stale handles are detected rather than silently aliased.
//!
//! Eviction policy is not decided here. The tracking front end chooses what
//! to prune when a pool is full.

use slotmap::{Key, SlotMap};
use tracing::{trace, warn};

use crate::error::GraphError;

use super::types::RecordKind;

pub struct Pool<K: Key, V> {
    slots: SlotMap<K, V>,
    capacity: usize,
    kind: RecordKind,
}

impl<K: Key, V> Pool<K, V> {
    /// Create an empty pool holding at most `capacity` live records.
    pub fn with_capacity(kind: RecordKind, capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            capacity,
            kind,
        }
    }

    /// Store `value` and return its handle.
    pub fn create(&mut self, value: V) -> Result<K, GraphError> {
        self.create_with_key(|_| value)
    }

    /// Like [`create`](Self::create), for records that store their own handle.
    pub fn create_with_key(&mut self, f: impl FnOnce(K) -> V) -> Result<K, GraphError> {
        if self.is_full() {
            warn!("[Pool] {} pool exhausted (capacity {})", self.kind, self.capacity);
            return Err(GraphError::PoolExhausted {
                kind: self.kind,
                capacity: self.capacity,
            });
        }
        let key = self.slots.insert_with_key(f);
        trace!("[Pool] {} allocated ({}/{})", self.kind, self.slots.len(), self.capacity);
        Ok(key)
    }

    /// Return the slot to the free list. The handle is invalid afterwards.
    pub fn release(&mut self, key: K) -> Result<V, GraphError> {
        let value = self.slots.remove(key).ok_or(self.stale())?;
        trace!("[Pool] {} released ({}/{})", self.kind, self.slots.len(), self.capacity);
        Ok(value)
    }

    /// Whether `key` still refers to a live record.
    pub fn is_valid(&self, key: K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn get(&self, key: K) -> Result<&V, GraphError> {
        self.slots.get(key).ok_or(self.stale())
    }

    pub fn get_mut(&mut self, key: K) -> Result<&mut V, GraphError> {
        let stale = self.stale();
        self.slots.get_mut(key).ok_or(stale)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.slots.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.slots.keys()
    }

    fn stale(&self) -> GraphError {
        GraphError::StaleReference { kind: self.kind }
    }
}

impl<K: Key, V> std::fmt::Debug for Pool<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("kind", &self.kind)
            .field("live", &self.slots.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
