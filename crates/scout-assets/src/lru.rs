// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Capacity-bounded least-recently-used map.
//!
//! Recency is tracked with a monotonically increasing tick per entry and a
//! tick-ordered index, so promotion and eviction are both `O(log n)`.
//! Reads through [`LruMap::get`] promote; [`LruMap::peek`] does not.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

struct Slot<V> {
    value: V,
    tick: u64,
}

/// A key-value map that evicts its least-recently-used entry on overflow.
pub struct LruMap<K, V> {
    entries: HashMap<K, Slot<V>>,
    order: BTreeMap<u64, K>,
    capacity: usize,
    tick: u64,
}

impl<K: Hash + Eq + Clone, V> LruMap<K, V> {
    /// Create a map holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            capacity: capacity.max(1),
            tick: 0,
        }
    }

    /// Create a map whose size is managed entirely by the caller.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn promote<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let tick = self.next_tick();
        if let Some((owned, slot)) = self.entries.get_key_value(key) {
            let owned = owned.clone();
            let old = slot.tick;
            self.order.remove(&old);
            self.order.insert(tick, owned);
        }
        if let Some(slot) = self.entries.get_mut(key) {
            slot.tick = tick;
        }
    }

    /// Look up a key, promoting it to most-recently-used on a hit.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Mutable lookup with promotion.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.entries.get_mut(key).map(|slot| &mut slot.value)
    }

    /// Look up a key without touching its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Whether the key is present. Does not affect recency.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Insert or replace a value and mark it most-recently-used.
    ///
    /// Inserting a new key into a full map evicts the least-recently-used
    /// entry first; the evicted pair is returned. Replacing an existing key
    /// never evicts.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let tick = self.next_tick();
        if let Some(slot) = self.entries.get_mut(&key) {
            let old = slot.tick;
            slot.value = value;
            slot.tick = tick;
            self.order.remove(&old);
            self.order.insert(tick, key);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        self.order.insert(tick, key.clone());
        self.entries.insert(key, Slot { value, tick });
        evicted
    }

    /// Remove and return the least-recently-used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let (_, key) = self.order.pop_first()?;
        let slot = self.entries.remove(&key)?;
        Some((key, slot.value))
    }

    /// Key of the least-recently-used entry, if any.
    pub fn peek_lru(&self) -> Option<&K> {
        self.order.first_key_value().map(|(_, key)| key)
    }

    /// Remove a key.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.tick);
        Some(slot.value)
    }

    /// Keep only the entries for which `keep` returns true, returning the
    /// removed pairs oldest-first.
    pub fn retain_with<F>(&mut self, mut keep: F) -> Vec<(K, V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let doomed: Vec<(u64, K)> = self
            .order
            .iter()
            .filter(|(_, key)| {
                self.entries
                    .get(*key)
                    .map(|slot| !keep(key, &slot.value))
                    .unwrap_or(false)
            })
            .map(|(tick, key)| (*tick, key.clone()))
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for (tick, key) in doomed {
            self.order.remove(&tick);
            if let Some(slot) = self.entries.remove(&key) {
                removed.push((key, slot.value));
            }
        }
        removed
    }

    /// Keys from least- to most-recently-used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
