// Cache slices
//
// A CacheEntry holds one fetched list plus its loading flags:
//
//   idle (loaded = false) → loading → loaded | error
//
// Every fetch takes a ticket carrying the entry's generation. Only the
// latest ticket may settle the entry; a response for a superseded fetch is
// dropped so it cannot overwrite newer data.

use crate::entities::Record;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePhase {
    Idle,
    Loading,
    Loaded,
    Error,
}

/// Proof that a fetch was started; settles only the generation it names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub loaded: bool,
    #[serde(skip)]
    generation: u64,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        CacheEntry {
            items: Vec::new(),
            loading: false,
            error: None,
            loaded: false,
            generation: 0,
        }
    }
}

/// A single flat cache (foranes, parishes, individuals, institutions)
pub type ListSlice<T> = CacheEntry<T>;

impl<T: Record> CacheEntry<T> {
    pub fn phase(&self) -> CachePhase {
        if self.loading {
            CachePhase::Loading
        } else if self.error.is_some() {
            CachePhase::Error
        } else if self.loaded {
            CachePhase::Loaded
        } else {
            CachePhase::Idle
        }
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    /// Enter the loading state; supersedes any fetch still in flight
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        FetchTicket { generation: self.generation }
    }

    fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Store fetched items; false when the ticket was superseded
    pub fn fulfill(&mut self, ticket: FetchTicket, items: Vec<T>) -> bool {
        if !self.is_current(ticket) {
            debug!(entity = T::ENTITY, "discarding stale fetch result");
            return false;
        }
        self.items = items;
        self.loading = false;
        self.loaded = true;
        self.error = None;
        true
    }

    /// Record a fetch failure; previously cached items are kept
    pub fn reject(&mut self, ticket: FetchTicket, message: String) -> bool {
        if !self.is_current(ticket) {
            debug!(entity = T::ENTITY, "discarding stale fetch failure");
            return false;
        }
        self.loading = false;
        self.error = Some(message);
        true
    }

    /// Append a server-confirmed record
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Replace the record with the same id in place
    ///
    /// A record that is not cached is dropped (logged), not inserted.
    pub fn replace(&mut self, item: T) -> bool {
        match self.items.iter_mut().find(|cached| cached.id() == item.id()) {
            Some(cached) => {
                *cached = item;
                true
            }
            None => {
                warn!(entity = T::ENTITY, id = item.id(), "update for uncached record dropped");
                false
            }
        }
    }

    /// Mutate a cached record in place
    pub fn modify(&mut self, id: u64, f: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|cached| cached.id() == id) {
            Some(cached) => {
                f(cached);
                true
            }
            None => false,
        }
    }

    /// Remove by id; a missing id is a no-op
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        self.items.len() != before
    }
}

// ============================================================================
// KEYED SLICE
// ============================================================================

/// Independent cache entries per parent key
#[derive(Debug, Clone)]
pub struct KeyedSlice<K, T> {
    entries: HashMap<K, CacheEntry<T>>,
}

impl<K, T> Default for KeyedSlice<K, T> {
    fn default() -> Self {
        KeyedSlice { entries: HashMap::new() }
    }
}

impl<K, T> KeyedSlice<K, T>
where
    K: Eq + Hash + Clone,
    T: Record,
{
    pub fn entry(&self, key: &K) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    pub fn entry_mut(&mut self, key: K) -> &mut CacheEntry<T> {
        self.entries.entry(key).or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Every cached record across all keys
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.values().flat_map(|entry| entry.items.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key of the entry currently caching `id`
    pub fn find_key(&self, id: u64) -> Option<K> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.contains(id))
            .map(|(key, _)| key.clone())
    }

    pub fn begin_fetch(&mut self, key: K) -> FetchTicket {
        self.entry_mut(key).begin_fetch()
    }

    pub fn fulfill(&mut self, key: K, ticket: FetchTicket, items: Vec<T>) -> bool {
        self.entry_mut(key).fulfill(ticket, items)
    }

    pub fn reject(&mut self, key: K, ticket: FetchTicket, message: String) -> bool {
        self.entry_mut(key).reject(ticket, message)
    }

    pub fn push(&mut self, key: K, item: T) {
        self.entry_mut(key).push(item);
    }

    /// Replace wherever the record is cached, moving it when its key changed
    pub fn upsert_moved(&mut self, key: K, item: T) -> bool {
        match self.find_key(item.id()) {
            Some(old) if old == key => self.entry_mut(key).replace(item),
            Some(old) => {
                self.entry_mut(old).remove(item.id());
                self.entry_mut(key).push(item);
                true
            }
            None => {
                warn!(entity = T::ENTITY, id = item.id(), "update for uncached record dropped");
                false
            }
        }
    }

    /// Remove from whichever entry holds it
    pub fn remove_anywhere(&mut self, id: u64) -> Option<K> {
        let key = self.find_key(id)?;
        self.entry_mut(key.clone()).remove(id);
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Community, ParentRef};

    fn community(id: u64, parent: ParentRef) -> Community {
        Community {
            id,
            number: id as u32,
            name: format!("Unit {}", id),
            parent,
        }
    }

    #[test]
    fn test_state_machine() {
        let mut entry: CacheEntry<Community> = CacheEntry::default();
        assert_eq!(entry.phase(), CachePhase::Idle);

        let ticket = entry.begin_fetch();
        assert_eq!(entry.phase(), CachePhase::Loading);

        assert!(entry.fulfill(ticket, vec![community(1, ParentRef::parish(1))]));
        assert_eq!(entry.phase(), CachePhase::Loaded);
        assert_eq!(entry.items.len(), 1);

        // Refetch passes back through loading, failure keeps items
        let ticket = entry.begin_fetch();
        assert_eq!(entry.phase(), CachePhase::Loading);
        assert!(entry.reject(ticket, "offline".to_string()));
        assert_eq!(entry.phase(), CachePhase::Error);
        assert_eq!(entry.error.as_deref(), Some("offline"));
        assert_eq!(entry.items.len(), 1);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let parent = ParentRef::parish(1);
        let mut entry: CacheEntry<Community> = CacheEntry::default();

        let first = entry.begin_fetch();
        let second = entry.begin_fetch();

        // Newer request lands first
        assert!(entry.fulfill(second, vec![community(1, parent), community(2, parent)]));
        // Older one arrives late and must not overwrite
        assert!(!entry.fulfill(first, vec![community(1, parent)]));
        assert!(!entry.reject(first, "late failure".to_string()));

        assert_eq!(entry.items.len(), 2);
        assert!(entry.error.is_none());
        assert!(!entry.loading);
    }

    #[test]
    fn test_replace_and_remove() {
        let parent = ParentRef::parish(1);
        let mut entry: CacheEntry<Community> = CacheEntry::default();
        entry.push(community(1, parent));
        entry.push(community(2, parent));

        let mut renamed = community(2, parent);
        renamed.name = "Renamed".to_string();
        assert!(entry.replace(renamed));
        assert_eq!(entry.get(2).unwrap().name, "Renamed");
        assert_eq!(entry.items.iter().filter(|c| c.id == 2).count(), 1);

        // Missing id: dropped, not inserted
        assert!(!entry.replace(community(9, parent)));
        assert_eq!(entry.items.len(), 2);

        assert!(entry.remove(1));
        assert!(!entry.remove(1));
        assert_eq!(entry.items.len(), 1);
    }

    #[test]
    fn test_keys_do_not_collide() {
        let mut slice: KeyedSlice<ParentRef, Community> = KeyedSlice::default();

        let a = slice.begin_fetch(ParentRef::forane(3));
        let b = slice.begin_fetch(ParentRef::parish(3));
        slice.fulfill(ParentRef::forane(3), a, vec![community(1, ParentRef::forane(3))]);

        assert_eq!(slice.len(), 2);
        assert!(slice.entry(&ParentRef::forane(3)).unwrap().loaded);
        assert!(slice.entry(&ParentRef::parish(3)).unwrap().loading);

        slice.reject(ParentRef::parish(3), b, "boom".to_string());
        assert!(slice.entry(&ParentRef::forane(3)).unwrap().error.is_none());
    }

    #[test]
    fn test_upsert_moved_between_keys() {
        let from = ParentRef::parish(1);
        let to = ParentRef::parish(2);
        let mut slice: KeyedSlice<ParentRef, Community> = KeyedSlice::default();
        slice.push(from, community(5, from));
        slice.push(to, community(6, to));

        assert!(slice.upsert_moved(to, community(5, to)));
        assert!(slice.entry(&from).unwrap().items.is_empty());
        assert_eq!(slice.entry(&to).unwrap().items.len(), 2);

        assert!(!slice.upsert_moved(to, community(42, to)));
    }

    #[test]
    fn test_remove_anywhere() {
        let parent = ParentRef::forane(1);
        let mut slice: KeyedSlice<ParentRef, Community> = KeyedSlice::default();
        slice.push(parent, community(1, parent));

        assert_eq!(slice.remove_anywhere(1), Some(parent));
        assert_eq!(slice.remove_anywhere(1), None);
    }
}
