//! Weighted queue of pending items
//!
//! Indexed binary max-heap keyed by `(weight, arrival)`: higher weight
//! first, and among equal weights the earlier arrival first. Heap entries
//! carry their weight inline and each item's heap position is kept in a hash
//! map, so a sift step is O(1) and `add` / `pop_max` / `adjust` are O(log n).
//!
//! Items are additionally indexed by URI. Re-adding a URI that is already
//! pending creates a second, independent item.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use wrms_common::Song;

use super::item::{Item, ItemId};
use super::votes::VoteLedger;

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    weight: i64,
    id: ItemId,
}

impl HeapEntry {
    fn key(&self) -> (i64, Reverse<ItemId>) {
        (self.weight, Reverse(self.id))
    }
}

#[derive(Debug, Default)]
pub struct WeightedQueue {
    heap: Vec<HeapEntry>,
    positions: HashMap<ItemId, usize>,
    /// Keyed by handle, so iteration is arrival order
    items: BTreeMap<ItemId, Item>,
    by_uri: HashMap<String, BTreeSet<ItemId>>,
    next_id: u64,
}

impl WeightedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Insert a new pending item with weight 0
    pub fn add(&mut self, song: Song) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;

        let item = Item::new(id, song);
        self.by_uri
            .entry(item.uri().to_string())
            .or_default()
            .insert(id);

        let pos = self.heap.len();
        self.heap.push(HeapEntry {
            weight: item.weight,
            id,
        });
        self.positions.insert(id, pos);
        self.items.insert(id, item);
        self.sift_up(pos);

        id
    }

    /// Remove and return the highest-weight item (earliest arrival on ties)
    pub fn pop_max(&mut self) -> Option<Item> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop()?;
        self.positions.remove(&entry.id);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }

        let item = self.items.remove(&entry.id)?;
        if let Some(ids) = self.by_uri.get_mut(item.uri()) {
            ids.remove(&entry.id);
            if ids.is_empty() {
                self.by_uri.remove(item.uri());
            }
        }

        Some(item)
    }

    pub fn peek_max(&self) -> Option<&Item> {
        self.heap.first().and_then(|entry| self.get(entry.id))
    }

    /// Set the weight of a pending item and restore heap order
    ///
    /// Returns `false` (and changes nothing) if `id` is not pending.
    pub fn adjust(&mut self, id: ItemId, new_weight: i64) -> bool {
        let Some(&pos) = self.positions.get(&id) else {
            return false;
        };
        let Some(item) = self.items.get_mut(&id) else {
            return false;
        };
        item.weight = new_weight;

        let old_weight = self.heap[pos].weight;
        self.heap[pos].weight = new_weight;
        if new_weight > old_weight {
            self.sift_up(pos);
        } else if new_weight < old_weight {
            self.sift_down(pos);
        }
        true
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Vote ledger of a pending item
    ///
    /// The weight is not touched here; follow a successful vote with
    /// [`WeightedQueue::adjust`].
    pub fn votes_mut(&mut self, id: ItemId) -> Option<&mut VoteLedger> {
        self.items.get_mut(&id).map(|item| &mut item.votes)
    }

    /// Earliest-added pending item with this URI
    pub fn find_by_uri(&self, uri: &str) -> Option<ItemId> {
        self.by_uri.get(uri).and_then(|ids| ids.first().copied())
    }

    /// Pending items in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].id, a);
        self.positions.insert(self.heap[b].id, b);
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap[pos].key() <= self.heap[parent].key() {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut best = pos;

            if left < len && self.heap[left].key() > self.heap[best].key() {
                best = left;
            }
            if right < len && self.heap[right].key() > self.heap[best].key() {
                best = right;
            }
            if best == pos {
                break;
            }
            self.swap(pos, best);
            pos = best;
        }
    }

    #[cfg(test)]
    fn assert_heap_invariants(&self) {
        assert_eq!(self.heap.len(), self.items.len());
        assert_eq!(self.heap.len(), self.positions.len());
        for (pos, entry) in self.heap.iter().enumerate() {
            assert_eq!(self.positions[&entry.id], pos);
            assert_eq!(self.items[&entry.id].weight, entry.weight);
            if pos > 0 {
                assert!(self.heap[(pos - 1) / 2].key() > entry.key());
            }
        }
    }
}
