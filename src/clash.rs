//! Unique id reconciliation across entity spaces.

use std::collections::{HashMap, HashSet};

/// Hands out effective ids that are unique within one space.
///
/// An id seen for the first time keeps its value. A repeat gets the next id
/// above everything handed out so far, and later lookups of the original id
/// resolve to that replacement.
#[derive(Debug, Default, Clone)]
pub struct ClashMap {
    forward: HashMap<i32, i32>,
    reverse: HashMap<i32, i32>,
    used: HashSet<i32>,
    high_water: i32,
}

impl ClashMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: i32) -> i32 {
        let effective = if self.used.contains(&id) {
            let allocated = self.next_free();
            self.forward.insert(id, allocated);
            self.reverse.insert(allocated, id);
            allocated
        } else {
            id
        };
        self.used.insert(effective);
        self.high_water = self.high_water.max(effective);
        effective
    }

    /// The id above the high water mark, or the lowest unused positive id
    /// once the top of the range has been handed out.
    fn next_free(&self) -> i32 {
        match self.high_water.checked_add(1) {
            Some(next) => next,
            None => (1..=i32::MAX)
                .find(|candidate| !self.used.contains(candidate))
                .unwrap_or(i32::MIN),
        }
    }

    /// Effective id for an original id; unchanged if it was never remapped.
    pub fn get(&self, id: i32) -> i32 {
        self.forward.get(&id).copied().unwrap_or(id)
    }

    /// Original id for an effective id.
    pub fn original(&self, effective: i32) -> i32 {
        self.reverse.get(&effective).copied().unwrap_or(effective)
    }

    pub fn contains(&self, effective: i32) -> bool {
        self.used.contains(&effective)
    }

    pub fn high_water(&self) -> i32 {
        self.high_water
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_id_is_identity() {
        let mut map = ClashMap::new();
        assert_eq!(map.add(5), 5);
        assert_eq!(map.get(5), 5);
    }

    #[test]
    fn test_clash_allocates_above_high_water() {
        let mut map = ClashMap::new();
        map.add(3);
        map.add(10);
        assert_eq!(map.add(3), 11);
        assert_eq!(map.get(3), 11);
        assert_eq!(map.original(11), 3);
        assert_eq!(map.high_water(), 11);
    }

    #[test]
    fn test_get_of_unknown_id_is_identity() {
        let map = ClashMap::new();
        assert_eq!(map.get(42), 42);
        assert_eq!(map.original(42), 42);
    }

    #[test]
    fn test_returned_ids_are_distinct() {
        let mut map = ClashMap::new();
        let inputs = [1, 2, 2, 3, 1, 4, 4, 4, 12, 5, 13];
        let mut seen = HashSet::new();
        for id in inputs {
            let effective = map.add(id);
            assert!(seen.insert(effective), "duplicate {effective}");
            assert_eq!(map.get(id), effective);
            assert_eq!(map.original(effective), id);
        }
    }

    #[test]
    fn test_clash_at_top_of_range() {
        let mut map = ClashMap::new();
        assert_eq!(map.add(i32::MAX), i32::MAX);
        assert_eq!(map.add(i32::MAX), 1);
        assert_eq!(map.get(i32::MAX), 1);
        assert_eq!(map.original(1), i32::MAX);
        assert_eq!(map.add(1), 2);
        assert_eq!(map.high_water(), i32::MAX);
    }

    #[test]
    fn test_allocated_id_added_later_is_renumbered() {
        let mut map = ClashMap::new();
        map.add(1);
        assert_eq!(map.add(1), 2);
        // 2 now belongs to the renumbered entity
        assert_eq!(map.add(2), 3);
        assert_eq!(map.get(2), 3);
        assert_eq!(map.get(1), 2);
    }
}
