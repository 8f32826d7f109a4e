//! The leader's live view of which members are still in play
//!
//! This module tracks every member the current leader believes is alive:
//! - Stable iteration order (address-book order) for the sequential fan-out
//! - Position updates from status replies
//! - Removal of members that were hit or could not be reached
//! - Snapshotting for a leadership hand-off
//!
//! A roster only ever shrinks. There is no way to add an entry after
//! construction; a new leader receives a whole new roster instead.

use log::info;
use rand::Rng;
use shared::{Position, RosterEntry};

/// Members still in play, in the order they are visited each round.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Creates a roster from an ordered list of entries
    ///
    /// Duplicate ids are dropped, keeping the first occurrence, so every id
    /// is visited at most once per fan-out.
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        let mut unique: Vec<RosterEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !unique.iter().any(|e| e.id == entry.id) {
                unique.push(entry);
            }
        }
        Self { entries: unique }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Copies out `(id, address)` pairs so callers can keep mutating the
    /// roster while walking it.
    pub fn endpoints(&self) -> Vec<(u32, String)> {
        self.entries
            .iter()
            .map(|e| (e.id, e.address.clone()))
            .collect()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn get(&self, id: u32) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Records the position a member reported
    ///
    /// Returns false if the member is no longer on the roster.
    pub fn update_position(&mut self, id: u32, position: Position) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.last_known_position = Some(position);
                true
            }
            None => false,
        }
    }

    /// Drops a member from play
    ///
    /// Returns true if the member was found and removed, false if it was
    /// already gone. Removal preserves the order of the remaining entries.
    pub fn remove(&mut self, id: u32) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(index) => {
                let entry = self.entries.remove(index);
                info!("Unit {} ({}) left the roster", entry.id, entry.address);
                true
            }
            None => false,
        }
    }

    /// Picks a member uniformly at random, or None when nobody is left.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&RosterEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.entries.len());
        self.entries.get(index)
    }

    /// Every entry except `id`, as handed to a successor.
    pub fn snapshot_excluding(&self, id: u32) -> Vec<RosterEntry> {
        self.entries
            .iter()
            .filter(|e| e.id != id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn roster_of(n: u32) -> Roster {
        Roster::new(
            (1..=n)
                .map(|id| RosterEntry::new(id, format!("127.0.0.1:{}", 7000 + id)))
                .collect(),
        )
    }

    #[test]
    fn test_roster_creation() {
        let roster = roster_of(3);
        assert_eq!(roster.len(), 3);
        assert_eq!(roster.ids(), vec![1, 2, 3]);
        assert!(!roster.is_empty());
    }

    #[test]
    fn test_duplicate_ids_dropped() {
        let roster = Roster::new(vec![
            RosterEntry::new(1, "a:1"),
            RosterEntry::new(1, "b:2"),
            RosterEntry::new(2, "c:3"),
        ]);
        assert_eq!(roster.ids(), vec![1, 2]);
        assert_eq!(roster.get(1).unwrap().address, "a:1");
    }

    #[test]
    fn test_update_position() {
        let mut roster = roster_of(2);
        assert!(roster.update_position(2, Position::new(3, 4)));
        assert_eq!(
            roster.get(2).unwrap().last_known_position,
            Some(Position::new(3, 4))
        );
        assert!(!roster.update_position(9, Position::new(0, 0)));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut roster = roster_of(4);
        assert!(roster.remove(2));
        assert_eq!(roster.ids(), vec![1, 3, 4]);
        assert!(!roster.remove(2));
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn test_choose_empty() {
        let roster = Roster::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(roster.choose(&mut rng).is_none());
    }

    #[test]
    fn test_choose_covers_all_members() {
        let roster = roster_of(4);
        let mut rng = StdRng::seed_from_u64(9);
        let chosen: HashSet<u32> = (0..200)
            .filter_map(|_| roster.choose(&mut rng).map(|e| e.id))
            .collect();
        assert_eq!(chosen, HashSet::from([1, 2, 3, 4]));
    }

    #[test]
    fn test_snapshot_excluding() {
        let roster = roster_of(3);
        let snapshot = roster.snapshot_excluding(2);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|e| e.id != 2));
        assert_eq!(roster.len(), 3);
    }
}
