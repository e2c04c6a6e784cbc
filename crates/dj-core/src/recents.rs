//! # Recently accessed journals
//!
//! A per-user list of journal ids, most recent first, with no duplicates and a
//! hard cap. The type enforces all three rules so callers only ever `push`.

use std::collections::VecDeque;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// How many journals the dashboard remembers per user.
pub const RECENTS_CAPACITY: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecentJournals(VecDeque<Uuid>);

impl RecentJournals {
    pub fn new() -> Self {
        Self(VecDeque::with_capacity(RECENTS_CAPACITY))
    }

    /// Moves `journal_id` to the front, evicting the oldest id when full.
    pub fn push(&mut self, journal_id: Uuid) {
        self.forget(journal_id);
        if self.0.len() == RECENTS_CAPACITY {
            self.0.pop_back();
        }
        self.0.push_front(journal_id);
    }

    /// Removes `journal_id`. Returns whether it was present.
    pub fn forget(&mut self, journal_id: Uuid) -> bool {
        match self.0.iter().position(|id| *id == journal_id) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    /// Keeps only the ids for which `keep` returns true, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&Uuid) -> bool) {
        self.0.retain(|id| keep(id));
    }

    pub fn contains(&self, journal_id: Uuid) -> bool {
        self.0.contains(&journal_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Uuid> {
        self.0.iter().copied().collect()
    }
}

impl FromIterator<Uuid> for RecentJournals {
    /// Builds the list from stored order, most recent first. Duplicates and
    /// anything past the cap are dropped.
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        let mut recents = RecentJournals::new();
        for id in iter {
            if recents.len() == RECENTS_CAPACITY {
                break;
            }
            if !recents.contains(id) {
                recents.0.push_back(id);
            }
        }
        recents
    }
}

impl<'de> Deserialize<'de> for RecentJournals {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ids = Vec::<Uuid>::deserialize(deserializer)?;
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn push_puts_newest_first() {
        let j = ids(3);
        let mut recents = RecentJournals::new();
        for id in &j {
            recents.push(*id);
        }
        assert_eq!(recents.to_vec(), vec![j[2], j[1], j[0]]);
    }

    #[test]
    fn repeated_push_moves_to_front_without_growing() {
        let j = ids(3);
        let mut recents = RecentJournals::new();
        for id in &j {
            recents.push(*id);
        }
        recents.push(j[0]);
        assert_eq!(recents.len(), 3);
        assert_eq!(recents.to_vec(), vec![j[0], j[2], j[1]]);

        recents.push(j[0]);
        assert_eq!(recents.len(), 3);
        assert_eq!(recents.to_vec()[0], j[0]);
    }

    #[test]
    fn fifth_distinct_push_evicts_oldest() {
        let j = ids(5);
        let mut recents = RecentJournals::new();
        for id in &j {
            recents.push(*id);
        }
        assert_eq!(recents.len(), RECENTS_CAPACITY);
        assert!(!recents.contains(j[0]));
        assert_eq!(recents.to_vec(), vec![j[4], j[3], j[2], j[1]]);
    }

    #[test]
    fn re_pushing_a_member_of_a_full_list_evicts_nothing_else() {
        let j = ids(4);
        let mut recents = RecentJournals::new();
        for id in &j {
            recents.push(*id);
        }
        recents.push(j[0]);
        assert_eq!(recents.to_vec(), vec![j[0], j[3], j[2], j[1]]);
    }

    #[test]
    fn forget_removes_only_the_given_id() {
        let j = ids(3);
        let mut recents: RecentJournals = j.iter().copied().collect();
        assert!(recents.forget(j[1]));
        assert!(!recents.forget(j[1]));
        assert_eq!(recents.to_vec(), vec![j[0], j[2]]);
    }

    #[test]
    fn deserializing_enforces_cap_and_uniqueness() {
        let j = ids(5);
        let raw = serde_json::json!([j[0], j[0], j[1], j[2], j[3], j[4]]);
        let recents: RecentJournals = serde_json::from_value(raw).unwrap();
        assert_eq!(recents.to_vec(), vec![j[0], j[1], j[2], j[3]]);
        assert_eq!(serde_json::to_value(&recents).unwrap(), serde_json::json!([j[0], j[1], j[2], j[3]]));
    }
}
