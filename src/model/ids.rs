use std::collections::BTreeSet;

use super::card::CardId;

/// Hands out card ids for one project.
///
/// The lowest id not held by a live card is issued next, so a card deleted
/// and recreated keeps the same id and plan-file diffs stay small. Only live
/// ids are stored; gaps cost nothing however large the ids in a file are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdAllocator {
    live: BTreeSet<u32>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next `allocate` will return.
    pub fn next_free(&self) -> u32 {
        let mut next = 0u32;
        for &id in &self.live {
            if id != next {
                break;
            }
            next = next.saturating_add(1);
        }
        next
    }

    pub fn allocate(&mut self) -> CardId {
        let id = self.next_free();
        self.live.insert(id);
        CardId(id)
    }

    /// Return an id to the pool once its card is destroyed.
    pub fn release(&mut self, id: CardId) {
        self.live.remove(&id.0);
    }

    /// Claim a specific id (used when loading). Returns false if the id is
    /// already taken.
    pub fn reserve(&mut self, id: CardId) -> bool {
        self.live.insert(id.0)
    }

    pub fn is_live(&self, id: CardId) -> bool {
        self.live.contains(&id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_sequentially() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(), CardId(0));
        assert_eq!(ids.allocate(), CardId(1));
        assert_eq!(ids.allocate(), CardId(2));
        assert_eq!(ids.next_free(), 3);
    }

    #[test]
    fn lowest_free_id_is_reused() {
        let mut ids = IdAllocator::new();
        for _ in 0..5 {
            ids.allocate();
        }
        ids.release(CardId(3));
        ids.release(CardId(1));
        assert_eq!(ids.allocate(), CardId(1));
        assert_eq!(ids.allocate(), CardId(3));
        assert_eq!(ids.allocate(), CardId(5));
    }

    #[test]
    fn release_of_unknown_id_is_ignored() {
        let mut ids = IdAllocator::new();
        ids.release(CardId(7));
        assert_eq!(ids.allocate(), CardId(0));
    }

    #[test]
    fn reserve_leaves_gaps_for_reuse() {
        let mut ids = IdAllocator::new();
        assert!(ids.reserve(CardId(0)));
        assert!(ids.reserve(CardId(3)));
        assert!(!ids.reserve(CardId(3)));
        assert!(ids.is_live(CardId(3)));
        assert!(!ids.is_live(CardId(1)));
        assert_eq!(ids.allocate(), CardId(1));
        assert_eq!(ids.allocate(), CardId(2));
        assert_eq!(ids.allocate(), CardId(4));
    }

    #[test]
    fn live_ids_are_never_duplicated() {
        // Pseudo-random create/delete sequence.
        let mut ids = IdAllocator::new();
        let mut live: Vec<CardId> = Vec::new();
        let mut seed: u32 = 12345;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            if seed % 3 == 0 && !live.is_empty() {
                let idx = (seed as usize / 3) % live.len();
                ids.release(live.swap_remove(idx));
            } else {
                let id = ids.allocate();
                assert!(!live.contains(&id), "duplicate id {id}");
                live.push(id);
            }
        }
    }

    #[test]
    fn huge_ids_are_reserved_without_filling_gaps() {
        let mut ids = IdAllocator::new();
        assert!(ids.reserve(CardId(u32::MAX)));
        assert!(ids.reserve(CardId(20_000_000)));
        assert!(!ids.reserve(CardId(u32::MAX)));
        assert!(ids.is_live(CardId(u32::MAX)));
        assert_eq!(ids.allocate(), CardId(0));
        assert_eq!(ids.allocate(), CardId(1));
    }

    #[test]
    fn deleting_the_newest_card_frees_its_id() {
        let mut ids = IdAllocator::new();
        ids.allocate();
        let last = ids.allocate();
        ids.release(last);
        assert_eq!(ids.allocate(), last);
    }
}
