use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::card::{Card, CardEvent, CardId};
use super::geometry::Rect;

/// How a box selection combines with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// Cards in the box become the whole selection.
    Replace,
    /// Cards in the box are added.
    Add,
    /// Cards in the box flip membership.
    Invert,
}

/// Selected cards of one board.
///
/// Selection is the only writer of each card's `selected` flag; every
/// mutation keeps `card.is_selected() == selection.contains(card.id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    members: BTreeSet<CardId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Select a card of this board. Returns false if it is not on the board
    /// or already selected.
    pub fn add(&mut self, cards: &mut IndexMap<CardId, Card>, id: CardId) -> bool {
        let Some(card) = cards.get_mut(&id) else {
            return false;
        };
        if !self.members.insert(id) {
            return false;
        }
        card.receive(CardEvent::Selected);
        true
    }

    pub fn remove(&mut self, cards: &mut IndexMap<CardId, Card>, id: CardId) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        if let Some(card) = cards.get_mut(&id) {
            card.receive(CardEvent::Deselected);
        }
        true
    }

    pub fn toggle(&mut self, cards: &mut IndexMap<CardId, Card>, id: CardId) {
        if self.contains(id) {
            self.remove(cards, id);
        } else {
            self.add(cards, id);
        }
    }

    pub fn clear(&mut self, cards: &mut IndexMap<CardId, Card>) {
        for id in std::mem::take(&mut self.members) {
            if let Some(card) = cards.get_mut(&id) {
                card.receive(CardEvent::Deselected);
            }
        }
    }

    /// Make `id` the only selected card.
    pub fn select_only(&mut self, cards: &mut IndexMap<CardId, Card>, id: CardId) -> bool {
        if !cards.contains_key(&id) {
            return false;
        }
        self.clear(cards);
        self.add(cards, id)
    }

    pub fn select_all(&mut self, cards: &mut IndexMap<CardId, Card>) -> usize {
        let ids: Vec<CardId> = cards.keys().copied().collect();
        for id in ids {
            self.add(cards, id);
        }
        self.len()
    }

    /// Flip membership of every card touching `rect`. Returns how many
    /// cards were deselected by the flip.
    pub fn invert_within(&mut self, cards: &mut IndexMap<CardId, Card>, rect: Rect) -> usize {
        let hits: Vec<CardId> = cards
            .values()
            .filter(|c| rect.touches(&c.rect))
            .map(|c| c.id)
            .collect();
        let mut deselected = 0;
        for id in hits {
            if self.contains(id) {
                deselected += 1;
            }
            self.toggle(cards, id);
        }
        deselected
    }

    /// Box selection. Returns how many cards became newly selected, or for
    /// [`SelectMode::Invert`] how many were deselected.
    pub fn select_in_rect(
        &mut self,
        cards: &mut IndexMap<CardId, Card>,
        rect: Rect,
        mode: SelectMode,
    ) -> usize {
        match mode {
            SelectMode::Invert => self.invert_within(cards, rect),
            SelectMode::Replace | SelectMode::Add => {
                if mode == SelectMode::Replace {
                    self.clear(cards);
                }
                let hits: Vec<CardId> = cards
                    .values()
                    .filter(|c| rect.touches(&c.rect))
                    .map(|c| c.id)
                    .collect();
                hits.into_iter().filter(|id| self.add(cards, *id)).count()
            }
        }
    }

    /// Selected ids in board order, for deterministic iteration.
    pub fn as_slice(&self, cards: &IndexMap<CardId, Card>) -> Vec<CardId> {
        cards
            .keys()
            .filter(|id| self.members.contains(id))
            .copied()
            .collect()
    }

    /// Drop a card that is leaving the board.
    pub(crate) fn forget(&mut self, id: CardId) {
        self.members.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::{CardContent, CardKind};

    fn board_cards(n: u32) -> IndexMap<CardId, Card> {
        (0..n)
            .map(|i| {
                let card = Card::new(
                    CardId(i),
                    CardContent::new(CardKind::Checkbox),
                    Rect::new(i as f32 * 64.0, 0.0, 32.0, 32.0),
                );
                (CardId(i), card)
            })
            .collect()
    }

    fn assert_consistent(sel: &Selection, cards: &IndexMap<CardId, Card>) {
        for card in cards.values() {
            assert_eq!(card.is_selected(), sel.contains(card.id), "card {}", card.id);
        }
    }

    #[test]
    fn add_remove_toggle_clear() {
        let mut cards = board_cards(3);
        let mut sel = Selection::new();
        assert!(sel.add(&mut cards, CardId(1)));
        assert!(!sel.add(&mut cards, CardId(1)));
        sel.toggle(&mut cards, CardId(2));
        assert_eq!(sel.as_slice(&cards), vec![CardId(1), CardId(2)]);
        sel.toggle(&mut cards, CardId(1));
        assert!(sel.remove(&mut cards, CardId(2)));
        assert!(sel.is_empty());
        sel.select_all(&mut cards);
        assert_eq!(sel.len(), 3);
        sel.clear(&mut cards);
        assert_consistent(&sel, &cards);
        assert!(sel.is_empty());
    }

    #[test]
    fn cards_from_other_boards_cannot_be_selected() {
        let mut cards = board_cards(2);
        let mut sel = Selection::new();
        assert!(!sel.add(&mut cards, CardId(9)));
        assert!(!sel.select_only(&mut cards, CardId(9)));
        assert!(sel.is_empty());
    }

    #[test]
    fn as_slice_follows_board_order() {
        let mut cards = board_cards(4);
        let mut sel = Selection::new();
        sel.add(&mut cards, CardId(3));
        sel.add(&mut cards, CardId(0));
        cards.move_index(0, 3);
        assert_eq!(sel.as_slice(&cards), vec![CardId(3), CardId(0)]);
    }

    #[test]
    fn invert_within_flips_membership() {
        let mut cards = board_cards(3);
        let mut sel = Selection::new();
        sel.add(&mut cards, CardId(0));
        // Covers cards 0 and 1.
        let deselected = sel.invert_within(&mut cards, Rect::new(0.0, 0.0, 70.0, 10.0));
        assert_eq!(deselected, 1);
        assert_eq!(sel.as_slice(&cards), vec![CardId(1)]);
        assert_consistent(&sel, &cards);
    }

    #[test]
    fn box_select_modes() {
        let mut cards = board_cards(3);
        let mut sel = Selection::new();
        sel.add(&mut cards, CardId(2));
        let n = sel.select_in_rect(&mut cards, Rect::new(0.0, 0.0, 10.0, 10.0), SelectMode::Add);
        assert_eq!(n, 1);
        assert_eq!(sel.as_slice(&cards), vec![CardId(0), CardId(2)]);
        sel.select_in_rect(
            &mut cards,
            Rect::new(60.0, 0.0, 10.0, 10.0),
            SelectMode::Replace,
        );
        assert_eq!(sel.as_slice(&cards), vec![CardId(1)]);
        assert_consistent(&sel, &cards);
    }

    #[test]
    fn invariant_holds_under_mixed_operations() {
        let mut cards = board_cards(8);
        let mut sel = Selection::new();
        let mut seed: u32 = 7;
        for _ in 0..400 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let id = CardId((seed >> 8) % 10);
            match (seed >> 4) % 6 {
                0 => {
                    sel.add(&mut cards, id);
                }
                1 => {
                    sel.remove(&mut cards, id);
                }
                2 => sel.toggle(&mut cards, id),
                3 => {
                    if seed % 7 == 0 {
                        sel.clear(&mut cards);
                    }
                }
                4 => {
                    let x = ((seed >> 12) % 400) as f32;
                    sel.invert_within(&mut cards, Rect::new(x, 0.0, 100.0, 40.0));
                }
                _ => {
                    sel.select_only(&mut cards, id);
                }
            }
            assert_consistent(&sel, &cards);
        }
    }
}
