use indexmap::IndexMap;

use super::card::{Card, CardId};
use super::geometry::Rect;
use super::selection::{SelectMode, Selection};

/// A named set of cards sharing one coordinate space.
///
/// Card order is insertion order. It has no meaning for layout; it only
/// keeps iteration (and therefore selection order and output) deterministic.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub name: String,
    pub(crate) cards: IndexMap<CardId, Card>,
    pub(crate) selection: Selection,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Board {
            name: name.into(),
            cards: IndexMap::new(),
            selection: Selection::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.cards.contains_key(&id)
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    /// Mutable access for content edits. Call the board's `reorder` after
    /// changing a card's rectangle so adjacency stays current.
    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.get_mut(&id)
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    pub fn ids(&self) -> Vec<CardId> {
        self.cards.keys().copied().collect()
    }

    /// Topmost card under a world point (last drawn wins).
    pub fn card_at(&self, point: super::geometry::Vec2) -> Option<CardId> {
        self.cards
            .values()
            .rev()
            .find(|c| c.rect.contains(point))
            .map(|c| c.id)
    }

    // --- Selection ---

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected ids in board order.
    pub fn selected(&self) -> Vec<CardId> {
        self.selection.as_slice(&self.cards)
    }

    pub fn select(&mut self, id: CardId) -> bool {
        self.selection.add(&mut self.cards, id)
    }

    pub fn toggle_selected(&mut self, id: CardId) {
        self.selection.toggle(&mut self.cards, id)
    }

    pub fn select_only(&mut self, id: CardId) -> bool {
        self.selection.select_only(&mut self.cards, id)
    }

    pub fn select_all(&mut self) -> usize {
        self.selection.select_all(&mut self.cards)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear(&mut self.cards)
    }

    pub fn select_in_rect(&mut self, rect: Rect, mode: SelectMode) -> usize {
        self.selection.select_in_rect(&mut self.cards, rect, mode)
    }

    /// Bounding box of the selected cards.
    pub fn selection_bounds(&self) -> Option<Rect> {
        self.selected()
            .iter()
            .filter_map(|id| self.cards.get(id))
            .map(|c| c.rect)
            .reduce(|acc, r| acc.union(&r))
    }
}
