use std::cmp::Ordering;

use crate::model::board::Board;
use crate::model::card::{CardEvent, CardId, Direction, Neighbors};
use crate::model::geometry::{Rect, snap_point};

/// Slack for float noise when comparing edges of grid-aligned rectangles.
const EDGE_EPSILON: f32 = 0.01;

/// Distance from `from` to `to` across the edge facing `direction`, and the
/// offset along the perpendicular axis. `None` if `to` is not beyond that
/// edge or the perpendicular ranges do not overlap.
fn edge_distance(from: &Rect, to: &Rect, direction: Direction) -> Option<(f32, f32)> {
    let (gap, overlaps, offset) = match direction {
        Direction::Right => (
            to.x - from.right(),
            to.y < from.bottom() && to.bottom() > from.y,
            (to.y - from.y).abs(),
        ),
        Direction::Left => (
            from.x - to.right(),
            to.y < from.bottom() && to.bottom() > from.y,
            (to.y - from.y).abs(),
        ),
        Direction::Down => (
            to.y - from.bottom(),
            to.x < from.right() && to.right() > from.x,
            (to.x - from.x).abs(),
        ),
        Direction::Up => (
            from.y - to.bottom(),
            to.x < from.right() && to.right() > from.x,
            (to.x - from.x).abs(),
        ),
    };
    if gap >= -EDGE_EPSILON && overlaps {
        Some((gap.max(0.0), offset))
    } else {
        None
    }
}

fn by_distance(a: &(f32, f32, CardId), b: &(f32, f32, CardId)) -> Ordering {
    a.0.total_cmp(&b.0)
        .then(a.1.total_cmp(&b.1))
        .then(a.2.cmp(&b.2))
}

/// Nearest card across `id`'s edge in `direction`.
///
/// Candidates lie beyond the edge (touching counts) and overlap the card on
/// the perpendicular axis. The smallest gap wins, then the smallest
/// perpendicular offset, then the lowest id.
pub fn find_neighbor(board: &Board, id: CardId, direction: Direction) -> Option<CardId> {
    let from = board.card(id)?.rect;
    board
        .cards()
        .filter(|c| c.id != id)
        .filter_map(|c| edge_distance(&from, &c.rect, direction).map(|(g, o)| (g, o, c.id)))
        .min_by(by_distance)
        .map(|(_, _, id)| id)
}

/// Recompute all four neighbours of every card on the board.
pub fn resolve_neighbors(board: &mut Board) {
    let resolved: Vec<(CardId, Neighbors)> = board
        .ids()
        .into_iter()
        .map(|id| {
            let mut n = Neighbors::default();
            for d in Direction::ALL {
                n.set(d, find_neighbor(board, id, d));
            }
            (id, n)
        })
        .collect();

    for (id, neighbors) in resolved {
        if let Some(card) = board.card_mut(id) {
            card.receive(CardEvent::Neighbors(neighbors));
        }
    }
}

/// Snap every card that is not mid-drag onto the grid. Returns true if any
/// card moved.
pub fn settle(board: &mut Board, grid: f32) -> bool {
    let mut moved = false;
    for card in board.cards.values_mut() {
        if card.is_dragging() {
            continue;
        }
        let snapped = snap_point(card.position(), grid);
        if snapped != card.position() {
            card.rect.x = snapped.x;
            card.rect.y = snapped.y;
            moved = true;
        }
    }
    moved
}

/// Closest card whose centre lies in the quarter-plane opening toward
/// `direction`. Used by keyboard navigation when there is no direct neighbour.
pub fn nearest_in_direction(board: &Board, id: CardId, direction: Direction) -> Option<CardId> {
    let origin = board.card(id)?.rect.center();
    board
        .cards()
        .filter(|c| c.id != id)
        .filter_map(|c| {
            let d = c.rect.center().sub(origin);
            let (along, across) = match direction {
                Direction::Right => (d.x, d.y),
                Direction::Left => (-d.x, d.y),
                Direction::Down => (d.y, d.x),
                Direction::Up => (-d.y, d.x),
            };
            (along > 0.0 && across.abs() <= along).then(|| (along.hypot(across), 0.0, c.id))
        })
        .min_by(by_distance)
        .map(|(_, _, id)| id)
}
