//! Hierarchical numbering inferred from vertical adjacency.
//!
//! Numberable cards are visited top to bottom. Each one looks at the
//! numberable card directly above it:
//!
//! - same column: next sibling (`1.2` follows `1.1`)
//! - indented by any amount: first child (`1.1` follows `1`)
//! - outdented by `k` grid cells: climbs `k` levels, never above the top
//!
//! A numberable card with nothing numberable above it starts a new list,
//! but only if something numberable hangs below it; a lone checkbox stays
//! unnumbered.

use std::collections::{HashMap, HashSet};

use crate::model::board::Board;
use crate::model::card::{CardEvent, CardId, Completion, Direction};
use crate::model::settings::ProjectSettings;

#[derive(Debug, Clone)]
struct Node {
    prefix: Vec<usize>,
    parent: Option<CardId>,
}

/// Numbering prefix of every numbered card, plus each card's parent.
fn build_tree(board: &Board, grid: f32) -> HashMap<CardId, Node> {
    let mut order: Vec<CardId> = board
        .cards()
        .filter(|c| c.numberable())
        .map(|c| c.id)
        .collect();
    order.sort_by(|a, b| {
        let (ra, rb) = (board.cards[a].rect, board.cards[b].rect);
        ra.y.total_cmp(&rb.y)
            .then(ra.x.total_cmp(&rb.x))
            .then(a.cmp(b))
    });

    let numberable_neighbor = |id: CardId, direction: Direction| {
        board.cards[&id]
            .neighbor(direction)
            .filter(|n| board.card(*n).is_some_and(|c| c.numberable()))
    };

    let has_child_below: HashSet<CardId> = order
        .iter()
        .filter_map(|id| numberable_neighbor(*id, Direction::Up))
        .collect();

    let mut nodes: HashMap<CardId, Node> = HashMap::new();
    for &id in &order {
        let above = numberable_neighbor(id, Direction::Up).and_then(|a| nodes.get(&a).map(|n| (a, n)));
        let node = match above {
            None => {
                let starts_list = has_child_below.contains(&id)
                    || numberable_neighbor(id, Direction::Down).is_some();
                if !starts_list {
                    continue;
                }
                Node {
                    prefix: vec![1],
                    parent: None,
                }
            }
            Some((above_id, above_node)) => {
                let dx = board.cards[&id].rect.x - board.cards[&above_id].rect.x;
                let step = if grid > 0.0 {
                    (dx / grid).round() as i64
                } else {
                    dx.signum() as i64
                };
                place_below(&nodes, above_id, above_node, step)
            }
        };
        nodes.insert(id, node);
    }
    nodes
}

fn place_below(
    nodes: &HashMap<CardId, Node>,
    above_id: CardId,
    above: &Node,
    step: i64,
) -> Node {
    if step > 0 {
        let mut prefix = above.prefix.clone();
        prefix.push(1);
        return Node {
            prefix,
            parent: Some(above_id),
        };
    }

    // Sibling of the ancestor at the kept depth.
    let depth = above.prefix.len();
    let climb = (-step) as usize;
    let keep = depth.saturating_sub(climb).max(1);

    let mut sibling = above;
    for _ in keep..depth {
        match sibling.parent.and_then(|p| nodes.get(&p)) {
            Some(parent) => sibling = parent,
            None => break,
        }
    }

    let mut prefix = sibling.prefix.clone();
    if let Some(last) = prefix.last_mut() {
        *last += 1;
    }
    Node {
        prefix,
        parent: sibling.parent,
    }
}

/// Assign numbering labels and aggregate completion to every card on the
/// board. Neighbours must be current. Running it twice gives the same result.
pub fn renumber(board: &mut Board, settings: &ProjectSettings, grid: f32) {
    let nodes = build_tree(board, grid);

    let mut children: HashMap<CardId, Vec<CardId>> = HashMap::new();
    for (id, node) in &nodes {
        if let Some(parent) = node.parent {
            children.entry(parent).or_default().push(*id);
        }
    }

    // Deepest first so every child's aggregate is ready before its parent's.
    let mut by_depth: Vec<CardId> = nodes.keys().copied().collect();
    by_depth.sort_by(|a, b| {
        nodes[b]
            .prefix
            .len()
            .cmp(&nodes[a].prefix.len())
            .then(a.cmp(b))
    });

    let mut completion: HashMap<CardId, Completion> = HashMap::new();
    let mut aggregates: HashMap<CardId, Completion> = HashMap::new();
    for id in &by_depth {
        let own = board.cards[id].own_completion();
        let value = match children.get(id) {
            Some(kids) if !kids.is_empty() => {
                let level = kids
                    .iter()
                    .map(|k| completion.get(k).map(Completion::ratio).unwrap_or(0.0))
                    .sum();
                let aggregate = Completion {
                    level,
                    max: kids.len() as f32,
                };
                aggregates.insert(*id, aggregate);
                aggregate
            }
            _ => own,
        };
        completion.insert(*id, value);
    }

    for card in board.cards.values_mut() {
        let prefix = nodes.get(&card.id).map(|n| n.prefix.clone());
        card.receive(CardEvent::Numbering {
            prefix,
            style: settings.numbering,
            ignore_top_level: settings.numbering_ignore_top_level,
            aggregate: aggregates.get(&card.id).copied(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::{Card, CardContent, CardKind};
    use crate::model::geometry::Rect;
    use crate::model::settings::NumberingStyle;
    use crate::ops::layout::resolve_neighbors;

    const GRID: f32 = 16.0;

    /// Cards are 8x2 grid cells; `(id, column, row)` in grid units.
    fn board_of(cells: &[(u32, i32, i32, CardKind)]) -> Board {
        let mut board = Board::new("numbers");
        for &(id, col, row, kind) in cells {
            let card = Card::new(
                CardId(id),
                CardContent::new(kind),
                Rect::new(col as f32 * GRID, row as f32 * GRID, 8.0 * GRID, 2.0 * GRID),
            );
            board.cards.insert(CardId(id), card);
        }
        resolve_neighbors(&mut board);
        board
    }

    fn labels(board: &Board) -> Vec<String> {
        let mut ids = board.ids();
        ids.sort();
        ids.iter()
            .map(|id| board.card(*id).unwrap().label().to_string())
            .collect()
    }

    #[test]
    fn vertical_list_counts_up() {
        let mut board = board_of(&[
            (0, 0, 0, CardKind::Checkbox),
            (1, 0, 2, CardKind::Checkbox),
            (2, 0, 4, CardKind::Numbered),
        ]);
        renumber(&mut board, &ProjectSettings::default(), GRID);
        assert_eq!(labels(&board), vec!["1.", "2.", "3."]);
    }

    #[test]
    fn indent_and_outdent() {
        let mut board = board_of(&[
            (0, 0, 0, CardKind::Checkbox),
            (1, 1, 2, CardKind::Checkbox),
            (2, 1, 4, CardKind::Checkbox),
            (3, 2, 6, CardKind::Checkbox),
            (4, 0, 8, CardKind::Checkbox),
        ]);
        renumber(&mut board, &ProjectSettings::default(), GRID);
        assert_eq!(labels(&board), vec!["1.", "1.1.", "1.2.", "1.2.1.", "2."]);
        assert_eq!(board.card(CardId(3)).unwrap().numbering(), Some(&[1, 2, 1][..]));
    }

    #[test]
    fn outdent_never_climbs_past_top_level() {
        let mut board = board_of(&[
            (0, 4, 0, CardKind::Checkbox),
            (1, 0, 2, CardKind::Checkbox),
        ]);
        renumber(&mut board, &ProjectSettings::default(), GRID);
        assert_eq!(labels(&board), vec!["1.", "2."]);
    }

    #[test]
    fn lone_card_is_unnumbered() {
        let mut board = board_of(&[
            (0, 0, 0, CardKind::Checkbox),
            (1, 20, 0, CardKind::Note),
        ]);
        renumber(&mut board, &ProjectSettings::default(), GRID);
        assert_eq!(labels(&board), vec!["", ""]);
    }

    #[test]
    fn notes_break_the_chain() {
        let mut board = board_of(&[
            (0, 0, 0, CardKind::Checkbox),
            (1, 0, 2, CardKind::Note),
            (2, 0, 4, CardKind::Checkbox),
            (3, 0, 6, CardKind::Checkbox),
        ]);
        renumber(&mut board, &ProjectSettings::default(), GRID);
        assert_eq!(labels(&board), vec!["", "", "1.", "2."]);
    }

    #[test]
    fn styles_and_ignore_top_level() {
        let mut board = board_of(&[
            (0, 0, 0, CardKind::Checkbox),
            (1, 1, 2, CardKind::Checkbox),
            (2, 1, 4, CardKind::Checkbox),
        ]);
        let mut settings = ProjectSettings::default();
        settings.numbering = NumberingStyle::Roman;
        renumber(&mut board, &settings, GRID);
        assert_eq!(labels(&board), vec!["I.", "I.I.", "I.II."]);

        settings.numbering = NumberingStyle::Dashed;
        settings.numbering_ignore_top_level = true;
        renumber(&mut board, &settings, GRID);
        assert_eq!(labels(&board), vec!["", "1)", "2)"]);

        settings.numbering = NumberingStyle::Off;
        renumber(&mut board, &settings, GRID);
        assert_eq!(labels(&board), vec!["", "", ""]);
    }

    #[test]
    fn parent_completion_aggregates_children() {
        let mut board = board_of(&[
            (0, 0, 0, CardKind::Checkbox),
            (1, 1, 2, CardKind::Checkbox),
            (2, 1, 4, CardKind::Numbered),
        ]);
        board.card_mut(CardId(1)).unwrap().set_completion(true);
        if let CardContent::Numbered { current, max, .. } =
            &mut board.card_mut(CardId(2)).unwrap().content
        {
            *current = 1;
            *max = 4;
        }
        renumber(&mut board, &ProjectSettings::default(), GRID);

        let parent = board.card(CardId(0)).unwrap();
        assert_eq!(parent.completion(), Completion { level: 1.25, max: 2.0 });
        assert!(!parent.is_complete());

        board.card_mut(CardId(2)).unwrap().set_completion(true);
        renumber(&mut board, &ProjectSettings::default(), GRID);
        assert!(board.card(CardId(0)).unwrap().is_complete());
    }

    #[test]
    fn renumbering_is_idempotent() {
        let mut board = board_of(&[
            (0, 0, 0, CardKind::Checkbox),
            (1, 1, 2, CardKind::Numbered),
            (2, 3, 4, CardKind::Checkbox),
            (3, 0, 6, CardKind::Checkbox),
            (4, 10, 0, CardKind::Checkbox),
            (5, 10, 2, CardKind::Checkbox),
        ]);
        let settings = ProjectSettings::default();
        renumber(&mut board, &settings, GRID);
        let first = labels(&board);
        renumber(&mut board, &settings, GRID);
        assert_eq!(labels(&board), first);
    }
}
