use regex::{Regex, RegexBuilder};

use super::project_ops::{commit, switch_board};
use crate::model::card::{Card, CardContent, CardId};
use crate::model::project::{Change, Project, SearchState};

/// Build a case-insensitive literal matcher for `query`.
fn matcher(query: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// The searchable strings of a card: its text, its file path or its
/// timer's name.
fn haystacks(card: &Card) -> Vec<&str> {
    match &card.content {
        CardContent::Checkbox { text, .. }
        | CardContent::Numbered { text, .. }
        | CardContent::Note { text } => vec![text.as_str()],
        CardContent::Image { path } | CardContent::Sound { path, .. } => vec![path.as_str()],
        CardContent::Timer(timer) => vec![timer.name.as_str()],
        CardContent::Map(_) => Vec::new(),
    }
}

/// Collect `(board index, card id)` for every card matching `re`, boards in
/// order and cards top-to-bottom, left-to-right within a board.
fn collect_hits(project: &Project, re: &Regex) -> Vec<(usize, CardId)> {
    let mut hits = Vec::new();
    for (index, board) in project.boards().iter().enumerate() {
        let mut found: Vec<&Card> = board
            .cards()
            .filter(|c| haystacks(c).iter().any(|h| re.is_match(h)))
            .collect();
        found.sort_by(|a, b| {
            a.rect
                .y
                .total_cmp(&b.rect.y)
                .then(a.rect.x.total_cmp(&b.rect.x))
                .then(a.id.cmp(&b.id))
        });
        hits.extend(found.into_iter().map(|c| (index, c.id)));
    }
    hits
}

/// Search every board and focus the first hit. Returns the hit count.
pub fn search(project: &mut Project, query: &str) -> usize {
    let query = query.trim();
    if query.is_empty() {
        clear_search(project);
        return 0;
    }
    let hits = match matcher(query) {
        Some(re) => collect_hits(project, &re),
        None => Vec::new(),
    };
    let count = hits.len();
    project.search = SearchState {
        query: query.to_string(),
        hits,
        cursor: 0,
    };
    if count == 0 {
        project.log.push(format!("No cards match \"{query}\"."));
    } else {
        focus_current(project);
    }
    count
}

/// Step to the next hit, wrapping at the end.
pub fn next_hit(project: &mut Project) -> Option<CardId> {
    step(project, 1)
}

/// Step to the previous hit, wrapping at the start.
pub fn previous_hit(project: &mut Project) -> Option<CardId> {
    step(project, -1)
}

fn step(project: &mut Project, by: isize) -> Option<CardId> {
    let len = project.search.hits.len();
    if len == 0 {
        return None;
    }
    let cursor = (project.search.cursor as isize + by).rem_euclid(len as isize);
    project.search.cursor = cursor as usize;
    focus_current(project)
}

/// Bring the current hit into view: switch to its board, select only it
/// and centre the camera on it. Hits whose card has since been deleted are
/// skipped over.
fn focus_current(project: &mut Project) -> Option<CardId> {
    let (_, id) = project.search.current()?;
    // Boards may have been reordered since the search ran.
    let (board, center) = match project.find_card(id) {
        Some((board, card)) => (board, card.rect.center()),
        None => {
            project.search.hits.retain(|(_, hit)| *hit != id);
            if project.search.cursor >= project.search.hits.len() {
                project.search.cursor = 0;
            }
            return if project.search.hits.is_empty() {
                None
            } else {
                focus_current(project)
            };
        }
    };
    switch_board(project, board).ok()?;
    project.current_board_mut().select_only(id);
    project.camera.focus_on(center);
    commit(project, Change::Selection);
    Some(id)
}

pub fn clear_search(project: &mut Project) {
    project.search = SearchState::default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::CardKind;
    use crate::model::geometry::Vec2;
    use crate::ops::board_ops::{create_card_at, set_card_text};
    use crate::ops::project_ops::new_board;
    use pretty_assertions::assert_eq;

    fn note(project: &mut Project, text: &str, at: Vec2) -> CardId {
        let id = create_card_at(project, CardKind::Note, at);
        set_card_text(project, id, text).unwrap();
        id
    }

    #[test]
    fn finds_cards_across_boards_case_insensitively() {
        let mut p = Project::new();
        let a = note(&mut p, "Buy MILK", Vec2::new(0.0, 0.0));
        note(&mut p, "call mom", Vec2::new(0.0, 200.0));
        new_board(&mut p).unwrap();
        let b = note(&mut p, "milk the cow", Vec2::new(0.0, 0.0));

        assert_eq!(search(&mut p, "milk"), 2);
        assert_eq!(p.search().hits, vec![(0, a), (1, b)]);
        assert_eq!(p.board_index(), 0);
        assert_eq!(p.current_board().selected(), vec![a]);

        assert_eq!(next_hit(&mut p), Some(b));
        assert_eq!(p.board_index(), 1);
        assert_eq!(next_hit(&mut p), Some(a));
        assert_eq!(previous_hit(&mut p), Some(b));
    }

    #[test]
    fn regex_characters_are_literal() {
        let mut p = Project::new();
        note(&mut p, "costs $5 (approx)", Vec2::ZERO);
        assert_eq!(search(&mut p, "$5 ("), 1);
        assert_eq!(search(&mut p, ".*"), 0);
    }

    #[test]
    fn searching_timer_names_and_paths() {
        let mut p = Project::new();
        let id = create_card_at(&mut p, CardKind::Timer, Vec2::ZERO);
        if let Some(card) = p.current_board_mut().card_mut(id) {
            if let CardContent::Timer(t) = &mut card.content {
                t.name = "Tea".into();
            }
        }
        assert_eq!(search(&mut p, "tea"), 1);
    }

    #[test]
    fn empty_query_clears() {
        let mut p = Project::new();
        note(&mut p, "x", Vec2::ZERO);
        search(&mut p, "x");
        assert_eq!(search(&mut p, "  "), 0);
        assert_eq!(p.search(), &SearchState::default());
        assert_eq!(next_hit(&mut p), None);
    }
}
