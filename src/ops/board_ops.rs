use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::layout::{nearest_in_direction, resolve_neighbors, settle};
use super::numbering::renumber;
use super::project_ops::{ProjectError, commit};
use crate::model::board::Board;
use crate::model::card::{Card, CardEvent, CardId, CardKind, Direction, Reaction};
use crate::model::geometry::{Rect, Vec2, grid_to_world, snap_point, world_to_grid};
use crate::model::project::{Change, Project};
use crate::model::selection::SelectMode;
use crate::model::settings::ProjectSettings;
use crate::parse::card_record;

/// Rings searched around the target cell before giving up and stacking.
const MAX_PROBE_RING: i32 = 64;

/// Grid cells between a copied card and its pasted copy.
const PASTE_OFFSET_CELLS: f32 = 2.0;

// ---------------------------------------------------------------------------
// Recompute pass
// ---------------------------------------------------------------------------

/// Neighbours, then grid settle, then numbering. Neighbours are resolved
/// again if settling moved anything.
pub fn reorder_board(board: &mut Board, settings: &ProjectSettings, grid: f32) {
    resolve_neighbors(board);
    if settle(board, grid) {
        resolve_neighbors(board);
    }
    renumber(board, settings, grid);
}

/// Run the recompute pass on every board.
pub fn reorder(project: &mut Project) {
    let grid = project.grid_size;
    for board in &mut project.boards {
        reorder_board(board, &project.settings, grid);
    }
}

// ---------------------------------------------------------------------------
// Create / delete
// ---------------------------------------------------------------------------

/// Cells on the square ring `r` cells out from the origin, clockwise from
/// the top-left corner.
fn ring(r: i32) -> Vec<(i32, i32)> {
    if r == 0 {
        return vec![(0, 0)];
    }
    let mut cells = Vec::with_capacity((8 * r) as usize);
    cells.extend((-r..=r).map(|x| (x, -r)));
    cells.extend((-r + 1..=r).map(|y| (r, y)));
    cells.extend((-r..r).rev().map(|x| (x, r)));
    cells.extend((-r + 1..r).rev().map(|y| (-r, y)));
    cells
}

/// First grid position, spiralling out from `start`, that no card on the
/// board already occupies exactly.
fn free_cell(board: &Board, start: Vec2, grid: f32) -> Vec2 {
    let origin = world_to_grid(snap_point(start, grid), grid);
    let taken: Vec<Vec2> = board.cards().map(Card::position).collect();
    for r in 0..=MAX_PROBE_RING {
        for (dx, dy) in ring(r) {
            let p = grid_to_world((origin.0 + dx, origin.1 + dy), grid);
            if !taken.contains(&p) {
                return p;
            }
        }
    }
    grid_to_world(origin, grid)
}

/// Place a new card centred near `center` on the current board without
/// committing. The caller reorders and commits.
pub(crate) fn spawn_card(project: &mut Project, kind: CardKind, center: Vec2) -> CardId {
    let grid = project.grid_size;
    let id = project.ids.allocate();
    let mut card = Card::with_kind(id, kind, grid);
    card.set_center(center);
    let board = project.current_board_mut();
    let position = free_cell(board, card.position(), grid);
    card.rect.x = position.x;
    card.rect.y = position.y;
    board.cards.insert(id, card);
    board.select_only(id);
    id
}

/// Create a card at the camera focus.
pub fn create_card(project: &mut Project, kind: CardKind) -> CardId {
    let focus = project.camera.focus();
    create_card_at(project, kind, focus)
}

/// Create a card centred near `center`, on the first free grid cell. The
/// new card becomes the selection.
pub fn create_card_at(project: &mut Project, kind: CardKind, center: Vec2) -> CardId {
    let id = spawn_card(project, kind, center);
    reorder(project);
    commit(project, Change::Edit);
    id
}

/// Delete cards from the current board. Ids that are not on it are skipped.
/// Returns how many were removed.
pub fn delete_cards(project: &mut Project, ids: &[CardId]) -> usize {
    let index = project.board_index();
    let mut removed = 0;
    for &id in ids {
        let board = &mut project.boards[index];
        let Some(mut card) = board.cards.shift_remove(&id) else {
            continue;
        };
        board.selection.forget(id);
        if let Reaction::ReleaseResource(path) = card.receive(CardEvent::Delete) {
            project.resources.release(&path);
        }
        project.ids.release(id);
        removed += 1;
    }
    if removed > 0 {
        reorder(project);
        project.log.push(format!("Deleted {removed} card(s)."));
        commit(project, Change::Edit);
    }
    removed
}

pub fn delete_selected(project: &mut Project) -> usize {
    let ids = project.current_board().selected();
    delete_cards(project, &ids)
}

// ---------------------------------------------------------------------------
// Copy / paste
// ---------------------------------------------------------------------------

/// Copy the selected cards into the project's copy buffer.
pub fn copy_selected(project: &mut Project) -> usize {
    let index = project.board_index();
    let board = project.current_board();
    let records: Vec<_> = board
        .selected()
        .iter()
        .filter_map(|id| board.card(*id))
        .map(|card| card_record::serialize(card, index, false))
        .collect();
    let n = records.len();
    if n > 0 {
        project.copy_buffer = records;
        project.log.push(format!("Copied {n} card(s)."));
    }
    n
}

pub fn cut_selected(project: &mut Project) -> usize {
    if copy_selected(project) == 0 {
        return 0;
    }
    delete_selected(project)
}

/// Paste the copy buffer onto the current board with fresh ids, offset from
/// the originals. The pasted cards become the selection. Repeated pastes
/// keep stepping further out.
pub fn paste(project: &mut Project) -> Vec<CardId> {
    if project.copy_buffer.is_empty() {
        return Vec::new();
    }
    let grid = project.grid_size;
    let offset = PASTE_OFFSET_CELLS * grid;
    let mut records = std::mem::take(&mut project.copy_buffer);
    project.current_board_mut().clear_selection();

    let mut pasted = Vec::with_capacity(records.len());
    for record in &mut records {
        let id = project.ids.allocate();
        let mut card = card_record::deserialize(record, id, grid);
        card.move_by(offset, offset);
        record.insert("Position.X".into(), card.rect.x.into());
        record.insert("Position.Y".into(), card.rect.y.into());
        if let Some(path) = card.content.resource_path() {
            let status = project.resources.request(path);
            card.receive(CardEvent::Resource(status));
        }
        let board = project.current_board_mut();
        board.cards.insert(id, card);
        board.select(id);
        pasted.push(id);
    }
    project.copy_buffer = records;

    reorder(project);
    project.log.push(format!("Pasted {} card(s).", pasted.len()));
    commit(project, Change::Edit);
    pasted
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// Translate cards on the current board, then settle them onto the grid.
pub fn move_cards(project: &mut Project, ids: &[CardId], delta: Vec2) -> usize {
    let board = project.current_board_mut();
    let mut moved = 0;
    for id in ids {
        if let Some(card) = board.card_mut(*id) {
            card.move_by(delta.x, delta.y);
            moved += 1;
        }
    }
    if moved > 0 {
        reorder(project);
        commit(project, Change::Edit);
    }
    moved
}

/// Slide the selection one grid cell. A single numberable card sliding
/// up or down into a numberable neighbour trades places with it instead,
/// which reorders a list without leaving gaps.
pub fn slide_selected(project: &mut Project, direction: Direction) -> bool {
    let grid = project.grid_size;
    let selected = project.current_board().selected();
    if selected.is_empty() {
        return false;
    }

    if let [only] = selected[..]
        && matches!(direction, Direction::Up | Direction::Down)
        && swap_with_neighbor(project.current_board_mut(), only, direction)
    {
        reorder(project);
        commit(project, Change::Edit);
        return true;
    }

    let step = direction.delta().scale(grid);
    move_cards(project, &selected, step) > 0
}

fn swap_with_neighbor(board: &mut Board, id: CardId, direction: Direction) -> bool {
    let Some(card) = board.card(id) else {
        return false;
    };
    if !card.numberable() {
        return false;
    }
    let Some(other_id) = card.neighbor(direction) else {
        return false;
    };
    let Some(other) = board.card(other_id) else {
        return false;
    };
    if !other.numberable() {
        return false;
    }

    let (mine, theirs) = (card.rect, other.rect);
    let (my_y, their_y) = match direction {
        Direction::Up => (theirs.y, theirs.y + mine.h),
        _ => (mine.y + theirs.h, mine.y),
    };
    if let Some(c) = board.card_mut(id) {
        c.rect.y = my_y;
    }
    if let Some(c) = board.card_mut(other_id) {
        c.rect.y = their_y;
    }
    true
}

// ---------------------------------------------------------------------------
// Keyboard selection
// ---------------------------------------------------------------------------

/// The selected card furthest toward `direction`, or the card closest to
/// the camera focus when nothing is selected.
fn anchor(project: &Project, direction: Direction) -> Option<CardId> {
    let board = project.current_board();
    let reach = |r: Rect| match direction {
        Direction::Right => r.right(),
        Direction::Left => -r.x,
        Direction::Down => r.bottom(),
        Direction::Up => -r.y,
    };
    let selected = board.selected();
    if !selected.is_empty() {
        return selected
            .iter()
            .filter_map(|id| board.card(*id))
            .max_by(|a, b| reach(a.rect).total_cmp(&reach(b.rect)))
            .map(|c| c.id);
    }
    let focus = project.camera.focus();
    board
        .cards()
        .min_by(|a, b| {
            a.rect
                .center()
                .distance(focus)
                .total_cmp(&b.rect.center().distance(focus))
        })
        .map(|c| c.id)
}

/// Move the selection to the neighbour in `direction` (or the nearest card
/// that way). With `extend`, the target is added instead.
pub fn select_in_direction(
    project: &mut Project,
    direction: Direction,
    extend: bool,
) -> Option<CardId> {
    let from = anchor(project, direction)?;
    let board = project.current_board();
    let had_selection = !board.selection().is_empty();
    let target = if had_selection {
        board
            .card(from)
            .and_then(|c| c.neighbor(direction))
            .or_else(|| nearest_in_direction(board, from, direction))?
    } else {
        from
    };

    let board = project.current_board_mut();
    if extend {
        board.select(target);
    } else {
        board.select_only(target);
    }
    commit(project, Change::Selection);
    Some(target)
}

/// Follow neighbours in `direction` to the end of the chain and select the
/// last card.
pub fn select_chain_end(project: &mut Project, direction: Direction) -> Option<CardId> {
    let start = anchor(project, direction)?;
    let board = project.current_board();
    let mut seen = HashSet::from([start]);
    let mut end = start;
    while let Some(next) = board.card(end).and_then(|c| c.neighbor(direction)) {
        if !seen.insert(next) {
            break;
        }
        end = next;
    }
    project.current_board_mut().select_only(end);
    commit(project, Change::Selection);
    Some(end)
}

pub fn select_card(project: &mut Project, id: CardId, mode: SelectMode) -> bool {
    let board = project.current_board_mut();
    let changed = match mode {
        SelectMode::Replace => board.select_only(id),
        SelectMode::Add => board.select(id),
        SelectMode::Invert => {
            if !board.contains(id) {
                return false;
            }
            board.toggle_selected(id);
            true
        }
    };
    if changed {
        commit(project, Change::Selection);
    }
    changed
}

pub fn box_select(project: &mut Project, rect: Rect, mode: SelectMode) -> usize {
    let n = project.current_board_mut().select_in_rect(rect, mode);
    commit(project, Change::Selection);
    n
}

pub fn select_all(project: &mut Project) -> usize {
    let n = project.current_board_mut().select_all();
    commit(project, Change::Selection);
    n
}

pub fn deselect_all(project: &mut Project) {
    project.current_board_mut().clear_selection();
    commit(project, Change::Selection);
}

/// Centre the camera on the selection.
pub fn focus_view_on_selected(project: &mut Project) -> bool {
    let Some(bounds) = project.current_board().selection_bounds() else {
        return false;
    };
    project.camera.focus_on(bounds.center());
    commit(project, Change::Camera);
    true
}

// ---------------------------------------------------------------------------
// Drag transaction
// ---------------------------------------------------------------------------

/// Start dragging the selection. Returns how many cards picked up.
pub fn begin_drag(project: &mut Project) -> usize {
    let board = project.current_board_mut();
    let mut n = 0;
    for id in board.selected() {
        if let Some(card) = board.card_mut(id) {
            card.receive(CardEvent::DragStart);
            n += usize::from(card.is_dragging());
        }
    }
    n
}

/// Follow the pointer. Positions are free until the drop.
pub fn drag_by(project: &mut Project, delta: Vec2) {
    for card in project.current_board_mut().cards.values_mut() {
        if card.is_dragging() {
            card.move_by(delta.x, delta.y);
        }
    }
}

/// Drop dragged cards onto the grid and commit the move.
pub fn drop_drag(project: &mut Project) -> usize {
    let grid = project.grid_size;
    let dropped = project
        .current_board_mut()
        .cards
        .values_mut()
        .filter(|c| c.is_dragging())
        .map(|c| c.receive(CardEvent::Dropped { grid }))
        .filter(|r| *r == Reaction::Moved)
        .count();
    if dropped > 0 {
        reorder(project);
        commit(project, Change::Edit);
    }
    dropped
}

/// Escape during a drag: every card returns to where it was picked up and
/// nothing is committed.
pub fn cancel_drag(project: &mut Project) -> usize {
    let restored = project
        .current_board_mut()
        .cards
        .values_mut()
        .map(|c| c.receive(CardEvent::DragCancelled))
        .filter(|r| *r == Reaction::Moved)
        .count();
    if restored > 0 {
        reorder(project);
    }
    restored
}

// ---------------------------------------------------------------------------
// Card edits
// ---------------------------------------------------------------------------

fn card_on_board(project: &mut Project, id: CardId) -> Result<&mut Card, ProjectError> {
    project
        .current_board_mut()
        .card_mut(id)
        .ok_or(ProjectError::CardNotFound(id))
}

/// Mark every selected completable card complete, or all incomplete if they
/// already are.
pub fn toggle_completion_selected(project: &mut Project) -> usize {
    let board = project.current_board_mut();
    let targets: Vec<CardId> = board
        .selected()
        .into_iter()
        .filter(|id| board.card(*id).is_some_and(|c| c.completable()))
        .collect();
    if targets.is_empty() {
        return 0;
    }
    let all_done = targets
        .iter()
        .all(|id| board.card(*id).is_some_and(|c| c.own_completion().ratio() >= 1.0));
    for id in &targets {
        if let Some(card) = board.card_mut(*id) {
            card.set_completion(!all_done);
        }
    }
    reorder(project);
    commit(project, Change::Edit);
    targets.len()
}

pub fn set_completion(project: &mut Project, id: CardId, complete: bool) -> Result<(), ProjectError> {
    let card = card_on_board(project, id)?;
    if !card.completable() {
        return Err(ProjectError::WrongKind(id, "completion"));
    }
    card.set_completion(complete);
    reorder(project);
    commit(project, Change::Edit);
    Ok(())
}

/// Open a card's editor; it becomes the only selected card.
pub fn open_card(project: &mut Project, id: CardId) -> Result<(), ProjectError> {
    card_on_board(project, id)?.receive(CardEvent::DoubleClick);
    project.current_board_mut().select_only(id);
    Ok(())
}

/// Close a card's editor, tidying its content and reloading its resource if
/// the path changed.
pub fn close_card(project: &mut Project, id: CardId) -> Result<(), ProjectError> {
    let grid = project.grid_size;
    let card = card_on_board(project, id)?;
    let before = card.content.resource_path().map(str::to_string);
    if card.receive(CardEvent::Close) != Reaction::Closed {
        return Ok(());
    }
    card.fit_to_content(grid);
    let after = card.content.resource_path().map(str::to_string);
    if before != after {
        rebind_resource(project, id, before.as_deref(), after.as_deref());
    }
    reorder(project);
    commit(project, Change::Edit);
    Ok(())
}

/// Primary action on a card: tick, count, start/stop a timer, play/stop.
pub fn activate_card(
    project: &mut Project,
    id: CardId,
    now: DateTime<Utc>,
) -> Result<Reaction, ProjectError> {
    let reaction = card_on_board(project, id)?.receive(CardEvent::Activate { now });
    if reaction == Reaction::Toggled {
        reorder(project);
        commit(project, Change::Edit);
    }
    Ok(reaction)
}

pub fn set_card_text(project: &mut Project, id: CardId, text: &str) -> Result<(), ProjectError> {
    let grid = project.grid_size;
    let card = card_on_board(project, id)?;
    if !card.content.set_text(text) {
        return Err(ProjectError::WrongKind(id, "text"));
    }
    card.fit_to_content(grid);
    reorder(project);
    commit(project, Change::Edit);
    Ok(())
}

/// Point an image or sound card at a new file or URL.
pub fn set_card_path(project: &mut Project, id: CardId, path: &str) -> Result<(), ProjectError> {
    use crate::model::card::CardContent;

    let card = card_on_board(project, id)?;
    let before = card.content.resource_path().map(str::to_string);
    match &mut card.content {
        CardContent::Image { path: p } | CardContent::Sound { path: p, .. } => {
            *p = path.trim().to_string();
        }
        _ => return Err(ProjectError::WrongKind(id, "file path")),
    }
    let after = card.content.resource_path().map(str::to_string);
    rebind_resource(project, id, before.as_deref(), after.as_deref());
    commit(project, Change::Edit);
    Ok(())
}

/// Swap the cached resource a card holds.
pub(crate) fn rebind_resource(
    project: &mut Project,
    id: CardId,
    before: Option<&str>,
    after: Option<&str>,
) {
    if let Some(old) = before {
        project.resources.release(old);
    }
    let status = match after {
        Some(new) => project.resources.request(new),
        None => Default::default(),
    };
    if let Some(card) = project.current_board_mut().card_mut(id) {
        card.receive(CardEvent::Resource(status));
    }
}
