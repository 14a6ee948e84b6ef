use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::board_ops::{cancel_drag, rebind_resource, reorder, spawn_card};
use crate::io::plan_io;
use crate::io::resources::{classify, is_remote};
use crate::model::board::Board;
use crate::model::card::{AssetKind, CardContent, CardEvent, CardId, CardKind, Reaction};
use crate::model::geometry::Vec2;
use crate::model::project::{Change, Project, default_board_name};
use crate::model::settings::{DEFAULT_THEME, ProjectSettings};

/// Error type for board and card operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("card {0} is not on the current board")]
    CardNotFound(CardId),
    #[error("board {0} does not exist")]
    BoardNotFound(usize),
    #[error("can't create a new board while an empty board exists")]
    EmptyBoardExists,
    #[error("can't remove the last board")]
    LastBoard,
    #[error("board name cannot be empty")]
    EmptyName,
    #[error("card {0} has no {1}")]
    WrongKind(CardId, &'static str),
}

/// Apply the change policy: with auto-save on (and a file to save to) every
/// change saves immediately; otherwise significant changes mark the plan
/// modified. Camera changes never mark it modified.
pub fn commit(project: &mut Project, change: Change) {
    if project.settings.auto_save && project.file_path.is_some() {
        if plan_io::save(project).is_err() && change.is_significant() {
            project.modified = true;
        }
    } else if change.is_significant() {
        project.modified = true;
    }
}

// ---------------------------------------------------------------------------
// Boards
// ---------------------------------------------------------------------------

/// Add a board and switch to it. Refused while any board is empty.
pub fn new_board(project: &mut Project) -> Result<usize, ProjectError> {
    if project.boards().iter().any(Board::is_empty) {
        project
            .log
            .push("Can't create new Board while an empty Board exists.");
        return Err(ProjectError::EmptyBoardExists);
    }
    let index = project.board_count();
    project.boards.push(Board::new(default_board_name(index)));
    switch_board(project, index)?;
    project.log.push(format!("New Board {} created.", index + 1));
    commit(project, Change::Boards);
    Ok(index)
}

/// Make `index` the active board. The previous board's selection and any
/// drag in progress are dropped, then empty boards other than the new one
/// are removed.
pub fn switch_board(project: &mut Project, index: usize) -> Result<(), ProjectError> {
    if index >= project.board_count() {
        return Err(ProjectError::BoardNotFound(index));
    }
    if index != project.board_index() {
        cancel_drag(project);
        project.current_board_mut().clear_selection();
        project.set_board_index(index);
        let name = project.current_board().name.clone();
        project.log.push(format!("Switched to Board: {name}."));
    }
    remove_empty_boards(project);
    Ok(())
}

/// Remove every empty board except the active one. The last board always
/// stays. Returns how many were removed.
pub fn remove_empty_boards(project: &mut Project) -> usize {
    let mut removed = 0;
    let mut i = 0;
    while i < project.boards.len() {
        let active = project.board_index();
        if project.boards.len() > 1 && i != active && project.boards[i].is_empty() {
            let board = project.boards.remove(i);
            if i < active {
                project.set_board_index(active - 1);
            }
            project.log.push(format!("Deleted empty Board: {}", board.name));
            removed += 1;
        } else {
            i += 1;
        }
    }
    removed
}

pub fn rename_board(project: &mut Project, index: usize, name: &str) -> Result<(), ProjectError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProjectError::EmptyName);
    }
    let board = project
        .board_mut(index)
        .ok_or(ProjectError::BoardNotFound(index))?;
    board.name = name.to_string();
    commit(project, Change::Boards);
    Ok(())
}

/// Swap a board with the one above (`up`) or below it. Returns its new
/// index; a board already at the edge stays put.
pub fn move_board(project: &mut Project, index: usize, up: bool) -> Result<usize, ProjectError> {
    let count = project.board_count();
    if index >= count {
        return Err(ProjectError::BoardNotFound(index));
    }
    let target = match (up, index) {
        (true, 0) => return Ok(index),
        (true, i) => i - 1,
        (false, i) if i + 1 >= count => return Ok(index),
        (false, i) => i + 1,
    };
    project.boards.swap(index, target);
    let active = project.board_index();
    if active == index {
        project.set_board_index(target);
    } else if active == target {
        project.set_board_index(index);
    }
    let name = project.boards[target].name.clone();
    let way = if up { "up" } else { "down" };
    project.log.push(format!("Moved Board {name} {way}."));
    commit(project, Change::Boards);
    Ok(target)
}

/// Delete a board and everything on it.
pub fn remove_board(project: &mut Project, index: usize) -> Result<(), ProjectError> {
    let count = project.board_count();
    if index >= count {
        return Err(ProjectError::BoardNotFound(index));
    }
    if count == 1 {
        return Err(ProjectError::LastBoard);
    }
    let active = project.board_index();
    if active == index {
        cancel_drag(project);
    }
    let mut board = project.boards.remove(index);
    for (id, mut card) in board.cards.drain(..) {
        if let Reaction::ReleaseResource(path) = card.receive(CardEvent::Delete) {
            project.resources.release(&path);
        }
        project.ids.release(id);
    }
    if index < active || active >= project.board_count() {
        project.set_board_index(active.saturating_sub(1));
    }
    project.log.push(format!("Deleted Board: {}", board.name));
    commit(project, Change::Boards);
    Ok(())
}

// ---------------------------------------------------------------------------
// Content arriving from outside
// ---------------------------------------------------------------------------

/// Card kind for a path or URL naming an image or sound, if it does.
fn resource_kind(source: &str) -> Option<CardKind> {
    let kind = classify(source)?;
    if !is_remote(source) && !Path::new(source).is_file() {
        return None;
    }
    Some(match kind {
        AssetKind::Image | AssetKind::Gif => CardKind::Image,
        AssetKind::Audio => CardKind::Sound,
    })
}

/// Create one card for `source` at `center`: an image or sound card for
/// media files and URLs, a note holding the text otherwise.
fn spawn_for_source(project: &mut Project, source: &str, center: Vec2) -> CardId {
    let grid = project.grid_size;
    match resource_kind(source) {
        Some(kind) => {
            let id = spawn_card(project, kind, center);
            if let Some(card) = project.current_board_mut().card_mut(id) {
                match &mut card.content {
                    CardContent::Image { path } | CardContent::Sound { path, .. } => {
                        *path = source.to_string();
                    }
                    _ => {}
                }
            }
            rebind_resource(project, id, None, Some(source));
            id
        }
        None => {
            let id = spawn_card(project, CardKind::Note, center);
            if let Some(card) = project.current_board_mut().card_mut(id) {
                card.content.set_text(source);
                card.fit_to_content(grid);
            }
            id
        }
    }
}

/// Paste clipboard text at the camera focus.
pub fn paste_content(project: &mut Project, text: &str) -> Option<CardId> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let focus = project.camera.focus();
    let id = spawn_for_source(project, text, focus);
    reorder(project);
    commit(project, Change::Edit);
    Some(id)
}

/// Files dropped onto the window become cards around the camera focus.
pub fn drop_files(project: &mut Project, paths: &[PathBuf]) -> Vec<CardId> {
    let focus = project.camera.focus();
    let ids: Vec<CardId> = paths
        .iter()
        .map(|p| spawn_for_source(project, &p.to_string_lossy(), focus))
        .collect();
    if !ids.is_empty() {
        let board = project.current_board_mut();
        board.clear_selection();
        for id in &ids {
            board.select(*id);
        }
        reorder(project);
        project.log.push(format!("Dropped {} file(s).", ids.len()));
        commit(project, Change::Edit);
    }
    ids
}

// ---------------------------------------------------------------------------
// Settings, theme, camera
// ---------------------------------------------------------------------------

/// Stop every playing sound card on every board.
pub fn stop_all_sounds(project: &mut Project) -> usize {
    let mut stopped = 0;
    for card in project.boards.iter_mut().flat_map(|b| b.cards.values_mut()) {
        if card.stop_sound() {
            stopped += 1;
        }
    }
    if stopped > 0 {
        project.log.push(format!("Stopped {stopped} sound(s)."));
        if project.settings.save_sounds_playing {
            commit(project, Change::Edit);
        }
    }
    stopped
}

/// Switch to theme `name`, or to the first available theme if it is not one
/// of `available`. Returns the theme now in use.
pub fn change_theme(project: &mut Project, name: &str, available: &[&str]) -> String {
    let chosen = if available.contains(&name) {
        name
    } else {
        available.first().copied().unwrap_or(DEFAULT_THEME)
    };
    if project.settings.theme != chosen {
        project.settings.theme = chosen.to_string();
        project.log.push(format!("Theme changed to {chosen}."));
        commit(project, Change::Settings);
    }
    chosen.to_string()
}

/// Edit the plan's settings, then renumber (the style may have changed).
pub fn update_settings(project: &mut Project, edit: impl FnOnce(&mut ProjectSettings)) {
    edit(&mut project.settings);
    reorder(project);
    commit(project, Change::Settings);
}

pub fn pan_camera(project: &mut Project, delta: Vec2) {
    project.camera.pan_by(delta);
    commit(project, Change::Camera);
}

pub fn zoom_camera(project: &mut Project, steps: i64) {
    let before = project.camera.zoom_level();
    project.camera.zoom_by(steps);
    if project.camera.zoom_level() != before {
        commit(project, Change::Camera);
    }
}

// ---------------------------------------------------------------------------
// Update tick
// ---------------------------------------------------------------------------

/// First-tick work after a load: size cards to their content, run the
/// recompute pass once and start out unmodified.
pub fn finish_load(project: &mut Project) {
    let grid = project.grid_size;
    for board in &mut project.boards {
        for card in board.cards.values_mut() {
            card.fit_to_content(grid);
        }
    }
    reorder(project);
    project.camera.settle();
    project.just_loaded = false;
    project.modified = false;
}

/// One update tick: camera easing, finished resource loads, timers, the
/// deferred post-load pass and empty-board cleanup, in that order.
pub fn tick(project: &mut Project, now: DateTime<Utc>) {
    project.camera.tick();

    for (source, status) in project.resources.drain() {
        for board in &mut project.boards {
            for card in board.cards.values_mut() {
                if card.content.resource_path() == Some(source.as_str()) {
                    card.receive(CardEvent::Resource(status.clone()));
                }
            }
        }
    }

    let mut fired = Vec::new();
    for board in &mut project.boards {
        for card in board.cards.values_mut() {
            if let Reaction::TimerFired(name) = card.receive(CardEvent::Tick { now }) {
                fired.push(name);
            }
        }
    }
    for name in &fired {
        project.log.push(format!("Timer {name} went off."));
    }

    if project.just_loaded {
        finish_load(project);
    } else if !fired.is_empty() {
        commit(project, Change::Edit);
    }

    remove_empty_boards(project);
}
