use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::board::Board;
use super::camera::Camera;
use super::card::{Card, CardId};
use super::event_log::EventLog;
use super::ids::IdAllocator;
use super::settings::ProjectSettings;
use crate::io::resources::{AssetLoader, ResourceCache};

/// Pixels per grid cell for new plans.
pub const DEFAULT_GRID_SIZE: f32 = 16.0;

/// Kind of mutation reported to the change policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Cards created, deleted, moved, dropped, closed or edited.
    Edit,
    /// Selection membership changed.
    Selection,
    /// Boards added, removed, renamed or reordered.
    Boards,
    Settings,
    /// Pan or zoom. Saved under auto-save but never marks the plan modified.
    Camera,
}

impl Change {
    pub fn is_significant(self) -> bool {
        !matches!(self, Change::Camera)
    }
}

/// Results of the last search and the hit currently focused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    /// `(board index, card id)` in board order.
    pub hits: Vec<(usize, CardId)>,
    pub cursor: usize,
}

impl SearchState {
    pub fn current(&self) -> Option<(usize, CardId)> {
        self.hits.get(self.cursor).copied()
    }
}

/// An open plan: its boards, view and settings.
#[derive(Debug)]
pub struct Project {
    /// Where the plan is saved; `None` until the first save-as.
    pub file_path: Option<PathBuf>,
    pub(crate) boards: Vec<Board>,
    board_index: usize,
    pub grid_size: f32,
    pub camera: Camera,
    pub settings: ProjectSettings,
    pub(crate) modified: bool,
    /// Set by a load; the first tick fits card sizes, reorders and clears it.
    pub(crate) just_loaded: bool,
    pub(crate) ids: IdAllocator,
    /// Serialized copies of the last copied cards.
    pub(crate) copy_buffer: Vec<Map<String, Value>>,
    pub resources: ResourceCache,
    pub log: EventLog,
    pub(crate) search: SearchState,
    save_count: usize,
}

impl Default for Project {
    fn default() -> Self {
        Project::new()
    }
}

impl Project {
    pub fn new() -> Self {
        Project::with_resources(ResourceCache::default())
    }

    /// A fresh plan whose images and sounds are loaded through `loader`.
    pub fn with_loader(loader: Arc<dyn AssetLoader>) -> Self {
        Project::with_resources(ResourceCache::new(loader))
    }

    fn with_resources(resources: ResourceCache) -> Self {
        Project {
            file_path: None,
            boards: vec![Board::new(default_board_name(0))],
            board_index: 0,
            grid_size: DEFAULT_GRID_SIZE,
            camera: Camera::default(),
            settings: ProjectSettings::default(),
            modified: false,
            just_loaded: false,
            ids: IdAllocator::new(),
            copy_buffer: Vec::new(),
            resources,
            log: EventLog::new(),
            search: SearchState::default(),
            save_count: 0,
        }
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn board(&self, index: usize) -> Option<&Board> {
        self.boards.get(index)
    }

    pub fn board_mut(&mut self, index: usize) -> Option<&mut Board> {
        self.boards.get_mut(index)
    }

    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    pub fn board_index(&self) -> usize {
        self.board_index
    }

    pub fn current_board(&self) -> &Board {
        &self.boards[self.board_index]
    }

    pub fn current_board_mut(&mut self) -> &mut Board {
        &mut self.boards[self.board_index]
    }

    /// Point the active index at `index`, clamped into range. Keeps at
    /// least one board in existence.
    pub(crate) fn set_board_index(&mut self, index: usize) {
        self.ensure_board();
        self.board_index = index.min(self.boards.len() - 1);
    }

    pub(crate) fn ensure_board(&mut self) {
        if self.boards.is_empty() {
            self.boards.push(Board::new(default_board_name(0)));
        }
        if self.board_index >= self.boards.len() {
            self.board_index = self.boards.len() - 1;
        }
    }

    /// Find a card on any board.
    pub fn find_card(&self, id: CardId) -> Option<(usize, &Card)> {
        self.boards
            .iter()
            .enumerate()
            .find_map(|(i, b)| b.card(id).map(|c| (i, c)))
    }

    /// Every card with its board index, board by board.
    pub fn all_cards(&self) -> impl Iterator<Item = (usize, &Card)> {
        self.boards
            .iter()
            .enumerate()
            .flat_map(|(i, b)| b.cards().map(move |c| (i, c)))
    }

    pub fn card_count(&self) -> usize {
        self.boards.iter().map(Board::len).sum()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn just_loaded(&self) -> bool {
        self.just_loaded
    }

    /// Successful saves since the project was created.
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    pub(crate) fn record_save(&mut self) {
        self.save_count += 1;
        self.modified = false;
    }

    pub fn copied_count(&self) -> usize {
        self.copy_buffer.len()
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    /// File name shown in titles, or "New Plan".
    pub fn display_name(&self) -> String {
        self.file_path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "New Plan".to_string())
    }
}

/// Name given to the board at `index` when none is stored.
pub fn default_board_name(index: usize) -> String {
    format!("Board {}", index + 1)
}
