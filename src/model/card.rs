use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use super::geometry::{Rect, Vec2, snap_point};
use super::settings::NumberingStyle;

/// Stable card identity, unique within a project and preserved across save/load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the four axis directions used by adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit step in world space (y grows downward).
    pub fn delta(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }

    /// Direction of a step; the dominant axis wins, a zero step has none.
    pub fn from_delta(dx: f32, dy: f32) -> Option<Direction> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        if dx.abs() >= dy.abs() {
            Some(if dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            })
        } else {
            Some(if dy > 0.0 {
                Direction::Down
            } else {
                Direction::Up
            })
        }
    }
}

/// Cached adjacency. Non-owning: ids into the board's arena, recomputed after
/// every structural or positional change and never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub above: Option<CardId>,
    pub below: Option<CardId>,
    pub left: Option<CardId>,
    pub right: Option<CardId>,
}

impl Neighbors {
    pub fn get(&self, direction: Direction) -> Option<CardId> {
        match direction {
            Direction::Up => self.above,
            Direction::Down => self.below,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    pub fn set(&mut self, direction: Direction, id: Option<CardId>) {
        match direction {
            Direction::Up => self.above = id,
            Direction::Down => self.below = id,
            Direction::Left => self.left = id,
            Direction::Right => self.right = id,
        }
    }
}

/// Closed set of card content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardKind {
    Checkbox,
    Numbered,
    Note,
    Image,
    Sound,
    Timer,
    Map,
}

impl CardKind {
    pub const ALL: [CardKind; 7] = [
        CardKind::Checkbox,
        CardKind::Numbered,
        CardKind::Note,
        CardKind::Image,
        CardKind::Sound,
        CardKind::Timer,
        CardKind::Map,
    ];

    /// Name written to the plan file.
    pub fn name(self) -> &'static str {
        match self {
            CardKind::Checkbox => "Checkbox",
            CardKind::Numbered => "Numbered",
            CardKind::Note => "Note",
            CardKind::Image => "Image",
            CardKind::Sound => "Sound",
            CardKind::Timer => "Timer",
            CardKind::Map => "Map",
        }
    }

    /// Parse a kind name, accepting the older "Check Box"/"Progression" spellings.
    pub fn parse_kind(s: &str) -> Option<CardKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checkbox" | "check box" => Some(CardKind::Checkbox),
            "numbered" | "progression" => Some(CardKind::Numbered),
            "note" => Some(CardKind::Note),
            "image" => Some(CardKind::Image),
            "sound" => Some(CardKind::Sound),
            "timer" => Some(CardKind::Timer),
            "map" => Some(CardKind::Map),
            _ => None,
        }
    }

    pub fn numberable(self) -> bool {
        matches!(self, CardKind::Checkbox | CardKind::Numbered)
    }

    pub fn completable(self) -> bool {
        matches!(self, CardKind::Checkbox | CardKind::Numbered)
    }

    /// Size of a freshly created card of this kind.
    pub fn default_size(self, grid: f32) -> Vec2 {
        match self {
            CardKind::Image => Vec2::new(grid * 8.0, grid * 8.0),
            CardKind::Map => Vec2::new(
                grid * DEFAULT_MAP_SIZE as f32,
                grid * DEFAULT_MAP_SIZE as f32,
            ),
            _ => Vec2::new(grid * 8.0, grid * 2.0),
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const DEFAULT_MAP_SIZE: u32 = 8;

/// Largest map edge, in cells. Plan files asking for more are clamped.
pub const MAX_MAP_SIZE: u32 = 256;

/// Countdown timer payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerContent {
    pub name: String,
    pub minutes: u32,
    pub seconds: u32,
    /// Set while the timer is running.
    pub started_at: Option<DateTime<Utc>>,
}

impl TimerContent {
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.minutes as i64 * 60 + self.seconds as i64)
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Time left at `now`; the full duration when stopped.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.started_at {
            Some(start) => {
                let left = self.duration() - (now - start);
                if left < Duration::zero() {
                    Duration::zero()
                } else {
                    left
                }
            }
            None => self.duration(),
        }
    }

    /// Carry whole minutes out of the seconds field.
    fn normalize(&mut self) {
        self.minutes += self.seconds / 60;
        self.seconds %= 60;
    }
}

/// A small cell grid drawn on a map card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapContent {
    cols: u32,
    rows: u32,
    cells: Vec<bool>,
}

impl MapContent {
    /// Dimensions are clamped to `1..=MAX_MAP_SIZE`.
    pub fn new(cols: u32, rows: u32) -> Self {
        let cols = cols.clamp(1, MAX_MAP_SIZE);
        let rows = rows.clamp(1, MAX_MAP_SIZE);
        MapContent {
            cols,
            rows,
            cells: vec![false; cols as usize * rows as usize],
        }
    }

    fn index(&self, col: u32, row: u32) -> Option<usize> {
        (col < self.cols && row < self.rows)
            .then(|| row as usize * self.cols as usize + col as usize)
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn get(&self, col: u32, row: u32) -> bool {
        self.index(col, row)
            .and_then(|i| self.cells.get(i))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, col: u32, row: u32, filled: bool) {
        if let Some(cell) = self.index(col, row).and_then(|i| self.cells.get_mut(i)) {
            *cell = filled;
        }
    }

    pub fn toggle(&mut self, col: u32, row: u32) {
        let filled = self.get(col, row);
        self.set(col, row, !filled);
    }

    /// Resize, keeping cells that still fit.
    pub fn resize(&mut self, cols: u32, rows: u32) {
        let mut resized = MapContent::new(cols, rows);
        for row in 0..self.rows.min(resized.rows) {
            for col in 0..self.cols.min(resized.cols) {
                resized.set(col, row, self.get(col, row));
            }
        }
        *self = resized;
    }

    /// Rows as `#` (filled) / `.` (empty) strings.
    pub fn to_rows(&self) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| if self.get(col, row) { '#' } else { '.' })
                    .collect()
            })
            .collect()
    }

    /// Build from `#`/`.` rows; ragged rows are padded, other characters read as empty.
    pub fn from_rows(cols: u32, rows: u32, data: &[String]) -> Self {
        let mut map = MapContent::new(cols, rows);
        for (row, line) in data.iter().enumerate().take(map.rows as usize) {
            for (col, ch) in line.chars().enumerate().take(map.cols as usize) {
                map.set(col as u32, row as u32, ch == '#');
            }
        }
        map
    }
}

/// Content payload, one variant per [`CardKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum CardContent {
    Checkbox { text: String, checked: bool },
    Numbered { text: String, current: u32, max: u32 },
    Note { text: String },
    Image { path: String },
    Sound { path: String, playing: bool },
    Timer(TimerContent),
    Map(MapContent),
}

impl CardContent {
    /// Default payload for a new card of `kind`.
    pub fn new(kind: CardKind) -> Self {
        match kind {
            CardKind::Checkbox => CardContent::Checkbox {
                text: String::new(),
                checked: false,
            },
            CardKind::Numbered => CardContent::Numbered {
                text: String::new(),
                current: 0,
                max: 1,
            },
            CardKind::Note => CardContent::Note {
                text: String::new(),
            },
            CardKind::Image => CardContent::Image {
                path: String::new(),
            },
            CardKind::Sound => CardContent::Sound {
                path: String::new(),
                playing: false,
            },
            CardKind::Timer => CardContent::Timer(TimerContent {
                name: String::new(),
                minutes: 1,
                seconds: 0,
                started_at: None,
            }),
            CardKind::Map => CardContent::Map(MapContent::new(DEFAULT_MAP_SIZE, DEFAULT_MAP_SIZE)),
        }
    }

    pub fn kind(&self) -> CardKind {
        match self {
            CardContent::Checkbox { .. } => CardKind::Checkbox,
            CardContent::Numbered { .. } => CardKind::Numbered,
            CardContent::Note { .. } => CardKind::Note,
            CardContent::Image { .. } => CardKind::Image,
            CardContent::Sound { .. } => CardKind::Sound,
            CardContent::Timer(_) => CardKind::Timer,
            CardContent::Map(_) => CardKind::Map,
        }
    }

    /// Free text shown on the card, if the kind has any.
    pub fn text(&self) -> Option<&str> {
        match self {
            CardContent::Checkbox { text, .. }
            | CardContent::Numbered { text, .. }
            | CardContent::Note { text } => Some(text),
            CardContent::Timer(timer) => Some(&timer.name),
            _ => None,
        }
    }

    /// Replace the text; returns false for kinds without text.
    pub fn set_text(&mut self, value: &str) -> bool {
        match self {
            CardContent::Checkbox { text, .. }
            | CardContent::Numbered { text, .. }
            | CardContent::Note { text } => {
                *text = value.to_string();
                true
            }
            CardContent::Timer(timer) => {
                timer.name = value.to_string();
                true
            }
            _ => false,
        }
    }

    /// File path or URL of an image/sound resource.
    pub fn resource_path(&self) -> Option<&str> {
        match self {
            CardContent::Image { path } | CardContent::Sound { path, .. } if !path.is_empty() => {
                Some(path)
            }
            _ => None,
        }
    }
}

/// Completion amount of a card: `level` out of `max`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Completion {
    pub level: f32,
    pub max: f32,
}

impl Completion {
    /// Completion scaled to `0.0..=1.0`; zero when nothing is completable.
    pub fn ratio(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.level / self.max).clamp(0.0, 1.0)
        }
    }
}

/// Broad class of a loaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Gif,
    Audio,
}

/// Load state of a card's image or sound resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResourceStatus {
    #[default]
    None,
    Loading,
    Ready(AssetKind),
    Failed(String),
}

/// Typed events delivered to cards.
#[derive(Debug, Clone, PartialEq)]
pub enum CardEvent {
    /// Sent only by [`Selection`](super::selection::Selection).
    Selected,
    /// Sent only by [`Selection`](super::selection::Selection).
    Deselected,
    DragStart,
    Dropped { grid: f32 },
    DragCancelled,
    DoubleClick,
    /// Primary action (tick a checkbox, advance a counter, start a timer, play a sound).
    Activate { now: DateTime<Utc> },
    Close,
    Delete,
    Neighbors(Neighbors),
    Numbering {
        prefix: Option<Vec<usize>>,
        style: NumberingStyle,
        ignore_top_level: bool,
        aggregate: Option<Completion>,
    },
    Tick { now: DateTime<Utc> },
    Resource(ResourceStatus),
}

/// What a card did in response to an event, for the owner to act on.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reaction {
    #[default]
    None,
    Moved,
    Opened,
    Closed,
    Toggled,
    TimerFired(String),
    /// The card no longer needs the resource at this path.
    ReleaseResource(String),
}

/// A positioned, typed unit on a board.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,
    /// World-space rectangle; the position is grid aligned once placed.
    pub rect: Rect,
    pub content: CardContent,

    // --- Derived / transient, never persisted ---
    neighbors: Neighbors,
    selected: bool,
    open: bool,
    drag_origin: Option<Vec2>,
    prefix: Option<Vec<usize>>,
    label: String,
    aggregate: Option<Completion>,
    resource: ResourceStatus,
}

impl Card {
    pub fn new(id: CardId, content: CardContent, rect: Rect) -> Self {
        Card {
            id,
            rect,
            content,
            neighbors: Neighbors::default(),
            selected: false,
            open: false,
            drag_origin: None,
            prefix: None,
            label: String::new(),
            aggregate: None,
            resource: ResourceStatus::None,
        }
    }

    /// A card of `kind` with default content and size at the origin.
    pub fn with_kind(id: CardId, kind: CardKind, grid: f32) -> Self {
        let size = kind.default_size(grid);
        Card::new(id, CardContent::new(kind), Rect::new(0.0, 0.0, size.x, size.y))
    }

    pub fn kind(&self) -> CardKind {
        self.content.kind()
    }

    pub fn position(&self) -> Vec2 {
        self.rect.position()
    }

    /// Translate by a delta. No grid alignment is applied here.
    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.rect.translate(Vec2::new(dx, dy));
    }

    /// Reposition so the rectangle's centre sits on `point`.
    pub fn set_center(&mut self, point: Vec2) {
        self.rect.x = point.x - self.rect.w / 2.0;
        self.rect.y = point.y - self.rect.h / 2.0;
    }

    pub fn numberable(&self) -> bool {
        self.kind().numberable()
    }

    pub fn completable(&self) -> bool {
        self.kind().completable()
    }

    /// Completion of the card's own payload, ignoring any children.
    pub fn own_completion(&self) -> Completion {
        match &self.content {
            CardContent::Checkbox { checked, .. } => Completion {
                level: if *checked { 1.0 } else { 0.0 },
                max: 1.0,
            },
            CardContent::Numbered { current, max, .. } => Completion {
                level: (*current).min(*max) as f32,
                max: *max as f32,
            },
            _ => Completion::default(),
        }
    }

    /// Completion of this card; a card with numbered children reports the
    /// aggregate of its children instead of its own payload.
    pub fn completion(&self) -> Completion {
        self.aggregate.unwrap_or_else(|| self.own_completion())
    }

    pub fn completion_level(&self) -> f32 {
        self.completion().level
    }

    pub fn maximum_completion_level(&self) -> f32 {
        self.completion().max
    }

    pub fn is_complete(&self) -> bool {
        let c = self.completion();
        self.completable() && c.max > 0.0 && c.level >= c.max
    }

    /// Mark the card's own payload complete or incomplete. No-op for kinds
    /// that cannot complete.
    pub fn set_completion(&mut self, complete: bool) {
        match &mut self.content {
            CardContent::Checkbox { checked, .. } => *checked = complete,
            CardContent::Numbered { current, max, .. } => {
                *current = if complete { *max } else { 0 };
            }
            _ => {}
        }
    }

    pub fn neighbors(&self) -> Neighbors {
        self.neighbors
    }

    pub fn neighbor(&self, direction: Direction) -> Option<CardId> {
        self.neighbors.get(direction)
    }

    /// Adjacent card one grid step away in the direction of `(dx, dy)`.
    pub fn neighbor_in_direction(&self, dx: f32, dy: f32) -> Option<CardId> {
        Direction::from_delta(dx, dy).and_then(|d| self.neighbor(d))
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// True while the card's editor is open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    /// Numbering prefix from the last numbering pass, e.g. `[1, 2]`.
    pub fn numbering(&self) -> Option<&[usize]> {
        self.prefix.as_deref()
    }

    /// Rendered numbering label, empty when unnumbered.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn resource(&self) -> &ResourceStatus {
        &self.resource
    }

    /// Grow text cards to fit their text and size map cards to their grid.
    /// Returns true if the rectangle changed.
    pub fn fit_to_content(&mut self, grid: f32) -> bool {
        let before = self.rect;
        let default = self.kind().default_size(grid);
        match &self.content {
            CardContent::Checkbox { text, .. }
            | CardContent::Numbered { text, .. }
            | CardContent::Note { text } => {
                let columns = text.lines().map(|l| l.width()).max().unwrap_or(0) as f32;
                let line_count = text.lines().count().max(1) as f32;
                // Half a grid cell per column, plus two cells for the checkbox and margins.
                let text_w = ((columns * grid / 2.0 + grid * 2.0) / grid).ceil() * grid;
                self.rect.w = default.x.max(text_w);
                self.rect.h = default.y.max(line_count * grid);
            }
            CardContent::Map(map) => {
                self.rect.w = map.cols() as f32 * grid;
                self.rect.h = map.rows() as f32 * grid;
            }
            _ => {}
        }
        self.rect != before
    }

    /// Handle an event. Common state is updated first, then the content
    /// type's own handler runs.
    pub(crate) fn receive(&mut self, event: CardEvent) -> Reaction {
        match event {
            CardEvent::Selected => {
                self.selected = true;
                Reaction::None
            }
            CardEvent::Deselected => {
                self.selected = false;
                Reaction::None
            }
            CardEvent::DragStart => {
                if self.selected {
                    self.drag_origin = Some(self.position());
                }
                Reaction::None
            }
            CardEvent::Dropped { grid } => match self.drag_origin.take() {
                Some(_) => {
                    let before = self.position();
                    let snapped = snap_point(before, grid);
                    self.rect.x = snapped.x;
                    self.rect.y = snapped.y;
                    Reaction::Moved
                }
                None => Reaction::None,
            },
            CardEvent::DragCancelled => match self.drag_origin.take() {
                Some(origin) => {
                    self.rect.x = origin.x;
                    self.rect.y = origin.y;
                    Reaction::Moved
                }
                None => Reaction::None,
            },
            CardEvent::DoubleClick => {
                self.open = true;
                Reaction::Opened
            }
            CardEvent::Close => {
                if !self.open {
                    return Reaction::None;
                }
                self.open = false;
                self.close_content();
                Reaction::Closed
            }
            CardEvent::Neighbors(neighbors) => {
                self.neighbors = neighbors;
                Reaction::None
            }
            CardEvent::Numbering {
                prefix,
                style,
                ignore_top_level,
                aggregate,
            } => {
                self.label = prefix
                    .as_deref()
                    .map(|p| style.format(p, ignore_top_level))
                    .unwrap_or_default();
                self.prefix = prefix;
                self.aggregate = aggregate;
                Reaction::None
            }
            CardEvent::Resource(status) => {
                self.resource = status;
                Reaction::None
            }
            CardEvent::Activate { now } => self.activate_content(now),
            CardEvent::Delete => self.delete_content(),
            CardEvent::Tick { now } => self.tick_content(now),
        }
    }

    fn close_content(&mut self) {
        match &mut self.content {
            CardContent::Checkbox { text, .. }
            | CardContent::Numbered { text, .. }
            | CardContent::Note { text } => {
                let trimmed = text.trim_end().len();
                text.truncate(trimmed);
            }
            CardContent::Timer(timer) => timer.normalize(),
            CardContent::Image { path } | CardContent::Sound { path, .. } => {
                *path = path.trim().to_string();
            }
            CardContent::Map(_) => {}
        }
        if let CardContent::Numbered { current, max, .. } = &mut self.content {
            *current = (*current).min(*max);
        }
    }

    fn activate_content(&mut self, now: DateTime<Utc>) -> Reaction {
        match &mut self.content {
            CardContent::Checkbox { checked, .. } => {
                *checked = !*checked;
                Reaction::Toggled
            }
            CardContent::Numbered { current, max, .. } => {
                *current = if *current >= *max { 0 } else { *current + 1 };
                Reaction::Toggled
            }
            CardContent::Timer(timer) => {
                timer.started_at = match timer.started_at {
                    Some(_) => None,
                    None => Some(now),
                };
                Reaction::Toggled
            }
            CardContent::Sound { path, playing } if !path.is_empty() => {
                *playing = !*playing;
                Reaction::Toggled
            }
            _ => Reaction::None,
        }
    }

    fn delete_content(&mut self) -> Reaction {
        self.drag_origin = None;
        match &mut self.content {
            CardContent::Sound { path, playing } => {
                *playing = false;
                if path.is_empty() {
                    Reaction::None
                } else {
                    Reaction::ReleaseResource(path.clone())
                }
            }
            CardContent::Image { path } if !path.is_empty() => {
                Reaction::ReleaseResource(path.clone())
            }
            CardContent::Timer(timer) => {
                timer.started_at = None;
                Reaction::None
            }
            _ => Reaction::None,
        }
    }

    fn tick_content(&mut self, now: DateTime<Utc>) -> Reaction {
        match &mut self.content {
            CardContent::Timer(timer) => match timer.started_at {
                Some(start) if now - start >= timer.duration() => {
                    timer.started_at = None;
                    Reaction::TimerFired(timer.name.clone())
                }
                _ => Reaction::None,
            },
            _ => Reaction::None,
        }
    }

    /// Stop playback if this is a playing sound card.
    pub(crate) fn stop_sound(&mut self) -> bool {
        match &mut self.content {
            CardContent::Sound { playing, .. } if *playing => {
                *playing = false;
                true
            }
            _ => false,
        }
    }
}
