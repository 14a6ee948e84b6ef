use serde::Serialize;

use crate::model::board::Board;
use crate::model::card::{Card, CardContent};
use crate::model::geometry::world_to_grid;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CardJson {
    pub id: u32,
    pub board: usize,
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    pub text: String,
    pub col: i32,
    pub row: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<f32>,
}

#[derive(Serialize)]
pub struct BoardJson {
    pub index: usize,
    pub name: String,
    pub active: bool,
    pub cards: usize,
    pub done: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct RecentJson {
    pub path: String,
    pub exists: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn card_to_json(card: &Card, board: usize, grid: f32) -> CardJson {
    let (col, row) = world_to_grid(card.position(), grid);
    let completable = card.completable();
    CardJson {
        id: card.id.0,
        board,
        kind: card.kind().name().to_string(),
        label: card.label().to_string(),
        text: card_text(card),
        col,
        row,
        complete: completable.then(|| card.is_complete()),
        completion: completable.then(|| card.completion().ratio()),
    }
}

pub fn board_to_json(index: usize, board: &Board, active: bool) -> BoardJson {
    let (done, total) = board_progress(board);
    BoardJson {
        index,
        name: board.name.clone(),
        active,
        cards: board.len(),
        done,
        total,
    }
}

/// Completed and completable card counts.
pub fn board_progress(board: &Board) -> (usize, usize) {
    let completable: Vec<&Card> = board.cards().filter(|c| c.completable()).collect();
    let done = completable.iter().filter(|c| c.is_complete()).count();
    (done, completable.len())
}

/// Cards in reading order: top to bottom, then left to right.
pub fn reading_order(board: &Board) -> Vec<&Card> {
    let mut cards: Vec<&Card> = board.cards().collect();
    cards.sort_by(|a, b| {
        a.rect
            .y
            .total_cmp(&b.rect.y)
            .then(a.rect.x.total_cmp(&b.rect.x))
            .then(a.id.cmp(&b.id))
    });
    cards
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn card_text(card: &Card) -> String {
    let text = match &card.content {
        CardContent::Checkbox { text, .. }
        | CardContent::Numbered { text, .. }
        | CardContent::Note { text } => text.as_str(),
        CardContent::Image { path } | CardContent::Sound { path, .. } => path.as_str(),
        CardContent::Timer(timer) => timer.name.as_str(),
        CardContent::Map(_) => "",
    };
    text.lines().next().unwrap_or_default().to_string()
}

fn card_mark(card: &Card) -> String {
    match &card.content {
        CardContent::Checkbox { checked: true, .. } => "[x]".into(),
        CardContent::Checkbox { checked: false, .. } => "[ ]".into(),
        CardContent::Numbered { current, max, .. } => format!("[{current}/{max}]"),
        CardContent::Note { .. } => "-".into(),
        CardContent::Image { .. } => "img".into(),
        CardContent::Sound { playing: true, .. } => "snd>".into(),
        CardContent::Sound { .. } => "snd".into(),
        CardContent::Timer(timer) => format!("{}:{:02}", timer.minutes, timer.seconds),
        CardContent::Map(map) => format!("map {}x{}", map.cols(), map.rows()),
    }
}

/// Format a card as one line, indented by its numbering depth
pub fn format_card_line(card: &Card) -> String {
    let depth = card.numbering().map_or(0, |p| p.len().saturating_sub(1));
    let label = if card.label().is_empty() {
        String::new()
    } else {
        format!("{} ", card.label())
    };
    let text = card_text(card);
    let mut line = format!("{}{}{}", "  ".repeat(depth), label, card_mark(card));
    if !text.is_empty() {
        line.push(' ');
        line.push_str(&text);
    }
    line.push_str(&format!(" #{}", card.id.0));
    line
}

/// Format every card of a board in reading order
pub fn format_board_cards(board: &Board) -> Vec<String> {
    reading_order(board).into_iter().map(format_card_line).collect()
}

/// Format a board summary line
pub fn format_board_line(index: usize, board: &Board, active: bool) -> String {
    let (done, total) = board_progress(board);
    let marker = if active { '*' } else { ' ' };
    let noun = if board.len() == 1 { "card" } else { "cards" };
    format!(
        "{} {} {}  {} {}, {}/{} done",
        marker,
        index,
        board.name,
        board.len(),
        noun,
        done,
        total
    )
}
