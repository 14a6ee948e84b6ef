use chrono::{DateTime, Utc};
use serde_json::Value;

use super::fields::{Record, get_bool, get_f32, get_i64, get_string, get_string_array, get_u32};
use crate::model::card::{Card, CardContent, CardId, CardKind, MapContent};

/// Persisted form of a card. Derived state (neighbours, selection, numbering,
/// resource status) is left out.
pub fn serialize(card: &Card, board_index: usize, save_sounds_playing: bool) -> Record {
    let mut r = Record::new();
    r.insert("ID".into(), Value::from(card.id.0));
    r.insert("BoardIndex".into(), Value::from(board_index));
    r.insert("Position.X".into(), Value::from(card.rect.x));
    r.insert("Position.Y".into(), Value::from(card.rect.y));
    r.insert("Rect.W".into(), Value::from(card.rect.w));
    r.insert("Rect.H".into(), Value::from(card.rect.h));
    r.insert("TaskType".into(), Value::from(card.kind().name()));

    match &card.content {
        CardContent::Checkbox { text, checked } => {
            r.insert("Description".into(), Value::from(text.as_str()));
            r.insert("Checked".into(), Value::from(*checked));
        }
        CardContent::Numbered { text, current, max } => {
            r.insert("Description".into(), Value::from(text.as_str()));
            r.insert("Current".into(), Value::from(*current));
            r.insert("Max".into(), Value::from(*max));
        }
        CardContent::Note { text } => {
            r.insert("Description".into(), Value::from(text.as_str()));
        }
        CardContent::Image { path } => {
            r.insert("FilePath".into(), Value::from(path.as_str()));
        }
        CardContent::Sound { path, playing } => {
            r.insert("FilePath".into(), Value::from(path.as_str()));
            if save_sounds_playing {
                r.insert("Playing".into(), Value::from(*playing));
            }
        }
        CardContent::Timer(timer) => {
            r.insert("TimerName".into(), Value::from(timer.name.as_str()));
            r.insert("TimerMinutes".into(), Value::from(timer.minutes));
            r.insert("TimerSeconds".into(), Value::from(timer.seconds));
            if let Some(start) = timer.started_at {
                r.insert("TimerStarted".into(), Value::from(start.to_rfc3339()));
            }
        }
        CardContent::Map(map) => {
            r.insert("MapCols".into(), Value::from(map.cols()));
            r.insert("MapRows".into(), Value::from(map.rows()));
            r.insert("MapData".into(), Value::from(map.to_rows()));
        }
    }
    r
}

/// Id stored in a record, if it is a valid one.
pub fn record_id(record: &Record) -> Option<CardId> {
    let id = get_i64(record, "ID", -1);
    u32::try_from(id).ok().map(CardId)
}

/// Board index stored in a record; board 0 when absent.
pub fn record_board(record: &Record) -> i64 {
    get_i64(record, "BoardIndex", 0)
}

/// Kind stored in a record. Accepts kind names and the numeric indices older
/// plans used.
pub fn record_kind(record: &Record) -> Option<CardKind> {
    match record.get("TaskType")? {
        Value::String(name) => CardKind::parse_kind(name),
        Value::Number(n) => n
            .as_u64()
            .and_then(|i| CardKind::ALL.get(i as usize).copied()),
        _ => None,
    }
}

/// Build a card with id `id` from a record. An unknown kind falls back to a
/// checkbox; every other missing field keeps the kind's default.
pub fn deserialize(record: &Record, id: CardId, grid: f32) -> Card {
    let kind = record_kind(record).unwrap_or(CardKind::Checkbox);
    let mut card = Card::with_kind(id, kind, grid);
    apply(&mut card, record);
    card
}

/// Overwrite a card's persisted attributes from a record. Fields that are
/// missing, wrongly typed or belong to another kind are ignored.
pub fn apply(card: &mut Card, record: &Record) {
    card.rect.x = get_f32(record, "Position.X", card.rect.x);
    card.rect.y = get_f32(record, "Position.Y", card.rect.y);
    card.rect.w = get_f32(record, "Rect.W", card.rect.w).max(1.0);
    card.rect.h = get_f32(record, "Rect.H", card.rect.h).max(1.0);

    match &mut card.content {
        CardContent::Checkbox { text, checked } => {
            *text = get_string(record, "Description", text);
            *checked = get_bool(record, "Checked", *checked);
        }
        CardContent::Numbered { text, current, max } => {
            *text = get_string(record, "Description", text);
            *max = get_u32(record, "Max", *max).max(1);
            *current = get_u32(record, "Current", *current).min(*max);
        }
        CardContent::Note { text } => {
            *text = get_string(record, "Description", text);
        }
        CardContent::Image { path } => {
            *path = get_string(record, "FilePath", path);
        }
        CardContent::Sound { path, playing } => {
            *path = get_string(record, "FilePath", path);
            *playing = get_bool(record, "Playing", *playing);
        }
        CardContent::Timer(timer) => {
            timer.name = get_string(record, "TimerName", &timer.name);
            timer.minutes = get_u32(record, "TimerMinutes", timer.minutes);
            timer.seconds = get_u32(record, "TimerSeconds", timer.seconds);
            if let Some(started) = record.get("TimerStarted").and_then(Value::as_str) {
                timer.started_at = DateTime::parse_from_rfc3339(started)
                    .ok()
                    .map(|t| t.with_timezone(&Utc));
            }
        }
        CardContent::Map(map) => {
            let cols = get_u32(record, "MapCols", map.cols());
            let rows = get_u32(record, "MapRows", map.rows());
            match get_string_array(record, "MapData") {
                Some(data) => *map = MapContent::from_rows(cols, rows, &data),
                None => map.resize(cols, rows),
            }
        }
    }
}
