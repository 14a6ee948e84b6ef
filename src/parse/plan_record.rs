use serde_json::Value;

use super::card_record;
use super::fields::{Record, get_bool, get_f32, get_i64, get_string, get_string_array, get_u32};
use crate::model::board::Board;
use crate::model::card::{Card, CardEvent};
use crate::model::ids::IdAllocator;
use crate::model::project::{Project, default_board_name};
use crate::model::settings::NumberingStyle;

/// Most boards a plan may hold. Larger counts in a file are clamped.
pub const MAX_BOARDS: usize = 1024;

/// Plan format version written to new files.
pub const PLAN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the plan document. Cards are written board by board in ascending
/// id order so unrelated edits stay out of diffs.
pub fn to_document(project: &Project) -> Record {
    let mut cards: Vec<(usize, &Card)> = project.all_cards().collect();
    cards.sort_by_key(|(_, c)| c.id);
    let tasks: Vec<Value> = cards
        .into_iter()
        .map(|(board, card)| {
            Value::Object(card_record::serialize(
                card,
                board,
                project.settings.save_sounds_playing,
            ))
        })
        .collect();

    let s = &project.settings;
    let mut doc = Record::new();
    doc.insert("Version".into(), Value::from(PLAN_VERSION));
    doc.insert("GridSize".into(), Value::from(project.grid_size));
    doc.insert("Pan.X".into(), Value::from(project.camera.pan.x));
    doc.insert("Pan.Y".into(), Value::from(project.camera.pan.y));
    doc.insert("ZoomLevel".into(), Value::from(project.camera.zoom_level()));
    doc.insert("BoardCount".into(), Value::from(project.board_count()));
    doc.insert(
        "BoardNames".into(),
        Value::from(
            project
                .boards()
                .iter()
                .map(|b| b.name.clone())
                .collect::<Vec<_>>(),
        ),
    );
    doc.insert("BoardIndex".into(), Value::from(project.board_index()));
    doc.insert("Tasks".into(), Value::Array(tasks));
    doc.insert("ColorTheme".into(), Value::from(s.theme.as_str()));
    doc.insert("SampleRate".into(), Value::from(s.sample_rate()));
    doc.insert("SampleBuffer".into(), Value::from(s.sample_buffer));
    doc.insert("TaskShadow".into(), Value::from(s.task_shadow()));
    doc.insert("OutlineTasks".into(), Value::from(s.outline_cards));
    doc.insert("GridVisible".into(), Value::from(s.grid_visible));
    doc.insert("ShowIcons".into(), Value::from(s.show_icons));
    doc.insert("NumberingSequence".into(), Value::from(s.numbering.index()));
    doc.insert(
        "NumberingIgnoreTopLevel".into(),
        Value::from(s.numbering_ignore_top_level),
    );
    doc.insert("PulsingTaskSelection".into(), Value::from(s.pulsing_selection));
    doc.insert("AutoSave".into(), Value::from(s.auto_save));
    doc.insert("AutoReloadThemes".into(), Value::from(s.auto_reload_themes));
    doc.insert("SaveSoundsPlaying".into(), Value::from(s.save_sounds_playing));
    doc
}

/// The card list of a plan document, or `None` if the document has no
/// `Tasks` array (which marks it as not a plan).
pub fn tasks(doc: &Record) -> Option<&Vec<Value>> {
    doc.get("Tasks").and_then(Value::as_array)
}

/// Replace the project's content with a validated plan document.
///
/// Every field falls back to the project's current value. Cards naming a
/// board that does not exist land on board 0; a duplicated id is replaced
/// by a fresh one. Both cases are logged.
pub fn apply_document(project: &mut Project, doc: &Record, tasks: &[Value]) {
    project.grid_size = get_f32(doc, "GridSize", project.grid_size).max(1.0);
    project.camera.pan.x = get_f32(doc, "Pan.X", project.camera.pan.x);
    project.camera.pan.y = get_f32(doc, "Pan.Y", project.camera.pan.y);
    project
        .camera
        .set_zoom_level(get_i64(doc, "ZoomLevel", project.camera.zoom_level() as i64));
    project.camera.settle();

    let s = &mut project.settings;
    let rate = get_u32(doc, "SampleRate", s.sample_rate());
    if !s.set_sample_rate(rate) {
        log::warn!("unsupported sample rate {rate}, keeping {}", s.sample_rate());
    }
    s.sample_buffer = get_u32(doc, "SampleBuffer", s.sample_buffer);
    s.set_task_shadow(get_i64(doc, "TaskShadow", s.task_shadow() as i64));
    s.outline_cards = get_bool(doc, "OutlineTasks", s.outline_cards);
    s.grid_visible = get_bool(doc, "GridVisible", s.grid_visible);
    s.show_icons = get_bool(doc, "ShowIcons", s.show_icons);
    let numbering = get_i64(doc, "NumberingSequence", s.numbering.index());
    s.numbering = NumberingStyle::from_index(numbering).unwrap_or(s.numbering);
    s.numbering_ignore_top_level =
        get_bool(doc, "NumberingIgnoreTopLevel", s.numbering_ignore_top_level);
    s.pulsing_selection = get_bool(doc, "PulsingTaskSelection", s.pulsing_selection);
    s.auto_save = get_bool(doc, "AutoSave", s.auto_save);
    s.auto_reload_themes = get_bool(doc, "AutoReloadThemes", s.auto_reload_themes);
    s.save_sounds_playing = get_bool(doc, "SaveSoundsPlaying", s.save_sounds_playing);
    s.theme = get_string(doc, "ColorTheme", &s.theme);

    let names = get_string_array(doc, "BoardNames").unwrap_or_default();
    let count = board_count(doc, &names, tasks);
    project.boards = (0..count)
        .map(|i| {
            let name = names
                .get(i)
                .cloned()
                .unwrap_or_else(|| default_board_name(i));
            Board::new(name)
        })
        .collect();
    project.ids = IdAllocator::new();

    let mut repaired = 0;
    for (n, task) in tasks.iter().enumerate() {
        let Some(record) = task.as_object() else {
            log::warn!("skipping card record {n}: not an object");
            continue;
        };

        let board = card_record::record_board(record);
        let board = match usize::try_from(board) {
            Ok(b) if b < count => b,
            _ => {
                log::warn!("card record {n} names board {board}, which does not exist; using board 0");
                repaired += 1;
                0
            }
        };

        let id = match card_record::record_id(record) {
            Some(id) if project.ids.reserve(id) => id,
            Some(id) => {
                let fresh = project.ids.allocate();
                log::warn!("duplicate card id {id}, renumbered to {fresh}");
                repaired += 1;
                fresh
            }
            None => project.ids.allocate(),
        };

        let mut card = card_record::deserialize(record, id, project.grid_size);
        if let Some(path) = card.content.resource_path() {
            let status = project.resources.request(path);
            card.receive(CardEvent::Resource(status));
        }
        project.boards[board].cards.insert(id, card);
    }
    if repaired > 0 {
        project
            .log
            .push(format!("Repaired {repaired} card record(s) while loading."));
    }

    let index = get_i64(doc, "BoardIndex", 0);
    let clamped = usize::try_from(index).unwrap_or(0);
    if clamped >= count || index < 0 {
        log::warn!("active board {index} out of range, using board 0");
        project.set_board_index(0);
    } else {
        project.set_board_index(clamped);
    }
}

/// Number of boards to build. The declared `BoardCount` is trusted only as
/// far as the names and card records back it up, and never past
/// [`MAX_BOARDS`].
fn board_count(doc: &Record, names: &[String], tasks: &[Value]) -> usize {
    let declared = get_i64(doc, "BoardCount", 1).max(1);
    let used = tasks
        .iter()
        .filter_map(Value::as_object)
        .map(card_record::record_board)
        .filter(|&b| b >= 0 && b < declared)
        .max()
        .map_or(1, |b| b + 1);
    let backed = used.max(names.len() as i64).max(1);
    let count = declared.min(backed).min(MAX_BOARDS as i64);
    if count < declared {
        log::warn!("plan declares {declared} boards, loading {count}");
    }
    count as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::{CardContent, CardId, CardKind};
    use serde_json::json;

    fn doc(value: Value) -> Record {
        match value {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn document_carries_settings_and_sorted_cards() {
        let mut project = Project::new();
        project.boards.push(Board::new("Second"));
        for id in [4, 1] {
            let card = Card::with_kind(CardId(id), CardKind::Note, 16.0);
            project.boards[1].cards.insert(CardId(id), card);
        }
        project.settings.auto_save = true;

        let d = to_document(&project);
        assert_eq!(d["BoardCount"], json!(2));
        assert_eq!(d["BoardNames"], json!(["Board 1", "Second"]));
        assert_eq!(d["AutoSave"], json!(true));
        let ids: Vec<_> = tasks(&d).unwrap().iter().map(|t| t["ID"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(4)]);
        assert_eq!(tasks(&d).unwrap()[0]["BoardIndex"], json!(1));
    }

    #[test]
    fn missing_tasks_is_not_a_plan() {
        assert!(tasks(&doc(json!({"GridSize": 16}))).is_none());
        assert!(tasks(&doc(json!({"Tasks": {}}))).is_none());
        assert!(tasks(&doc(json!({"Tasks": []}))).is_some());
    }

    #[test]
    fn out_of_range_boards_and_duplicate_ids_are_repaired() {
        let d = doc(json!({
            "BoardCount": 2,
            "BoardNames": ["Only one name"],
            "BoardIndex": 5,
            "Tasks": [
                {"ID": 2, "BoardIndex": 1, "TaskType": "Note", "Description": "a"},
                {"ID": 2, "BoardIndex": 9, "TaskType": "Note", "Description": "b"},
                {"TaskType": "Note", "Description": "c"},
                "garbage"
            ]
        }));
        let mut project = Project::new();
        let list = tasks(&d).unwrap().clone();
        apply_document(&mut project, &d, &list);

        assert_eq!(project.board_count(), 2);
        assert_eq!(project.boards()[0].name, "Only one name");
        assert_eq!(project.boards()[1].name, "Board 2");
        assert_eq!(project.board_index(), 0);

        assert!(project.boards()[1].contains(CardId(2)));
        let moved: Vec<_> = project.boards()[0].ids();
        assert_eq!(moved, vec![CardId(0), CardId(1)]);
        let text = |id| project.find_card(CardId(id)).unwrap().1.content.text().map(str::to_string);
        assert_eq!(text(0), Some("b".into()));
        assert_eq!(text(1), Some("c".into()));
        assert!(matches!(
            project.find_card(CardId(2)).unwrap().1.content,
            CardContent::Note { .. }
        ));
    }

    #[test]
    fn huge_board_counts_fall_back_to_used_boards() {
        let d = doc(json!({
            "BoardCount": 1e12,
            "BoardNames": ["Home"],
            "Tasks": [
                {"ID": 0, "BoardIndex": 2, "TaskType": "Note", "Description": "x"}
            ]
        }));
        let mut project = Project::new();
        let list = tasks(&d).unwrap().clone();
        apply_document(&mut project, &d, &list);

        assert_eq!(project.board_count(), 3);
        assert_eq!(project.boards()[0].name, "Home");
        assert!(project.boards()[2].contains(CardId(0)));

        let stray = doc(json!({"BoardCount": 5_000_000, "Tasks": [
            {"ID": 0, "BoardIndex": 4_999_999, "TaskType": "Note"}
        ]}));
        let list = tasks(&stray).unwrap().clone();
        apply_document(&mut project, &stray, &list);
        assert_eq!(project.board_count(), MAX_BOARDS);
        assert!(project.boards()[0].contains(CardId(0)));
    }

    #[test]
    fn large_card_ids_load_and_free_ids_stay_low() {
        let d = doc(json!({"Tasks": [
            {"ID": 4_294_967_295u64, "TaskType": "Note", "Description": "far"},
            {"ID": 20_000_000, "TaskType": "Note", "Description": "farther"},
            {"TaskType": "Note", "Description": "no id"}
        ]}));
        let mut project = Project::new();
        let list = tasks(&d).unwrap().clone();
        apply_document(&mut project, &d, &list);

        assert_eq!(project.card_count(), 3);
        assert!(project.find_card(CardId(u32::MAX)).is_some());
        assert!(project.find_card(CardId(20_000_000)).is_some());
        assert!(project.find_card(CardId(0)).is_some());
        assert_eq!(project.ids.allocate(), CardId(1));
    }
}
