use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;

use super::resources::AssetLoader;
use crate::model::project::Project;
use crate::parse::{Record, apply_document, plan_record, to_document};

/// Error type for plan file I/O
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("plan has not been saved yet; choose a file first")]
    NoPath,
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("{path} is not a valid plan: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("could not encode plan: {0}")]
    EncodeError(#[from] serde_json::Error),
}

/// Write `content` to `path` through a temp file in the same directory so a
/// failed write never leaves a truncated plan behind.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Encode a project as tab-indented JSON.
pub fn encode(project: &Project) -> Result<Vec<u8>, PlanError> {
    let doc = Value::Object(to_document(project));
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
    doc.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

/// Save to the project's own path.
///
/// On failure nothing in memory changes apart from the event log entry.
pub fn save(project: &mut Project) -> Result<PathBuf, PlanError> {
    let Some(path) = project.file_path.clone() else {
        project.log.push("ERROR: Save unsuccessful. The plan has no file yet.");
        return Err(PlanError::NoPath);
    };
    match write_plan(project, &path) {
        Ok(()) => {
            project.record_save();
            project.log.push("Save successful.");
            Ok(path)
        }
        Err(e) => {
            log::error!("{e}");
            project.log.push(format!("ERROR: Save unsuccessful. {e}"));
            Err(e)
        }
    }
}

/// Save to `path` and adopt it as the project's path if the write succeeds.
pub fn save_as(project: &mut Project, path: &Path) -> Result<PathBuf, PlanError> {
    let previous = project.file_path.replace(path.to_path_buf());
    let result = save(project);
    if result.is_err() {
        project.file_path = previous;
    }
    result
}

fn write_plan(project: &Project, path: &Path) -> Result<(), PlanError> {
    let bytes = encode(project)?;
    atomic_write(path, &bytes).map_err(|e| PlanError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read and validate a plan document. The `Tasks` array is the marker of a
/// well-formed plan; without it the file is rejected.
pub fn read_document(path: &Path) -> Result<Record, PlanError> {
    let text = fs::read_to_string(path).map_err(|e| PlanError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let corrupt = |reason: String| PlanError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };
    let doc = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(corrupt("top level is not an object".into())),
        Err(e) => return Err(corrupt(e.to_string())),
    };
    if plan_record::tasks(&doc).is_none() {
        return Err(corrupt("no Tasks list".into()));
    }
    Ok(doc)
}

/// Load a plan into `project`, replacing its boards and settings.
///
/// The file is read and validated before anything is touched, so a failed
/// load leaves the project exactly as it was. Derived layout is deferred to
/// the next tick.
pub fn load_into(project: &mut Project, path: &Path) -> Result<(), PlanError> {
    let doc = read_document(path)?;
    let tasks = plan_record::tasks(&doc).cloned().unwrap_or_default();

    project.resources.clear();
    apply_document(project, &doc, &tasks);
    project.file_path = Some(path.to_path_buf());
    project.just_loaded = true;
    project.modified = false;
    project.log.push("Load successful.");
    Ok(())
}

/// Load a plan into a fresh project.
pub fn load(path: &Path, loader: Arc<dyn AssetLoader>) -> Result<Project, PlanError> {
    let mut project = Project::with_loader(loader);
    load_into(&mut project, path)?;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::resources::FileAssetLoader;
    use crate::model::card::{Card, CardId, CardKind};
    use tempfile::TempDir;

    fn loader() -> Arc<dyn AssetLoader> {
        Arc::new(FileAssetLoader)
    }

    #[test]
    fn save_without_path_fails_and_keeps_state() {
        let mut p = Project::new();
        p.modified = true;
        assert!(matches!(save(&mut p), Err(PlanError::NoPath)));
        assert!(p.is_modified());
        assert_eq!(p.save_count(), 0);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let mut p = Project::new();
        p.modified = true;
        let bad = tmp.path().join("no/such/dir/plan.plan");
        assert!(matches!(
            save_as(&mut p, &bad),
            Err(PlanError::WriteError { .. })
        ));
        assert_eq!(p.file_path, None);
        assert!(p.is_modified());
    }

    #[test]
    fn written_plan_is_tab_indented_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.plan");
        let mut p = Project::new();
        p.boards[0]
            .cards
            .insert(CardId(0), Card::with_kind(CardId(0), CardKind::Note, 16.0));
        save_as(&mut p, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n\t\""));
        assert!(text.contains("\"Tasks\""));
        assert_eq!(p.save_count(), 1);
    }

    #[test]
    fn corrupt_plans_are_rejected_without_mutation() {
        let tmp = TempDir::new().unwrap();
        let no_tasks = tmp.path().join("no_tasks.plan");
        fs::write(&no_tasks, r#"{"GridSize": 32, "BoardCount": 3}"#).unwrap();
        let garbage = tmp.path().join("garbage.plan");
        fs::write(&garbage, "not json at all").unwrap();

        let mut p = Project::new();
        p.boards[0].name = "Mine".into();
        for path in [&no_tasks, &garbage] {
            assert!(matches!(
                load_into(&mut p, path),
                Err(PlanError::Corrupt { .. })
            ));
        }
        assert!(matches!(
            load_into(&mut p, &tmp.path().join("missing.plan")),
            Err(PlanError::ReadError { .. })
        ));
        assert_eq!(p.grid_size, 16.0);
        assert_eq!(p.board_count(), 1);
        assert_eq!(p.boards()[0].name, "Mine");
        assert!(p.file_path.is_none());
    }

    #[test]
    fn load_marks_project_just_loaded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("b.plan");
        fs::write(&path, r#"{"Tasks": [], "GridSize": 24}"#).unwrap();
        let p = load(&path, loader()).unwrap();
        assert!(p.just_loaded());
        assert_eq!(p.grid_size, 24.0);
        assert_eq!(p.file_path.as_deref(), Some(path.as_path()));
    }
}
