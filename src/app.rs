use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::io::plan_io::{self, PlanError};
use crate::io::resources::{AssetLoader, FileAssetLoader};
use crate::io::settings_io::{read_settings_from, remember_recent, write_settings_to};
use crate::model::project::Project;
use crate::model::settings::AppSettings;

/// An action that throws away unsaved work or overwrites a file, and so
/// may need confirming first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestructiveAction {
    New,
    Load(PathBuf),
    SaveAs(PathBuf),
}

impl DestructiveAction {
    /// The question to put to the user before running this action.
    pub fn prompt(&self) -> String {
        match self {
            DestructiveAction::New | DestructiveAction::Load(_) => {
                "This plan has unsaved changes. Abandon them?".to_string()
            }
            DestructiveAction::SaveAs(path) => {
                format!("{} already exists. Overwrite it?", path.display())
            }
        }
    }
}

/// What happened to a requested action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Parked until `resolve_pending` is called.
    NeedsConfirmation,
    /// A pending action was declined.
    Dropped,
}

/// The open plan together with program-wide settings.
pub struct App {
    pub project: Project,
    pub settings: AppSettings,
    pub settings_path: PathBuf,
    pending: Option<DestructiveAction>,
    loader: Arc<dyn AssetLoader>,
}

impl App {
    /// Start with an empty plan and the settings stored at `settings_path`.
    pub fn new(settings_path: PathBuf) -> Self {
        App::with_loader(settings_path, Arc::new(FileAssetLoader))
    }

    pub fn with_loader(settings_path: PathBuf, loader: Arc<dyn AssetLoader>) -> Self {
        let settings = read_settings_from(&settings_path);
        let project = fresh_project(&settings, &loader);
        App {
            project,
            settings,
            settings_path,
            pending: None,
            loader,
        }
    }

    pub fn pending(&self) -> Option<&DestructiveAction> {
        self.pending.as_ref()
    }

    /// Open the plan at `path`. On failure the current plan is replaced by
    /// an empty one and the error is logged there as well as returned.
    pub fn open(&mut self, path: &Path) -> Result<(), PlanError> {
        match plan_io::load(path, self.loader.clone()) {
            Ok(project) => {
                self.project = project;
                remember_recent(&mut self.settings, path);
                self.write_settings();
                Ok(())
            }
            Err(e) => {
                log::error!("{e}");
                self.project = fresh_project(&self.settings, &self.loader);
                self.project
                    .log
                    .push(format!("ERROR: Could not load plan. {e}"));
                Err(e)
            }
        }
    }

    /// Open the most recent plan if the settings ask for it.
    pub fn open_last(&mut self) -> Option<Result<(), PlanError>> {
        if !self.settings.auto_load_last_plan {
            return None;
        }
        let last = PathBuf::from(self.settings.recent_plans.first()?);
        Some(self.open(&last))
    }

    /// Save the plan to its own file, then the settings.
    pub fn save(&mut self) -> Result<PathBuf, PlanError> {
        let path = plan_io::save(&mut self.project)?;
        remember_recent(&mut self.settings, &path);
        self.write_settings();
        Ok(path)
    }

    pub fn save_as(&mut self, path: &Path) -> Result<PathBuf, PlanError> {
        let path = plan_io::save_as(&mut self.project, path)?;
        remember_recent(&mut self.settings, &path);
        self.write_settings();
        Ok(path)
    }

    /// Replace the plan with an empty one.
    pub fn new_plan(&mut self) {
        self.project = fresh_project(&self.settings, &self.loader);
        self.project.log.push("New plan created.");
    }

    /// Run `action`, or park it if it would lose unsaved changes (New,
    /// Load) or overwrite an existing file (SaveAs). A parked action
    /// replaces any earlier one.
    pub fn request(&mut self, action: DestructiveAction) -> Result<Outcome, PlanError> {
        let needs_confirmation = match &action {
            DestructiveAction::New | DestructiveAction::Load(_) => self.project.is_modified(),
            DestructiveAction::SaveAs(path) => path.exists(),
        };
        if needs_confirmation {
            self.pending = Some(action);
            return Ok(Outcome::NeedsConfirmation);
        }
        self.run(action)?;
        Ok(Outcome::Done)
    }

    /// Answer the parked confirmation.
    pub fn resolve_pending(&mut self, accept: bool) -> Result<Outcome, PlanError> {
        let Some(action) = self.pending.take() else {
            return Ok(Outcome::Dropped);
        };
        if !accept {
            return Ok(Outcome::Dropped);
        }
        self.run(action)?;
        Ok(Outcome::Done)
    }

    fn run(&mut self, action: DestructiveAction) -> Result<(), PlanError> {
        match action {
            DestructiveAction::New => {
                self.new_plan();
                Ok(())
            }
            DestructiveAction::Load(path) => self.open(&path),
            DestructiveAction::SaveAs(path) => self.save_as(&path).map(|_| ()),
        }
    }

    fn write_settings(&mut self) {
        if let Err(e) = write_settings_to(&self.settings_path, &mut self.settings) {
            log::warn!("could not write {}: {}", self.settings_path.display(), e);
        }
    }
}

fn fresh_project(settings: &AppSettings, loader: &Arc<dyn AssetLoader>) -> Project {
    let mut project = Project::with_loader(loader.clone());
    project.settings.theme = settings.theme.clone();
    project
}
