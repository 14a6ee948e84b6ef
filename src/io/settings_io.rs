use std::fs;
use std::path::{Path, PathBuf};

use crate::model::settings::AppSettings;

/// Get the settings file path, respecting XDG_CONFIG_HOME
pub fn settings_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".config"));
    config_dir.join("gridplan").join("settings.toml")
}

/// Get the user's home directory
fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Read settings from a specific path.
/// If the file doesn't exist, returns defaults.
/// If the file is corrupted, backs it up as .bak and returns defaults.
pub fn read_settings_from(path: &Path) -> AppSettings {
    if !path.exists() {
        return AppSettings::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str::<AppSettings>(&content) {
            Ok(settings) => settings,
            Err(e) => {
                let bak = path.with_extension("toml.bak");
                let _ = fs::copy(path, &bak);
                log::warn!(
                    "could not parse {} (backed up as {}): {}",
                    path.display(),
                    bak.display(),
                    e
                );
                AppSettings::default()
            }
        },
        Err(e) => {
            log::warn!("could not read {}: {}", path.display(), e);
            AppSettings::default()
        }
    }
}

/// Write settings to a specific path. The recent list is pruned of files
/// that no longer exist, deduplicated and capped first.
pub fn write_settings_to(path: &Path, settings: &mut AppSettings) -> Result<(), std::io::Error> {
    prune_recent(settings);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content =
        toml::to_string_pretty(settings).map_err(|e| std::io::Error::other(e.to_string()))?;
    super::plan_io::atomic_write(path, content.as_bytes())
}

/// Drop missing files and duplicates from the recent list and cap its length.
pub fn prune_recent(settings: &mut AppSettings) {
    let mut kept: Vec<String> = Vec::with_capacity(settings.recent_plans.len());
    for entry in settings.recent_plans.drain(..) {
        if Path::new(&entry).exists() && !kept.contains(&entry) {
            kept.push(entry);
        }
    }
    kept.truncate(settings.recent_limit);
    settings.recent_plans = kept;
}

/// Move `plan` to the front of the recent list. Relative paths are stored
/// absolute.
pub fn remember_recent(settings: &mut AppSettings, plan: &Path) {
    let plan = std::path::absolute(plan).unwrap_or_else(|_| plan.to_path_buf());
    let entry = plan.to_string_lossy().to_string();
    settings.recent_plans.retain(|p| *p != entry);
    settings.recent_plans.insert(0, entry);
    settings.recent_plans.truncate(settings.recent_limit);
}
