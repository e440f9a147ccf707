//! Settings and path resolution.
//!
//! Everything lives under `~/.clarodb/` (or `$CLARODB_HOME`): workspace
//! databases in `workspaces/`, logs in `logs/`, and an optional
//! `settings.toml` for defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use clarodb_logging::{clarodb_home, workspaces_dir};

pub const DEFAULT_WORKSPACE: &str = "demo";

/// Workspaces offered in the TUI switcher. Any other name still works from
/// the CLI; these are just the presets.
pub const KNOWN_WORKSPACES: &[&str] = &["demo", "analyze", "engineer", "enterprise"];

/// User settings from `~/.clarodb/settings.toml`. Every field is optional;
/// a missing file means all defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_workspace: Option<String>,
    /// Model override for the Claude provider.
    pub model: Option<String>,
    /// Canvas width in canvas pixels for auto-layout wrapping.
    pub canvas_width: Option<f64>,
}

impl Settings {
    pub fn path() -> PathBuf {
        clarodb_home().join("settings.toml")
    }

    pub fn load() -> Result<Self> {
        let path = Self::path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn workspace_or_default(&self, override_name: Option<&str>) -> String {
        override_name
            .map(str::to_string)
            .or_else(|| self.default_workspace.clone())
            .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string())
    }
}

/// Database file for a named workspace:
/// `~/.clarodb/workspaces/<name>.sqlite3`.
pub fn workspace_db_path(workspace: &str) -> PathBuf {
    workspaces_dir().join(format!("{workspace}.sqlite3"))
}
