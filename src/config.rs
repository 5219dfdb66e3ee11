//! Application configuration: TOML file loading, CLI overrides, defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--stable-reconcile`)
//! 2. `$TREEDIT_CONFIG` environment variable (path to config file)
//! 3. Project-local `.treedit.toml` in the current working directory
//! 4. Global `~/.config/treedit/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::tree::ReconcileMode;

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Command used to open files (falls back to $VISUAL, then $EDITOR).
    pub editor: Option<String>,
}

/// Tree engine settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Match refreshed children by name instead of the historical
    /// forward-only cursor, so reordering renames keep their expansion.
    pub stable_reconcile: Option<bool>,
}

/// Session persistence settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Restore saved outlines on start and save them on exit.
    pub restore: Option<bool>,
    /// Directory for saved outlines (defaults under the user data dir).
    pub dir: Option<String>,
}

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub session: SessionConfig,
}

/// Return the list of candidate config file paths in priority order.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("TREEDIT_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".treedit.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("treedit").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to parse config file");
            None
        }
    }
}

impl AppConfig {
    /// Merge `other` on top of `self` — `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                editor: other.general.editor.clone().or(self.general.editor),
            },
            tree: TreeConfig {
                stable_reconcile: other.tree.stable_reconcile.or(self.tree.stable_reconcile),
            },
            session: SessionConfig {
                restore: other.session.restore.or(self.session.restore),
                dir: other.session.dir.clone().or(self.session.dir),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk candidates in reverse so that highest priority overwrites.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────

    /// Editor command for opening files, if configured.
    pub fn editor(&self) -> Option<&str> {
        self.general.editor.as_deref()
    }

    /// Which reconciliation the refresh algorithm uses.
    pub fn reconcile_mode(&self) -> ReconcileMode {
        if self.tree.stable_reconcile.unwrap_or(false) {
            ReconcileMode::ByName
        } else {
            ReconcileMode::Forward
        }
    }

    /// Whether sessions are saved on exit and restored on start.
    pub fn restore_enabled(&self) -> bool {
        self.session.restore.unwrap_or(true)
    }

    /// Where saved outlines live.
    pub fn session_dir(&self) -> PathBuf {
        match &self.session.dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("treedit")
                .join("session"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.editor(), None);
        assert_eq!(cfg.reconcile_mode(), ReconcileMode::Forward);
        assert!(cfg.restore_enabled());
    }

    #[test]
    fn toml_parsing_full() {
        let toml = r#"
[general]
editor = "hx"

[tree]
stable_reconcile = true

[session]
restore = false
dir = "/tmp/treedit-sessions"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.editor(), Some("hx"));
        assert_eq!(cfg.reconcile_mode(), ReconcileMode::ByName);
        assert!(!cfg.restore_enabled());
        assert_eq!(cfg.session_dir(), PathBuf::from("/tmp/treedit-sessions"));
    }

    #[test]
    fn toml_parsing_partial_keeps_defaults() {
        let cfg: AppConfig = toml::from_str("[tree]\nstable_reconcile = true\n").unwrap();
        assert_eq!(cfg.reconcile_mode(), ReconcileMode::ByName);
        assert!(cfg.restore_enabled());
        assert_eq!(cfg.editor(), None);
    }

    #[test]
    fn toml_parsing_empty() {
        let cfg: AppConfig = toml::from_str("").expect("parse failed");
        assert_eq!(cfg.reconcile_mode(), ReconcileMode::Forward);
    }

    #[test]
    fn merge_overrides_without_clearing() {
        let base = AppConfig {
            general: GeneralConfig {
                editor: Some("vi".into()),
            },
            session: SessionConfig {
                restore: Some(false),
                dir: None,
            },
            ..Default::default()
        };
        let over = AppConfig {
            tree: TreeConfig {
                stable_reconcile: Some(true),
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert_eq!(merged.editor(), Some("vi")); // base preserved
        assert_eq!(merged.reconcile_mode(), ReconcileMode::ByName); // overridden
        assert!(!merged.restore_enabled()); // base preserved
    }

    #[test]
    fn load_from_file_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(&cfg_path, "[general]\neditor = \"nano\"\n").expect("write");

        let cli_overrides = AppConfig {
            tree: TreeConfig {
                stable_reconcile: Some(true),
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.editor(), Some("nano"));
        assert_eq!(cfg.reconcile_mode(), ReconcileMode::ByName);
    }

    #[test]
    fn load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }
}
