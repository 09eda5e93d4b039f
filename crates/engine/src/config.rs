// Local configuration files for the engine.
//
// Global config: `~/.folio/config.toml` (default actor identity)
// Workspace config: `<root>/.folio/workspace.toml` (git + mirror push)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use folio_common::proposal::{Actor, ActorKind};

/// Root directory for folio global state: `~/.folio/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".folio"))
}

/// Path to the global config file: `~/.folio/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join("config.toml"))
}

/// Path to the workspace config file: `<root>/.folio/workspace.toml`.
pub fn workspace_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".folio").join("workspace.toml")
}

// ── Global config ──────────────────────────────────────────────────

/// Global configuration at `~/.folio/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default display name for proposals created on this machine.
    pub display_name: Option<String>,
    /// Default email for commit attribution.
    pub email: Option<String>,
    /// Default actor type (human or agent).
    pub actor_kind: ActorKindConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self { display_name: None, email: None, actor_kind: ActorKindConfig::Human }
    }
}

impl GlobalConfig {
    /// Load from `~/.folio/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|path| Self::load_from(&path).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// The default actor this machine proposes as.
    pub fn default_actor(&self) -> Actor {
        Actor {
            name: self.display_name.clone().unwrap_or_else(|| "folio".to_string()),
            email: self.email.clone(),
            kind: match self.actor_kind {
                ActorKindConfig::Human => ActorKind::Human,
                ActorKindConfig::Agent => ActorKind::Agent,
            },
        }
    }
}

/// Actor type for this client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorKindConfig {
    Human,
    Agent,
}

// ── Workspace config ───────────────────────────────────────────────

/// Per-workspace configuration at `<root>/.folio/workspace.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Git settings for this workspace.
    pub git: GitConfig,
}

impl WorkspaceConfig {
    /// Load from `<root>/.folio/workspace.toml`. Returns defaults if
    /// the file doesn't exist.
    pub fn load(workspace_root: &Path) -> Self {
        let path = workspace_config_path(workspace_root);
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to `<root>/.folio/workspace.toml`.
    pub fn save(&self, workspace_root: &Path) -> Result<(), ConfigError> {
        self.save_to(&workspace_config_path(workspace_root))
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Git and mirror settings per workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitConfig {
    /// Git remote name for the mirror (defaults to `"origin"`).
    pub remote: String,
    /// Branch to push (defaults to `"main"`).
    pub branch: String,
    /// Mirror push policy: `disabled`, `on_execute`, or `periodic`.
    pub push_policy: PushPolicy,
    /// Interval for the periodic mirror push, in seconds.
    pub push_interval_sec: u32,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: "origin".into(),
            branch: "main".into(),
            push_policy: PushPolicy::Disabled,
            push_interval_sec: 300,
        }
    }
}

/// Mirror push policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PushPolicy {
    /// Never push.
    Disabled,
    /// Best-effort push after each executed proposal.
    OnExecute,
    /// Background push on a fixed interval.
    Periodic,
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── GlobalConfig ───────────────────────────────────────────────

    #[test]
    fn global_config_defaults() {
        let cfg = GlobalConfig::default();
        assert!(cfg.display_name.is_none());
        assert!(cfg.email.is_none());
        assert_eq!(cfg.actor_kind, ActorKindConfig::Human);
    }

    #[test]
    fn global_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = GlobalConfig {
            display_name: Some("Dana".into()),
            email: Some("dana@example.com".into()),
            actor_kind: ActorKindConfig::Agent,
        };
        cfg.save_to(&path).unwrap();
        let loaded = GlobalConfig::load_from(&path).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn default_actor_falls_back_to_folio() {
        let actor = GlobalConfig::default().default_actor();
        assert_eq!(actor.name, "folio");
        assert_eq!(actor.kind, ActorKind::Human);
    }

    #[test]
    fn default_actor_uses_configured_identity() {
        let cfg = GlobalConfig {
            display_name: Some("scribe".into()),
            email: None,
            actor_kind: ActorKindConfig::Agent,
        };
        let actor = cfg.default_actor();
        assert_eq!(actor.name, "scribe");
        assert_eq!(actor.kind, ActorKind::Agent);
    }

    // ── WorkspaceConfig ────────────────────────────────────────────

    #[test]
    fn workspace_config_defaults() {
        let cfg = WorkspaceConfig::default();
        assert_eq!(cfg.git.remote, "origin");
        assert_eq!(cfg.git.branch, "main");
        assert_eq!(cfg.git.push_policy, PushPolicy::Disabled);
        assert_eq!(cfg.git.push_interval_sec, 300);
    }

    #[test]
    fn workspace_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let ws_root = dir.path().join("tree");
        std::fs::create_dir_all(&ws_root).unwrap();

        let cfg = WorkspaceConfig {
            git: GitConfig {
                remote: "mirror".into(),
                branch: "trunk".into(),
                push_policy: PushPolicy::Periodic,
                push_interval_sec: 60,
            },
        };
        cfg.save(&ws_root).unwrap();

        let loaded = WorkspaceConfig::load(&ws_root);
        assert_eq!(cfg, loaded);
        assert!(ws_root.join(".folio/workspace.toml").exists());
    }

    #[test]
    fn workspace_config_partial_toml_uses_defaults() {
        let toml_str = r#"
[git]
push_policy = "on_execute"
"#;
        let cfg: WorkspaceConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.git.push_policy, PushPolicy::OnExecute);
        assert_eq!(cfg.git.remote, "origin"); // default
        assert_eq!(cfg.git.push_interval_sec, 300); // default
    }

    #[test]
    fn workspace_config_load_missing_returns_default() {
        let dir = TempDir::new().unwrap();
        let loaded = WorkspaceConfig::load(dir.path());
        assert_eq!(loaded, WorkspaceConfig::default());
    }

    #[test]
    fn push_policy_serializes_as_snake_case() {
        assert_eq!(serde_json::to_string(&PushPolicy::OnExecute).unwrap(), "\"on_execute\"");
        assert_eq!(serde_json::to_string(&PushPolicy::Periodic).unwrap(), "\"periodic\"");
    }
}
