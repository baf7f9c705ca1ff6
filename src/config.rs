use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::beads::{self, IssueStore};
use crate::error::ExitError;
use crate::wisp::{ConflictPolicy, HookStore};

/// Config file name constants.
pub const CONFIG_TOML: &str = ".gastown.toml";
pub const CONFIG_JSON: &str = ".gastown.json";

/// Find the config file path, preferring .gastown.toml over .gastown.json.
/// Returns None if neither exists.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let toml_path = dir.join(CONFIG_TOML);
    if toml_path.exists() {
        return Some(toml_path);
    }
    let json_path = dir.join(CONFIG_JSON);
    if json_path.exists() {
        return Some(json_path);
    }
    None
}

/// Top-level .gastown.toml config.
///
/// Every section is optional. JSON configs may use camelCase keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub town: TownConfig,
    #[serde(default)]
    pub beads: BeadsConfig,
    #[serde(default)]
    pub hooks: HooksConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TownConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Identity used as the creator of hooks and sender of mail when none is given.
    #[serde(default, alias = "defaultAgent")]
    pub default_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BeadsConfig {
    /// Beads directory, relative to the town root.
    #[serde(default = "default_beads_dir")]
    pub dir: String,
    /// Prefix for new issue ids.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for BeadsConfig {
    fn default() -> Self {
        Self {
            dir: default_beads_dir(),
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HooksConfig {
    /// Hook directory, relative to the town root. Defaults to the beads directory.
    #[serde(default)]
    pub dir: Option<String>,
    /// What to do when slinging to an agent whose hook is still pending.
    #[serde(default)]
    pub conflict: ConflictPolicy,
    /// Minimum age before an interrupted hook write is swept.
    #[serde(default = "default_sweep_after", alias = "sweepAfterSecs")]
    pub sweep_after_secs: u64,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            dir: None,
            conflict: ConflictPolicy::default(),
            sweep_after_secs: default_sweep_after(),
        }
    }
}

fn default_beads_dir() -> String {
    beads::DEFAULT_DIR.into()
}

fn default_prefix() -> String {
    "gt".into()
}

const fn default_sweep_after() -> u64 {
    300
}

impl Config {
    /// Load config from a file (TOML or JSON, auto-detected by extension).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => Self::parse_toml(&contents).or_else(|_| Self::parse_json(&contents)),
        }
    }

    /// Load the town's config, or defaults when the town has none.
    pub fn load_for_town(root: &Path) -> anyhow::Result<Self> {
        match find_config(root) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_TOML}: {e}")).into())
    }

    /// Parse config from a JSON string (for backwards compatibility).
    pub fn parse_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_JSON}: {e}")).into())
    }

    /// Identity to act as when the caller gives none.
    pub fn default_agent(&self) -> String {
        self.town
            .default_agent
            .clone()
            .unwrap_or_else(|| "operator".to_string())
    }

    pub fn beads_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.beads.dir)
    }

    pub fn hooks_dir(&self, root: &Path) -> PathBuf {
        self.hooks
            .dir
            .as_ref()
            .map_or_else(|| self.beads_dir(root), |dir| root.join(dir))
    }

    pub fn export_path(&self, root: &Path) -> PathBuf {
        self.beads_dir(root).join(beads::EXPORT_FILE)
    }

    pub fn hook_store(&self, root: &Path) -> HookStore {
        HookStore::new(self.hooks_dir(root), self.hooks.conflict)
    }

    pub fn issue_store(&self, root: &Path) -> anyhow::Result<IssueStore> {
        let dir = self.beads_dir(root);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        crate::gitignore::ensure_lines(&dir, beads::LOCAL_ONLY)
            .with_context(|| format!("updating {}/.gitignore", dir.display()))?;
        Ok(IssueStore::open(dir.join(beads::LOCAL_FILE), &self.beads.prefix)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_toml_config() {
        let toml_str = r#"
[town]
name = "gastown"
default_agent = "deacon"

[beads]
dir = "state/beads"
prefix = "hq"

[hooks]
dir = "state/hooks"
conflict = "overwrite"
sweep_after_secs = 60
"#;

        let config = Config::parse_toml(toml_str).unwrap();
        assert_eq!(config.town.name.as_deref(), Some("gastown"));
        assert_eq!(config.default_agent(), "deacon");
        assert_eq!(config.beads.prefix, "hq");
        assert_eq!(config.hooks.conflict, ConflictPolicy::Overwrite);
        assert_eq!(config.hooks.sweep_after_secs, 60);

        let root = Path::new("/town");
        assert_eq!(config.beads_dir(root), Path::new("/town/state/beads"));
        assert_eq!(config.hooks_dir(root), Path::new("/town/state/hooks"));
        assert_eq!(config.export_path(root), Path::new("/town/state/beads/issues.jsonl"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.beads.dir, ".beads");
        assert_eq!(config.beads.prefix, "gt");
        assert_eq!(config.hooks.conflict, ConflictPolicy::Reject);
        assert_eq!(config.default_agent(), "operator");
        let root = Path::new("/town");
        assert_eq!(config.hooks_dir(root), Path::new("/town/.beads"));
    }

    #[test]
    fn parse_json_with_camel_case() {
        let json = r#"{
            "town": { "defaultAgent": "mayor" },
            "hooks": { "conflict": "reject", "sweepAfterSecs": 10 }
        }"#;
        let config = Config::parse_json(json).unwrap();
        assert_eq!(config.default_agent(), "mayor");
        assert_eq!(config.hooks.sweep_after_secs, 10);
    }

    #[test]
    fn unknown_conflict_policy_is_config_error() {
        let err = Config::parse_toml("[hooks]\nconflict = \"merge\"\n").unwrap_err();
        assert!(err.downcast_ref::<ExitError>().is_some());
    }

    #[test]
    fn find_config_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gastown.toml"), "").unwrap();
        std::fs::write(dir.path().join(".gastown.json"), "").unwrap();

        let found = find_config(dir.path()).unwrap();
        assert!(found.to_string_lossy().ends_with(".gastown.toml"));
    }

    #[test]
    fn find_config_falls_back_to_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gastown.json"), "{}").unwrap();

        let found = find_config(dir.path()).unwrap();
        assert!(found.to_string_lossy().ends_with(".gastown.json"));
        assert!(Config::load_for_town(dir.path()).is_ok());
    }

    #[test]
    fn missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_config(dir.path()).is_none());
        let config = Config::load_for_town(dir.path()).unwrap();
        assert_eq!(config.beads.prefix, "gt");
    }

    #[test]
    fn issue_store_keeps_local_file_out_of_git() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let mut store = config.issue_store(dir.path()).unwrap();
        store.create(crate::beads::NewIssue::task("work")).unwrap();
        assert!(dir.path().join(".beads/local.jsonl").exists());
        assert!(crate::gitignore::has_lines(&dir.path().join(".beads"), beads::LOCAL_ONLY));
    }
}
