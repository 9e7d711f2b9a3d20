//! Tunables for this core: freshness tolerance and the `.varp/` directory
//! name. Three-tier resolution, later wins:
//! built-in default < `.varp/config.toml` (if present) < `VARP_*` env var.
//!
//! This is not the orchestrator's own config system — it only resolves the
//! handful of knobs this crate reads at call time.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Seconds a doc may lag its component's source-max mtime before being
    /// considered stale.
    pub freshness_tolerance_secs: u64,

    /// Name of the state directory under the manifest's parent, holding
    /// `freshness.json`.
    pub state_dir_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            freshness_tolerance_secs: 5,
            state_dir_name: ".varp".to_string(),
        }
    }
}

impl Config {
    /// Resolve the config for a manifest located at `manifest_path`: start
    /// from the default, merge `<manifest_dir>/.varp/config.toml` if present,
    /// then apply `VARP_FRESHNESS_TOLERANCE_SECS`/`VARP_STATE_DIR_NAME` env
    /// overrides.
    pub fn resolve(manifest_path: &Path) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = manifest_path.parent() {
            let candidate = dir.join(&config.state_dir_name).join("config.toml");
            if candidate.exists() {
                let content = std::fs::read_to_string(&candidate)?;
                let file_config: FileConfig = toml::from_str(&content)
                    .map_err(|e| crate::error::Error::Internal(e.to_string()))?;
                file_config.merge_into(&mut config);
            }
        }

        if let Ok(v) = std::env::var("VARP_FRESHNESS_TOLERANCE_SECS") {
            if let Ok(secs) = v.parse() {
                config.freshness_tolerance_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("VARP_STATE_DIR_NAME") {
            if !v.is_empty() {
                config.state_dir_name = v;
            }
        }

        Ok(config)
    }

    pub fn state_dir(&self, manifest_path: &Path) -> PathBuf {
        manifest_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.state_dir_name)
    }
}

/// On-disk shape of `.varp/config.toml`; every field optional so a file may
/// override just one tunable.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    freshness_tolerance_secs: Option<u64>,
    state_dir_name: Option<String>,
}

impl FileConfig {
    fn merge_into(self, config: &mut Config) {
        if let Some(secs) = self.freshness_tolerance_secs {
            config.freshness_tolerance_secs = secs;
        }
        if let Some(name) = self.state_dir_name {
            config.state_dir_name = name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_tolerance() {
        let config = Config::default();
        assert_eq!(config.freshness_tolerance_secs, 5);
        assert_eq!(config.state_dir_name, ".varp");
    }

    #[test]
    fn test_resolve_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("varp.yaml");
        let config = Config::resolve(&manifest_path).unwrap();
        assert_eq!(config.freshness_tolerance_secs, 5);
    }

    #[test]
    fn test_resolve_with_config_file_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".varp")).unwrap();
        fs::write(
            dir.path().join(".varp/config.toml"),
            "freshness_tolerance_secs = 30\n",
        )
        .unwrap();

        let manifest_path = dir.path().join("varp.yaml");
        let config = Config::resolve(&manifest_path).unwrap();
        assert_eq!(config.freshness_tolerance_secs, 30);
        assert_eq!(config.state_dir_name, ".varp");
    }

    #[test]
    fn test_state_dir() {
        let config = Config::default();
        let manifest_path = Path::new("/repo/varp.yaml");
        assert_eq!(config.state_dir(manifest_path), PathBuf::from("/repo/.varp"));
    }
}
