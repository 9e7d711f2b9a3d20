//! Manifest model (M): parse and normalize the component description of a
//! codebase.
//!
//! Parsing is pure over file contents: the same bytes always produce the
//! same `Manifest`. Component paths and doc paths are resolved relative to
//! the manifest file's own directory, and a `README.md` found on disk under
//! a component's path is folded into `docs` if not already declared.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Stable,
    Active,
    Experimental,
}

impl Default for Stability {
    fn default() -> Self {
        Stability::Active
    }
}

/// Either a single path or a non-empty ordered sequence of paths, both
/// normalized to absolute form relative to the manifest's directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ComponentPath {
    Single(PathBuf),
    Multiple(Vec<PathBuf>),
}

impl ComponentPath {
    pub fn as_slice(&self) -> &[PathBuf] {
        match self {
            ComponentPath::Single(p) => std::slice::from_ref(p),
            ComponentPath::Multiple(ps) => ps.as_slice(),
        }
    }

    fn resolve(&self, base: &Path) -> Self {
        match self {
            ComponentPath::Single(p) => ComponentPath::Single(resolve_path(base, p)),
            ComponentPath::Multiple(ps) => {
                ComponentPath::Multiple(ps.iter().map(|p| resolve_path(base, p)).collect())
            }
        }
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    #[serde(skip)]
    pub name: String,

    pub path: ComponentPath,

    #[serde(default)]
    pub deps: HashSet<String>,

    #[serde(default)]
    pub docs: Vec<PathBuf>,

    #[serde(default)]
    pub tags: HashSet<String>,

    #[serde(default)]
    pub stability: Stability,

    #[serde(default)]
    pub test: Option<String>,

    #[serde(default)]
    pub env: HashSet<String>,
}

#[derive(Debug, Deserialize)]
struct RawComponent {
    path: ComponentPath,
    #[serde(default)]
    deps: HashSet<String>,
    #[serde(default)]
    docs: Vec<PathBuf>,
    #[serde(default)]
    tags: HashSet<String>,
    #[serde(default)]
    stability: Stability,
    #[serde(default)]
    test: Option<String>,
    #[serde(default)]
    env: HashSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub version: String,
    pub components: Vec<Component>,
    #[serde(skip)]
    name_index: HashMap<String, usize>,
}

impl Manifest {
    pub fn get(&self, name: &str) -> Option<&Component> {
        self.name_index.get(name).map(|&i| &self.components[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.name.as_str())
    }

    pub(crate) fn from_components(version: String, components: Vec<Component>) -> Self {
        let name_index = components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self {
            version,
            components,
            name_index,
        }
    }
}

/// Parse a manifest file at `manifest_path`. Auto-discovers a `README.md`
/// under each component path and appends it to `docs` when not already
/// listed. Does not reject `deps` entries naming unknown components — that
/// is a validator concern (§4.4).
pub fn parse_manifest(manifest_path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(manifest_path)?;
    parse_manifest_str(&content, manifest_path)
}

fn parse_manifest_str(content: &str, manifest_path: &Path) -> Result<Manifest> {
    let document: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| Error::MalformedManifest(e.to_string()))?;

    let mapping = document
        .as_mapping()
        .ok_or_else(|| Error::MalformedManifest("manifest root is not a mapping".to_string()))?;

    // serde_yaml::Mapping preserves declaration order; components stay in
    // the order they appear in the file, which the ownership index and
    // `suggest_touches` tie-break depend on.
    let mut version = None;
    let mut entries: Vec<(String, serde_yaml::Value)> = Vec::new();
    for (key, value) in mapping {
        let key = key
            .as_str()
            .ok_or_else(|| Error::MalformedManifest("non-string top-level key".to_string()))?;
        if key == "version" {
            version = value.as_str().map(|s| s.to_string());
        } else {
            entries.push((key.to_string(), value.clone()));
        }
    }

    let version = version
        .ok_or_else(|| Error::MalformedManifest("missing version key".to_string()))?;

    let base = manifest_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut components = Vec::with_capacity(entries.len());
    for (name, raw_value) in entries {
        if name.is_empty() {
            return Err(Error::MalformedManifest(
                "component name must not be empty".to_string(),
            ));
        }

        let raw_component: RawComponent = serde_yaml::from_value(raw_value)
            .map_err(|e| Error::MalformedManifest(format!("component '{}': {}", name, e)))?;

        let path = raw_component.path.resolve(&base);
        if path.as_slice().is_empty() {
            return Err(Error::MalformedManifest(format!(
                "component '{}' has an empty path sequence",
                name
            )));
        }

        let mut docs: Vec<PathBuf> = raw_component
            .docs
            .iter()
            .map(|d| resolve_path(&base, d))
            .collect();
        discover_readmes(&path, &mut docs);

        components.push(Component {
            name,
            path,
            deps: raw_component.deps,
            docs,
            tags: raw_component.tags,
            stability: raw_component.stability,
            test: raw_component.test,
            env: raw_component.env,
        });
    }


    Ok(Manifest::from_components(version, components))
}

fn discover_readmes(path: &ComponentPath, docs: &mut Vec<PathBuf>) {
    for dir in path.as_slice() {
        let readme = dir.join("README.md");
        if readme.is_file() && !docs.contains(&readme) {
            docs.push(readme);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("varp.yaml");
        fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_parse_simple_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/auth")).unwrap();
        let manifest_path = write_manifest(
            dir.path(),
            r#"
version: "1.0"
auth:
  path: src/auth
  stability: stable
"#,
        );

        let manifest = parse_manifest(&manifest_path).unwrap();
        assert_eq!(manifest.version, "1.0");
        let auth = manifest.get("auth").unwrap();
        assert_eq!(auth.stability, Stability::Stable);
        assert_eq!(auth.path.as_slice(), &[dir.path().join("src/auth")]);
    }

    #[test]
    fn test_missing_version_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_manifest(dir.path(), "auth:\n  path: src/auth\n");
        let err = parse_manifest(&manifest_path).unwrap_err();
        assert!(matches!(err, Error::MalformedManifest(_)));
    }

    #[test]
    fn test_default_stability_is_active() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/api")).unwrap();
        let manifest_path = write_manifest(
            dir.path(),
            "version: \"1.0\"\napi:\n  path: src/api\n",
        );
        let manifest = parse_manifest(&manifest_path).unwrap();
        assert_eq!(manifest.get("api").unwrap().stability, Stability::Active);
    }

    #[test]
    fn test_readme_auto_discovery() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/api")).unwrap();
        fs::write(dir.path().join("src/api/README.md"), "# api").unwrap();
        let manifest_path = write_manifest(
            dir.path(),
            "version: \"1.0\"\napi:\n  path: src/api\n",
        );
        let manifest = parse_manifest(&manifest_path).unwrap();
        let api = manifest.get("api").unwrap();
        assert_eq!(api.docs, vec![dir.path().join("src/api/README.md")]);
    }

    #[test]
    fn test_multiple_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/api")).unwrap();
        fs::create_dir_all(dir.path().join("src/api-gen")).unwrap();
        let manifest_path = write_manifest(
            dir.path(),
            "version: \"1.0\"\napi:\n  path: [src/api, src/api-gen]\n",
        );
        let manifest = parse_manifest(&manifest_path).unwrap();
        let api = manifest.get("api").unwrap();
        assert_eq!(api.path.as_slice().len(), 2);
    }

    #[test]
    fn test_unknown_dep_is_not_rejected_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/api")).unwrap();
        let manifest_path = write_manifest(
            dir.path(),
            "version: \"1.0\"\napi:\n  path: src/api\n  deps: [nonexistent]\n",
        );
        let manifest = parse_manifest(&manifest_path).unwrap();
        assert!(manifest.get("api").unwrap().deps.contains("nonexistent"));
    }
}
