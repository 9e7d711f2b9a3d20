//! Freshness (F): compares component source modification times against
//! their attached docs, with a tolerance that absorbs batch-edit races
//! (§4.9).

use crate::config::Config;
use crate::manifest::Manifest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocFreshness {
    pub path: String,
    pub last_modified: String,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentFreshness {
    pub docs: HashMap<String, DocFreshness>,
    pub source_last_modified: Option<String>,
}

/// Report freshness for every component in `manifest`, using `config`'s
/// tolerance (default 5s, §4.9).
pub fn check_freshness(manifest: &Manifest, config: &Config) -> HashMap<String, ComponentFreshness> {
    let tolerance = config.freshness_tolerance_secs;
    let mut report = HashMap::new();

    for name in manifest.names() {
        let component = manifest.get(name).expect("name from manifest.names()");
        let source_max = max_source_mtime(component.path.as_slice());

        let mut docs = HashMap::new();
        for doc in &component.docs {
            let basename = doc
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            let entry = match (mtime_of(doc), source_max) {
                (Some(doc_mtime), Some(src_mtime)) => {
                    let stale = doc_mtime + std::time::Duration::from_secs(tolerance) < src_mtime;
                    DocFreshness {
                        path: doc.display().to_string(),
                        last_modified: to_iso8601(doc_mtime),
                        stale,
                    }
                }
                (Some(doc_mtime), None) => DocFreshness {
                    path: doc.display().to_string(),
                    last_modified: to_iso8601(doc_mtime),
                    stale: false,
                },
                (None, _) => DocFreshness {
                    path: doc.display().to_string(),
                    last_modified: "N/A".to_string(),
                    stale: true,
                },
            };
            docs.insert(basename, entry);
        }

        report.insert(
            name.to_string(),
            ComponentFreshness {
                docs,
                source_last_modified: source_max.map(to_iso8601),
            },
        );
    }

    report
}

/// Maximum modification time over source files under `roots`, excluding
/// doc files (`.md`) and test files/directories so that editing a doc
/// can't mark itself fresh.
fn max_source_mtime(roots: &[std::path::PathBuf]) -> Option<SystemTime> {
    let mut max: Option<SystemTime> = None;
    for root in roots {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || is_excluded(path) {
                continue;
            }
            if let Some(mtime) = mtime_of(path) {
                max = Some(max.map_or(mtime, |m| m.max(mtime)));
            }
        }
    }
    max
}

fn is_excluded(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) == Some("md") {
        return true;
    }
    path.components().any(|c| {
        let part = c.as_os_str().to_string_lossy();
        part.contains("test")
    })
}

fn mtime_of(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

fn to_iso8601(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Component, ComponentPath, Stability};
    use std::collections::HashSet;
    use std::fs;
    use std::thread::sleep;
    use std::time::Duration;

    fn component(name: &str, path: std::path::PathBuf, docs: Vec<std::path::PathBuf>) -> Component {
        Component {
            name: name.to_string(),
            path: ComponentPath::Single(path),
            deps: HashSet::new(),
            docs,
            tags: HashSet::new(),
            stability: Stability::Active,
            test: None,
            env: HashSet::new(),
        }
    }

    #[test]
    fn test_stale_doc_detected() {
        let dir = tempfile::tempdir().unwrap();
        let src_dir = dir.path().join("src");
        fs::create_dir_all(&src_dir).unwrap();
        let doc_path = dir.path().join("README.md");
        fs::write(&doc_path, "# old").unwrap();

        sleep(Duration::from_millis(20));
        fs::write(src_dir.join("lib.rs"), "fn main() {}").unwrap();

        let manifest = Manifest::from_components(
            "1.0".to_string(),
            vec![component("api", src_dir.clone(), vec![doc_path.clone()])],
        );
        let config = Config::default();
        let report = check_freshness(&manifest, &config);
        let api = &report["api"];
        let doc = &api.docs["README.md"];
        assert!(doc.stale);
    }

    #[test]
    fn test_fresh_doc_not_stale() {
        let dir = tempfile::tempdir().unwrap();
        let src_dir = dir.path().join("src");
        fs::create_dir_all(&src_dir).unwrap();
        fs::write(src_dir.join("lib.rs"), "fn main() {}").unwrap();

        sleep(Duration::from_millis(20));
        let doc_path = dir.path().join("README.md");
        fs::write(&doc_path, "# new").unwrap();

        let manifest = Manifest::from_components(
            "1.0".to_string(),
            vec![component("api", src_dir.clone(), vec![doc_path.clone()])],
        );
        let config = Config::default();
        let report = check_freshness(&manifest, &config);
        assert!(!report["api"].docs["README.md"].stale);
    }

    #[test]
    fn test_missing_doc_reports_na_and_stale() {
        let dir = tempfile::tempdir().unwrap();
        let src_dir = dir.path().join("src");
        fs::create_dir_all(&src_dir).unwrap();
        fs::write(src_dir.join("lib.rs"), "fn main() {}").unwrap();

        let manifest = Manifest::from_components(
            "1.0".to_string(),
            vec![component(
                "api",
                src_dir.clone(),
                vec![dir.path().join("MISSING.md")],
            )],
        );
        let config = Config::default();
        let report = check_freshness(&manifest, &config);
        let doc = &report["api"].docs["MISSING.md"];
        assert_eq!(doc.last_modified, "N/A");
        assert!(doc.stale);
    }
}
