//! Import analyzer (I): scans component source files for static import
//! specifiers, resolves them to absolute paths, and attributes each
//! resolved import to its owning component via the ownership index.

use crate::graph::OwnershipIndex;
use crate::manifest::Manifest;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Matches `from "spec"`, `import("spec")`, and `require("spec")` with
/// either quote style, across the JS/TS and Rust-flavored forms this
/// analyzer scans.
fn import_specifier_pattern() -> Regex {
    Regex::new(r#"(?:from|import|require)\s*\(?\s*["']([^"']+)["']"#)
        .expect("import specifier pattern is a fixed, valid regex")
}

/// A single `(pattern, target)` alias entry from a TypeScript-style config,
/// e.g. `"@app/*": ["src/app/*"]`. `extends` chains are flattened into this
/// table before resolution starts.
#[derive(Debug, Clone, Default, Deserialize)]
struct AliasFile {
    #[serde(default)]
    extends: Option<String>,
    #[serde(default, rename = "compilerOptions")]
    compiler_options: CompilerOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CompilerOptions {
    #[serde(default)]
    paths: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<(String, String)>,
}

impl AliasTable {
    /// Load a TypeScript-style config file at `path`, following its `extends`
    /// chain to a fixed point. Entries declared closer to `path` win over
    /// entries inherited from `extends`.
    pub fn load(path: &Path) -> Self {
        let mut chain = Vec::new();
        let mut current = Some(path.to_path_buf());
        let mut visited = HashSet::new();

        while let Some(file) = current {
            if !visited.insert(file.clone()) {
                break; // extends cycle; stop rather than loop forever
            }
            let Ok(content) = std::fs::read_to_string(&file) else {
                break;
            };
            let Ok(parsed) = serde_json::from_str::<AliasFile>(&content) else {
                break;
            };
            let next = parsed
                .extends
                .as_ref()
                .map(|rel| file.parent().unwrap_or(Path::new(".")).join(rel));
            chain.push(parsed);
            current = next;
        }

        // Nearest file's entries should win, so keep `chain` in its
        // original nearest-to-furthest order and let `resolve` take the
        // first match.
        let mut entries = Vec::new();
        for parsed in chain {
            for (pattern, targets) in parsed.compiler_options.paths {
                if let Some(target) = targets.into_iter().next() {
                    entries.push((pattern, target));
                }
            }
        }
        Self { entries }
    }

    /// Resolve `specifier` against this table. Supports a single wildcard
    /// suffix (`prefix/*`) on both pattern and target.
    fn resolve(&self, specifier: &str) -> Option<String> {
        for (pattern, target) in &self.entries {
            if let (Some(p), Some(t)) = (pattern.strip_suffix("/*"), target.strip_suffix("/*")) {
                if let Some(rest) = specifier.strip_prefix(p).and_then(|r| r.strip_prefix('/')) {
                    return Some(format!("{}/{}", t, rest));
                }
            } else if pattern == specifier {
                return Some(target.clone());
            }
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ImportEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportReport {
    pub import_deps: Vec<ImportEdge>,
    pub missing_deps: Vec<(String, String)>,
    pub extra_deps: Vec<(String, String)>,
    pub files_scanned: usize,
    pub imports_found: usize,
}

/// Per-file scan output, merged back into `ImportReport` after the
/// parallel fan-out below.
struct FileScan {
    edges: Vec<ImportEdge>,
    imports_found: usize,
}

fn scan_one_file(name: &str, path: &Path, pattern: &Regex, ownership: &OwnershipIndex, aliases: &AliasTable) -> FileScan {
    let mut scan = FileScan {
        edges: Vec::new(),
        imports_found: 0,
    };
    let Ok(contents) = std::fs::read_to_string(path) else {
        return scan;
    };
    for specifier in extract_import_specifiers(&contents, pattern) {
        scan.imports_found += 1;
        let Some(resolved) = resolve_specifier(&specifier, path, aliases) else {
            continue;
        };
        let Some(to) = ownership.owner_of(&resolved) else {
            continue;
        };
        if to != name {
            scan.edges.push(ImportEdge {
                from: name.to_string(),
                to: to.to_string(),
            });
        }
    }
    scan
}

/// Scan every source file under every component's path(s), resolve each
/// import specifier, attribute it to a component, and diff the resulting
/// edge set against declared `deps` (§4.7). The directory walk that
/// enumerates files stays sequential (it's cheap metadata traversal); the
/// read-and-extract step per file is the embarrassingly parallel part and
/// runs via `rayon`, with the merge back into one edge set staying
/// sequential and order-independent (both outputs are sorted below).
pub fn infer_imports(manifest: &Manifest, aliases: &AliasTable) -> ImportReport {
    let ownership = OwnershipIndex::build(manifest);
    let pattern = import_specifier_pattern();

    let mut scan_targets: Vec<(&str, PathBuf)> = Vec::new();
    for name in manifest.names() {
        let component = manifest.get(name).expect("name from manifest.names()");
        for root in component.path.as_slice() {
            for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if is_source_file(path) {
                    scan_targets.push((name, path.to_path_buf()));
                }
            }
        }
    }
    let files_scanned = scan_targets.len();

    let per_file: Vec<FileScan> = scan_targets
        .par_iter()
        .map(|(name, path)| scan_one_file(name, path, &pattern, &ownership, aliases))
        .collect();

    let mut edges: HashSet<ImportEdge> = HashSet::new();
    let mut imports_found = 0usize;
    for scan in per_file {
        imports_found += scan.imports_found;
        edges.extend(scan.edges);
    }

    let mut import_deps: Vec<ImportEdge> = edges.into_iter().collect();
    import_deps.sort_by(|a, b| (a.from.as_str(), a.to.as_str()).cmp(&(b.from.as_str(), b.to.as_str())));

    let declared: HashSet<(String, String)> = manifest
        .names()
        .flat_map(|name| {
            let component = manifest.get(name).unwrap();
            component
                .deps
                .iter()
                .map(move |dep| (name.to_string(), dep.clone()))
        })
        .collect();
    let inferred: HashSet<(String, String)> = import_deps
        .iter()
        .map(|e| (e.from.clone(), e.to.clone()))
        .collect();

    let mut missing_deps: Vec<(String, String)> =
        inferred.difference(&declared).cloned().collect();
    missing_deps.sort();
    let mut extra_deps: Vec<(String, String)> = declared.difference(&inferred).cloned().collect();
    extra_deps.sort();

    ImportReport {
        import_deps,
        missing_deps,
        extra_deps,
        files_scanned,
        imports_found,
    }
}

fn is_source_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("rs") | Some("ts") | Some("tsx") | Some("js") | Some("jsx")
    )
}

/// Regex-based specifier extraction, matching a small set of import forms
/// rather than parsing a full AST — sufficient for static specifier text
/// regardless of source language.
fn extract_import_specifiers(contents: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .captures_iter(contents)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn resolve_specifier(specifier: &str, importing_file: &Path, aliases: &AliasTable) -> Option<PathBuf> {
    if specifier.starts_with("./") || specifier.starts_with("../") {
        let base = importing_file.parent()?;
        return Some(normalize_join(base, specifier));
    }
    if let Some(resolved) = aliases.resolve(specifier) {
        return Some(PathBuf::from(resolved));
    }
    None // bare external package specifier, out of scope
}

fn normalize_join(base: &Path, specifier: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for part in specifier.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
