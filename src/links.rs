//! Link analyzer (L): scans each component's docs for Markdown link
//! targets and classifies them against the manifest (§4.8).

use crate::graph::OwnershipIndex;
use crate::manifest::Manifest;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LinkEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokenLink {
    pub doc: PathBuf,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutsideLink {
    pub doc: PathBuf,
    pub target: String,
    pub resolved: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkReport {
    pub link_deps: Vec<LinkEdge>,
    pub missing_deps: Vec<(String, String)>,
    pub extra_deps: Vec<(String, String)>,
    pub broken_links: Vec<BrokenLink>,
    pub outside_links: Vec<OutsideLink>,
    pub docs_scanned: usize,
    pub links_found: usize,
}

/// Per-doc scan output, merged back into `LinkReport` after the parallel
/// fan-out below.
struct DocScan {
    edges: Vec<LinkEdge>,
    broken_links: Vec<BrokenLink>,
    outside_links: Vec<OutsideLink>,
    links_found: usize,
}

fn scan_one_doc(name: &str, doc: &Path, ownership: &OwnershipIndex) -> DocScan {
    let mut scan = DocScan {
        edges: Vec::new(),
        broken_links: Vec::new(),
        outside_links: Vec::new(),
        links_found: 0,
    };
    let Ok(contents) = std::fs::read_to_string(doc) else {
        return scan;
    };
    let doc_dir = doc.parent().unwrap_or(Path::new("."));

    for target in extract_markdown_links(&contents) {
        if target.starts_with("http://") || target.starts_with("https://") || target.starts_with('#') {
            continue; // external or same-doc anchor, out of scope
        }
        scan.links_found += 1;
        let resolved = normalize_join(doc_dir, &target);

        if !resolved.is_file() {
            scan.broken_links.push(BrokenLink {
                doc: doc.to_path_buf(),
                target,
            });
            continue;
        }

        match ownership.owner_of(&resolved) {
            Some(to) if to != name => {
                scan.edges.push(LinkEdge {
                    from: name.to_string(),
                    to: to.to_string(),
                });
            }
            Some(_) => {} // link stays within the same component
            None => scan.outside_links.push(OutsideLink {
                doc: doc.to_path_buf(),
                target,
                resolved,
            }),
        }
    }
    scan
}

/// Scan every doc attached to every component, resolve each Markdown link
/// target relative to its containing doc, and classify it (§4.8). Docs are
/// read and scanned in parallel since each doc's scan is independent; the
/// parallel fan-out only touches the read-and-extract step, the merge back
/// into one report stays sequential and order-preserving.
pub fn scan_links(manifest: &Manifest) -> LinkReport {
    let ownership = OwnershipIndex::build(manifest);

    let scan_targets: Vec<(&str, PathBuf)> = manifest
        .names()
        .flat_map(|name| {
            let component = manifest.get(name).expect("name from manifest.names()");
            component.docs.iter().map(move |doc| (name, doc.clone()))
        })
        .collect();
    let docs_scanned = scan_targets.len();

    let per_doc: Vec<DocScan> = scan_targets
        .par_iter()
        .map(|(name, doc)| scan_one_doc(name, doc, &ownership))
        .collect();

    let mut edges: HashSet<LinkEdge> = HashSet::new();
    let mut broken_links = Vec::new();
    let mut outside_links = Vec::new();
    let mut links_found = 0usize;
    for scan in per_doc {
        links_found += scan.links_found;
        edges.extend(scan.edges);
        broken_links.extend(scan.broken_links);
        outside_links.extend(scan.outside_links);
    }

    let mut link_deps: Vec<LinkEdge> = edges.into_iter().collect();
    link_deps.sort_by(|a, b| (a.from.as_str(), a.to.as_str()).cmp(&(b.from.as_str(), b.to.as_str())));

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
    let inferred: HashSet<(String, String)> =
        link_deps.iter().map(|e| (e.from.clone(), e.to.clone())).collect();

    let mut missing_deps: Vec<(String, String)> =
        inferred.difference(&declared).cloned().collect();
    missing_deps.sort();
    let mut extra_deps: Vec<(String, String)> = declared.difference(&inferred).cloned().collect();
    extra_deps.sort();

    LinkReport {
        link_deps,
        missing_deps,
        extra_deps,
        broken_links,
        outside_links,
        docs_scanned,
        links_found,
    }
}

/// Extract `[text](target)` Markdown link targets, skipping image embeds
/// (`![alt](target)`).
fn extract_markdown_links(contents: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let bytes = contents.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' && (i == 0 || bytes[i - 1] != b'!') {
            if let Some(close_bracket) = contents[i..].find(']') {
                let after = i + close_bracket + 1;
                if contents.as_bytes().get(after) == Some(&b'(') {
                    if let Some(close_paren) = contents[after..].find(')') {
                        let target = &contents[after + 1..after + close_paren];
                        let target = target.split_whitespace().next().unwrap_or("");
                        if !target.is_empty() {
                            targets.push(target.to_string());
                        }
                        i = after + close_paren;
                        continue;
                    }
                }
            }
        }
        i += 1;
    }
    targets
}

fn normalize_join(base: &Path, target: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for part in target.split('/') {
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
