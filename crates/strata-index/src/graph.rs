//! Dependency graph: resolve import specifiers to known files.
//!
//! Resolution is deliberately approximate. Only relative (`./`, `../`) and
//! root-relative (`/`) specifiers are considered; each is tried as a literal
//! path, then with common source extensions, then as a directory holding an
//! index file. The first known file wins. Anything else (packages, aliases,
//! unresolvable paths) produces no edge.

use crate::extractor::Module;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

const EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".py", ".rs", ".go", ".java",
];

const INDEX_FILES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.js",
    "index.jsx",
    "index.mjs",
    "__init__.py",
    "mod.rs",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imported_names: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub type_only: bool,
}

/// Nodes are module paths; edges reference them by value, so cycles are
/// plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: BTreeSet<String>,
    pub edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Build the graph over the complete module set. Edges follow module
    /// order, then import order within a module.
    pub fn build(modules: &[Module]) -> Self {
        let known: HashSet<&str> = modules.iter().map(|m| m.path.as_str()).collect();
        let mut edges = Vec::new();

        for module in modules {
            for import in &module.imports {
                let Some(target) = resolve_import(&module.path, &import.source, &known) else {
                    continue;
                };
                if target == module.path {
                    continue;
                }
                edges.push(DependencyEdge {
                    from: module.path.clone(),
                    to: target,
                    imported_names: import.imported_names(),
                    type_only: import.type_only,
                });
            }
        }

        let graph = Self {
            nodes: modules.iter().map(|m| m.path.clone()).collect(),
            edges,
        };
        debug!(
            "Built dependency graph: {} nodes, {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );
        graph
    }

    /// Target path → paths that import it.
    pub fn dependents(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut index: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for edge in &self.edges {
            index
                .entry(edge.to.as_str())
                .or_default()
                .insert(edge.from.as_str());
        }
        index
    }

    /// Paths imported by `path`.
    pub fn dependencies_of(&self, path: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == path)
            .map(|e| e.to.as_str())
            .collect()
    }

    /// A copy with every occurrence of an old path replaced by its new one.
    pub fn renamed(&self, renames: &HashMap<String, String>) -> Self {
        let rename = |path: &String| renames.get(path).unwrap_or(path).clone();
        Self {
            nodes: self.nodes.iter().map(rename).collect(),
            edges: self
                .edges
                .iter()
                .map(|e| DependencyEdge {
                    from: rename(&e.from),
                    to: rename(&e.to),
                    ..e.clone()
                })
                .collect(),
        }
    }

    /// Every edge endpoint is a node.
    pub fn is_consistent(&self) -> bool {
        self.edges
            .iter()
            .all(|e| self.nodes.contains(&e.from) && self.nodes.contains(&e.to))
    }
}

/// Resolve `specifier`, imported from the module at `from`, to a known path.
pub fn resolve_import(from: &str, specifier: &str, known: &HashSet<&str>) -> Option<String> {
    let base = if let Some(rooted) = specifier.strip_prefix('/') {
        normalize("", rooted)?
    } else if is_relative(specifier) {
        let dir = from.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        normalize(dir, specifier)?
    } else {
        return None;
    };

    candidates(&base).find(|candidate| known.contains(candidate.as_str()))
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    let literal = (!base.is_empty()).then(|| base.to_string());
    let with_ext = EXTENSIONS
        .iter()
        .filter(move |_| !base.is_empty())
        .map(move |ext| format!("{}{}", base, ext));
    let index = INDEX_FILES.iter().map(move |file| {
        if base.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", base, file)
        }
    });
    literal.into_iter().chain(with_ext).chain(index)
}

/// Join `relative` onto `dir` and collapse `.`/`..`. `None` if the result
/// would climb above the root.
fn normalize(dir: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
