//! The analysis manifest: every module, the dependency graph and derived
//! project metadata and statistics for one commit.

use crate::extractor::Module;
use crate::graph::DependencyGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use strata_parser::{Language, SymbolKind};

/// Version stamped into every manifest.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File stems that mark an entry point, in any supported language.
const ENTRY_STEMS: &[&str] = &["index", "main", "app", "server", "cli"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisManifest {
    pub tool_version: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub commit_sha: String,
    pub generated_at: DateTime<Utc>,
    /// Sorted by path, paths unique.
    pub modules: Vec<Module>,
    pub dependency_graph: DependencyGraph,
    pub project: ProjectMeta,
    pub stats: AnalysisStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub name: String,
    /// Share of modules per language, in percent (one decimal).
    pub languages: BTreeMap<Language, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_language: Option<Language>,
    pub entry_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub total_modules: usize,
    pub total_symbols: usize,
    pub total_lines: usize,
    pub modules_by_language: BTreeMap<Language, usize>,
    pub symbols_by_kind: BTreeMap<SymbolKind, usize>,
    /// Files skipped (too large, unreadable, parser failure) by the run that
    /// produced this manifest.
    pub skipped_files: usize,
    pub duration_ms: u64,
}

/// Everything the assembler needs besides the modules.
#[derive(Debug, Clone)]
pub struct ManifestContext {
    pub repo: String,
    pub branch: Option<String>,
    pub commit_sha: String,
    pub skipped_files: usize,
    pub duration_ms: u64,
}

impl ManifestContext {
    /// Context for `root`, named after its directory.
    pub fn for_root(root: &Path, commit_sha: impl Into<String>) -> Self {
        Self {
            repo: repo_name(root),
            branch: None,
            commit_sha: commit_sha.into(),
            skipped_files: 0,
            duration_ms: 0,
        }
    }
}

/// Directory name of `root`, `"repository"` if it has none.
pub fn repo_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repository".to_string())
}

impl AnalysisManifest {
    /// Assemble a manifest. Modules are sorted by path; the graph is built
    /// over the full set.
    pub fn assemble(mut modules: Vec<Module>, context: ManifestContext) -> Self {
        modules.sort_by(|a, b| a.path.cmp(&b.path));
        modules.dedup_by(|a, b| a.path == b.path);

        let dependency_graph = DependencyGraph::build(&modules);
        let stats = AnalysisStats::compute(&modules, context.skipped_files, context.duration_ms);
        let project = ProjectMeta::compute(&context.repo, &modules, &stats);

        Self {
            tool_version: TOOL_VERSION.to_string(),
            repo: context.repo,
            branch: context.branch,
            commit_sha: context.commit_sha,
            generated_at: Utc::now(),
            modules,
            dependency_graph,
            project,
            stats,
        }
    }

    pub fn module(&self, path: &str) -> Option<&Module> {
        self.modules
            .binary_search_by(|m| m.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.modules[i])
    }

    /// A copy in which each renamed module, graph node and edge endpoint
    /// carries its new path. `self` is left untouched.
    pub fn with_renames(&self, renames: &HashMap<String, String>) -> Self {
        if renames.is_empty() {
            return self.clone();
        }

        let mut modules: Vec<Module> = self
            .modules
            .iter()
            .map(|m| match renames.get(&m.path) {
                Some(new_path) => Module {
                    path: new_path.clone(),
                    ..m.clone()
                },
                None => m.clone(),
            })
            .collect();
        modules.sort_by(|a, b| a.path.cmp(&b.path));

        Self {
            modules,
            dependency_graph: self.dependency_graph.renamed(renames),
            ..self.clone()
        }
    }
}

impl AnalysisStats {
    pub fn compute(modules: &[Module], skipped_files: usize, duration_ms: u64) -> Self {
        let mut stats = Self {
            total_modules: modules.len(),
            skipped_files,
            duration_ms,
            ..Self::default()
        };
        for module in modules {
            stats.total_symbols += module.symbols.len();
            stats.total_lines += module.line_count;
            *stats.modules_by_language.entry(module.language).or_default() += 1;
            for symbol in &module.symbols {
                *stats.symbols_by_kind.entry(symbol.kind).or_default() += 1;
            }
        }
        stats
    }
}

impl ProjectMeta {
    pub fn compute(name: &str, modules: &[Module], stats: &AnalysisStats) -> Self {
        let total = stats.total_modules.max(1) as f64;
        let languages = stats
            .modules_by_language
            .iter()
            .map(|(lang, count)| (*lang, (*count as f64 * 1000.0 / total).round() / 10.0))
            .collect();

        // Highest count wins; ties go to the language that sorts first.
        let primary_language = stats
            .modules_by_language
            .iter()
            .fold(None::<(Language, usize)>, |best, (lang, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((*lang, *count)),
            })
            .map(|(lang, _)| lang);

        let entry_points = modules
            .iter()
            .filter(|m| is_entry_point(&m.path))
            .map(|m| m.path.clone())
            .collect();

        Self {
            name: name.to_string(),
            languages,
            primary_language,
            entry_points,
        }
    }
}

fn is_entry_point(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    if file_name == "__main__.py" {
        return true;
    }
    let stem = file_name.split('.').next().unwrap_or(file_name);
    ENTRY_STEMS.contains(&stem)
}
