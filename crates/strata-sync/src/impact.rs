//! Reverse-dependency impact analysis.

use std::collections::{BTreeSet, VecDeque};
use strata_index::DependencyGraph;

/// Every module that transitively imports one of `seeds`, excluding the
/// seeds themselves.
///
/// Breadth-first over the reverse-dependency index; the visited set keeps
/// cyclic graphs finite and each path appears at most once.
pub fn impacted_modules<'a, I>(graph: &DependencyGraph, seeds: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let dependents = graph.dependents();
    let seeds: BTreeSet<&str> = seeds.into_iter().collect();

    let mut visited: BTreeSet<&str> = seeds.clone();
    let mut impacted: BTreeSet<&str> = BTreeSet::new();
    let mut queue: VecDeque<&str> = seeds.iter().copied().collect();

    while let Some(current) = queue.pop_front() {
        let Some(importers) = dependents.get(current) else {
            continue;
        };
        for &importer in importers {
            if visited.insert(importer) {
                impacted.insert(importer);
                queue.push_back(importer);
            }
        }
    }

    impacted
        .into_iter()
        .filter(|path| !seeds.contains(path))
        .map(str::to_string)
        .collect()
}
