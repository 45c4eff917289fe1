use std::collections::{BTreeMap, BTreeSet};

use aho_corasick::AhoCorasick;
use rayon::prelude::*;

use crate::error::{Result, StrataError};
use crate::types::{DependencyEdge, SourceUnit};

/// Link every file to the files whose qualified exports appear inside
/// its import strings.
///
/// A consumer depends on a provider when any of the provider's
/// qualified export paths occurs as a substring of any of the
/// consumer's raw imports. All distinct paths go into one automaton
/// and each import is scanned once with overlapping search, so nested
/// paths like `a.b` and `a.b.C` both match the same import.
pub fn resolve(units: &BTreeMap<String, SourceUnit>) -> Result<BTreeSet<DependencyEdge>> {
    let mut providers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (path, unit) in units {
        for export in unit.qualified_exports.keys() {
            if export.is_empty() {
                continue;
            }
            providers.entry(export.as_str()).or_default().push(path.as_str());
        }
    }
    if providers.is_empty() {
        return Ok(BTreeSet::new());
    }

    let patterns: Vec<&str> = providers.keys().copied().collect();
    let owners: Vec<Vec<&str>> = providers.into_values().collect();
    let automaton = AhoCorasick::new(&patterns).map_err(|e| {
        StrataError::Resolve(format!("failed to build export path matcher: {e}"))
    })?;
    tracing::debug!(patterns = patterns.len(), "built export path matcher");

    let edges: BTreeSet<DependencyEdge> = units
        .par_iter()
        .flat_map_iter(|(consumer, unit)| {
            let mut found = BTreeSet::new();
            for import in &unit.imports {
                for m in automaton.find_overlapping_iter(import.as_str()) {
                    for &provider in &owners[m.pattern().as_usize()] {
                        if provider != consumer.as_str() {
                            found.insert(DependencyEdge::new(consumer.as_str(), provider));
                        }
                    }
                }
            }
            found
        })
        .collect();

    tracing::debug!(edges = edges.len(), "resolved dependency edges");
    Ok(edges)
}
