use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use strata_core::graph::RootGraphDoc;
use strata_core::{FileFailure, GraphResult, SourceUnit};

pub const FILE_TREES: &str = "file_trees.json";
pub const FULL_GRAPH: &str = "full_graph.json";
pub const ROOT_GRAPH: &str = "repos_graph.json";
pub const README_AGGREGATE: &str = "repos_readme.json";
/// Subdirectory of the output dir holding one graph per component.
pub const COMPONENT_DIR: &str = "files";

/// Where a run's artifacts go.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub output_dir: PathBuf,
    pub index_dir: PathBuf,
}

/// Pretty JSON with object keys in sorted order.
///
/// Routing through `serde_json::Value` sorts every map, including
/// struct fields.
pub fn to_sorted_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("failed to serialize artifact")?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Write every artifact of `result`. Returns the written paths in order.
pub fn write_artifacts(result: &GraphResult, paths: &ArtifactPaths) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let units: Vec<&SourceUnit> = result.file_trees.values().collect();
    written.push(write_json(&paths.index_dir.join(FILE_TREES), &units)?);
    written.push(write_json(
        &paths.output_dir.join(FULL_GRAPH),
        &result.file_graph,
    )?);

    let component_dir = paths.output_dir.join(COMPONENT_DIR);
    for (component, graph) in &result.component_graphs {
        let path = component_dir.join(format!("{component}.json"));
        written.push(write_json(&path, graph)?);
    }

    written.push(write_json(
        &paths.output_dir.join(ROOT_GRAPH),
        &result.root_graph,
    )?);
    written.push(write_json(
        &paths.output_dir.join(README_AGGREGATE),
        &result.readmes,
    )?);

    tracing::info!(count = written.len(), "artifacts written");
    Ok(written)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = to_sorted_json(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote artifact");
    Ok(path.to_path_buf())
}

/// Machine-readable summary of a run.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub files: usize,
    pub edges: usize,
    pub components: usize,
    pub modules: usize,
    pub failures: &'a [FileFailure],
    pub skipped: &'a [FileFailure],
    pub cycles: &'a [Vec<String>],
    pub root_graph: &'a RootGraphDoc,
}

impl<'a> RunSummary<'a> {
    pub fn new(result: &'a GraphResult) -> Self {
        Self {
            files: result.file_trees.len(),
            edges: result.file_graph.links.len(),
            components: result.root_graph.nodes.len(),
            modules: result.modules.len(),
            failures: &result.failures,
            skipped: &result.skipped,
            cycles: &result.cycles,
            root_graph: &result.root_graph,
        }
    }
}

/// Format the run summary as JSON.
pub fn format_summary(result: &GraphResult) -> Result<String> {
    to_sorted_json(&RunSummary::new(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use strata_core::{DependencyEdge, ReadmeEntry, ScanOutput};

    fn sample_result() -> GraphResult {
        let mut scan = ScanOutput::default();
        for (path, component, size) in [
            ("repos/teamA/src/A.java", "teamA", 120),
            ("repos/teamA/src/B.java", "teamA", 30),
            ("repos/teamB/src/C.java", "teamB", 50),
        ] {
            scan.file_trees.insert(
                path.to_string(),
                SourceUnit {
                    file_path: path.to_string(),
                    ..SourceUnit::default()
                },
            );
            scan.file_sizes.insert(path.to_string(), size);
            scan.component_of
                .insert(path.to_string(), component.to_string());
        }
        scan.readmes.push(ReadmeEntry {
            id: "teamA".to_string(),
            content: "# Team A".to_string(),
        });
        scan.failures.push(FileFailure {
            path: PathBuf::from("repos/teamB/src/locked.java"),
            message: "permission denied".to_string(),
        });

        let edges: BTreeSet<DependencyEdge> = [
            DependencyEdge::new("repos/teamA/src/B.java", "repos/teamA/src/A.java"),
            DependencyEdge::new("repos/teamB/src/C.java", "repos/teamA/src/A.java"),
        ]
        .into_iter()
        .collect();
        GraphResult::from_scan(scan, &edges)
    }

    fn read_json(path: &Path) -> serde_json::Value {
        let content = fs::read_to_string(path).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_write_artifacts_layout() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths {
            output_dir: dir.path().join("assets"),
            index_dir: dir.path().join("index"),
        };
        let written = write_artifacts(&sample_result(), &paths).unwrap();
        assert_eq!(written.len(), 6);

        let trees = read_json(&paths.index_dir.join(FILE_TREES));
        assert_eq!(trees.as_array().unwrap().len(), 3);
        assert_eq!(trees[0]["file_path"], "repos/teamA/src/A.java");

        let full = read_json(&paths.output_dir.join(FULL_GRAPH));
        assert_eq!(full["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(full["links"].as_array().unwrap().len(), 2);

        let team_a = read_json(&paths.output_dir.join(COMPONENT_DIR).join("teamA.json"));
        assert_eq!(team_a["links"].as_array().unwrap().len(), 1);
        let team_b = read_json(&paths.output_dir.join(COMPONENT_DIR).join("teamB.json"));
        assert!(team_b["links"].as_array().unwrap().is_empty());

        let root = read_json(&paths.output_dir.join(ROOT_GRAPH));
        assert_eq!(root["links"][0]["source"], "teamB");
        assert_eq!(root["links"][0]["target"], "teamA");
        assert_eq!(root["nodes"][0]["fileCount"], 2);
        assert_eq!(root["nodes"][0]["fileSize"], 150);

        let readmes = read_json(&paths.output_dir.join(README_AGGREGATE));
        assert_eq!(readmes[0]["id"], "teamA");
    }

    #[test]
    fn test_artifact_keys_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths {
            output_dir: dir.path().to_path_buf(),
            index_dir: dir.path().to_path_buf(),
        };
        write_artifacts(&sample_result(), &paths).unwrap();

        let text = fs::read_to_string(dir.path().join(FILE_TREES)).unwrap();
        let class_names = text.find("\"class_names\"").unwrap();
        let file_path = text.find("\"file_path\"").unwrap();
        let functions = text.find("\"functions\"").unwrap();
        let package = text.find("\"package\"").unwrap();
        assert!(class_names < file_path && file_path < functions && functions < package);
    }

    #[test]
    fn test_rewrite_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths {
            output_dir: dir.path().join("out"),
            index_dir: dir.path().join("out"),
        };
        write_artifacts(&sample_result(), &paths).unwrap();
        let first = fs::read_to_string(paths.output_dir.join(FULL_GRAPH)).unwrap();
        write_artifacts(&sample_result(), &paths).unwrap();
        let second = fs::read_to_string(paths.output_dir.join(FULL_GRAPH)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_format_summary() {
        let json = format_summary(&sample_result()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["files"], 3);
        assert_eq!(parsed["edges"], 2);
        assert_eq!(parsed["components"], 2);
        assert_eq!(parsed["failures"].as_array().unwrap().len(), 1);
        assert!(parsed["cycles"].as_array().unwrap().is_empty());
        assert!(parsed.get("root_graph").is_some());
    }
}
