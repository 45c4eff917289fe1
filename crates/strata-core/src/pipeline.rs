use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::analyzer::LanguageAdapter;
use crate::config::{Config, ReadErrorPolicy};
use crate::error::{Result, StrataError};
use crate::graph::{DependencyGraph, FileGraphDoc, RootGraphDoc};
use crate::resolve;
use crate::types::{
    component_for_path, package_name, path_id, DependencyEdge, FileFailure, ReadmeEntry,
    SourceUnit,
};

/// Everything the batch driver collects before resolution.
#[derive(Debug, Default, Serialize)]
pub struct ScanOutput {
    pub file_trees: BTreeMap<String, SourceUnit>,
    pub file_sizes: BTreeMap<String, u64>,
    pub component_of: BTreeMap<String, String>,
    /// Top-level directory name -> (file path -> content).
    pub modules: BTreeMap<String, BTreeMap<String, String>>,
    pub readmes: Vec<ReadmeEntry>,
    /// Files that could not be read.
    pub failures: Vec<FileFailure>,
    /// Files that were read but could not be parsed.
    pub skipped: Vec<FileFailure>,
}

/// Result of a full run: scan, resolve and aggregate.
#[derive(Debug, Serialize)]
pub struct GraphResult {
    pub modules: BTreeMap<String, BTreeMap<String, String>>,
    pub file_sizes: BTreeMap<String, u64>,
    pub component_of: BTreeMap<String, String>,
    pub file_trees: BTreeMap<String, SourceUnit>,
    pub file_graph: FileGraphDoc,
    pub component_graphs: BTreeMap<String, FileGraphDoc>,
    pub root_graph: RootGraphDoc,
    pub readmes: Vec<ReadmeEntry>,
    pub failures: Vec<FileFailure>,
    pub skipped: Vec<FileFailure>,
    /// File groups that import each other in a cycle.
    pub cycles: Vec<Vec<String>>,
}

impl GraphResult {
    /// Aggregate a finished scan and its resolved edges into graph views.
    pub fn from_scan(scan: ScanOutput, edges: &BTreeSet<DependencyEdge>) -> Self {
        let packages: BTreeMap<String, String> = scan
            .file_trees
            .iter()
            .map(|(path, unit)| (path.clone(), package_name(unit.package.as_deref())))
            .collect();
        let graph = DependencyGraph::build(&scan.file_sizes, &scan.component_of, &packages, edges);
        let cycles = graph.find_cycles();

        tracing::info!(
            files = graph.node_count(),
            edges = graph.edge_count(),
            cycles = cycles.len(),
            "dependency graph built"
        );

        Self {
            file_graph: graph.to_doc(),
            component_graphs: graph.component_graphs(),
            root_graph: graph.root_graph(),
            cycles,
            modules: scan.modules,
            file_sizes: scan.file_sizes,
            component_of: scan.component_of,
            file_trees: scan.file_trees,
            readmes: scan.readmes,
            failures: scan.failures,
            skipped: scan.skipped,
        }
    }
}

enum FileOutcome {
    Extracted {
        id: String,
        unit: SourceUnit,
        content: String,
    },
    Unparsed(FileFailure),
    Unreadable(FileFailure),
}

/// Batch driver shared by the CLI commands.
pub struct Pipeline {
    adapters: Vec<Box<dyn LanguageAdapter>>,
    config: Config,
    exclude_patterns: GlobSet,
}

impl Pipeline {
    /// Build a pipeline from the registered adapters, keeping the ones
    /// selected by `[project] languages`.
    pub fn new(adapters: Vec<Box<dyn LanguageAdapter>>, config: Config) -> Result<Self> {
        let available: Vec<&'static str> = adapters.iter().map(|a| a.language()).collect();
        for lang in &config.project.languages {
            if !available.contains(&lang.as_str()) {
                return Err(StrataError::Configuration(format!(
                    "unknown language '{lang}' (available: {})",
                    available.join(", ")
                )));
            }
        }

        let adapters = if config.project.languages.is_empty() {
            adapters
        } else {
            adapters
                .into_iter()
                .filter(|a| config.project.languages.iter().any(|l| l == a.language()))
                .collect()
        };

        let mut builder = GlobSetBuilder::new();
        for pattern in &config.project.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                StrataError::Configuration(format!("invalid exclude pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }
        let exclude_patterns = builder.build().map_err(|e| {
            StrataError::Configuration(format!("failed to build exclude patterns: {e}"))
        })?;

        Ok(Self {
            adapters,
            config,
            exclude_patterns,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn adapters(&self) -> &[Box<dyn LanguageAdapter>] {
        &self.adapters
    }

    /// Adapter responsible for `path`, chosen by extension.
    pub fn adapter_for(&self, path: &Path) -> Option<&dyn LanguageAdapter> {
        self.adapters
            .iter()
            .find(|a| a.handles(path))
            .map(|a| a.as_ref())
    }

    /// Whether a path relative to the scanned root is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        let excluded_dir = relative.components().any(|c| match c {
            Component::Normal(segment) => segment
                .to_str()
                .is_some_and(|s| self.config.project.exclude_dirs.iter().any(|d| d == s)),
            _ => false,
        });
        excluded_dir || self.exclude_patterns.is_match(relative)
    }

    /// Read and extract a single file.
    pub fn extract_file(&self, path: &Path) -> Result<SourceUnit> {
        let adapter = self.adapter_for(path).ok_or_else(|| {
            StrataError::Configuration(format!("no language adapter for '{}'", path.display()))
        })?;
        let bytes = std::fs::read(path).map_err(|e| StrataError::io(path, e))?;
        let content = String::from_utf8(bytes)
            .map_err(|_| StrataError::parse(path, "file is not valid UTF-8"))?;
        self.extract_content(adapter, path, &content)
    }

    fn extract_content(
        &self,
        adapter: &dyn LanguageAdapter,
        path: &Path,
        content: &str,
    ) -> Result<SourceUnit> {
        let parsed = adapter
            .parse_file(path, content)
            .map_err(|e| StrataError::parse(path, format!("{e:#}")))?;
        Ok(adapter.extract(&parsed, self.config.resolve.qualified_path_trim))
    }

    /// Enumerate and extract every source file under `root`.
    pub fn scan(&self, root: &Path) -> Result<ScanOutput> {
        if !root.is_dir() {
            return Err(StrataError::io(
                root,
                io::Error::new(io::ErrorKind::NotFound, "root directory not found"),
            ));
        }

        let mut directories: Vec<PathBuf> = std::fs::read_dir(root)
            .map_err(|e| StrataError::io(root, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| !self.is_excluded(relative_to(path, root)))
            .collect();
        directories.sort();

        let mut output = ScanOutput::default();
        let total = directories.len();

        for (done, dir) in directories.iter().enumerate() {
            let module_name = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            tracing::info!(
                "Processing {} ({}/{}, {:.2}% complete)",
                path_id(dir),
                done + 1,
                total,
                (done + 1) as f64 / total as f64 * 100.0
            );

            output.readmes.extend(collect_readmes(dir, &module_name));

            let files = self.source_files(root, dir, &mut output.failures)?;
            let outcomes = files
                .par_iter()
                .map(|(path, adapter)| self.process_file(path, *adapter))
                .collect::<Result<Vec<_>>>()?;

            let mut module_files = BTreeMap::new();
            for outcome in outcomes {
                match outcome {
                    FileOutcome::Extracted { id, unit, content } => {
                        output.file_sizes.insert(id.clone(), content.len() as u64);
                        output
                            .component_of
                            .insert(id.clone(), component_for_path(&id));
                        output.file_trees.insert(id.clone(), unit);
                        module_files.insert(id, content);
                    }
                    FileOutcome::Unparsed(failure) => output.skipped.push(failure),
                    FileOutcome::Unreadable(failure) => output.failures.push(failure),
                }
            }

            let count = module_files.len();
            if count > 0 && count >= self.config.project.min_module_files {
                output.modules.insert(module_name, module_files);
            } else if count > 0 {
                tracing::debug!(
                    module = %module_name,
                    files = count,
                    "below min_module_files, not listed as a module"
                );
            }
        }

        Ok(output)
    }

    /// Scan, resolve and aggregate.
    pub fn run(&self, root: &Path) -> Result<GraphResult> {
        let scan = self.scan(root)?;
        let edges = resolve::resolve(&scan.file_trees)?;
        Ok(GraphResult::from_scan(scan, &edges))
    }

    /// Source files under `dir` paired with their adapter, sorted by path.
    fn source_files(
        &self,
        root: &Path,
        dir: &Path,
        failures: &mut Vec<FileFailure>,
    ) -> Result<Vec<(PathBuf, &dyn LanguageAdapter)>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded(relative_to(e.path(), root)));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let failure = FileFailure {
                        path: e.path().unwrap_or(dir).to_path_buf(),
                        message: e.to_string(),
                    };
                    self.read_failure(&failure, io::Error::from(e))?;
                    failures.push(failure);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(adapter) = self.adapter_for(entry.path()) {
                files.push((entry.into_path(), adapter));
            }
        }
        Ok(files)
    }

    fn process_file(&self, path: &Path, adapter: &dyn LanguageAdapter) -> Result<FileOutcome> {
        let id = path_id(path);
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let failure = FileFailure {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                };
                self.read_failure(&failure, e)?;
                return Ok(FileOutcome::Unreadable(failure));
            }
        };

        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                tracing::warn!(path = %id, "skipping file that is not valid UTF-8");
                return Ok(FileOutcome::Unparsed(FileFailure {
                    path: path.to_path_buf(),
                    message: "file is not valid UTF-8".to_string(),
                }));
            }
        };

        match self.extract_content(adapter, path, &content) {
            Ok(mut unit) => {
                unit.file_path = id.clone();
                tracing::debug!(
                    path = %id,
                    language = adapter.language(),
                    imports = unit.imports.len(),
                    functions = unit.functions.len(),
                    exports = unit.qualified_exports.len(),
                    "extracted"
                );
                if unit.is_empty() {
                    tracing::debug!(path = %id, "no declarations found");
                }
                Ok(FileOutcome::Extracted { id, unit, content })
            }
            Err(e) => {
                tracing::warn!(path = %id, "skipping unparseable file: {e}");
                Ok(FileOutcome::Unparsed(FileFailure {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }))
            }
        }
    }

    /// Apply `on_read_error`: `abort` turns the failure into an error,
    /// `skip` logs it and lets the caller record it.
    fn read_failure(&self, failure: &FileFailure, source: io::Error) -> Result<()> {
        match self.config.project.on_read_error {
            ReadErrorPolicy::Abort => Err(StrataError::io(&failure.path, source)),
            ReadErrorPolicy::Skip => {
                tracing::warn!(
                    path = %failure.path.display(),
                    "skipping unreadable file: {}",
                    failure.message
                );
                Ok(())
            }
        }
    }
}

fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// README files directly inside `dir`, in file name order.
fn collect_readmes(dir: &Path, module_name: &str) -> Vec<ReadmeEntry> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .is_some_and(|n| n.to_string_lossy().to_uppercase().contains("README"))
        })
        .collect();
    paths.sort();

    let mut readmes = Vec::new();
    for path in paths {
        match std::fs::read_to_string(&path) {
            Ok(content) => readmes.push(ReadmeEntry {
                id: module_name.to_string(),
                content,
            }),
            Err(e) => tracing::warn!(path = %path.display(), "failed to read README: {e}"),
        }
    }
    readmes
}
