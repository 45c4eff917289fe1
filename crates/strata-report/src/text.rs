use std::path::PathBuf;

use colored::Colorize;

use strata_core::GraphResult;

/// Format a run summary for terminal output.
pub fn format_summary(result: &GraphResult, written: &[PathBuf]) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "Strata - Dependency Index".bold()));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));

    out.push_str(&format!(
        "{}: {} files, {} edges, {} components\n",
        "Summary".bold(),
        result.file_trees.len(),
        result.file_graph.links.len(),
        result.root_graph.nodes.len(),
    ));

    if !result.root_graph.nodes.is_empty() {
        out.push_str(&format!("\n{}\n{}\n", "Components".bold(), "-".repeat(40)));
        for node in &result.root_graph.nodes {
            out.push_str(&format!(
                "  {}: {} files, {} bytes\n",
                node.id, node.file_count, node.file_size
            ));
        }
    }

    if !result.root_graph.links.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n",
            "Cross-component links".bold(),
            result.root_graph.links.len()
        ));
        for link in &result.root_graph.links {
            out.push_str(&format!("  {link}\n"));
        }
    }

    if result.failures.is_empty() && result.skipped.is_empty() {
        out.push_str(&format!("\n{}\n", "All files indexed".green().bold()));
    }
    if !result.failures.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n",
            "Unreadable files".red().bold(),
            result.failures.len()
        ));
        for failure in &result.failures {
            out.push_str(&format!(
                "  {}: {}\n",
                failure.path.display(),
                failure.message
            ));
        }
    }
    if !result.skipped.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n",
            "Skipped files".yellow().bold(),
            result.skipped.len()
        ));
        for skipped in &result.skipped {
            out.push_str(&format!(
                "  {}: {}\n",
                skipped.path.display(),
                skipped.message
            ));
        }
    }

    if !result.cycles.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n",
            "Dependency cycles".yellow().bold(),
            result.cycles.len()
        ));
        for cycle in &result.cycles {
            out.push_str(&format!("  {}\n", cycle.join(" <-> ")));
        }
    }

    if !written.is_empty() {
        out.push_str(&format!("\n{}\n", "Artifacts".bold()));
        for path in written {
            out.push_str(&format!("  {}\n", path.display().to_string().cyan()));
        }
    }

    out.push('\n');
    out
}
