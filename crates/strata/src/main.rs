use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use strata_core::analyzer::LanguageAdapter;
use strata_core::config::{Config, CONFIG_FILE};
use strata_core::Pipeline;

use strata_c::CAdapter;
use strata_cpp::CppAdapter;
use strata_go::GoAdapter;
use strata_java::JavaAdapter;
use strata_javascript::JavaScriptAdapter;
use strata_kotlin::KotlinAdapter;
use strata_python::PythonAdapter;
use strata_report::json::{self, ArtifactPaths};
use strata_report::text;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Index symbol dependencies across the repositories of a monorepo layout")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a root directory, resolve dependencies and write the graph artifacts
    Run {
        /// Directory whose subdirectories are the repositories to index
        root: PathBuf,
        /// Config file path (defaults to .strata.toml in the root or an ancestor)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory for the graph artifacts (overrides [output] dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Summary format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Print the summary without writing artifacts
        #[arg(long)]
        no_write: bool,
    },
    /// Print the extracted declarations of one source file as JSON
    Tree {
        /// Source file to extract
        file: PathBuf,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Create a default .strata.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            root,
            config,
            output,
            format,
            no_write,
        } => cmd_run(&root, config.as_deref(), output, format, no_write),
        Commands::Tree { file, config } => cmd_tree(&file, config.as_deref()),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Every language the binary ships with.
fn adapters() -> Result<Vec<Box<dyn LanguageAdapter>>> {
    let adapters: Vec<Box<dyn LanguageAdapter>> = vec![
        Box::new(JavaAdapter::new().context("failed to initialize Java adapter")?),
        Box::new(KotlinAdapter::new().context("failed to initialize Kotlin adapter")?),
        Box::new(JavaScriptAdapter::new().context("failed to initialize JavaScript adapter")?),
        Box::new(GoAdapter::new().context("failed to initialize Go adapter")?),
        Box::new(PythonAdapter::new().context("failed to initialize Python adapter")?),
        Box::new(CAdapter::new().context("failed to initialize C adapter")?),
        Box::new(CppAdapter::new().context("failed to initialize C++ adapter")?),
    ];
    Ok(adapters)
}

fn cmd_run(
    root: &Path,
    config_path: Option<&Path>,
    output: Option<PathBuf>,
    format: OutputFormat,
    no_write: bool,
) -> Result<()> {
    let mut config = load_config(root, config_path)?;
    if let Some(dir) = output {
        config.output.dir = dir;
    }
    let pipeline = Pipeline::new(adapters()?, config)?;
    let result = pipeline
        .run(root)
        .with_context(|| format!("failed to index {}", root.display()))?;

    let written = if no_write {
        Vec::new()
    } else {
        let paths = ArtifactPaths {
            output_dir: pipeline.config().output.dir.clone(),
            index_dir: pipeline.config().output.index_dir.clone(),
        };
        json::write_artifacts(&result, &paths)?
    };

    match format {
        OutputFormat::Text => print!("{}", text::format_summary(&result, &written)),
        OutputFormat::Json => println!("{}", json::format_summary(&result)?),
    }
    Ok(())
}

fn cmd_tree(file: &Path, config_path: Option<&Path>) -> Result<()> {
    let start = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let config = load_config(start, config_path)?;
    let pipeline = Pipeline::new(adapters()?, config)?;
    let unit = pipeline.extract_file(file)?;
    println!("{}", json::to_sorted_json(&unit)?);
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Ok(Config::load(p)?),
        None => Ok(Config::load_or_default(project_path)),
    }
}
