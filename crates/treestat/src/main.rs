use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use treestat_core::config::{Config, CONFIG_FILE};
use treestat_core::{AnalysisPipeline, LanguageProfile, SelectorConfig};

use treestat_javascript::JavaScriptProfile;
use treestat_python::PythonProfile;
use treestat_report::{json, markdown, text};

#[derive(Parser)]
#[command(name = "treestat")]
#[command(about = "Extract code metrics from serialized syntax trees")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Javascript,
    Python,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a directory of tree files and print a metrics report
    Analyze {
        /// Directory containing one serialized tree per source file
        tree_dir: PathBuf,
        /// Selector document (JSON or TOML) describing the grammar
        #[arg(long, conflicts_with = "profile", required_unless_present = "profile")]
        selectors: Option<PathBuf>,
        /// Use a built-in language profile instead of a selector document
        #[arg(long, value_enum)]
        profile: Option<Profile>,
        /// Config file path (defaults to .treestat.toml in the tree directory or above)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Compact JSON output
        #[arg(long)]
        compact: bool,
        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Reuse cached metrics for unchanged tree files
        #[arg(long)]
        incremental: bool,
    },
    /// Create a default .treestat.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
    /// Print the selector document of a built-in profile
    Selectors {
        #[arg(value_enum)]
        profile: Profile,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Analyze {
            tree_dir,
            selectors,
            profile,
            config,
            format,
            compact,
            output,
            incremental,
        } => cmd_analyze(&AnalyzeArgs {
            tree_dir: &tree_dir,
            selectors: selectors.as_deref(),
            profile,
            config: config.as_deref(),
            format,
            compact,
            output: output.as_deref(),
            incremental,
        }),
        Commands::Init { force } => cmd_init(force),
        Commands::Selectors { profile } => cmd_selectors(profile),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

struct AnalyzeArgs<'a> {
    tree_dir: &'a Path,
    selectors: Option<&'a Path>,
    profile: Option<Profile>,
    config: Option<&'a Path>,
    format: Format,
    compact: bool,
    output: Option<&'a Path>,
    incremental: bool,
}

fn builtin(profile: Profile) -> Box<dyn LanguageProfile> {
    match profile {
        Profile::Javascript => Box::new(JavaScriptProfile::new()),
        Profile::Python => Box::new(PythonProfile::new()),
    }
}

fn cmd_analyze(args: &AnalyzeArgs<'_>) -> Result<()> {
    if !args.tree_dir.is_dir() {
        bail!("tree directory '{}' not found", args.tree_dir.display());
    }
    let config = load_config(args.tree_dir, args.config)?;

    let (selectors, profile) = match (args.selectors, args.profile) {
        (Some(path), _) => (SelectorConfig::load(path)?, None),
        (None, Some(p)) => {
            let profile = builtin(p);
            (profile.selectors()?, Some(profile))
        }
        (None, None) => bail!("either --selectors or --profile is required"),
    };

    let pipeline = AnalysisPipeline::new(selectors, config, profile)?;
    let outcome = if args.incremental {
        pipeline.analyze_incremental(args.tree_dir)?
    } else {
        pipeline.analyze(args.tree_dir)?
    };

    if outcome.report.composition.file_count == 0 {
        warn!(
            "no eligible tree files analyzed in '{}'",
            args.tree_dir.display()
        );
    }

    let rendered = match args.format {
        Format::Text => text::format_report(&outcome.report),
        Format::Json => {
            json::format_report(&outcome.report, args.compact).context("failed to encode report")?
        }
        Format::Markdown => markdown::format_report(&outcome.report),
    };

    match args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write report to '{}'", path.display()))?;
            info!("report written to {}", path.display());
        }
        None => {
            print!("{rendered}");
            if !rendered.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn cmd_selectors(profile: Profile) -> Result<()> {
    let selectors = builtin(profile).selectors()?;
    let rendered = selectors
        .to_json_pretty()
        .context("failed to encode selector document")?;
    println!("{rendered}");
    Ok(())
}

fn load_config(tree_dir: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(tree_dir)),
    }
}
