//! Command-line entry point for vaultdiff.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use vaultdiff::app_dirs::{AppDirError, AppDirs};
use vaultdiff::catalog::DiffStatus;
use vaultdiff::config::{self, AppSettings, ConfigError};
use vaultdiff::logging;
use vaultdiff::ops::{Operations, OpsError};

#[derive(Parser)]
#[command(name = "vaultdiff")]
#[command(about = "Check that a local archive holds every asset of a remote source")]
#[command(version)]
struct Cli {
    /// Catalog database (defaults to the configured path, then catalog.db in the app directory)
    #[arg(long, global = true, env = "VAULTDIFF_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a local directory tree, replacing the local-file catalog
    ScanLocal {
        /// Archive root (defaults to the configured local_root)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Import a line-delimited JSON inventory of remote assets
    #[command(after_help = "\
Each line is one asset, for example:
  {\"sourceAssetId\":\"ABC123\",\"filename\":\"photo.jpg\",\"sizeBytes\":1000}")]
    ImportRemote {
        /// Source name for assets that do not carry one
        #[arg(long)]
        source: Option<String>,

        /// Inventory file
        #[arg(long)]
        file: PathBuf,
    },

    /// Reconcile a source against the local catalog and print the counts
    Diff {
        #[arg(long)]
        source: Option<String>,
    },

    /// Export stored verdicts for a source as line-delimited JSON
    Report {
        #[arg(long)]
        source: Option<String>,

        /// Output file
        #[arg(long)]
        out: PathBuf,

        /// Only export verdicts with this status
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Print the stored verdict counts for a source
    Summary {
        #[arg(long)]
        source: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the most recent operations
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show or update persisted settings
    Config {
        #[arg(long, value_name = "PATH")]
        set_db: Option<PathBuf>,

        #[arg(long, value_name = "NAME")]
        set_source: Option<String>,

        #[arg(long, value_name = "PATH")]
        set_root: Option<PathBuf>,
    },
}

impl Commands {
    /// Subcommand name as typed, used to label the run's log file.
    fn name(&self) -> &'static str {
        match self {
            Commands::ScanLocal { .. } => "scan-local",
            Commands::ImportRemote { .. } => "import-remote",
            Commands::Diff { .. } => "diff",
            Commands::Report { .. } => "report",
            Commands::Summary { .. } => "summary",
            Commands::Jobs { .. } => "jobs",
            Commands::Config { .. } => "config",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Present,
    Missing,
    Uncertain,
}

impl From<StatusArg> for DiffStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Present => DiffStatus::Present,
            StatusArg::Missing => DiffStatus::Missing,
            StatusArg::Uncertain => DiffStatus::Uncertain,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error(transparent)]
    Ops(#[from] OpsError),
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to encode settings: {0}")]
    EncodeSettings(#[from] toml::ser::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.name();
    let log_setup = AppDirs::discover()
        .map_err(logging::LoggingError::from)
        .and_then(|dirs| logging::init(&dirs, command));
    if let Err(err) = log_setup {
        eprintln!("Logging disabled: {err}");
    }
    let _run = tracing::info_span!("run", command).entered();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting");
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // stderr already gets the message below; keep the log file complete.
            tracing::info!(error = %err, "Command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = config::load_or_default()?;
    if let Commands::Config {
        set_db,
        set_source,
        set_root,
    } = cli.command
    {
        return update_config(settings, set_db, set_source, set_root);
    }

    let db_path = match cli.db.or_else(|| settings.database_path.clone()) {
        Some(path) => path,
        None => settings.resolved_database_path(AppDirs::discover()?.ensure_root()?),
    };
    let ops = Operations::open(db_path)?;
    let source_or_default = |source: Option<String>| source.unwrap_or_else(|| settings.source_name.clone());

    match cli.command {
        Commands::ScanLocal { root } => {
            let root = root.or_else(|| settings.local_root.clone());
            let report = ops.scan_local(root.as_deref())?;
            println!("Scanned {} files under {}", report.files, report.root.display());
            if report.skipped > 0 {
                println!("Skipped {} unreadable entries", report.skipped);
            }
        }
        Commands::ImportRemote { source, file } => {
            let report = ops.import_remote(&source_or_default(source), &file)?;
            println!("Imported {} assets into {}", report.imported, report.source_name);
            if report.skipped > 0 {
                println!("Skipped {} invalid lines", report.skipped);
            }
        }
        Commands::Diff { source } => {
            let report = ops.run_diff(&source_or_default(source))?;
            println!("{}", report.summary);
        }
        Commands::Report { source, out, status } => {
            let report = ops.export_report(&source_or_default(source), &out, status.map(DiffStatus::from))?;
            println!("Wrote {} results to {}", report.written, report.path.display());
        }
        Commands::Summary { source, json } => {
            let summary = ops.summary(&source_or_default(source))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }
        Commands::Jobs { limit } => {
            for job in ops.recent_jobs(limit)? {
                println!(
                    "{:>5}  {:<7} {:<10} {:<9} {}",
                    job.id.0,
                    job.kind.as_str(),
                    job.source_name.as_deref().unwrap_or("-"),
                    job.status.as_str(),
                    job.detail.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Config { .. } => {}
    }
    Ok(())
}

fn update_config(
    mut settings: AppSettings,
    set_db: Option<PathBuf>,
    set_source: Option<String>,
    set_root: Option<PathBuf>,
) -> Result<(), CliError> {
    let changed = set_db.is_some() || set_source.is_some() || set_root.is_some();
    if let Some(path) = set_db {
        settings.database_path = Some(path);
    }
    if let Some(source) = set_source {
        settings.source_name = source;
    }
    if let Some(root) = set_root {
        settings.local_root = Some(root);
    }
    if changed {
        config::save(&settings)?;
    }
    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}
