use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use directories::BaseDirs;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ccvi_catalog::archive::{ArchiveReader, ZipArchiveReader};
use ccvi_catalog::catalog::{CatalogSink, JsonCatalogSink};
use ccvi_catalog::classify::{RolePredicates, order_for_extraction};
use ccvi_catalog::columnar::ParquetColumnReader;
use ccvi_catalog::config::{ConfigLoader, ResolvedConfig};
use ccvi_catalog::domain::AssemblyStrategy;
use ccvi_catalog::error::CcviError;
use ccvi_catalog::fetch::{HttpFetcher, RetrieveOptions};
use ccvi_catalog::output::{InspectResult, JsonOutput, LogSink};
use ccvi_catalog::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "ccvi-catalog")]
#[command(about = "Build the CCVI catalog dataset from the quarterly and full archives")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch both archives and build the dataset descriptor")]
    Generate(GenerateArgs),
    #[command(about = "Show roles and extraction order for a local archive")]
    Inspect(InspectArgs),
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long)]
    strategy: Option<AssemblyStrategy>,

    /// Directory for saved archives (defaults to ~/.cache/ccvi-catalog).
    #[arg(long)]
    saved_dir: Option<Utf8PathBuf>,

    /// Read archives from the saved directory instead of downloading.
    #[arg(long, conflicts_with = "save")]
    use_saved: bool,

    /// Keep a copy of each download in the saved directory.
    #[arg(long)]
    save: bool,

    /// Write the catalog record to this file.
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    /// Do not delete the extraction directory on exit.
    #[arg(long)]
    keep_workdir: bool,
}

#[derive(Args)]
struct InspectArgs {
    archive: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CcviError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CcviError) -> u8 {
    match error.root() {
        CcviError::MissingConfig
        | CcviError::ConfigRead(_)
        | CcviError::ConfigParse(_)
        | CcviError::InvalidConfig(_)
        | CcviError::InvalidPattern { .. } => 2,
        CcviError::Network { .. } | CcviError::NetworkStatus { .. } | CcviError::NotFound(_) => 3,
        CcviError::ArchiveCorrupt { .. }
        | CcviError::MalformedData { .. }
        | CcviError::AmbiguousQuarter { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => {
            let config = ConfigLoader::resolve(cli.config.as_deref())?;
            run_generate(args, config)
        }
        Commands::Inspect(args) => {
            let roles = match ConfigLoader::resolve(cli.config.as_deref()) {
                Ok(config) => config.roles,
                Err(CcviError::MissingConfig) => RolePredicates::default(),
                Err(err) => return Err(err.into()),
            };
            run_inspect(args, &roles)
        }
    }
}

fn run_generate(args: GenerateArgs, mut config: ResolvedConfig) -> miette::Result<()> {
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }

    let workdir = tempfile::Builder::new()
        .prefix("ccvi-catalog")
        .tempdir()
        .map_err(|err| CcviError::Filesystem(err.to_string()))?;
    let workdir_path = Utf8PathBuf::from_path_buf(workdir.path().to_path_buf())
        .map_err(|_| CcviError::Filesystem("non-utf8 temp directory".to_string()))?;

    let mut options = RetrieveOptions::new(workdir_path.clone());
    options.use_saved = args.use_saved;
    options.save = args.save;
    if args.use_saved || args.save {
        options.saved_dir = Some(match args.saved_dir {
            Some(dir) => dir,
            None => default_saved_dir()?,
        });
    }

    let metadata = config.metadata.clone();
    let fetcher = HttpFetcher::new(options)?;
    let pipeline = Pipeline::new(
        config,
        fetcher,
        ZipArchiveReader,
        ParquetColumnReader,
        workdir_path,
    );
    let generated = pipeline.generate_dataset(&LogSink)?;

    for warning in &generated.warnings {
        eprintln!("warning: {warning}");
    }
    if let Some(path) = args.output {
        JsonCatalogSink::new(path).publish(&generated.dataset, &metadata)?;
    }
    JsonOutput::print_generated(&generated).into_diagnostic()?;

    if args.keep_workdir {
        let kept = workdir.keep();
        eprintln!("extracted files kept in {}", kept.display());
    }
    Ok(())
}

fn run_inspect(args: InspectArgs, roles: &RolePredicates) -> miette::Result<()> {
    let entries = ZipArchiveReader.list_entries(&args.archive)?;
    let classified = roles.classify(&order_for_extraction(&entries));
    JsonOutput::print_inspect(&InspectResult::new(args.archive.as_str(), classified))
        .into_diagnostic()?;
    Ok(())
}

fn default_saved_dir() -> Result<Utf8PathBuf, CcviError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("ccvi-catalog")).ok()
        })
        .ok_or_else(|| CcviError::Filesystem("unable to resolve cache directory".to_string()))
}
