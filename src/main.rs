//! rlc-cloud-repos - point dnf at the closest package mirror
//!
//! Runs once per boot after cloud-init has identified the instance:
//! - detects provider and region
//! - resolves primary and backup mirrors from the mirror map
//! - writes the dnf variables and a marker file

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rlc_cloud_repos::config::parse_assignment;
use rlc_cloud_repos::marker::MarkerFile;
use rlc_cloud_repos::metadata::detect_metadata_source;
use rlc_cloud_repos::mirrors::azure;
use rlc_cloud_repos::mirrors::backup::GLOBAL_FALLBACK_URL;
use rlc_cloud_repos::mirrors::{BackupSource, load_mirror_map, select_mirror};
use rlc_cloud_repos::paths::{
    DEFAULT_MARKER_PATH, DEFAULT_MIRROR_PATH, DEFAULT_REPO_FILE_PATH, DNF_VARS_DIR,
    INSTANCE_DATA_PATH, RepoPaths,
};
use rlc_cloud_repos::repo_file::{render_repo_file, write_repo_file};
use rlc_cloud_repos::{CloudMetadata, Settings, configure_repos};

#[derive(Parser)]
#[command(name = "rlc-cloud-repos")]
#[command(author, version, about = "Cloud-aware dnf mirror configuration", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Override path to mirror map YAML
    #[arg(long, env = "RLC_MIRROR_MAP_PATH", default_value = DEFAULT_MIRROR_PATH, global = true)]
    mirror_file: PathBuf,

    /// cloud-init instance data JSON
    #[arg(long, env = "RLC_METADATA_PATH", default_value = INSTANCE_DATA_PATH, global = true)]
    metadata_file: PathBuf,

    #[command(flatten)]
    configure: ConfigureArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ConfigureArgs {
    /// Force reconfiguration (ignore marker file)
    #[arg(long)]
    force: bool,

    /// Directory holding dnf variable files
    #[arg(long, env = "RLC_DNF_VARS_DIR", default_value = DNF_VARS_DIR)]
    vars_dir: PathBuf,

    /// Marker file written after a successful run
    #[arg(long, env = "RLC_MARKER_PATH", default_value = DEFAULT_MARKER_PATH)]
    marker_file: PathBuf,

    /// Where the backup mirror URL comes from
    #[arg(long, value_enum, default_value_t = BackupMode::Map)]
    backup_source: BackupMode,

    /// Backup URL used with `--backup-source fixed`
    #[arg(long, default_value = GLOBAL_FALLBACK_URL)]
    backup_url: String,

    /// Extra dnf variable to write (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackupMode {
    /// Backup from the mirror map
    Map,
    /// Backup from --backup-url
    Fixed,
    /// Primary URL without the region label
    Derived,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Url,
    Repo,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect, select and write dnf variables (default)
    Configure,
    /// Print the mirror for detected or given metadata
    Select {
        /// Override detected cloud
        #[arg(long)]
        cloud: Option<String>,
        /// Override detected region
        #[arg(long)]
        region: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Url)]
        format: OutputFormat,
        /// Write the .repo file to disk
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_REPO_FILE_PATH)]
        output: Option<PathBuf>,
    },
    /// Check that every mirror map entry has a primary and backup URL
    Validate,
    /// Regenerate the azure section of a mirror map from Azure region metadata
    AzureMirrors(AzureMirrorsArgs),
}

#[derive(Args)]
struct AzureMirrorsArgs {
    /// Azure region metadata YAML
    #[arg(long, env = "AZURE_METADATA_PATH", default_value = "azure.metadata.yaml")]
    metadata: PathBuf,
    /// Existing mirrors YAML
    #[arg(long, env = "CIQ_MIRRORS_PATH", default_value = "data/mirrors.yaml")]
    mirrors: PathBuf,
    /// Where to write the result (default: stdout)
    #[arg(long, env = "OUTPUT_PATH")]
    output: Option<PathBuf>,
    /// Report whether the azure section would change, write nothing
    #[arg(long, env = "VERIFY_ONLY")]
    verify: bool,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    parse_assignment(raw).map_err(|e| e.to_string())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

impl ConfigureArgs {
    fn settings(&self, cli_paths: RepoPaths) -> Settings {
        let backup = match self.backup_source {
            BackupMode::Map => BackupSource::Map,
            BackupMode::Fixed => BackupSource::Fixed(self.backup_url.clone()),
            BackupMode::Derived => BackupSource::DerivedFromPrimary,
        };
        let paths = cli_paths
            .with_vars_dir(&self.vars_dir)
            .with_marker_file(&self.marker_file);

        let mut settings = Settings::new(paths).with_force(self.force).with_backup(backup);
        for (name, value) in &self.vars {
            settings.extra_vars.insert(name.as_str(), value.as_str());
        }
        settings
    }
}

async fn configure(cli: &Cli) -> anyhow::Result<ExitCode> {
    let paths = RepoPaths::new()
        .with_mirror_file(&cli.mirror_file)
        .with_instance_data(&cli.metadata_file);
    let settings = cli.configure.settings(paths);

    let marker = MarkerFile::new(&settings.paths.marker_file);
    if !settings.force && marker.exists().await {
        println!(
            "Marker file exists ({}). Skipping repo update.",
            marker.path().display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let source = detect_metadata_source(&settings.paths.instance_data)
        .await
        .context("cloud metadata is unavailable")?;

    let report = configure_repos(&settings, source.as_ref()).await?;
    marker.mark_done().await?;

    println!("Using cloud metadata: {}", report.metadata);
    println!("Selected mirror URL: {}", report.selection.primary);
    for (name, outcome) in &report.outcomes {
        println!("  {}: {}", name, outcome);
    }
    println!("Marker file written to {}", marker.path().display());
    Ok(ExitCode::SUCCESS)
}

async fn select(
    cli: &Cli,
    cloud: Option<&str>,
    region: Option<&str>,
    format: OutputFormat,
    output: Option<&PathBuf>,
) -> anyhow::Result<ExitCode> {
    let metadata = match (cloud, region) {
        (Some(cloud), Some(region)) => CloudMetadata::new(cloud, region),
        _ => {
            let source = detect_metadata_source(&cli.metadata_file)
                .await
                .context("cloud metadata is unavailable")?;
            let mut metadata = source.get_metadata().await?;
            if let Some(cloud) = cloud {
                metadata.provider = cloud.to_string();
            }
            if let Some(region) = region {
                metadata.region = Some(region.to_string());
            }
            metadata
        }
    };

    let mirror_map = load_mirror_map(&cli.mirror_file).await?;
    let selection = select_mirror(&metadata, &mirror_map)?;

    match format {
        OutputFormat::Url => println!("{}", selection.primary),
        OutputFormat::Repo => {
            let repo = render_repo_file(&metadata, &selection.primary);
            match output {
                Some(path) => {
                    write_repo_file(path, &repo)
                        .await
                        .with_context(|| format!("Failed to write repo file {}", path.display()))?;
                    println!("Wrote repo to {}", path.display());
                }
                None => print!("{}", repo),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn validate(cli: &Cli) -> anyhow::Result<ExitCode> {
    let mirror_map = load_mirror_map(&cli.mirror_file).await?;
    let issues = mirror_map.lint();

    if issues.is_empty() {
        println!("{}: OK", cli.mirror_file.display());
        return Ok(ExitCode::SUCCESS);
    }
    for issue in &issues {
        println!("{}", issue);
    }
    Ok(ExitCode::FAILURE)
}

async fn azure_mirrors(args: &AzureMirrorsArgs) -> anyhow::Result<ExitCode> {
    let azure_metadata = azure::load_yaml_file(&args.metadata).await?;
    let existing = azure::load_yaml_file(&args.mirrors).await?;
    let updated = azure::transform_azure_mirrors(&azure_metadata, &existing)?;

    if args.verify {
        if azure::azure_section_changed(&updated, &existing) {
            println!("Changes detected in Azure mirrors configuration.");
            return Ok(ExitCode::FAILURE);
        }
        println!("No changes detected in Azure mirrors configuration.");
        return Ok(ExitCode::SUCCESS);
    }

    let yaml = azure::to_yaml(&updated)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, yaml)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote azure mirrors to {}", path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(ExitCode::SUCCESS)
}

async fn dispatch(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        None | Some(Commands::Configure) => configure(cli).await,
        Some(Commands::Select {
            cloud,
            region,
            format,
            output,
        }) => select(cli, cloud.as_deref(), region.as_deref(), *format, output.as_ref()).await,
        Some(Commands::Validate) => validate(cli).await,
        Some(Commands::AzureMirrors(args)) => azure_mirrors(args).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Configuration failed: {:#}", e);
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
