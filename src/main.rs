use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use teamcity_runner::installation::ShapeCheck;
use teamcity_runner::{Config, TeamCityRunner, ValidationOutcome};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "teamcity-runner")]
#[command(about = "Start and stop a local TeamCity installation for plugin testing")]
#[command(version)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "teamcity-runner.json")]
    pub config: PathBuf,

    /// Override the TeamCity installation directory
    #[arg(long)]
    pub teamcity_dir: Option<PathBuf>,

    /// Override the expected TeamCity version
    #[arg(long)]
    pub teamcity_version: Option<String>,

    /// Override the data directory (absolute or relative to the installation)
    #[arg(long)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the plugin and start the server and agent
    Start,
    /// Stop the server and agent
    Stop,
    /// Print the installed TeamCity version
    Version,
    /// Check the installation strictly and report problems
    Check,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::from_file(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        if let Some(dir) = &self.teamcity_dir {
            config.teamcity_dir = Some(dir.clone());
        }
        if let Some(version) = &self.teamcity_version {
            config.teamcity_version = version.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_directory = data_dir.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let runner = TeamCityRunner::new(cli.load_config()?)?;

    match cli.command {
        Commands::Start => {
            let report = runner.start().await?;
            tracing::info!(
                data_dir = %report.effective_data_dir.display(),
                exit_code = ?report.exit.exit_code,
                "TeamCity start command finished"
            );
        }
        Commands::Stop => {
            let report = runner.stop().await?;
            tracing::info!(exit_code = ?report.exit.exit_code, "TeamCity stop command finished");
        }
        Commands::Version => {
            println!("{}", runner.version()?);
        }
        Commands::Check => match runner.check(ShapeCheck::Strict)? {
            ValidationOutcome::Ok => println!("OK"),
            // the problem itself was already logged as a warning
            _ => anyhow::bail!("installation check failed"),
        },
    }

    Ok(())
}
