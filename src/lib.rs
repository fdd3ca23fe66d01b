/*!
 # TeamCity Runner

 A Rust library and command line tool for starting and stopping a local
 TeamCity installation while integration-testing TeamCity plugins.

 ## Overview

 TeamCity Runner provides functionality to:
 - Check that a directory holds a TeamCity installation of the expected version
 - Deploy a freshly built plugin archive into the server data directory
 - Start the server and agent through the distribution's `runAll` script
 - Stop them again, forwarding the script output to the log

 ## Basic Usage

 ```no_run
 use teamcity_runner::{Result, TeamCityRunner};

 #[tokio::main]
 async fn main() -> Result<()> {
     // Create a runner from config file
     let runner = TeamCityRunner::from_config_file("teamcity-runner.json")?;

     // Deploy the plugin and start the server
     let report = runner.start().await?;
     println!("Data directory: {}", report.effective_data_dir.display());

     // ... run the integration tests ...

     runner.stop().await?;
     Ok(())
 }
 ```

 ## Features

 - **Installation checks**: version read from the packaged server metadata
 - **Deployment**: relative or absolute data directories
 - **Process control**: Windows and Unix control script invocation, optional
   deadlines and cancellation
 - **Logging**: every operation reports through a pluggable [`log::LogSink`]
*/

pub mod config;
pub mod deploy;
pub mod error;
pub mod installation;
pub mod log;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
pub use installation::{ServerVersion, ValidationOutcome};
pub use server::{LifecycleController, StartReport, StopReport};

use installation::{InstallationValidator, ShapeCheck};
use log::{LogSink, TracingSink};
use server::{Platform, Supervision};
use std::path::Path;
use std::sync::Arc;

/// Start and stop the TeamCity installation described by a [`Config`]
///
/// This struct is the main entry point; it derives the per-call requests from
/// the configuration and hands them to a [`LifecycleController`].
/// All public methods are instrumented with `tracing` spans.
pub struct TeamCityRunner {
    config: Config,
    platform: Platform,
    sink: Arc<dyn LogSink>,
}

impl TeamCityRunner {
    /// Create a runner from a configuration file path
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path)?;
        Self::new(config)
    }

    /// Create a runner from a configuration string
    #[tracing::instrument(skip(config))]
    pub fn from_config_str(config: &str) -> Result<Self> {
        tracing::info!("Loading configuration from string");
        let config = Config::parse_from_str(config)?;
        Self::new(config)
    }

    /// Create a runner from a configuration, logging through `tracing`
    #[tracing::instrument(skip(config), fields(artifact_id = %config.project.artifact_id))]
    pub fn new(config: Config) -> Result<Self> {
        crate::config::validate_config(&config)?;
        tracing::debug!("Creating new TeamCityRunner");
        Ok(Self {
            config,
            platform: Platform::current(),
            sink: Arc::new(TracingSink),
        })
    }

    /// Report to `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Invoke the control script the way `platform` does
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// The configuration this runner was created from
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn controller(&self) -> LifecycleController {
        LifecycleController::with_platform(self.platform, Arc::clone(&self.sink))
            .with_shape_check(self.config.shape_check())
    }

    /// Check the installation, deploy the plugin and start TeamCity
    #[tracing::instrument(skip(self))]
    pub async fn start(&self) -> Result<StartReport> {
        self.controller()
            .start(
                &self.config.installation(),
                &self.config.deployment(),
                &self.config.launch_options(),
            )
            .await
    }

    /// Stop TeamCity
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self) -> Result<StopReport> {
        self.controller()
            .stop(&self.config.installation(), &Supervision::default())
            .await
    }

    /// Read the installed version; unreadable metadata is an error here
    #[tracing::instrument(skip(self))]
    pub fn version(&self) -> Result<ServerVersion> {
        InstallationValidator::new(self.platform, self.config.shape_check())
            .require_version(&self.config.installation())
    }

    /// Validate the installation with the given shape check mode
    #[tracing::instrument(skip(self))]
    pub fn check(&self, shape_check: ShapeCheck) -> Result<ValidationOutcome> {
        InstallationValidator::new(self.platform, shape_check)
            .validate(&self.config.installation(), self.sink.as_ref())
    }
}
