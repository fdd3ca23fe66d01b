use crate::config::{DEFAULT_AGENT_DEBUG_OPTS, DEFAULT_SERVER_DEBUG_OPTS};
use crate::deploy::{self, DeploymentRequest};
use crate::error::{Error, Result};
use crate::installation::version::absolute;
use crate::installation::{InstallationConfig, InstallationValidator, ShapeCheck, ValidationOutcome};
use crate::log::LogSink;
use crate::server::command::{CommandBuilder, Platform, ServerAction};
use crate::server::process::{ProcessResult, ProcessRunner, RunOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Data directory handed to the server
pub const DATA_PATH_ENV: &str = "TEAMCITY_DATA_PATH";
/// JVM options of the server process
pub const SERVER_OPTS_ENV: &str = "TEAMCITY_SERVER_OPTS";
/// JVM options of the agent process
pub const AGENT_OPTS_ENV: &str = "TEAMCITY_AGENT_OPTS";

/// Phase of a single start or stop call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing done yet
    Idle,
    /// Checking the installation
    Validating,
    /// Copying the plugin archive
    Deploying,
    /// Control script running
    Launching,
    /// Control script has exited
    Exited,
}

/// Optional limits on a control script run
#[derive(Debug, Clone, Default)]
pub struct Supervision {
    /// Kill the script if it runs longer than this
    pub deadline: Option<Duration>,
    /// Kill the script when cancelled
    pub cancel: Option<CancellationToken>,
}

impl Supervision {
    fn run_options(&self, stream_output: bool) -> RunOptions {
        RunOptions {
            stream_output,
            deadline: self.deadline,
            cancel: self.cancel.clone(),
        }
    }
}

/// Settings for the start script invocation
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Passed verbatim as `TEAMCITY_SERVER_OPTS`
    pub server_debug_opts: String,
    /// Passed verbatim as `TEAMCITY_AGENT_OPTS`
    pub agent_debug_opts: String,
    /// Turn a non-zero start exit code into [`Error::StartFailed`]
    pub fail_on_start_error: bool,
    /// Deadline and cancellation for the start script
    pub supervision: Supervision,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            server_debug_opts: DEFAULT_SERVER_DEBUG_OPTS.to_string(),
            agent_debug_opts: DEFAULT_AGENT_DEBUG_OPTS.to_string(),
            fail_on_start_error: false,
            supervision: Supervision::default(),
        }
    }
}

/// What a start call did
#[derive(Debug, Clone)]
pub struct StartReport {
    /// Absolute installation directory
    pub install_dir: PathBuf,
    /// Data directory the plugin was deployed to
    pub effective_data_dir: PathBuf,
    /// Result of the installation check
    pub validation: ValidationOutcome,
    /// Exit of the start script (not of the server itself)
    pub exit: ProcessResult,
}

/// What a stop call did
#[derive(Debug, Clone)]
pub struct StopReport {
    /// Absolute installation directory
    pub install_dir: PathBuf,
    /// Exit of the stop script
    pub exit: ProcessResult,
}

/// Starts and stops a TeamCity installation.
///
/// Holds no state between calls; every call walks
/// [`LifecycleState`] from `Idle` on its own.
pub struct LifecycleController {
    platform: Platform,
    shape_check: ShapeCheck,
    sink: Arc<dyn LogSink>,
    runner: ProcessRunner,
}

impl LifecycleController {
    /// Controller for the current platform reporting to `sink`
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self::with_platform(Platform::current(), sink)
    }

    /// Controller invoking the control script the way `platform` does
    pub fn with_platform(platform: Platform, sink: Arc<dyn LogSink>) -> Self {
        Self {
            platform,
            shape_check: ShapeCheck::default(),
            runner: ProcessRunner::new(Arc::clone(&sink)),
            sink,
        }
    }

    /// Set how a directory without a control script is treated
    pub fn with_shape_check(mut self, shape_check: ShapeCheck) -> Self {
        self.shape_check = shape_check;
        self
    }

    /// Validate, deploy the plugin and run the start script.
    ///
    /// Version mismatches are reported to the sink and do not stop the start.
    /// The start script's output is discarded because it never closes once
    /// the server has forked; the call returns when the script exits.
    ///
    /// # Errors
    ///
    /// * [`Error::MissingVersionConfig`] before anything else is touched
    /// * [`Error::CopyFailed`] before any process is launched
    /// * [`Error::ProcessLaunchFailed`], [`Error::Timeout`], [`Error::Cancelled`]
    /// * [`Error::StartFailed`] only with `fail_on_start_error`
    #[tracing::instrument(skip_all, fields(install_dir = %installation.install_dir.display()))]
    pub async fn start(
        &self,
        installation: &InstallationConfig,
        deployment: &DeploymentRequest,
        launch: &LaunchOptions,
    ) -> Result<StartReport> {
        let mut state = LifecycleState::Idle;

        advance(&mut state, LifecycleState::Validating);
        let validation = InstallationValidator::new(self.platform, self.shape_check)
            .validate(installation, self.sink.as_ref())?;

        advance(&mut state, LifecycleState::Deploying);
        let effective_data_dir = deploy::deploy(deployment, &installation.install_dir)?;

        advance(&mut state, LifecycleState::Launching);
        let install_dir = absolute(&installation.install_dir);
        self.sink
            .info(&format!("Starting TeamCity in [{}]", install_dir.display()));
        self.sink.info(&format!(
            "TeamCity data directory is [{}]",
            effective_data_dir.display()
        ));

        let spec = CommandBuilder::new(&installation.install_dir, self.platform)
            .build(ServerAction::Start)
            .with_env(DATA_PATH_ENV, effective_data_dir.to_string_lossy())
            .with_env(SERVER_OPTS_ENV, &launch.server_debug_opts)
            .with_env(AGENT_OPTS_ENV, &launch.agent_debug_opts);
        let exit = self
            .runner
            .run(&spec, &launch.supervision.run_options(false))
            .await?;

        advance(&mut state, LifecycleState::Exited);
        if !exit.success() {
            if launch.fail_on_start_error {
                return Err(Error::StartFailed(exit.exit_code.unwrap_or(-1)));
            }
            self.sink.warn(&format!(
                "Start script exited with {}",
                describe_exit(&exit)
            ));
        }

        tracing::info!(exit_code = ?exit.exit_code, "Start script finished");
        Ok(StartReport {
            install_dir,
            effective_data_dir,
            validation,
            exit,
        })
    }

    /// Run the stop script, forwarding its output to the sink.
    ///
    /// The exit code is returned and logged; a non-zero code is not an error.
    #[tracing::instrument(skip_all, fields(install_dir = %installation.install_dir.display()))]
    pub async fn stop(
        &self,
        installation: &InstallationConfig,
        supervision: &Supervision,
    ) -> Result<StopReport> {
        let mut state = LifecycleState::Idle;

        advance(&mut state, LifecycleState::Launching);
        let install_dir = absolute(&installation.install_dir);
        self.sink
            .info(&format!("Stopping TeamCity in [{}]", install_dir.display()));

        let spec = CommandBuilder::new(&installation.install_dir, self.platform)
            .build(ServerAction::Stop);
        let exit = self.runner.run(&spec, &supervision.run_options(true)).await?;

        advance(&mut state, LifecycleState::Exited);
        if !exit.success() {
            self.sink
                .warn(&format!("Stop script exited with {}", describe_exit(&exit)));
        }

        tracing::info!(exit_code = ?exit.exit_code, "Stop script finished");
        Ok(StopReport { install_dir, exit })
    }
}

fn advance(state: &mut LifecycleState, next: LifecycleState) {
    tracing::debug!(from = ?*state, to = ?next, "Lifecycle transition");
    *state = next;
}

fn describe_exit(exit: &ProcessResult) -> String {
    match exit.exit_code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}
