/// Server control module for TeamCity Runner.
///
/// This module turns a start or stop request into a control script
/// invocation and supervises it. All public operations are instrumented
/// with `tracing` spans.
///
/// # Components
///
/// * `command` - Builds the platform-specific control script invocation
/// * `process` - Launches a command and waits for it, optionally streaming output
/// * `lifecycle` - Validate, deploy and launch sequence behind `start` and `stop`
///
/// # Examples
///
/// Building a stop command:
///
/// ```
/// use teamcity_runner::server::{CommandBuilder, Platform, ServerAction};
///
/// let spec = CommandBuilder::new("/opt/teamcity", Platform::Unix).build(ServerAction::Stop);
/// assert_eq!(spec.argv(), vec!["/bin/bash", "bin/runAll.sh", "stop"]);
/// ```
///
/// Stopping an installation:
///
/// ```no_run
/// use teamcity_runner::installation::InstallationConfig;
/// use teamcity_runner::log::TracingSink;
/// use teamcity_runner::server::{LifecycleController, Supervision};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> teamcity_runner::Result<()> {
///     let controller = LifecycleController::new(Arc::new(TracingSink));
///     let installation = InstallationConfig::new("target/servers/2023.11", "2023.11");
///     let report = controller.stop(&installation, &Supervision::default()).await?;
///     println!("stop exited with {:?}", report.exit.exit_code);
///     Ok(())
/// }
/// ```
pub mod command;
pub mod lifecycle;
mod process;

pub use command::{CONTROL_SCRIPT, CommandBuilder, CommandSpec, Platform, ServerAction};
pub use lifecycle::{
    AGENT_OPTS_ENV, DATA_PATH_ENV, LaunchOptions, LifecycleController, LifecycleState,
    SERVER_OPTS_ENV, StartReport, StopReport, Supervision,
};
pub use process::{ProcessResult, ProcessRunner, RunOptions};
