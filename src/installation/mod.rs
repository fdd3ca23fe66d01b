/// Installation inspection for TeamCity Runner.
///
/// This module decides whether a directory is a usable TeamCity installation
/// and which version it holds.
///
/// # Components
///
/// * `version` - Reads the display version from the packaged metadata archive
/// * `validator` - Shape and version checks producing a [`ValidationOutcome`]
///
/// # Examples
///
/// ```no_run
/// use teamcity_runner::installation::{InstallationConfig, InstallationValidator};
/// use teamcity_runner::log::TracingSink;
///
/// let cfg = InstallationConfig::new("target/servers/2023.11", "2023.11");
/// let outcome = InstallationValidator::default().validate(&cfg, &TracingSink).unwrap();
/// if outcome.is_warning() {
///     println!("{}", outcome.warning_message().unwrap_or_default());
/// }
/// ```
pub mod validator;
pub mod version;

pub use validator::{InstallationConfig, InstallationValidator, ShapeCheck, ValidationOutcome};
pub use version::{ServerVersion, read_version};
