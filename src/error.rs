/// Error handling module for TeamCity Runner.
///
/// This module defines the error types used throughout the library.
/// Every variant that concerns the filesystem carries the offending path so
/// that a failed `start` or `stop` can be diagnosed from the message alone.
///
/// # Example
///
/// ```
/// use teamcity_runner::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::MissingVersionConfig) => println!("Set teamcityVersion first"),
///         Err(Error::CopyFailed { to, .. }) => println!("Could not deploy to {}", to.display()),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the teamcity-runner library.
///
/// Soft validation problems (a version mismatch, a directory that does not
/// look like an installation) are not errors; they are reported through
/// [`ValidationOutcome`](crate::installation::ValidationOutcome).
#[derive(Error, Debug)]
pub enum Error {
    /// The expected TeamCity version was not configured.
    ///
    /// Raised before any filesystem access by every operation that needs the
    /// version.
    #[error(
        "Could not determine TeamCity version. Set the `teamcityVersion` option \
         in the configuration or pass --teamcity-version"
    )]
    MissingVersionConfig,

    /// The metadata archive holding the server version is absent or not a file.
    #[error(
        "Can not read TeamCity version. Can not access [{}]. Check that [{}] points to a valid TeamCity installation",
        .archive.display(),
        .install_dir.display()
    )]
    InstallationUnreadable {
        /// Path of the archive that was probed
        archive: PathBuf,
        /// Configured installation directory
        install_dir: PathBuf,
    },

    /// The metadata archive exists but does not contain the version resource.
    #[error("Resource [{resource}] not found in [{}]", .archive.display())]
    MetadataMissing {
        /// Path of the archive that was opened
        archive: PathBuf,
        /// Name of the resource that was looked up
        resource: String,
    },

    /// The archive or the version resource inside it could not be decoded.
    ///
    /// This error occurs when:
    /// - The archive is not a valid zip file
    /// - The resource is not well-formed XML
    /// - The display version key is absent from the resource
    #[error("Invalid version metadata: {0}")]
    MetadataInvalid(String),

    /// The directory does not look like a TeamCity installation.
    ///
    /// Only raised when the strict shape check is enabled.
    #[error("[{}] does not look like a TeamCity installation", .0.display())]
    NotAnInstallation(PathBuf),

    /// The control script could not be launched.
    #[error("Failed to launch [{program}]: {source}")]
    ProcessLaunchFailed {
        /// Program that was executed
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Error while waiting on or reading from a launched process.
    #[error("Server process error: {0}")]
    Process(String),

    /// The plugin artifact could not be copied into the data directory.
    #[error("Failed to copy [{}] to [{}]: {source}", .from.display(), .to.display())]
    CopyFailed {
        /// Artifact being deployed
        from: PathBuf,
        /// Destination file
        to: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The process did not finish before its deadline and was killed.
    #[error("Process did not exit within {0:?}")]
    Timeout(Duration),

    /// The run was cancelled and the process was killed.
    #[error("Process run was cancelled")]
    Cancelled,

    /// The start script exited with a non-zero code.
    ///
    /// Only raised when `failOnStartError` is enabled.
    #[error("Start script exited with code {0}")]
    StartFailed(i32),

    /// Failed to parse configuration from a file or string.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains unusable values.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
}

/// Result type for teamcity-runner operations.
///
/// This is a convenience type alias for `std::result::Result` with the `Error` type
/// from this module.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_message_names_both_paths() {
        let err = Error::InstallationUnreadable {
            archive: PathBuf::from("/opt/tc/webapps/ROOT/WEB-INF/lib/common-api.jar"),
            install_dir: PathBuf::from("/opt/tc"),
        };
        let message = err.to_string();
        assert!(message.contains("[/opt/tc/webapps/ROOT/WEB-INF/lib/common-api.jar]"));
        assert!(message.contains("[/opt/tc]"));
    }

    #[test]
    fn test_copy_failed_exposes_source() {
        let err = Error::CopyFailed {
            from: PathBuf::from("a.zip"),
            to: PathBuf::from("data/plugins/a.zip"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("data/plugins/a.zip"));
    }
}
