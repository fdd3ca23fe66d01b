use crate::error::{Error, Result};
use crate::installation::version::{self, ServerVersion, absolute};
use crate::log::LogSink;
use crate::server::Platform;
use std::path::{Path, PathBuf};

/// What the validator needs to know about an installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationConfig {
    /// Root of the extracted TeamCity distribution
    pub install_dir: PathBuf,
    /// Version the project is built against; must be non-empty
    pub expected_version: String,
}

impl InstallationConfig {
    /// Create an installation config
    pub fn new(install_dir: impl Into<PathBuf>, expected_version: impl Into<String>) -> Self {
        Self {
            install_dir: install_dir.into(),
            expected_version: expected_version.into(),
        }
    }

    /// Fail with [`Error::MissingVersionConfig`] when no version is configured.
    pub fn require_expected_version(&self) -> Result<&str> {
        if self.expected_version.is_empty() {
            return Err(Error::MissingVersionConfig);
        }
        Ok(&self.expected_version)
    }
}

/// How to treat a directory that does not look like an installation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShapeCheck {
    /// Report [`ValidationOutcome::NotAnInstallation`] without any warning
    #[default]
    Lenient,
    /// Fail with [`Error::NotAnInstallation`]
    Strict,
}

/// Result of an opportunistic installation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The installed version is the expected one
    Ok,
    /// The directory is missing or has no control script
    NotAnInstallation,
    /// The installed version differs from the expected one
    VersionMismatch {
        /// Version found in the installation
        actual: ServerVersion,
        /// Version from the configuration
        expected: String,
        /// Installation that was inspected
        install_dir: PathBuf,
    },
    /// The directory looks like an installation but its version could not be read
    Unverified {
        /// Why the version could not be read
        reason: String,
    },
}

impl ValidationOutcome {
    /// Whether this outcome should be surfaced to the operator as a warning
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ValidationOutcome::VersionMismatch { .. } | ValidationOutcome::Unverified { .. }
        )
    }

    /// Operator-facing description of a warning outcome
    pub fn warning_message(&self) -> Option<String> {
        match self {
            ValidationOutcome::VersionMismatch {
                actual,
                expected,
                install_dir,
            } => Some(format!(
                "TeamCity version at [{}] is [{}], but project uses [{}]",
                absolute(install_dir).display(),
                actual,
                expected
            )),
            ValidationOutcome::Unverified { reason } => {
                Some(format!("Could not verify TeamCity version: {}", reason))
            }
            _ => None,
        }
    }
}

/// Checks that a directory is a TeamCity installation of the expected version.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallationValidator {
    platform: Platform,
    shape_check: ShapeCheck,
}

impl InstallationValidator {
    /// Validator probing the control script of `platform`
    pub fn new(platform: Platform, shape_check: ShapeCheck) -> Self {
        Self {
            platform,
            shape_check,
        }
    }

    /// Whether `dir` contains the control script of this validator's platform.
    pub fn looks_like_installation(&self, dir: &Path) -> bool {
        dir.is_dir() && dir.join(self.platform.probe_script()).exists()
    }

    /// Validate an installation without aborting on soft problems.
    ///
    /// Mismatched versions and unreadable metadata are returned as warning
    /// outcomes and also reported to `sink`. Metadata that cannot be read is
    /// therefore not skipped silently: it produces
    /// [`ValidationOutcome::Unverified`] and a warn line, and the caller goes
    /// on as for a mismatch. A directory that is not an installation is
    /// accepted silently unless the shape check is strict.
    ///
    /// # Errors
    ///
    /// * [`Error::MissingVersionConfig`] if no expected version is configured
    /// * [`Error::NotAnInstallation`] in strict mode
    #[tracing::instrument(skip(self, sink), fields(install_dir = %cfg.install_dir.display()))]
    pub fn validate(&self, cfg: &InstallationConfig, sink: &dyn LogSink) -> Result<ValidationOutcome> {
        let expected = cfg.require_expected_version()?;

        if !self.looks_like_installation(&cfg.install_dir) {
            return match self.shape_check {
                ShapeCheck::Lenient => {
                    tracing::debug!("Directory does not look like an installation, skipping version check");
                    Ok(ValidationOutcome::NotAnInstallation)
                }
                ShapeCheck::Strict => Err(Error::NotAnInstallation(absolute(&cfg.install_dir))),
            };
        }

        let outcome = match version::read_version(&cfg.install_dir) {
            Ok(actual) if actual.matches(expected) => ValidationOutcome::Ok,
            Ok(actual) => ValidationOutcome::VersionMismatch {
                actual,
                expected: expected.to_string(),
                install_dir: cfg.install_dir.clone(),
            },
            Err(
                e @ (Error::InstallationUnreadable { .. }
                | Error::MetadataMissing { .. }
                | Error::MetadataInvalid(_)),
            ) => ValidationOutcome::Unverified {
                reason: e.to_string(),
            },
            Err(e) => return Err(e),
        };

        if let Some(message) = outcome.warning_message() {
            sink.warn(&message);
        }
        Ok(outcome)
    }

    /// Read the installed version, failing on anything that prevents it.
    ///
    /// Used by explicit version queries, where an unreadable installation is
    /// an error rather than a warning.
    pub fn require_version(&self, cfg: &InstallationConfig) -> Result<ServerVersion> {
        cfg.require_expected_version()?;
        version::read_version(&cfg.install_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemorySink;

    #[test]
    fn test_empty_version_is_fatal_before_filesystem_access() {
        let validator = InstallationValidator::default();
        let cfg = InstallationConfig::new("/definitely/not/here", "");
        let sink = MemorySink::new();

        let result = validator.validate(&cfg, &sink);

        assert!(matches!(result, Err(Error::MissingVersionConfig)));
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_missing_directory_is_silently_accepted() {
        let validator = InstallationValidator::default();
        let cfg = InstallationConfig::new("/definitely/not/here", "2023.11");
        let sink = MemorySink::new();

        let outcome = validator.validate(&cfg, &sink).unwrap();

        assert_eq!(outcome, ValidationOutcome::NotAnInstallation);
        assert!(!outcome.is_warning());
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_strict_mode_rejects_missing_directory() {
        let validator = InstallationValidator::new(Platform::Unix, ShapeCheck::Strict);
        let cfg = InstallationConfig::new("/definitely/not/here", "2023.11");

        let result = validator.validate(&cfg, &MemorySink::new());

        assert!(matches!(result, Err(Error::NotAnInstallation(_))));
    }

    #[test]
    fn test_mismatch_message_names_both_versions() {
        let outcome = ValidationOutcome::VersionMismatch {
            actual: ServerVersion::new("2023.05"),
            expected: "2023.11".to_string(),
            install_dir: PathBuf::from("/opt/tc"),
        };
        let message = outcome.warning_message().unwrap();
        assert!(message.contains("[2023.05]"));
        assert!(message.contains("[2023.11]"));
        assert!(message.contains("/opt/tc"));
        assert!(ValidationOutcome::Ok.warning_message().is_none());
    }
}
