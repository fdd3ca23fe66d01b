mod common;

use assert_fs::TempDir;
use mockall::mock;
use teamcity_runner::error::{Error, Result};
use teamcity_runner::installation::version::METADATA_ARCHIVE;
use teamcity_runner::installation::{
    InstallationConfig, InstallationValidator, ShapeCheck, ValidationOutcome, read_version,
};
use teamcity_runner::log::{LogSink, MemorySink};
use teamcity_runner::server::Platform;
use tracing::Level;

mock! {
    pub Sink {}
    impl LogSink for Sink {
        fn log(&self, level: Level, line: &str);
    }
}

fn unix_validator() -> InstallationValidator {
    InstallationValidator::new(Platform::Unix, ShapeCheck::Lenient)
}

#[test]
fn test_read_version_from_archive() -> Result<()> {
    let install = common::installation("2023.11.1", "exit 0");

    let version = read_version(install.path())?;

    assert_eq!(version.as_str(), "2023.11.1");
    Ok(())
}

#[test]
fn test_read_version_without_resource_is_metadata_missing() {
    let install = TempDir::new().unwrap();
    common::write_archive(
        &install.path().join(METADATA_ARCHIVE),
        &[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n")],
    );

    match read_version(install.path()) {
        Err(Error::MetadataMissing { resource, .. }) => {
            assert_eq!(resource, "serverVersion.properties.xml");
        }
        other => panic!("expected MetadataMissing, got {:?}", other),
    }
}

#[test]
fn test_read_version_when_archive_is_a_directory() {
    let install = TempDir::new().unwrap();
    std::fs::create_dir_all(install.path().join(METADATA_ARCHIVE)).unwrap();

    let result = read_version(install.path());

    assert!(matches!(result, Err(Error::InstallationUnreadable { .. })));
}

#[test]
fn test_read_version_from_corrupt_archive() {
    let install = TempDir::new().unwrap();
    let archive = install.path().join(METADATA_ARCHIVE);
    std::fs::create_dir_all(archive.parent().unwrap()).unwrap();
    std::fs::write(&archive, b"definitely not a zip").unwrap();

    let result = read_version(install.path());

    assert!(matches!(result, Err(Error::MetadataInvalid(_))));
}

#[test]
fn test_empty_expected_version_is_fatal() {
    let install = common::installation("2023.11", "exit 0");
    let cfg = InstallationConfig::new(install.path(), "");

    let result = unix_validator().validate(&cfg, &MemorySink::new());

    assert!(matches!(result, Err(Error::MissingVersionConfig)));
    assert!(matches!(
        unix_validator().require_version(&cfg),
        Err(Error::MissingVersionConfig)
    ));
}

#[test]
fn test_directory_without_control_script_is_accepted_silently() -> Result<()> {
    let dir = TempDir::new().unwrap();
    common::write_metadata_archive(dir.path(), "2023.05");
    let cfg = InstallationConfig::new(dir.path(), "2023.11");

    let mut sink = MockSink::new();
    sink.expect_log().times(0);
    let outcome = unix_validator().validate(&cfg, &sink)?;

    assert_eq!(outcome, ValidationOutcome::NotAnInstallation);
    assert!(!outcome.is_warning());
    Ok(())
}

#[test]
fn test_strict_check_rejects_directory_without_control_script() {
    let dir = TempDir::new().unwrap();
    let cfg = InstallationConfig::new(dir.path(), "2023.11");
    let validator = InstallationValidator::new(Platform::Unix, ShapeCheck::Strict);

    let result = validator.validate(&cfg, &MemorySink::new());

    assert!(matches!(result, Err(Error::NotAnInstallation(_))));
}

#[test]
fn test_matching_version_gives_no_warning() -> Result<()> {
    let install = common::installation("2023.11", "exit 0");
    let cfg = InstallationConfig::new(install.path(), "2023.11");

    let mut sink = MockSink::new();
    sink.expect_log().times(0);
    let outcome = unix_validator().validate(&cfg, &sink)?;

    assert_eq!(outcome, ValidationOutcome::Ok);
    Ok(())
}

#[test]
fn test_mismatched_version_warns_with_both_versions() -> Result<()> {
    let install = common::installation("2023.11", "exit 0");
    let cfg = InstallationConfig::new(install.path(), "2024.03");

    let mut sink = MockSink::new();
    sink.expect_log()
        .withf(|level, line| {
            *level == Level::WARN && line.contains("[2023.11]") && line.contains("[2024.03]")
        })
        .times(1)
        .return_const(());
    let outcome = unix_validator().validate(&cfg, &sink)?;

    match outcome {
        ValidationOutcome::VersionMismatch {
            actual, expected, ..
        } => {
            assert_eq!(actual.as_str(), "2023.11");
            assert_eq!(expected, "2024.03");
        }
        other => panic!("expected VersionMismatch, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_unreadable_version_is_downgraded_to_warning() -> Result<()> {
    let dir = TempDir::new().unwrap();
    common::write_control_script(dir.path(), "exit 0");
    let cfg = InstallationConfig::new(dir.path(), "2023.11");
    let sink = MemorySink::new();

    let outcome = unix_validator().validate(&cfg, &sink)?;

    assert!(matches!(outcome, ValidationOutcome::Unverified { .. }));
    let warnings = sink.lines_at(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("common-api.jar"));

    assert!(matches!(
        unix_validator().require_version(&cfg),
        Err(Error::InstallationUnreadable { .. })
    ));
    Ok(())
}
