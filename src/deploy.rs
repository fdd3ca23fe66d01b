//! Plugin deployment into the server data directory.
//!
//! TeamCity picks up plugin archives from `<data dir>/plugins`. The data
//! directory may be configured relative to the installation.

use crate::error::{Error, Result};
use crate::installation::version::absolute;
use std::path::{Path, PathBuf};

/// Name of the plugin drop folder inside the data directory
pub const PLUGINS_DIR: &str = "plugins";

/// One deployment of a built plugin, assembled per start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    /// Built plugin archive
    pub artifact_path: PathBuf,
    /// Data directory, absolute or relative to the installation
    pub data_dir: String,
    /// File name of the plugin inside `plugins/`
    pub plugin_file_name: String,
}

/// Resolve the data directory against the installation.
///
/// Absolute paths are used unchanged; relative ones are joined onto
/// `install_dir`. The result is made absolute against the current directory.
pub fn effective_data_dir(configured: &str, install_dir: &Path) -> PathBuf {
    let configured = Path::new(configured);
    let resolved = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        install_dir.join(configured)
    };
    absolute(&resolved)
}

/// Copy the plugin archive into `<effective data dir>/plugins/<plugin file name>`.
///
/// Missing destination directories are not created. Returns the effective
/// data directory.
///
/// # Errors
///
/// * [`Error::CopyFailed`] if the archive cannot be copied, including when the
///   `plugins` directory does not exist
#[tracing::instrument(skip(request), fields(artifact = %request.artifact_path.display()))]
pub fn deploy(request: &DeploymentRequest, install_dir: &Path) -> Result<PathBuf> {
    let data_dir = effective_data_dir(&request.data_dir, install_dir);
    let target = data_dir.join(PLUGINS_DIR).join(&request.plugin_file_name);

    std::fs::copy(&request.artifact_path, &target).map_err(|source| Error::CopyFailed {
        from: request.artifact_path.clone(),
        to: target.clone(),
        source,
    })?;

    tracing::info!(target = %target.display(), "Deployed plugin archive");
    Ok(data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_data_dir_resolves_under_installation() {
        let install_dir = std::path::absolute("/opt/tc").unwrap();
        assert_eq!(effective_data_dir(".datadir", &install_dir), install_dir.join(".datadir"));
    }

    #[test]
    fn test_absolute_data_dir_ignores_installation() {
        let data_dir = std::env::temp_dir().join("tc-data");
        let configured = data_dir.to_string_lossy().into_owned();

        assert_eq!(effective_data_dir(&configured, Path::new("/opt/tc")), data_dir);
        assert_eq!(effective_data_dir(&configured, Path::new("elsewhere")), data_dir);
    }
}
