use crate::config::Config;
use crate::error::{Error, Result};

/// Validates that a configuration can produce a deployment.
///
/// The expected version is checked by the installation validator instead, so
/// that a missing version fails every version-dependent operation the same way.
pub fn validate_config(config: &Config) -> Result<()> {
    let derives_artifact = config.plugin_file_name.is_none() || config.artifact_path.is_none();
    if config.project.artifact_id.trim().is_empty() && derives_artifact {
        return Err(Error::ConfigInvalid(
            "project.artifactId is empty; set it or configure both pluginFileName and artifactPath"
                .to_string(),
        ));
    }

    if let Some(name) = &config.plugin_file_name {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(Error::ConfigInvalid(format!(
                "pluginFileName '{}' must be a plain file name",
                name
            )));
        }
    }

    if config.data_directory.is_empty() {
        return Err(Error::ConfigInvalid("dataDirectory is empty".to_string()));
    }

    Ok(())
}
