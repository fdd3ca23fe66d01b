use crate::deploy::DeploymentRequest;
use crate::error::{Error, Result};
use crate::installation::{InstallationConfig, ShapeCheck};
use crate::server::LaunchOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default data directory, relative to the installation
pub const DEFAULT_DATA_DIRECTORY: &str = ".datadir";

/// Default JVM options for the server process (remote debugging on port 10111)
pub const DEFAULT_SERVER_DEBUG_OPTS: &str =
    "-Xdebug -Xrunjdwp:transport=dt_socket,server=y,suspend=n,address=10111";

/// Default JVM options for the agent process (remote debugging on port 10112)
pub const DEFAULT_AGENT_DEBUG_OPTS: &str =
    "-Xdebug -Xrunjdwp:transport=dt_socket,server=y,suspend=n,address=10112";

/// Build metadata of the plugin project.
///
/// # Examples
///
/// ```
/// use teamcity_runner::config::ProjectInfo;
///
/// let project = ProjectInfo::new("target", "my-plugin");
/// assert_eq!(project.default_plugin_file_name(), "my-plugin.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    /// Directory the build writes its outputs to
    pub build_directory: PathBuf,
    /// Identifier of the built artifact
    pub artifact_id: String,
}

impl ProjectInfo {
    /// Create project metadata
    pub fn new(build_directory: impl Into<PathBuf>, artifact_id: impl Into<String>) -> Self {
        Self {
            build_directory: build_directory.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// `<artifactId>.zip`
    pub fn default_plugin_file_name(&self) -> String {
        format!("{}.zip", self.artifact_id)
    }
}

/// Configuration for starting and stopping a TeamCity installation.
///
/// # JSON Schema
///
/// Only `project` is required; every other key falls back to a default.
///
/// ```json
/// {
///   "project": { "buildDirectory": "target", "artifactId": "my-plugin" },
///   "teamcityVersion": "2023.11",
///   "teamcityDir": "target/servers/2023.11",
///   "dataDirectory": ".datadir",
///   "serverDebugOpts": "-Xdebug ...address=10111",
///   "agentDebugOpts": "-Xdebug ...address=10112",
///   "pluginFileName": "my-plugin.zip",
///   "artifactPath": "target/my-plugin.zip",
///   "strictInstallationCheck": false,
///   "failOnStartError": false
/// }
/// ```
///
/// # Examples
///
/// ```no_run
/// use teamcity_runner::config::Config;
///
/// let config = Config::from_file("teamcity-runner.json").unwrap();
/// println!("Installation: {}", config.install_dir().display());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// The plugin project being tested
    pub project: ProjectInfo,

    /// Installation directory; defaults to `<buildDirectory>/servers/<teamcityVersion>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teamcity_dir: Option<PathBuf>,

    /// Version the plugin is built against
    #[serde(default)]
    pub teamcity_version: String,

    /// Data directory, absolute or relative to the installation
    #[serde(default = "default_data_directory")]
    pub data_directory: String,

    /// Value of `TEAMCITY_SERVER_OPTS`
    #[serde(default = "default_server_debug_opts")]
    pub server_debug_opts: String,

    /// Value of `TEAMCITY_AGENT_OPTS`
    #[serde(default = "default_agent_debug_opts")]
    pub agent_debug_opts: String,

    /// Name of the deployed plugin file; defaults to `<artifactId>.zip`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_file_name: Option<String>,

    /// Built plugin archive; defaults to `<buildDirectory>/<pluginFileName>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,

    /// Fail instead of silently continuing when the directory is not an installation
    #[serde(default)]
    pub strict_installation_check: bool,

    /// Fail `start` when the start script exits with a non-zero code
    #[serde(default)]
    pub fail_on_start_error: bool,
}

fn default_data_directory() -> String {
    DEFAULT_DATA_DIRECTORY.to_string()
}

fn default_server_debug_opts() -> String {
    DEFAULT_SERVER_DEBUG_OPTS.to_string()
}

fn default_agent_debug_opts() -> String {
    DEFAULT_AGENT_DEBUG_OPTS.to_string()
}

impl Config {
    /// Configuration for `project` with every option at its default
    pub fn new(project: ProjectInfo, teamcity_version: impl Into<String>) -> Self {
        Self {
            project,
            teamcity_dir: None,
            teamcity_version: teamcity_version.into(),
            data_directory: default_data_directory(),
            server_debug_opts: default_server_debug_opts(),
            agent_debug_opts: default_agent_debug_opts(),
            plugin_file_name: None,
            artifact_path: None,
            strict_installation_check: false,
            fail_on_start_error: false,
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if the file cannot be read or is not a
    /// valid configuration document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigParse(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if the string is not valid JSON or does
    /// not match the expected schema.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Effective installation directory
    pub fn install_dir(&self) -> PathBuf {
        match &self.teamcity_dir {
            Some(dir) => dir.clone(),
            None => self
                .project
                .build_directory
                .join("servers")
                .join(&self.teamcity_version),
        }
    }

    /// Effective plugin file name
    pub fn plugin_file_name(&self) -> String {
        self.plugin_file_name
            .clone()
            .unwrap_or_else(|| self.project.default_plugin_file_name())
    }

    /// Effective path of the built plugin archive
    pub fn artifact_path(&self) -> PathBuf {
        match &self.artifact_path {
            Some(path) => path.clone(),
            None => self.project.build_directory.join(self.plugin_file_name()),
        }
    }

    /// Shape check mode selected by `strictInstallationCheck`
    pub fn shape_check(&self) -> ShapeCheck {
        if self.strict_installation_check {
            ShapeCheck::Strict
        } else {
            ShapeCheck::Lenient
        }
    }

    /// Installation settings for validation
    pub fn installation(&self) -> InstallationConfig {
        InstallationConfig::new(self.install_dir(), self.teamcity_version.clone())
    }

    /// Deployment of the built plugin for one start
    pub fn deployment(&self) -> DeploymentRequest {
        DeploymentRequest {
            artifact_path: self.artifact_path(),
            data_dir: self.data_directory.clone(),
            plugin_file_name: self.plugin_file_name(),
        }
    }

    /// Environment and supervision settings for the start script
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            server_debug_opts: self.server_debug_opts.clone(),
            agent_debug_opts: self.agent_debug_opts.clone(),
            fail_on_start_error: self.fail_on_start_error,
            ..LaunchOptions::default()
        }
    }
}
