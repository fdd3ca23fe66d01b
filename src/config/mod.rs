//! Configuration module for TeamCity Runner.
//!
//! This module handles parsing, validation, and access to the settings that
//! describe the plugin project and the TeamCity installation it runs
//! against. Configurations are JSON documents loaded from a file or string.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use teamcity_runner::config::Config;
//!
//! let config = Config::from_file("teamcity-runner.json").unwrap();
//! println!("Deploying {}", config.plugin_file_name());
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use teamcity_runner::config::{Config, ProjectInfo};
//!
//! let mut config = Config::new(ProjectInfo::new("target", "my-plugin"), "2023.11");
//! config.data_directory = "/var/tc-data".to_string();
//! assert_eq!(config.install_dir(), std::path::Path::new("target/servers/2023.11"));
//! ```
mod parser;
pub mod validator;

pub use parser::{
    Config, DEFAULT_AGENT_DEBUG_OPTS, DEFAULT_DATA_DIRECTORY, DEFAULT_SERVER_DEBUG_OPTS, ProjectInfo,
};
pub use validator::validate_config;
