use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Base name of the distribution's control script
pub const CONTROL_SCRIPT: &str = "runAll";

/// Verb passed to the control script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAction {
    /// Start the server and the bundled agent
    Start,
    /// Stop the server and the bundled agent
    Stop,
}

impl ServerAction {
    /// The verb as the control script expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerAction::Start => "start",
            ServerAction::Stop => "stop",
        }
    }
}

impl fmt::Display for ServerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform family deciding how the control script is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `cmd /C bin\runAll <action>`
    Windows,
    /// `/bin/bash bin/runAll.sh <action>`
    Unix,
}

impl Platform {
    /// Platform of the running process
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Classify an OS name; anything mentioning Windows is Windows.
    pub fn from_os_name(os_name: &str) -> Self {
        if os_name.to_ascii_lowercase().contains("windows") {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Script path passed to the shell, relative to the installation
    pub fn control_script(&self) -> String {
        match self {
            Platform::Windows => format!("bin\\{}", CONTROL_SCRIPT),
            Platform::Unix => format!("bin/{}.sh", CONTROL_SCRIPT),
        }
    }

    /// File whose presence marks a directory as an installation
    pub fn probe_script(&self) -> PathBuf {
        let file = match self {
            Platform::Windows => format!("{}.bat", CONTROL_SCRIPT),
            Platform::Unix => format!("{}.sh", CONTROL_SCRIPT),
        };
        Path::new("bin").join(file)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// A fully resolved process invocation.
///
/// Built once and consumed by [`ProcessRunner::run`](crate::server::ProcessRunner::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,
    /// Arguments after the program
    pub args: Vec<String>,
    /// Directory the process starts in
    pub working_dir: PathBuf,
    /// Variables added to the inherited environment
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Return the spec with an extra environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Builds control script invocations for one installation.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    install_dir: PathBuf,
    platform: Platform,
}

impl CommandBuilder {
    /// Builder for the installation at `install_dir`
    pub fn new(install_dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            install_dir: install_dir.into(),
            platform,
        }
    }

    /// Command running the control script with `action`.
    ///
    /// The working directory is the installation; no environment is set.
    pub fn build(&self, action: ServerAction) -> CommandSpec {
        let (program, mut args) = match self.platform {
            Platform::Windows => ("cmd", vec!["/C".to_string()]),
            Platform::Unix => ("/bin/bash", Vec::new()),
        };
        args.push(self.platform.control_script());
        args.push(action.as_str().to_string());

        CommandSpec {
            program: program.to_string(),
            args,
            working_dir: self.install_dir.clone(),
            env: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_start_command() {
        let spec = CommandBuilder::new("C:\\TeamCity", Platform::Windows).build(ServerAction::Start);
        assert_eq!(spec.argv(), vec!["cmd", "/C", "bin\\runAll", "start"]);
        assert_eq!(spec.working_dir, PathBuf::from("C:\\TeamCity"));
        assert!(spec.env.is_empty());
    }

    #[test]
    fn test_unix_stop_command() {
        let spec = CommandBuilder::new("/opt/tc", Platform::Unix).build(ServerAction::Stop);
        assert_eq!(spec.argv(), vec!["/bin/bash", "bin/runAll.sh", "stop"]);
        assert_eq!(spec.working_dir, PathBuf::from("/opt/tc"));
    }

    #[test]
    fn test_platform_from_os_name() {
        assert_eq!(Platform::from_os_name("Windows 10"), Platform::Windows);
        assert_eq!(Platform::from_os_name("windows"), Platform::Windows);
        assert_eq!(Platform::from_os_name("linux"), Platform::Unix);
        assert_eq!(Platform::from_os_name("Mac OS X"), Platform::Unix);
    }

    #[test]
    fn test_probe_script_per_platform() {
        assert_eq!(Platform::Unix.probe_script(), Path::new("bin").join("runAll.sh"));
        assert_eq!(Platform::Windows.probe_script(), Path::new("bin").join("runAll.bat"));
    }
}
