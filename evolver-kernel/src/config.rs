//! Kernel configuration.
//!
//! All settings are read once, up front. [`KernelConfig::from_env`] is the
//! only place that looks at the process environment; everything downstream
//! receives an explicit value.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::channel::PtyConfig;
use crate::transport::LaunchConfig;

/// Environment variable naming the Evolver executable.
pub const ENV_COMMAND: &str = "EVOLVER_CMD";

/// Environment variable holding the initial datafile answer.
pub const ENV_DATAFILE: &str = "EVOLVER_DATAFILE";

/// Environment variable enabling the raw I/O tee on stderr.
pub const ENV_DEBUG: &str = "EVOLVER_KERNEL_DEBUG";

/// Executable name searched on `PATH` when no override is set.
pub const DEFAULT_PROGRAM: &str = "evolver";

/// Configuration for launching and driving Evolver.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Executable to launch.
    pub program: PathBuf,

    /// Arguments passed to the executable (Evolver itself takes none).
    pub args: Vec<String>,

    /// Answer to the datafile prompt; empty continues without loading.
    pub datafile: String,

    /// Copy raw terminal traffic to stderr.
    pub debug: bool,

    /// Bound on each handshake wait.
    pub handshake_timeout: Duration,

    /// Bound on the wait after the nudge line.
    pub nudge_timeout: Duration,

    /// Bound on the wait for the prompt after an interrupt.
    pub resync_timeout: Duration,

    /// Quiet period that ends the hunt for stale prompts after a degraded
    /// startup step.
    pub settle_timeout: Duration,

    /// Terminal settings.
    pub pty: PtyConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            args: Vec::new(),
            datafile: String::new(),
            debug: false,
            handshake_timeout: Duration::from_secs(30),
            nudge_timeout: Duration::from_secs(5),
            resync_timeout: Duration::from_secs(2),
            settle_timeout: Duration::from_millis(500),
            pty: PtyConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Create a configuration that launches `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Read `EVOLVER_CMD`, `EVOLVER_DATAFILE` and `EVOLVER_KERNEL_DEBUG`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var_os(key))
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let program = match lookup(ENV_COMMAND) {
            Some(cmd) if !cmd.is_empty() => PathBuf::from(cmd),
            _ => find_in_path(DEFAULT_PROGRAM, lookup("PATH").as_deref())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM)),
        };

        let datafile = lookup(ENV_DATAFILE)
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();

        let debug = lookup(ENV_DEBUG).is_some_and(|v| !v.is_empty());

        Self {
            program,
            datafile,
            debug,
            ..Self::default()
        }
    }

    /// Set the datafile answer.
    pub fn with_datafile(mut self, datafile: impl Into<String>) -> Self {
        self.datafile = datafile.into();
        self
    }

    /// Add an executable argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Enable or disable the debug tee.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the nudge timeout.
    pub fn with_nudge_timeout(mut self, timeout: Duration) -> Self {
        self.nudge_timeout = timeout;
        self
    }

    /// Set the post-interrupt resync timeout.
    pub fn with_resync_timeout(mut self, timeout: Duration) -> Self {
        self.resync_timeout = timeout;
        self
    }

    /// Set the quiet period used to swallow stale startup prompts.
    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Set terminal options.
    pub fn with_pty(mut self, pty: PtyConfig) -> Self {
        self.pty = pty;
        self
    }

    /// Launch settings for one Evolver process.
    pub fn launch_config(&self) -> LaunchConfig {
        LaunchConfig {
            program: self.program.clone(),
            args: self.args.clone(),
            env: Vec::new(),
            cwd: None,
            pty: self.pty.clone(),
            echo: false,
            debug_tee: self.debug,
        }
    }
}

/// Search the directories of a `PATH`-style value for `name`.
pub fn find_in_path(name: &str, path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = KernelConfig::from_lookup(lookup(&[]));
        assert_eq!(config.program, PathBuf::from("evolver"));
        assert_eq!(config.datafile, "");
        assert!(!config.debug);
        assert_eq!(config.handshake_timeout, Duration::from_secs(30));
        assert_eq!(config.nudge_timeout, Duration::from_secs(5));
        assert_eq!(config.resync_timeout, Duration::from_secs(2));
        assert_eq!(config.settle_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_overrides() {
        let config = KernelConfig::from_lookup(lookup(&[
            ("EVOLVER_CMD", "/opt/evolver/bin/evolver"),
            ("EVOLVER_DATAFILE", "cube.fe"),
            ("EVOLVER_KERNEL_DEBUG", "1"),
        ]));
        assert_eq!(config.program, PathBuf::from("/opt/evolver/bin/evolver"));
        assert_eq!(config.datafile, "cube.fe");
        assert!(config.debug);
        assert!(config.launch_config().debug_tee);
    }

    #[test]
    fn test_empty_debug_value_is_off() {
        let config = KernelConfig::from_lookup(lookup(&[("EVOLVER_KERNEL_DEBUG", "")]));
        assert!(!config.debug);
    }

    #[cfg(unix)]
    #[test]
    fn test_discovers_program_on_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("evolver");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let path = env::join_paths([Path::new("/nonexistent"), dir.path()]).unwrap();
        let config =
            KernelConfig::from_lookup(lookup(&[("PATH", path.to_str().unwrap())]));
        assert_eq!(config.program, exe);
    }

    #[test]
    fn test_launch_config_disables_echo() {
        let launch = KernelConfig::new("/bin/evolver").with_arg("-q").launch_config();
        assert!(!launch.echo);
        assert_eq!(launch.args, vec!["-q".to_string()]);
    }
}
