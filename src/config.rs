//! Configuration management for console-host.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activation::{ActivationSettings, DEFAULT_TITLE};
use crate::cli::Args;
use crate::output::DEFAULT_BUFFER_LIMIT;
use crate::process::{LaunchSpec, PtySize};
use crate::session::OutputOptions;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Console process configuration.
    pub console: ConsoleSection,
    /// Output hand-off configuration.
    pub output: OutputSection,
    /// Activation behaviour.
    pub activation: ActivationSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Console process section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSection {
    /// REPL executable.
    pub executable: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Working directory for new consoles.
    pub working_dir: Option<PathBuf>,
    /// Base display name.
    pub title: String,
    /// Terminal width. Wide by default so the REPL never wraps.
    pub columns: u16,
    /// Terminal height.
    pub rows: u16,
    /// Extra environment variables.
    pub env: HashMap<String, String>,
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            executable: "evcxr".to_string(),
            args: vec!["--disable-readline".to_string()],
            working_dir: None,
            title: DEFAULT_TITLE.to_string(),
            columns: 1024,
            rows: 24,
            env: HashMap::new(),
        }
    }
}

/// Output section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Bytes retained while no surface is attached.
    pub buffer_limit: usize,
    /// Strip ANSI escape sequences.
    pub strip_ansi: bool,
    /// Report the exit code when a console finishes.
    pub report_exit: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            buffer_limit: DEFAULT_BUFFER_LIMIT,
            strip_ansi: true,
            report_exit: true,
        }
    }
}

/// Activation section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationSection {
    /// Start a console when the container is shown empty.
    pub auto_respawn: bool,
    /// Hide the container once its last console is closed.
    pub hide_when_empty: bool,
}

impl Default for ActivationSection {
    fn default() -> Self {
        Self {
            auto_respawn: true,
            hide_when_empty: true,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(exe) = var("CONSOLE_HOST_EXECUTABLE").filter(|v| !v.is_empty()) {
            self.console.executable = exe;
        }

        if let Some(dir) = var("CONSOLE_HOST_WORKDIR").filter(|v| !v.is_empty()) {
            self.console.working_dir = Some(PathBuf::from(dir));
        }

        if let Some(title) = var("CONSOLE_HOST_TITLE").filter(|v| !v.is_empty()) {
            self.console.title = title;
        }

        if let Some(level) = var("CONSOLE_HOST_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref exe) = args.executable {
            self.console.executable = exe.clone();
        }

        if !args.args.is_empty() {
            self.console.args = args.args.clone();
        }

        if let Some(ref dir) = args.working_dir {
            self.console.working_dir = Some(dir.clone());
        }

        if let Some(ref title) = args.title {
            self.console.title = title.clone();
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Launch description for new consoles.
    pub fn launch_spec(&self) -> LaunchSpec {
        let console = &self.console;
        let mut spec = LaunchSpec::new(&console.executable)
            .size(PtySize::new(console.rows, console.columns));
        spec.args = console.args.clone();
        spec.working_dir = console.working_dir.clone();
        spec.env = console.env.clone();
        spec
    }

    /// Output options for new consoles.
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            buffer_limit: self.output.buffer_limit,
            strip_ansi: self.output.strip_ansi,
            report_exit: self.output.report_exit,
        }
    }

    /// Settings for the activation controller.
    pub fn activation_settings(&self) -> ActivationSettings {
        ActivationSettings {
            title: self.console.title.clone(),
            auto_respawn: self.activation.auto_respawn,
            hide_when_empty: self.activation.hide_when_empty,
        }
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[source] std::io::Error),

    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.console.executable, "evcxr");
        assert_eq!(config.console.args, vec!["--disable-readline"]);
        assert_eq!(config.console.title, "Rust REPL");
        assert_eq!(config.console.columns, 1024);
        assert_eq!(config.output.buffer_limit, 64 * 1024);
        assert!(config.activation.auto_respawn);
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "console": {
                "executable": "/usr/local/bin/evcxr",
                "args": [],
                "working_dir": "/tmp/project",
                "env": { "RUST_BACKTRACE": "1" }
            },
            "output": { "strip_ansi": false },
            "activation": { "auto_respawn": false }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.console.executable, "/usr/local/bin/evcxr");
        assert!(config.console.args.is_empty());
        assert_eq!(
            config.console.working_dir,
            Some(PathBuf::from("/tmp/project"))
        );
        assert_eq!(config.console.env.get("RUST_BACKTRACE").unwrap(), "1");
        assert!(!config.output.strip_ansi);
        assert!(config.output.report_exit);
        assert!(!config.activation.auto_respawn);
        assert!(config.activation.hide_when_empty);
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("failed to parse config file"));
    }

    #[test]
    fn test_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_vars(vars(&[
            ("CONSOLE_HOST_EXECUTABLE", "/opt/evcxr"),
            ("CONSOLE_HOST_WORKDIR", "/work"),
            ("CONSOLE_HOST_TITLE", "Scratch"),
            ("RUST_LOG", "trace"),
        ]));

        assert_eq!(config.console.executable, "/opt/evcxr");
        assert_eq!(config.console.working_dir, Some(PathBuf::from("/work")));
        assert_eq!(config.console.title, "Scratch");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_env_log_level_beats_rust_log() {
        let mut config = Config::default();
        config.apply_vars(vars(&[
            ("CONSOLE_HOST_LOG_LEVEL", "debug"),
            ("RUST_LOG", "trace"),
        ]));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_env_ignored() {
        let mut config = Config::default();
        config.apply_vars(vars(&[("CONSOLE_HOST_EXECUTABLE", "")]));
        assert_eq!(config.console.executable, "evcxr");
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            executable: Some("sh".to_string()),
            working_dir: Some(PathBuf::from("/srv")),
            title: Some("Shell".to_string()),
            log_level: Some("warn".to_string()),
            args: vec!["-i".to_string()],
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.console.executable, "sh");
        assert_eq!(config.console.args, vec!["-i"]);
        assert_eq!(config.console.working_dir, Some(PathBuf::from("/srv")));
        assert_eq!(config.console.title, "Shell");
        assert_eq!(config.log_filter(), "warn");
    }

    #[test]
    fn test_empty_args_keep_configured_args() {
        let mut config = Config::default();
        config.apply_args(&Args::default());
        assert_eq!(config.console.args, vec!["--disable-readline"]);
    }

    #[test]
    fn test_launch_spec() {
        let mut config = Config::default();
        config.console.working_dir = Some(PathBuf::from("/tmp"));
        config
            .console
            .env
            .insert("EVCXR_TMPDIR".to_string(), "/tmp/evcxr".to_string());

        let spec = config.launch_spec();
        assert_eq!(spec.program, "evcxr");
        assert_eq!(spec.args, vec!["--disable-readline"]);
        assert_eq!(spec.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(spec.size, PtySize::new(24, 1024));
        assert_eq!(spec.env.len(), 1);
    }

    #[test]
    fn test_derived_settings() {
        let mut config = Config::default();
        config.console.title = "Scratch".to_string();
        config.output.report_exit = false;

        assert_eq!(config.activation_settings().title, "Scratch");
        assert!(!config.output_options().report_exit);
        assert_eq!(config.output_options().buffer_limit, DEFAULT_BUFFER_LIMIT);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"executable\""));
        assert!(json.contains("\"auto_respawn\""));

        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
