//! Launch and timing settings for the external engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENGINE_PROGRAM: &str = "lc0";
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_REPLY_GRACE: Duration = Duration::from_secs(1);
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_millis(500);
pub const DEFAULT_QUIT_TIMEOUT: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub program: PathBuf,
    /// Weights file handed to the engine as `--weights=<path>`.
    pub weights: Option<PathBuf>,
    pub args: Vec<String>,
    /// `setoption` pairs, sent only for options the engine advertises.
    pub uci_options: Vec<(String, String)>,
    /// Bound on the whole `uci` .. `readyok` exchange, and on `isready` waits.
    pub handshake_timeout: Duration,
    /// Wall time allowed beyond the think budget before `stop` is sent.
    pub reply_grace: Duration,
    /// Wait after `stop` before the process is killed.
    pub stop_grace: Duration,
    /// Wait after `quit` before the process is killed.
    pub quit_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_PROGRAM)
    }
}

impl EngineConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            weights: None,
            args: Vec::new(),
            uci_options: Vec::new(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            reply_grace: DEFAULT_REPLY_GRACE,
            stop_grace: DEFAULT_STOP_GRACE,
            quit_timeout: DEFAULT_QUIT_TIMEOUT,
        }
    }

    pub fn with_weights(mut self, weights: impl Into<PathBuf>) -> Self {
        self.weights = Some(weights.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.uci_options.push((name.into(), value.into()));
        self
    }

    /// Command-line arguments for the engine process, weights first.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        if let Some(weights) = &self.weights {
            args.push(format!("--weights={}", weights.display()));
        }
        args.extend(self.args.iter().cloned());
        args
    }

    /// Short name for log lines.
    pub fn label(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_engine() {
        let config = EngineConfig::default();
        assert_eq!(config.program, PathBuf::from("lc0"));
        assert_eq!(config.handshake_timeout, Duration::from_secs(30));
        assert!(config.command_args().is_empty());
        assert_eq!(config.label(), "lc0");
    }

    #[test]
    fn weights_are_passed_as_first_argument() {
        let config = EngineConfig::new("/opt/engines/lc0")
            .with_arg("--threads=2")
            .with_weights("/models/maia-1900.pb.gz")
            .with_option("Hash", "64");
        assert_eq!(
            config.command_args(),
            vec!["--weights=/models/maia-1900.pb.gz".to_owned(), "--threads=2".to_owned()]
        );
        assert_eq!(config.uci_options, vec![("Hash".to_owned(), "64".to_owned())]);
        assert_eq!(config.label(), "lc0");
    }
}
