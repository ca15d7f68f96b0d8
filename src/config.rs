//! Runtime settings resolved from the command line and environment.
//!
//! Every setting has a clap option backed by an environment variable
//! (see [`crate::cli::Cli`]). Paths left unset fall back to the per-user
//! config directory: `$XDG_CONFIG_HOME/opclip`, else `~/.config/opclip`.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot locate a config directory: neither $XDG_CONFIG_HOME nor $HOME is set")]
    NoConfigDir,
}

/// Resolved settings, passed explicitly to whoever needs them.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where the session token is cached.
    pub session_file: PathBuf,
    /// Extension manifest location.
    pub extensions_file: PathBuf,
    /// How long a secret stays on the clipboard.
    pub window: Duration,
    /// Secret store CLI binary.
    pub op_program: String,
    /// Fuzzy finder binary.
    pub selector_program: String,
}

const SESSION_FILE_NAME: &str = "session";
const EXTENSIONS_FILE_NAME: &str = "extensions.toml";

impl Settings {
    /// Resolve settings from parsed arguments and the process environment.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::resolve(cli, |name| std::env::var(name).ok())
    }

    fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config_dir = || default_config_dir(&env).ok_or(ConfigError::NoConfigDir);

        let session_file = match &cli.session_file {
            Some(path) => path.clone(),
            None => config_dir()?.join(SESSION_FILE_NAME),
        };
        let extensions_file = match &cli.extensions {
            Some(path) => path.clone(),
            None => config_dir()?.join(EXTENSIONS_FILE_NAME),
        };

        Ok(Self {
            session_file,
            extensions_file,
            window: Duration::from_secs(cli.timeout),
            op_program: cli.op_program.clone(),
            selector_program: cli.selector_program.clone(),
        })
    }
}

/// `$XDG_CONFIG_HOME/opclip`, falling back to `$HOME/.config/opclip`.
/// Empty variables count as unset.
fn default_config_dir(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let non_empty = |name: &str| env(name).filter(|v| !v.is_empty());
    let base = match non_empty("XDG_CONFIG_HOME") {
        Some(xdg) => PathBuf::from(xdg),
        None => PathBuf::from(non_empty("HOME")?).join(".config"),
    };
    Some(base.join("opclip"))
}
