//! Extension commands, kept in a registry of named handlers.
//!
//! Handlers implement [`CommandHandler`] and are added to a
//! [`Registry`] at startup, either in-process or from the TOML
//! extension manifest (see [`manifest`]). Builtin command names always
//! win: a handler registered under a builtin name is kept but never
//! dispatched or documented.

pub mod manifest;
mod shell;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dispatch::Builtin;
use crate::session::SessionToken;
use crate::store::SecretValue;

pub use manifest::Manifest;
pub use shell::ShellCommand;

/// Extension loading and execution errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("failed to read extension manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid extension manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("unknown clipboard backend '{0}' (expected: xclip, xsel, wl-clipboard, pbcopy)")]
    UnknownBackend(String),
    #[error("invalid command name '{0}'")]
    InvalidName(String),
    #[error("command '{0}' is registered twice")]
    Duplicate(String),
    #[error("extension '{name}' failed: {source}")]
    Run {
        name: String,
        source: std::io::Error,
    },
}

/// What the handler asks the dispatcher to do once it returns.
#[derive(Debug)]
pub enum Completion {
    /// Exit with this status.
    Exit(i32),
    /// Expose a secret through the clipboard exchange, then exit.
    Expose { label: String, value: SecretValue },
}

/// Everything a handler may use. The session is already established
/// when a handler runs.
pub struct CommandContext<'a> {
    pub token: &'a SessionToken,
    pub session_file: &'a Path,
}

/// An extension command.
pub trait CommandHandler {
    /// One-line description for the usage text.
    fn help(&self) -> Option<&str> {
        None
    }

    fn run(&self, ctx: &CommandContext<'_>, args: &[String]) -> Result<Completion, ExtensionError>;
}

/// Command name → handler.
#[derive(Default)]
pub struct Registry {
    handlers: BTreeMap<String, Box<dyn CommandHandler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler under `name`.
    pub fn register(
        &mut self,
        name: &str,
        handler: Box<dyn CommandHandler>,
    ) -> Result<(), ExtensionError> {
        validate_name(name)?;
        if self.handlers.contains_key(name) {
            return Err(ExtensionError::Duplicate(name.to_string()));
        }
        if Builtin::resolve(name).is_some() {
            tracing::warn!(name, "extension command is shadowed by a builtin");
        }
        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// The handler dispatched for `name`. Builtin names never resolve
    /// here.
    pub fn get(&self, name: &str) -> Option<&dyn CommandHandler> {
        if Builtin::resolve(name).is_some() {
            return None;
        }
        self.handlers.get(name).map(|h| h.as_ref())
    }

    /// Dispatchable commands and their help lines, sorted by name.
    pub fn documented(&self) -> Vec<(&str, Option<&str>)> {
        self.handlers
            .iter()
            .filter(|(name, _)| Builtin::resolve(name).is_none())
            .map(|(name, handler)| (name.as_str(), handler.help()))
            .collect()
    }
}

fn validate_name(name: &str) -> Result<(), ExtensionError> {
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ExtensionError::InvalidName(name.to_string()))
    }
}
