//! Extension manifest: the TOML file that registers extension commands
//! and configures the clipboard and notification backends.
//!
//! ```toml
//! [clipboard]
//! backend = "xclip"
//! notify = "notify-send opclip"
//!
//! [commands.totp]
//! run = "op item get \"$1\" --otp --session \"$OPCLIP_SESSION\""
//! help = "one-time password for the named item"
//! copy_output = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{ExtensionError, Registry, ShellCommand};
use crate::clipboard::presets::{self, Backend};
use crate::clipboard::{Capabilities, Notifier, ShellClipboard, ShellNotifier};

/// Parsed extension manifest.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub clipboard: ClipboardConfig,
    #[serde(default)]
    pub commands: BTreeMap<String, CommandConfig>,
}

/// `[clipboard]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipboardConfig {
    /// Preset name (see [`presets::preset_backend`]).
    #[serde(default)]
    pub backend: Option<String>,
    /// Copy command; overrides the preset.
    #[serde(default)]
    pub copy: Option<String>,
    /// Paste command; overrides the preset.
    #[serde(default)]
    pub paste: Option<String>,
    /// Notification command; the message is appended as its last
    /// argument.
    #[serde(default)]
    pub notify: Option<String>,
}

/// `[commands.<name>]` entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub run: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub copy_output: bool,
}

impl Manifest {
    /// Load the manifest at `path`. A missing file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self, ExtensionError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no extension manifest");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ExtensionError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let manifest = toml::from_str(&content).map_err(|source| ExtensionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "extension manifest loaded");
        Ok(manifest)
    }

    /// Register every `[commands.*]` entry.
    pub fn register_commands(&self, registry: &mut Registry) -> Result<(), ExtensionError> {
        for (name, config) in &self.commands {
            let handler = ShellCommand::new(name, &config.run, config.help.clone(), config.copy_output);
            registry.register(name, Box::new(handler))?;
        }
        Ok(())
    }

    /// Resolve the clipboard and notifier adapters.
    ///
    /// Explicit commands win over the named preset, which wins over
    /// `detected`. If copy or paste stays undefined the capabilities
    /// carry no clipboard and the first command that needs one fails.
    pub fn capabilities(&self, detected: Option<&str>) -> Result<Capabilities, ExtensionError> {
        let section = &self.clipboard;
        let preset: Option<Backend> = match section.backend.as_deref() {
            Some(name) => Some(
                presets::preset_backend(name)
                    .ok_or_else(|| ExtensionError::UnknownBackend(name.to_string()))?,
            ),
            None => detected.and_then(presets::preset_backend),
        };

        let copy = section
            .copy
            .clone()
            .or_else(|| preset.map(|b| b.copy.to_string()));
        let paste = section
            .paste
            .clone()
            .or_else(|| preset.map(|b| b.paste.to_string()));
        let notifier = section
            .notify
            .as_deref()
            .map(|cmd| Box::new(ShellNotifier::new(cmd)) as Box<dyn Notifier>);

        Ok(match (copy, paste) {
            (Some(copy), Some(paste)) => {
                tracing::debug!(copy = %copy, paste = %paste, "clipboard backend configured");
                Capabilities::new(Box::new(ShellClipboard::new(copy, paste)), notifier)
            }
            (None, _) => Capabilities::without_clipboard("copy", notifier),
            (Some(_), None) => Capabilities::without_clipboard("paste", notifier),
        })
    }
}
