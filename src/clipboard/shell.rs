//! Command-backed adapters: clipboard and notifications through
//! user-configurable shell commands.
//!
//! `copy` pipes the content to the command's stdin, `paste` reads the
//! command's stdout. Commands run through `sh -c`, so presets such as
//! `xclip -selection clipboard` and manifest-supplied pipelines work the
//! same way.

use std::io::Write;
use std::process::{Command, Stdio};

use super::{ClipboardError, ClipboardProvider, Notifier};

/// Clipboard driven by a pair of shell commands.
#[derive(Debug, Clone)]
pub struct ShellClipboard {
    copy: String,
    paste: String,
}

impl ShellClipboard {
    pub fn new(copy: impl Into<String>, paste: impl Into<String>) -> Self {
        Self {
            copy: copy.into(),
            paste: paste.into(),
        }
    }
}

fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

impl ClipboardProvider for ShellClipboard {
    fn copy(&self, content: &[u8]) -> Result<(), ClipboardError> {
        let mut child = shell(&self.copy)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipboardError::Command(format!("failed to spawn `{}`: {e}", self.copy)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content).map_err(|e| {
                ClipboardError::Command(format!("failed to write to `{}`: {e}", self.copy))
            })?;
            // Drop stdin to close the pipe so the command can finish.
        }

        let status = child.wait().map_err(|e| {
            ClipboardError::Command(format!("failed to wait for `{}`: {e}", self.copy))
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Command(format!(
                "`{}` exited with {status}",
                self.copy
            )))
        }
    }

    fn paste(&self) -> Result<Vec<u8>, ClipboardError> {
        let output = shell(&self.paste)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                ClipboardError::Command(format!("failed to spawn `{}`: {e}", self.paste))
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(ClipboardError::Command(format!(
                "`{}` exited with {}",
                self.paste, output.status
            )))
        }
    }
}

/// Notifier that runs a shell command with the message as its last
/// argument, e.g. `notify-send opclip`.
#[derive(Debug, Clone)]
pub struct ShellNotifier {
    command: String,
}

impl ShellNotifier {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Notifier for ShellNotifier {
    fn notify(&self, message: &str) -> Result<(), ClipboardError> {
        let status = shell(&format!("{} \"$@\"", self.command))
            .arg("opclip-notify")
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                ClipboardError::Command(format!("failed to spawn `{}`: {e}", self.command))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Command(format!(
                "`{}` exited with {status}",
                self.command
            )))
        }
    }
}
