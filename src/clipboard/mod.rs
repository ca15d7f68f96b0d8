//! Clipboard and notification capabilities, plus the timed exchange.
//!
//! Platform access sits behind two small traits: [`ClipboardProvider`]
//! (required) and [`Notifier`] (optional). [`Capabilities`] bundles the
//! configured adapters; [`ClipboardExchange`] uses them to expose a
//! secret for a bounded window and put the previous contents back.

mod exchange;
mod interrupts;
pub mod presets;
mod shell;

pub use exchange::ClipboardExchange;
pub use interrupts::Interrupts;
pub use shell::{ShellClipboard, ShellNotifier};

/// Errors returned by clipboard and notification adapters.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// A required capability was not configured.
    #[error(
        "no clipboard {0} command is configured; set [clipboard] in the extension manifest"
    )]
    MissingCapability(&'static str),

    /// The backing command failed (spawn error, pipe error, bad status).
    #[error("clipboard: {0}")]
    Command(String),
}

/// Reads and writes the system clipboard.
pub trait ClipboardProvider {
    /// Replace the clipboard content.
    fn copy(&self, content: &[u8]) -> Result<(), ClipboardError>;

    /// Read the current clipboard content.
    fn paste(&self) -> Result<Vec<u8>, ClipboardError>;
}

/// Shows a desktop notification.
pub trait Notifier {
    fn notify(&self, message: &str) -> Result<(), ClipboardError>;
}

/// The configured platform adapters.
///
/// Built once at startup from the extension manifest (or detected
/// defaults). A missing clipboard is only reported when a command that
/// needs it runs; a missing notifier silently disables notifications.
pub struct Capabilities {
    clipboard: Result<Box<dyn ClipboardProvider>, &'static str>,
    notifier: Option<Box<dyn Notifier>>,
}

impl Capabilities {
    pub fn new(
        clipboard: Box<dyn ClipboardProvider>,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            clipboard: Ok(clipboard),
            notifier,
        }
    }

    /// Capabilities with no usable clipboard. `missing` names the absent
    /// operation (`"copy"` or `"paste"`).
    pub fn without_clipboard(missing: &'static str, notifier: Option<Box<dyn Notifier>>) -> Self {
        Self {
            clipboard: Err(missing),
            notifier,
        }
    }

    /// The clipboard adapter, or `MissingCapability` if none is set.
    pub fn clipboard(&self) -> Result<&dyn ClipboardProvider, ClipboardError> {
        match &self.clipboard {
            Ok(clipboard) => Ok(clipboard.as_ref()),
            Err(missing) => Err(ClipboardError::MissingCapability(missing)),
        }
    }

    /// Best-effort notification; failures are logged and swallowed.
    pub fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(message) {
                tracing::debug!(error = %e, "notification failed");
            }
        }
    }
}
