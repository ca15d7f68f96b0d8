//! Timed clipboard exposure with guaranteed restoration.
//!
//! [`ClipboardExchange`] captures the clipboard, puts a secret on it,
//! waits out the exposure window and puts the snapshot back. The
//! snapshot lives in an `Option` that restoration `take()`s, so it is
//! restored at most once. The [`Drop`] impl is the safety net for every
//! path that leaves early: errors, panics and cancelled futures.

use std::time::Duration;

use nix::sys::signal::Signal;

use super::interrupts::{self, Interrupts};
use super::{Capabilities, ClipboardError};
use crate::store::SecretValue;

/// How an exposure ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The window elapsed.
    Expired,
    /// A termination signal arrived first.
    Interrupted(Signal),
}

impl Outcome {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Expired => 0,
            Outcome::Interrupted(signal) => interrupts::exit_code(signal),
        }
    }
}

/// Scoped ownership of the clipboard's "secret exposed" state.
pub struct ClipboardExchange<'a> {
    capabilities: &'a Capabilities,
    interrupts: &'a mut Interrupts,
    snapshot: Option<Vec<u8>>,
}

impl<'a> ClipboardExchange<'a> {
    pub fn new(capabilities: &'a Capabilities, interrupts: &'a mut Interrupts) -> Self {
        Self {
            capabilities,
            interrupts,
            snapshot: None,
        }
    }

    /// Expose `value` on the clipboard for `window`, then restore.
    ///
    /// A signal already pending when this is called ends it immediately,
    /// before the clipboard is touched.
    pub async fn expose(
        &mut self,
        label: &str,
        value: &SecretValue,
        window: Duration,
    ) -> Result<Outcome, ClipboardError> {
        let capabilities = self.capabilities;
        let clipboard = capabilities.clipboard()?;

        if let Some(signal) = self.interrupts.pending().await {
            tracing::info!(?signal, "interrupted before exposure");
            return Ok(Outcome::Interrupted(signal));
        }

        // One snapshot per exposure: settle any earlier one first.
        self.restore();

        let snapshot = clipboard.paste().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "clipboard unreadable, snapshot is empty");
            Vec::new()
        });
        // Armed before the secret lands, so a failed copy still restores.
        self.snapshot = Some(snapshot);
        clipboard.copy(value.as_bytes())?;

        let secs = window.as_secs();
        println!("Copied {label} to clipboard. Clearing in {secs}s.");
        capabilities.notify(&format!("Copied {label}. Clearing in {secs}s."));
        tracing::debug!(secs, "secret exposed");

        let outcome = tokio::select! {
            _ = tokio::time::sleep(window) => Outcome::Expired,
            signal = self.interrupts.recv() => Outcome::Interrupted(signal),
        };
        tracing::debug!(?outcome, "exposure window ended");

        self.restore();
        Ok(outcome)
    }

    /// Put the snapshot back, if one is held. Best effort: a failing
    /// copy is logged, never propagated. Returns whether a snapshot was
    /// pending.
    fn restore(&mut self) -> bool {
        let Some(snapshot) = self.snapshot.take() else {
            return false;
        };
        match self.capabilities.clipboard() {
            Ok(clipboard) => {
                if let Err(e) = clipboard.copy(&snapshot) {
                    tracing::warn!(error = %e, "failed to restore clipboard");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to restore clipboard"),
        }
        println!("Clipboard cleared.");
        self.capabilities.notify("Clipboard cleared.");
        true
    }
}

impl Drop for ClipboardExchange<'_> {
    fn drop(&mut self) {
        if self.restore() {
            tracing::debug!("clipboard restored on early exit");
        }
    }
}
