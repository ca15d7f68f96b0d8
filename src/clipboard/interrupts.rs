//! Termination signals that cut the exposure window short.
//!
//! Installing [`Interrupts`] replaces the default "die immediately"
//! action for SIGINT, SIGTERM and SIGHUP with tokio signal streams, so
//! the clipboard can be restored before the process exits.

use futures::FutureExt;
use nix::sys::signal::Signal;
use tokio::signal::unix::{self, SignalKind};

enum Source {
    Signals {
        int: unix::Signal,
        term: unix::Signal,
        hup: unix::Signal,
    },
    #[cfg(test)]
    Channel(tokio::sync::mpsc::UnboundedReceiver<Signal>),
}

/// Pending and future termination signals for this process.
pub struct Interrupts {
    source: Source,
}

impl Interrupts {
    /// Register the signal streams. Must run inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            source: Source::Signals {
                int: unix::signal(SignalKind::interrupt())?,
                term: unix::signal(SignalKind::terminate())?,
                hup: unix::signal(SignalKind::hangup())?,
            },
        })
    }

    /// Channel-fed interrupts for tests.
    #[cfg(test)]
    pub fn channel() -> (tokio::sync::mpsc::UnboundedSender<Signal>, Self) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (
            tx,
            Self {
                source: Source::Channel(rx),
            },
        )
    }

    /// Wait for the next termination signal.
    pub async fn recv(&mut self) -> Signal {
        match &mut self.source {
            Source::Signals { int, term, hup } => tokio::select! {
                Some(()) = int.recv() => Signal::SIGINT,
                Some(()) = term.recv() => Signal::SIGTERM,
                Some(()) = hup.recv() => Signal::SIGHUP,
                else => std::future::pending().await,
            },
            #[cfg(test)]
            Source::Channel(rx) => match rx.recv().await {
                Some(signal) => signal,
                None => std::future::pending().await,
            },
        }
    }

    /// A signal that already arrived, if any. Does not wait.
    ///
    /// Yields once first so the runtime's signal driver can deliver
    /// anything caught while the thread was blocked on a child process.
    pub async fn pending(&mut self) -> Option<Signal> {
        tokio::task::yield_now().await;
        self.recv().now_or_never()
    }
}

/// Shell convention for a signal-terminated process.
pub fn exit_code(signal: Signal) -> i32 {
    128 + signal as i32
}
