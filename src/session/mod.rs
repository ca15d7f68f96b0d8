//! Session manager. Owns the cached authentication token.
//!
//! A cached token is reused as long as the store's liveness probe
//! accepts it. Otherwise the store's interactive sign-in runs and the
//! new token is persisted before anything else uses it.

mod token;

use std::path::{Path, PathBuf};

use crate::store::{SecretStore, StoreError};

pub use token::SessionToken;
use token::{read_token, remove_token, write_token};

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("authentication failed: {0}")]
    Authentication(#[source] StoreError),
    #[error("authentication failed: no session token was issued")]
    EmptyToken,
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Validates, reuses or renews the session token cached at `path`.
pub struct SessionManager<'a> {
    store: &'a dyn SecretStore,
    path: &'a Path,
}

impl<'a> SessionManager<'a> {
    pub fn new(store: &'a dyn SecretStore, path: &'a Path) -> Self {
        Self { store, path }
    }

    /// Return a live session token, signing in when needed.
    ///
    /// With `force`, any cached token is discarded first. A cached token
    /// that passes the probe is returned unchanged and the file is left
    /// untouched.
    pub fn ensure_session(&self, force: bool) -> Result<SessionToken, SessionError> {
        if force {
            let removed = remove_token(self.path).map_err(|e| self.io_error(e))?;
            tracing::debug!(removed, path = %self.path.display(), "forced sign-in, cache discarded");
        }

        if let Some(cached) = read_token(self.path).map_err(|e| self.io_error(e))? {
            if self.store.probe(&cached) {
                tracing::debug!(path = %self.path.display(), "reusing cached session");
                return Ok(cached);
            }
            tracing::info!("cached session rejected by probe, signing in again");
        }

        let token = self
            .store
            .signin()
            .map_err(SessionError::Authentication)?;
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        write_token(self.path, &token).map_err(|e| self.io_error(e))?;
        tracing::info!(path = %self.path.display(), "session cached");
        Ok(token)
    }

    /// Forget the cached session. Absence of the file is not an error.
    pub fn clear(&self) -> Result<bool, SessionError> {
        remove_token(self.path).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.to_path_buf(),
            source,
        }
    }
}
