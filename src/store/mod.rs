//! Boundary to the external secret-management CLI.
//!
//! Everything opclip knows about the secret store goes through the
//! [`SecretStore`] trait: authentication, the liveness probe, item
//! listing and field reads. The production adapter is [`op::OpCli`];
//! tests substitute an in-memory fake.

pub mod op;

use std::fmt;

use zeroize::Zeroizing;

use crate::session::SessionToken;

pub use op::OpCli;

/// Errors returned by secret store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store binary could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The store command ran but reported failure.
    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: String },

    /// The store command produced output we could not interpret.
    #[error("unexpected output from `{command}`: {reason}")]
    Decode { command: String, reason: String },

    /// A field lookup returned nothing usable.
    #[error("no value for {0}")]
    Missing(String),
}

/// A reference to one item, as returned by the store's item listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    /// Store-assigned item identifier.
    pub id: String,
    /// Human-readable item title.
    pub title: String,
    /// Name of the vault holding the item, when the store reports one.
    pub vault: Option<String>,
}

impl ItemRef {
    /// Selector label for this item. Unique per item because the id is
    /// part of it.
    pub fn label(&self) -> String {
        match &self.vault {
            Some(vault) => format!("{} ({vault}) [{}]", self.title, self.id),
            None => format!("{} [{}]", self.title, self.id),
        }
    }
}

/// A resolved plaintext secret.
///
/// Held in memory only; the buffer is zeroed on drop and `Debug` never
/// prints the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(Zeroizing<String>);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue(<{} bytes redacted>)", self.0.len())
    }
}

/// Access to the external secret store.
///
/// Calls are synchronous: opclip runs one command at a time and every
/// store call is a short-lived child process.
pub trait SecretStore {
    /// Run the store's interactive sign-in and return the issued token.
    fn signin(&self) -> Result<SessionToken, StoreError>;

    /// Cheap authenticated call used to check that `token` is still live.
    fn probe(&self, token: &SessionToken) -> bool;

    /// List every item visible to the session.
    fn list_items(&self, token: &SessionToken) -> Result<Vec<ItemRef>, StoreError>;

    /// Fetch the item's single concealed field. Fails when the item has
    /// no concealed field, several of them, or an empty one.
    fn concealed_value(
        &self,
        token: &SessionToken,
        item: &ItemRef,
    ) -> Result<SecretValue, StoreError>;

    /// Enumerate the names of all fields on the item.
    fn field_names(&self, token: &SessionToken, item: &ItemRef) -> Result<Vec<String>, StoreError>;

    /// Fetch one named field's value.
    fn field_value(
        &self,
        token: &SessionToken,
        item: &ItemRef,
        field: &str,
    ) -> Result<SecretValue, StoreError>;

    /// Generate the current one-time password from the named OTP field.
    fn otp(&self, token: &SessionToken, item: &ItemRef, field: &str)
    -> Result<SecretValue, StoreError>;
}
