//! Secret resolution by item and field selection.
//!
//! Items with a single concealed field resolve straight to that value.
//! Everything else (several fields, an explicit `--choose`, or a
//! concealed fetch that produced nothing usable) goes through a second
//! selection over the item's field names.

use crate::selector::{Selector, SelectorError};
use crate::session::SessionToken;
use crate::store::{ItemRef, SecretStore, SecretValue, StoreError};

/// URI scheme that marks a field as OTP provisioning data rather than a
/// credential.
pub const OTP_URI_SCHEME: &str = "otpauth://";

/// Resolver errors. Empty selections are not errors.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Outcome of one resolution round-trip.
#[derive(Debug)]
pub enum Resolution {
    /// A secret was resolved. `label` names what was chosen, for display.
    Secret { label: String, value: SecretValue },
    /// The user dismissed a prompt.
    NoSelection,
}

pub struct SecretResolver<'a> {
    store: &'a dyn SecretStore,
    selector: &'a dyn Selector,
}

impl<'a> SecretResolver<'a> {
    pub fn new(store: &'a dyn SecretStore, selector: &'a dyn Selector) -> Self {
        Self { store, selector }
    }

    /// Drive item selection, then field selection when needed.
    pub fn resolve(&self, token: &SessionToken, choose: bool) -> Result<Resolution, ResolveError> {
        let items = self.store.list_items(token)?;
        let labels: Vec<String> = items.iter().map(ItemRef::label).collect();

        let Some(item) = self.pick(&labels, &items, "item")? else {
            return Ok(Resolution::NoSelection);
        };

        if !choose {
            match self.store.concealed_value(token, item) {
                Ok(value) if !value.is_empty() => {
                    tracing::debug!(item = %item.id, "resolved single concealed field");
                    return Ok(Resolution::Secret {
                        label: item.title.clone(),
                        value,
                    });
                }
                Ok(_) => {
                    tracing::debug!(item = %item.id, "concealed field empty, listing fields");
                }
                Err(e) => {
                    tracing::debug!(item = %item.id, error = %e, "no single concealed field, listing fields");
                }
            }
        }

        let fields = self.store.field_names(token, item)?;
        let Some(field) = self.pick(&fields, &fields, "field")? else {
            return Ok(Resolution::NoSelection);
        };

        let mut value = self.store.field_value(token, item, field)?;
        if value.as_str().starts_with(OTP_URI_SCHEME) {
            tracing::debug!(item = %item.id, field = %field, "field holds an OTP URI, generating code");
            value = self.store.otp(token, item, field)?;
        }

        Ok(Resolution::Secret {
            label: format!("{}/{}", item.title, field),
            value: strip_quotes(value),
        })
    }

    /// Present `labels` and map the chosen label back to its entry.
    fn pick<'t, T>(
        &self,
        labels: &[String],
        entries: &'t [T],
        prompt: &str,
    ) -> Result<Option<&'t T>, ResolveError> {
        if labels.is_empty() {
            tracing::info!(prompt, "nothing to choose from");
            return Ok(None);
        }
        let Some(chosen) = self.selector.select(prompt, labels)? else {
            return Ok(None);
        };
        let entry = labels
            .iter()
            .position(|label| *label == chosen)
            .and_then(|idx| entries.get(idx));
        if entry.is_none() {
            tracing::warn!(prompt, "selection did not match any offered option");
        }
        Ok(entry)
    }
}

/// Remove one layer of enclosing double quotes.
fn strip_quotes(value: SecretValue) -> SecretValue {
    let unquoted = value
        .as_str()
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map(SecretValue::new);
    unquoted.unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSelector, FakeStore};

    fn token() -> SessionToken {
        SessionToken::new("tok")
    }

    fn secret(resolution: Resolution) -> (String, String) {
        match resolution {
            Resolution::Secret { label, value } => (label, value.as_str().to_string()),
            Resolution::NoSelection => panic!("expected a secret, got NoSelection"),
        }
    }

    #[test]
    fn single_concealed_field_skips_field_selection() {
        let store = FakeStore::new().with_item("a1", "GitHub", Some("pw"), &[("password", "pw")]);
        let selector = FakeSelector::new().then_pick("GitHub");

        let resolution = SecretResolver::new(&store, &selector)
            .resolve(&token(), false)
            .unwrap();

        assert_eq!(secret(resolution), ("GitHub".into(), "pw".into()));
        assert_eq!(selector.prompts(), vec!["item"]);
        assert_eq!(store.field_name_calls(), 0);
    }

    #[test]
    fn choose_flag_forces_field_selection() {
        let store = FakeStore::new().with_item(
            "a1",
            "GitHub",
            Some("pw"),
            &[("username", "me"), ("password", "pw")],
        );
        let selector = FakeSelector::new().then_pick("GitHub").then_pick("username");

        let resolution = SecretResolver::new(&store, &selector)
            .resolve(&token(), true)
            .unwrap();

        assert_eq!(secret(resolution), ("GitHub/username".into(), "me".into()));
        assert_eq!(selector.prompts(), vec!["item", "field"]);
        assert_eq!(selector.options(1), vec!["username", "password"]);
    }

    #[test]
    fn failed_concealed_fetch_falls_back_to_fields() {
        let store = FakeStore::new().with_item(
            "a1",
            "Router",
            None,
            &[("website", "https://10.0.0.1"), ("password", "admin")],
        );
        let selector = FakeSelector::new().then_pick("Router").then_pick("password");

        let resolution = SecretResolver::new(&store, &selector)
            .resolve(&token(), false)
            .unwrap();

        assert_eq!(secret(resolution).1, "admin");
        assert_eq!(store.field_name_calls(), 1);
    }

    #[test]
    fn empty_concealed_value_falls_back_to_fields() {
        let store = FakeStore::new().with_item("a1", "Note", Some(""), &[("notes", "text")]);
        let selector = FakeSelector::new().then_pick("Note").then_pick("notes");

        let resolution = SecretResolver::new(&store, &selector)
            .resolve(&token(), false)
            .unwrap();

        assert_eq!(secret(resolution).1, "text");
    }

    #[test]
    fn dismissed_item_prompt() {
        let store = FakeStore::new().with_item("a1", "GitHub", Some("pw"), &[]);
        let selector = FakeSelector::new().then_dismiss();

        let resolution = SecretResolver::new(&store, &selector)
            .resolve(&token(), false)
            .unwrap();

        assert!(matches!(resolution, Resolution::NoSelection));
    }

    #[test]
    fn dismissed_field_prompt() {
        let store = FakeStore::new().with_item("a1", "GitHub", None, &[("a", "1"), ("b", "2")]);
        let selector = FakeSelector::new().then_pick("GitHub").then_dismiss();

        let resolution = SecretResolver::new(&store, &selector)
            .resolve(&token(), false)
            .unwrap();

        assert!(matches!(resolution, Resolution::NoSelection));
        assert_eq!(selector.prompts(), vec!["item", "field"]);
    }

    #[test]
    fn no_items_is_no_selection() {
        let store = FakeStore::new();
        let selector = FakeSelector::new().then_pick("anything");

        let resolution = SecretResolver::new(&store, &selector)
            .resolve(&token(), false)
            .unwrap();

        assert!(matches!(resolution, Resolution::NoSelection));
        assert!(selector.prompts().is_empty());
    }

    #[test]
    fn otp_uri_is_replaced_by_generated_code() {
        let store = FakeStore::new()
            .with_item(
                "a1",
                "GitHub",
                Some("pw"),
                &[("one-time password", "otpauth://totp/GitHub?secret=ABC")],
            )
            .with_otp("a1", "123456");
        let selector = FakeSelector::new().then_pick("GitHub").then_pick("one-time");

        let resolution = SecretResolver::new(&store, &selector)
            .resolve(&token(), true)
            .unwrap();

        let (_, value) = secret(resolution);
        assert_eq!(value, "123456");
        assert!(!value.starts_with(OTP_URI_SCHEME));
        assert_eq!(store.otp_calls(), 1);
    }

    #[test]
    fn otp_generated_for_the_chosen_field() {
        let store = FakeStore::new()
            .with_item(
                "a1",
                "AWS",
                None,
                &[
                    ("root otp", "otpauth://totp/root?secret=ABC"),
                    ("admin otp", "otpauth://totp/admin?secret=DEF"),
                ],
            )
            .with_otp("a1", "654321");
        let selector = FakeSelector::new().then_pick("AWS").then_pick("admin");

        SecretResolver::new(&store, &selector)
            .resolve(&token(), false)
            .unwrap();

        assert_eq!(store.otp_fields(), vec!["admin otp"]);
    }

    #[test]
    fn plain_field_does_not_generate_otp() {
        let store = FakeStore::new().with_item("a1", "GitHub", None, &[("username", "me")]);
        let selector = FakeSelector::new().then_pick("GitHub").then_pick("username");

        SecretResolver::new(&store, &selector)
            .resolve(&token(), false)
            .unwrap();

        assert_eq!(store.otp_calls(), 0);
    }

    #[test]
    fn quoted_field_value_is_unwrapped_once() {
        let store = FakeStore::new().with_item("a1", "DB", None, &[("dsn", "\"\"a,b\"\"")]);
        let selector = FakeSelector::new().then_pick("DB").then_pick("dsn");

        let resolution = SecretResolver::new(&store, &selector)
            .resolve(&token(), false)
            .unwrap();

        assert_eq!(secret(resolution).1, "\"a,b\"");
    }

    #[test]
    fn strip_quotes_cases() {
        assert_eq!(strip_quotes(SecretValue::new("\"x\"")).as_str(), "x");
        assert_eq!(strip_quotes(SecretValue::new("\"x")).as_str(), "\"x");
        assert_eq!(strip_quotes(SecretValue::new("\"")).as_str(), "\"");
        assert_eq!(strip_quotes(SecretValue::new("\"\"")).as_str(), "");
        assert_eq!(strip_quotes(SecretValue::new("plain")).as_str(), "plain");
    }
}
