//! In-memory fakes for the external collaborators, shared by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::clipboard::{ClipboardError, ClipboardProvider, Notifier};
use crate::selector::{Selector, SelectorError};
use crate::session::SessionToken;
use crate::store::{ItemRef, SecretStore, SecretValue, StoreError};

// -- Secret store --

/// Scriptable `SecretStore` that counts the calls it receives.
#[derive(Default)]
pub struct FakeStore {
    signin_token: Option<String>,
    probe_ok: bool,
    items: Vec<ItemRef>,
    concealed: HashMap<String, String>,
    fields: HashMap<String, Vec<(String, String)>>,
    otp_codes: HashMap<String, String>,
    signin_calls: Cell<u32>,
    probe_calls: Cell<u32>,
    field_name_calls: Cell<u32>,
    otp_fields: RefCell<Vec<String>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signin_token(mut self, token: &str) -> Self {
        self.signin_token = Some(token.into());
        self
    }

    pub fn with_probe(mut self, ok: bool) -> Self {
        self.probe_ok = ok;
        self
    }

    /// Add an item. `concealed` is what the single-concealed-field fetch
    /// returns; `None` makes that fetch fail.
    pub fn with_item(
        mut self,
        id: &str,
        title: &str,
        concealed: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Self {
        self.items.push(ItemRef {
            id: id.into(),
            title: title.into(),
            vault: Some("Private".into()),
        });
        if let Some(value) = concealed {
            self.concealed.insert(id.into(), value.into());
        }
        self.fields.insert(
            id.into(),
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_otp(mut self, id: &str, code: &str) -> Self {
        self.otp_codes.insert(id.into(), code.into());
        self
    }

    pub fn signin_calls(&self) -> u32 {
        self.signin_calls.get()
    }

    pub fn probe_calls(&self) -> u32 {
        self.probe_calls.get()
    }

    pub fn field_name_calls(&self) -> u32 {
        self.field_name_calls.get()
    }

    pub fn otp_calls(&self) -> u32 {
        self.otp_fields.borrow().len() as u32
    }

    /// Field labels the OTP generation was asked for, in order.
    pub fn otp_fields(&self) -> Vec<String> {
        self.otp_fields.borrow().clone()
    }
}

fn failed(command: &str) -> StoreError {
    StoreError::Failed {
        command: command.into(),
        status: "exit status: 1".into(),
    }
}

impl SecretStore for FakeStore {
    fn signin(&self) -> Result<SessionToken, StoreError> {
        self.signin_calls.set(self.signin_calls.get() + 1);
        self.signin_token
            .as_deref()
            .map(SessionToken::new)
            .ok_or_else(|| failed("op signin"))
    }

    fn probe(&self, _token: &SessionToken) -> bool {
        self.probe_calls.set(self.probe_calls.get() + 1);
        self.probe_ok
    }

    fn list_items(&self, _token: &SessionToken) -> Result<Vec<ItemRef>, StoreError> {
        Ok(self.items.clone())
    }

    fn concealed_value(
        &self,
        _token: &SessionToken,
        item: &ItemRef,
    ) -> Result<SecretValue, StoreError> {
        match self.concealed.get(&item.id) {
            Some(v) if !v.is_empty() => Ok(SecretValue::new(v.clone())),
            _ => Err(failed("op item get --fields type=concealed")),
        }
    }

    fn field_names(&self, _token: &SessionToken, item: &ItemRef) -> Result<Vec<String>, StoreError> {
        self.field_name_calls.set(self.field_name_calls.get() + 1);
        Ok(self
            .fields
            .get(&item.id)
            .map(|fields| fields.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    fn field_value(
        &self,
        _token: &SessionToken,
        item: &ItemRef,
        field: &str,
    ) -> Result<SecretValue, StoreError> {
        self.fields
            .get(&item.id)
            .and_then(|fields| fields.iter().find(|(k, _)| k == field))
            .map(|(_, v)| SecretValue::new(v.clone()))
            .ok_or_else(|| StoreError::Missing(field.into()))
    }

    fn otp(
        &self,
        _token: &SessionToken,
        item: &ItemRef,
        field: &str,
    ) -> Result<SecretValue, StoreError> {
        self.otp_fields.borrow_mut().push(field.to_string());
        self.otp_codes
            .get(&item.id)
            .map(|code| SecretValue::new(code.clone()))
            .ok_or_else(|| StoreError::Missing("otp".into()))
    }
}

// -- Selector --

/// Selector that answers from a script and records what it was shown.
#[derive(Default)]
pub struct FakeSelector {
    answers: RefCell<VecDeque<Answer>>,
    prompts: RefCell<Vec<(String, Vec<String>)>>,
}

enum Answer {
    /// Pick the first option containing this text.
    Containing(String),
    Dismiss,
}

impl FakeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_pick(self, needle: &str) -> Self {
        self.answers
            .borrow_mut()
            .push_back(Answer::Containing(needle.into()));
        self
    }

    pub fn then_dismiss(self) -> Self {
        self.answers.borrow_mut().push_back(Answer::Dismiss);
        self
    }

    /// Prompts shown so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Options offered at the `n`th prompt.
    pub fn options(&self, n: usize) -> Vec<String> {
        self.prompts.borrow()[n].1.clone()
    }
}

impl Selector for FakeSelector {
    fn select(&self, prompt: &str, options: &[String]) -> Result<Option<String>, SelectorError> {
        self.prompts
            .borrow_mut()
            .push((prompt.to_string(), options.to_vec()));
        match self.answers.borrow_mut().pop_front() {
            Some(Answer::Containing(needle)) => {
                Ok(options.iter().find(|o| o.contains(&needle)).cloned())
            }
            Some(Answer::Dismiss) | None => Ok(None),
        }
    }
}

// -- Clipboard and notifications --

#[derive(Default)]
struct ClipboardState {
    contents: Vec<u8>,
    copies: Vec<Vec<u8>>,
    pastes: u32,
    fail_copies: u32,
    fail_paste: bool,
}

/// Shared-handle clipboard: clones observe the same state, so a test can
/// keep one handle while the code under test owns another.
#[derive(Clone, Default)]
pub struct FakeClipboard(Rc<RefCell<ClipboardState>>);

impl FakeClipboard {
    pub fn with_contents(contents: &[u8]) -> Self {
        let clip = Self::default();
        clip.0.borrow_mut().contents = contents.to_vec();
        clip
    }

    /// Make the next `n` copy calls fail without touching the contents.
    pub fn fail_next_copies(&self, n: u32) {
        self.0.borrow_mut().fail_copies = n;
    }

    pub fn fail_paste(&self) {
        self.0.borrow_mut().fail_paste = true;
    }

    pub fn contents(&self) -> Vec<u8> {
        self.0.borrow().contents.clone()
    }

    /// Every payload passed to `copy`, including failed attempts.
    pub fn copies(&self) -> Vec<Vec<u8>> {
        self.0.borrow().copies.clone()
    }

    pub fn pastes(&self) -> u32 {
        self.0.borrow().pastes
    }
}

impl ClipboardProvider for FakeClipboard {
    fn copy(&self, content: &[u8]) -> Result<(), ClipboardError> {
        let mut state = self.0.borrow_mut();
        state.copies.push(content.to_vec());
        if state.fail_copies > 0 {
            state.fail_copies -= 1;
            return Err(ClipboardError::Command("copy failed".into()));
        }
        state.contents = content.to_vec();
        Ok(())
    }

    fn paste(&self) -> Result<Vec<u8>, ClipboardError> {
        let mut state = self.0.borrow_mut();
        state.pastes += 1;
        if state.fail_paste {
            return Err(ClipboardError::Command("paste failed".into()));
        }
        Ok(state.contents.clone())
    }
}

/// Notifier that records every message.
#[derive(Clone, Default)]
pub struct FakeNotifier(Rc<RefCell<Vec<String>>>);

impl FakeNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl Notifier for FakeNotifier {
    fn notify(&self, message: &str) -> Result<(), ClipboardError> {
        self.0.borrow_mut().push(message.to_string());
        Ok(())
    }
}

// -- Shared handles --
//
// The dispatcher owns its collaborators as boxes; tests hand it an `Rc`
// and keep a clone to inspect afterwards.

impl<T: SecretStore + ?Sized> SecretStore for Rc<T> {
    fn signin(&self) -> Result<SessionToken, StoreError> {
        (**self).signin()
    }

    fn probe(&self, token: &SessionToken) -> bool {
        (**self).probe(token)
    }

    fn list_items(&self, token: &SessionToken) -> Result<Vec<ItemRef>, StoreError> {
        (**self).list_items(token)
    }

    fn concealed_value(
        &self,
        token: &SessionToken,
        item: &ItemRef,
    ) -> Result<SecretValue, StoreError> {
        (**self).concealed_value(token, item)
    }

    fn field_names(&self, token: &SessionToken, item: &ItemRef) -> Result<Vec<String>, StoreError> {
        (**self).field_names(token, item)
    }

    fn field_value(
        &self,
        token: &SessionToken,
        item: &ItemRef,
        field: &str,
    ) -> Result<SecretValue, StoreError> {
        (**self).field_value(token, item, field)
    }

    fn otp(
        &self,
        token: &SessionToken,
        item: &ItemRef,
        field: &str,
    ) -> Result<SecretValue, StoreError> {
        (**self).otp(token, item, field)
    }
}

impl<T: Selector + ?Sized> Selector for Rc<T> {
    fn select(&self, prompt: &str, options: &[String]) -> Result<Option<String>, SelectorError> {
        (**self).select(prompt, options)
    }
}
