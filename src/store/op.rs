//! 1Password CLI adapter. Drives `op` as a child process.
//!
//! Every call is a synchronous `std::process::Command`. Output that may
//! carry secrets is kept in zeroizing buffers; stderr is only ever
//! logged at debug level and never contains field values.

use std::process::{Command, Output, Stdio};

use serde::Deserialize;
use zeroize::Zeroizing;

use super::{ItemRef, SecretStore, SecretValue, StoreError};
use crate::session::SessionToken;

/// `SecretStore` implementation backed by the `op` binary.
pub struct OpCli {
    program: String,
}

impl OpCli {
    /// Create an adapter that invokes `program` (normally `op`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, args: &[&str], token: Option<&SessionToken>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        if let Some(token) = token {
            cmd.arg("--session").arg(token.as_str());
        }
        cmd
    }

    /// Human-readable form of an invocation for errors and logs. Never
    /// includes the session token.
    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    fn spawn_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    /// Run a non-interactive authenticated call and return its stdout.
    fn run(&self, args: &[&str], token: &SessionToken) -> Result<Zeroizing<String>, StoreError> {
        let output = self
            .command(args, Some(token))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        self.finish(args, output)
    }

    fn finish(&self, args: &[&str], output: Output) -> Result<Zeroizing<String>, StoreError> {
        let command = self.describe(args);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(command = %command, stderr = %stderr.trim(), "op call failed");
            return Err(StoreError::Failed {
                command,
                status: output.status.to_string(),
            });
        }
        let stdout = String::from_utf8(output.stdout).map_err(|_| StoreError::Decode {
            command,
            reason: "output is not valid UTF-8".into(),
        })?;
        Ok(Zeroizing::new(stdout))
    }
}

impl SecretStore for OpCli {
    fn signin(&self) -> Result<SessionToken, StoreError> {
        let args = ["signin", "--raw"];
        // The prompt talks to the terminal on stdin/stderr; only the
        // token arrives on stdout.
        let child = self
            .command(&args, None)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        let output = child.wait_with_output().map_err(|e| self.spawn_error(e))?;
        let raw = self.finish(&args, output)?;
        Ok(SessionToken::new(raw.trim()))
    }

    fn probe(&self, token: &SessionToken) -> bool {
        let status = self
            .command(&["user", "list"], Some(token))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!(error = %e, "session probe could not run");
                false
            }
        }
    }

    fn list_items(&self, token: &SessionToken) -> Result<Vec<ItemRef>, StoreError> {
        let args = ["item", "list", "--format", "json"];
        let out = self.run(&args, token)?;
        parse_items(&out).map_err(|e| StoreError::Decode {
            command: self.describe(&args),
            reason: e.to_string(),
        })
    }

    fn concealed_value(
        &self,
        token: &SessionToken,
        item: &ItemRef,
    ) -> Result<SecretValue, StoreError> {
        let args = [
            "item",
            "get",
            item.id.as_str(),
            "--fields",
            "type=concealed",
            "--reveal",
            "--format",
            "json",
        ];
        let out = self.run(&args, token)?;
        parse_concealed(&out).map_err(|reason| StoreError::Decode {
            command: self.describe(&args),
            reason: reason.to_string(),
        })
    }

    fn field_names(&self, token: &SessionToken, item: &ItemRef) -> Result<Vec<String>, StoreError> {
        let args = ["item", "get", item.id.as_str(), "--format", "json"];
        let out = self.run(&args, token)?;
        parse_field_names(&out).map_err(|e| StoreError::Decode {
            command: self.describe(&args),
            reason: e.to_string(),
        })
    }

    fn field_value(
        &self,
        token: &SessionToken,
        item: &ItemRef,
        field: &str,
    ) -> Result<SecretValue, StoreError> {
        let selector = format!("label={field}");
        let args = ["item", "get", item.id.as_str(), "--fields", selector.as_str(), "--reveal"];
        let out = self.run(&args, token)?;
        Ok(SecretValue::new(strip_newline(&out)))
    }

    fn otp(
        &self,
        token: &SessionToken,
        item: &ItemRef,
        field: &str,
    ) -> Result<SecretValue, StoreError> {
        tracing::debug!(item = %item.id, field, "generating one-time password");
        // `--otp` only ever reads the item's primary OTP field; selecting by
        // label and reading `totp` honours the field the user picked.
        let selector = format!("label={field}");
        let args = [
            "item",
            "get",
            item.id.as_str(),
            "--fields",
            selector.as_str(),
            "--format",
            "json",
        ];
        let out = self.run(&args, token)?;
        parse_otp(&out).map_err(|reason| match reason {
            FieldProblem::Empty => {
                StoreError::Missing(format!("one-time password in {field} on {}", item.id))
            }
            other => StoreError::Decode {
                command: self.describe(&args),
                reason: other.to_string(),
            },
        })
    }
}

// -- Output parsing --

#[derive(Deserialize)]
struct ItemSummary {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    vault: Option<VaultSummary>,
}

#[derive(Deserialize)]
struct VaultSummary {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct ItemDetail {
    #[serde(default)]
    fields: Vec<FieldLabel>,
}

#[derive(Deserialize)]
struct FieldLabel {
    #[serde(default)]
    label: Option<String>,
}

#[derive(Deserialize)]
struct FieldEntry {
    #[serde(default)]
    value: Option<String>,
    /// Current code, present on OTP fields.
    #[serde(default)]
    totp: Option<String>,
}

/// `op` prints a bare object for one matching field and an array for
/// several.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldOutput {
    One(FieldEntry),
    Many(Vec<FieldEntry>),
}

/// Why a `--fields` lookup did not yield exactly one usable value.
#[derive(Debug, PartialEq, Eq)]
enum FieldProblem {
    Malformed,
    Count(usize),
    Empty,
}

impl std::fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldProblem::Malformed => f.write_str("not a field object"),
            FieldProblem::Count(n) => write!(f, "{n} matching fields"),
            FieldProblem::Empty => f.write_str("field is empty"),
        }
    }
}

fn single_field(json: &str) -> Result<FieldEntry, FieldProblem> {
    let output: FieldOutput = serde_json::from_str(json).map_err(|_| FieldProblem::Malformed)?;
    match output {
        FieldOutput::One(entry) => Ok(entry),
        FieldOutput::Many(mut entries) => {
            if entries.len() != 1 {
                return Err(FieldProblem::Count(entries.len()));
            }
            Ok(entries.remove(0))
        }
    }
}

fn non_empty(value: Option<String>) -> Result<SecretValue, FieldProblem> {
    match value {
        Some(value) if !value.is_empty() => Ok(SecretValue::new(value)),
        _ => Err(FieldProblem::Empty),
    }
}

fn parse_items(json: &str) -> Result<Vec<ItemRef>, serde_json::Error> {
    let items: Vec<ItemSummary> = serde_json::from_str(json)?;
    Ok(items
        .into_iter()
        .map(|item| ItemRef {
            id: item.id,
            title: item.title,
            vault: item.vault.and_then(|v| v.name),
        })
        .collect())
}

fn parse_field_names(json: &str) -> Result<Vec<String>, serde_json::Error> {
    let detail: ItemDetail = serde_json::from_str(json)?;
    let mut names: Vec<String> = Vec::with_capacity(detail.fields.len());
    for label in detail.fields.into_iter().filter_map(|f| f.label) {
        if !label.is_empty() && !names.contains(&label) {
            names.push(label);
        }
    }
    Ok(names)
}

fn parse_concealed(json: &str) -> Result<SecretValue, FieldProblem> {
    non_empty(single_field(json)?.value)
}

fn parse_otp(json: &str) -> Result<SecretValue, FieldProblem> {
    non_empty(single_field(json)?.totp)
}

fn strip_newline(s: &str) -> &str {
    let s = s.strip_suffix('\n').unwrap_or(s);
    s.strip_suffix('\r').unwrap_or(s)
}
