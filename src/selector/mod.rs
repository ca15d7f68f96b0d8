//! Interactive selection through a fuzzy finder.
//!
//! [`Selector`] presents a list of strings and returns the chosen one,
//! or `None` when the user dismissed the prompt. [`FzfSelector`] is the
//! production adapter.

use std::io::Write;
use std::process::{Command, Stdio};

/// Selector errors. Dismissal is not an error.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },
}

/// Presents options and returns the user's choice.
pub trait Selector {
    fn select(&self, prompt: &str, options: &[String]) -> Result<Option<String>, SelectorError>;
}

/// `Selector` backed by `fzf` (or a compatible binary).
///
/// Options go to the child's stdin one per line; the chosen line comes
/// back on stdout. The finder draws its UI on the terminal directly.
pub struct FzfSelector {
    program: String,
}

/// fzf exit status when nothing matched.
const EXIT_NO_MATCH: i32 = 1;
/// fzf exit status when the prompt was dismissed (Esc / Ctrl-C).
const EXIT_DISMISSED: i32 = 130;

impl FzfSelector {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> SelectorError {
        SelectorError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl Selector for FzfSelector {
    fn select(&self, prompt: &str, options: &[String]) -> Result<Option<String>, SelectorError> {
        if options.is_empty() {
            return Ok(None);
        }

        let mut child = Command::new(&self.program)
            .arg("--prompt")
            .arg(format!("{prompt}> "))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut input = options.join("\n");
            input.push('\n');
            // The finder may exit before reading everything (e.g. the
            // user dismissed it early); a broken pipe is not an error.
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                tracing::debug!(error = %e, "selector stopped reading options");
            }
            // Drop stdin so the finder sees EOF on its input.
        }

        let output = child.wait_with_output().map_err(|e| self.spawn_error(e))?;
        interpret(&self.program, output.status.code(), &output.stdout)
    }
}

/// Map the finder's exit status and stdout to a selection.
fn interpret(
    program: &str,
    code: Option<i32>,
    stdout: &[u8],
) -> Result<Option<String>, SelectorError> {
    match code {
        Some(0) => {
            let chosen = String::from_utf8_lossy(stdout);
            let chosen = chosen.trim_end_matches(['\n', '\r']);
            if chosen.is_empty() {
                Ok(None)
            } else {
                Ok(Some(chosen.to_string()))
            }
        }
        Some(EXIT_NO_MATCH) | Some(EXIT_DISMISSED) => Ok(None),
        Some(code) => Err(SelectorError::Failed {
            program: program.to_string(),
            status: format!("exit status: {code}"),
        }),
        None => Err(SelectorError::Failed {
            program: program.to_string(),
            status: "signal".into(),
        }),
    }
}
