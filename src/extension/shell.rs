//! Manifest-defined commands, run through `sh -c`.

use std::process::{Command, Stdio};

use super::{CommandContext, CommandHandler, Completion, ExtensionError};
use crate::store::SecretValue;

/// Environment variable carrying the session token to extensions.
pub const SESSION_ENV: &str = "OPCLIP_SESSION";
/// Environment variable carrying the session file path to extensions.
pub const SESSION_FILE_ENV: &str = "OPCLIP_SESSION_FILE";

/// An extension command backed by a shell snippet.
///
/// Arguments are passed as positional parameters (`$1`, `$2`, ...). With
/// `copy_output`, stdout is captured and handed back for clipboard
/// exposure instead of going to the terminal.
pub struct ShellCommand {
    name: String,
    run: String,
    help: Option<String>,
    copy_output: bool,
}

impl ShellCommand {
    pub fn new(name: &str, run: &str, help: Option<String>, copy_output: bool) -> Self {
        Self {
            name: name.to_string(),
            run: run.to_string(),
            help,
            copy_output,
        }
    }

    fn command(&self, ctx: &CommandContext<'_>, args: &[String]) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.run)
            .arg(format!("opclip-{}", self.name))
            .args(args)
            .env(SESSION_ENV, ctx.token.as_str())
            .env(SESSION_FILE_ENV, ctx.session_file)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }

    fn run_error(&self, source: std::io::Error) -> ExtensionError {
        ExtensionError::Run {
            name: self.name.clone(),
            source,
        }
    }
}

impl CommandHandler for ShellCommand {
    fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    fn run(&self, ctx: &CommandContext<'_>, args: &[String]) -> Result<Completion, ExtensionError> {
        tracing::debug!(name = %self.name, copy_output = self.copy_output, "running extension");
        let mut cmd = self.command(ctx, args);

        if !self.copy_output {
            let status = cmd
                .stdout(Stdio::inherit())
                .status()
                .map_err(|e| self.run_error(e))?;
            return Ok(Completion::Exit(status_code(status)));
        }

        let output = cmd
            .stdout(Stdio::piped())
            .output()
            .map_err(|e| self.run_error(e))?;
        if !output.status.success() {
            return Ok(Completion::Exit(status_code(output.status)));
        }
        let mut text = String::from_utf8(output.stdout).map_err(|_| {
            self.run_error(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "output is not valid UTF-8",
            ))
        })?;
        if text.ends_with('\n') {
            text.pop();
        }
        let value = SecretValue::new(text);
        if value.is_empty() {
            tracing::info!(name = %self.name, "extension produced no output to copy");
            return Ok(Completion::Exit(0));
        }
        Ok(Completion::Expose {
            label: self.name.clone(),
            value,
        })
    }
}

/// Exit status as the shell would report it.
fn status_code(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::session::SessionToken;
    use std::path::Path;

    fn run(cmd: &ShellCommand, args: &[&str]) -> Completion {
        let token = SessionToken::new("tok-ext");
        let ctx = CommandContext {
            token: &token,
            session_file: Path::new("/tmp/opclip-session"),
        };
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        cmd.run(&ctx, &args).unwrap()
    }

    #[test]
    fn exit_status_propagates() {
        let cmd = ShellCommand::new("fail", "exit 42", None, false);
        assert!(matches!(run(&cmd, &[]), Completion::Exit(42)));
    }

    #[test]
    fn output_is_exposed_with_session_and_args() {
        let cmd = ShellCommand::new("echo", "printf '%s-%s\\n' \"$OPCLIP_SESSION\" \"$1\"", None, true);
        match run(&cmd, &["item"]) {
            Completion::Expose { label, value } => {
                assert_eq!(label, "echo");
                assert_eq!(value.as_str(), "tok-ext-item");
            }
            other => panic!("expected Expose, got {other:?}"),
        }
    }

    #[test]
    fn session_file_is_exported() {
        let cmd = ShellCommand::new("where", "printf %s \"$OPCLIP_SESSION_FILE\"", None, true);
        match run(&cmd, &[]) {
            Completion::Expose { value, .. } => assert_eq!(value.as_str(), "/tmp/opclip-session"),
            other => panic!("expected Expose, got {other:?}"),
        }
    }

    #[test]
    fn empty_output_exits_cleanly() {
        let cmd = ShellCommand::new("quiet", "true", None, true);
        assert!(matches!(run(&cmd, &[]), Completion::Exit(0)));
    }

    #[test]
    fn failing_copy_command_reports_status() {
        let cmd = ShellCommand::new("bad", "echo secret; exit 3", None, true);
        assert!(matches!(run(&cmd, &[]), Completion::Exit(3)));
    }
}
