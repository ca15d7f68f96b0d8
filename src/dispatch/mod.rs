//! Command dispatch: builtins first, then registered extensions.
//!
//! Resolution order is fixed: the builtin table is consulted before the
//! extension registry, so an extension can never replace `list`,
//! `signin`, `clear` or `help`. Commands that need a session establish
//! it before the clipboard exchange is created, and the exchange exists
//! before anything can put a secret on the clipboard.

use clap::Parser;

use crate::cli::{self, ListArgs, SigninArgs};
use crate::clipboard::{Capabilities, ClipboardError, ClipboardExchange, Interrupts};
use crate::config::Settings;
use crate::extension::{CommandContext, Completion, ExtensionError, Registry};
use crate::resolver::{ResolveError, Resolution, SecretResolver};
use crate::selector::Selector;
use crate::session::{SessionError, SessionManager};
use crate::store::SecretStore;

/// Fatal dispatch errors. Empty selections and unknown commands are not
/// errors; they map to exit statuses.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    Extension(#[from] ExtensionError),
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

/// Builtin commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    List,
    Signin,
    Clear,
    Help,
}

impl Builtin {
    /// Map a command name (argv[0]) to a builtin.
    pub fn resolve(name: &str) -> Option<Self> {
        match name {
            "" | "list" | "-c" | "--choose" => Some(Builtin::List),
            "signin" => Some(Builtin::Signin),
            "clear" => Some(Builtin::Clear),
            "help" | "usage" | "-h" | "--help" => Some(Builtin::Help),
            _ => None,
        }
    }
}

/// Exit status for an unrecognized command.
const EXIT_UNKNOWN: i32 = 1;

pub struct Dispatcher {
    settings: Settings,
    store: Box<dyn SecretStore>,
    selector: Box<dyn Selector>,
    capabilities: Capabilities,
    registry: Registry,
    interrupts: Option<Interrupts>,
}

impl Dispatcher {
    pub fn new(
        settings: Settings,
        store: Box<dyn SecretStore>,
        selector: Box<dyn Selector>,
        capabilities: Capabilities,
        registry: Registry,
    ) -> Self {
        Self {
            settings,
            store,
            selector,
            capabilities,
            registry,
            interrupts: None,
        }
    }

    /// Use these interrupts instead of installing signal handlers.
    #[cfg(test)]
    fn with_interrupts(mut self, interrupts: Interrupts) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    /// Run the command named by `argv[0]` and return its exit status.
    pub async fn dispatch(&mut self, argv: &[String]) -> Result<i32, DispatchError> {
        let name = argv.first().map(String::as_str).unwrap_or("");
        let rest = argv.get(1..).unwrap_or(&[]);
        tracing::debug!(command = name, "dispatching");

        match Builtin::resolve(name) {
            Some(Builtin::List) => {
                // `-c` / `--choose` stand in for the command name and are
                // also its flag.
                let args = if name.starts_with('-') { argv } else { rest };
                match parse_args::<ListArgs>("list", args) {
                    Ok(args) => self.run_list(args.choose).await,
                    Err(code) => Ok(code),
                }
            }
            Some(Builtin::Signin) => match parse_args::<SigninArgs>("signin", rest) {
                Ok(args) => self.run_signin(args.force),
                Err(code) => Ok(code),
            },
            Some(Builtin::Clear) => Ok(self.run_clear()),
            Some(Builtin::Help) => {
                print!("{}", self.usage());
                Ok(0)
            }
            None => {
                if self.registry.get(name).is_none() {
                    eprintln!("opclip: unknown command '{name}'");
                    eprintln!("Run 'opclip help' for usage.");
                    return Ok(EXIT_UNKNOWN);
                }
                self.run_extension(name, rest).await
            }
        }
    }

    /// Usage text, including registered extension commands.
    fn usage(&self) -> String {
        cli::usage(&self.registry.documented())
    }

    async fn run_list(&mut self, choose: bool) -> Result<i32, DispatchError> {
        let Self {
            settings,
            store,
            selector,
            capabilities,
            interrupts,
            ..
        } = self;

        capabilities.clipboard()?;
        let token = SessionManager::new(&**store, &settings.session_file).ensure_session(false)?;

        let interrupts = install_interrupts(interrupts)?;
        let mut exchange = ClipboardExchange::new(capabilities, interrupts);

        let resolver = SecretResolver::new(&**store, &**selector);
        match resolver.resolve(&token, choose)? {
            Resolution::NoSelection => {
                tracing::debug!("nothing selected");
                Ok(0)
            }
            Resolution::Secret { label, value } => {
                let outcome = exchange.expose(&label, &value, settings.window).await?;
                Ok(outcome.exit_code())
            }
        }
    }

    fn run_signin(&self, force: bool) -> Result<i32, DispatchError> {
        let path = &self.settings.session_file;
        SessionManager::new(self.store.as_ref(), path).ensure_session(force)?;
        println!("Signed in; session cached at {}", path.display());
        Ok(0)
    }

    fn run_clear(&self) -> i32 {
        let path = &self.settings.session_file;
        match SessionManager::new(self.store.as_ref(), path).clear() {
            Ok(removed) => tracing::debug!(removed, path = %path.display(), "session cleared"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear session");
                eprintln!("opclip: {e}");
            }
        }
        0
    }

    async fn run_extension(&mut self, name: &str, args: &[String]) -> Result<i32, DispatchError> {
        let Self {
            settings,
            store,
            capabilities,
            registry,
            interrupts,
            ..
        } = self;
        let Some(handler) = registry.get(name) else {
            return Ok(EXIT_UNKNOWN);
        };

        capabilities.clipboard()?;
        let token = SessionManager::new(&**store, &settings.session_file).ensure_session(false)?;

        let interrupts = install_interrupts(interrupts)?;
        let mut exchange = ClipboardExchange::new(capabilities, interrupts);

        let ctx = CommandContext {
            token: &token,
            session_file: &settings.session_file,
        };
        match handler.run(&ctx, args)? {
            Completion::Exit(code) => {
                tracing::debug!(command = name, code, "extension finished");
                Ok(code)
            }
            Completion::Expose { label, value } => {
                let outcome = exchange.expose(&label, &value, settings.window).await?;
                Ok(outcome.exit_code())
            }
        }
    }
}

/// Install signal handling once per dispatcher.
fn install_interrupts(slot: &mut Option<Interrupts>) -> Result<&mut Interrupts, DispatchError> {
    let interrupts = match slot.take() {
        Some(interrupts) => interrupts,
        None => Interrupts::install().map_err(DispatchError::Signals)?,
    };
    Ok(slot.insert(interrupts))
}

/// Parse command arguments with clap. On failure (or `--help`) the
/// message is printed and the exit status returned as `Err`.
fn parse_args<T: Parser>(command: &str, args: &[String]) -> Result<T, i32> {
    let argv = std::iter::once(command.to_string()).chain(args.iter().cloned());
    T::try_parse_from(argv).map_err(|e| {
        let _ = e.print();
        e.exit_code()
    })
}
