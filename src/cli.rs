use std::path::PathBuf;

use clap::Parser;

/// Global options. Everything from the command name on is handed to the
/// dispatcher untouched, so `-c`, `-h` and `--help` reach it as commands.
#[derive(Parser, Debug)]
#[command(
    name = "opclip",
    about = "1Password session manager and clipboard secret helper",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Session token cache file
    #[arg(long, env = "OPCLIP_SESSION_FILE", value_name = "PATH")]
    pub session_file: Option<PathBuf>,

    /// Extension manifest (TOML)
    #[arg(long, env = "OPCLIP_EXTENSIONS", value_name = "PATH")]
    pub extensions: Option<PathBuf>,

    /// Seconds a secret stays on the clipboard
    #[arg(long, env = "OPCLIP_CLIP_TIMEOUT", default_value_t = 15)]
    pub timeout: u64,

    /// 1Password CLI binary
    #[arg(long = "op", env = "OPCLIP_OP", default_value = "op")]
    pub op_program: String,

    /// Fuzzy finder binary
    #[arg(long = "selector", env = "OPCLIP_SELECTOR", default_value = "fzf")]
    pub selector_program: String,

    /// Command and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub argv: Vec<String>,
}

/// `opclip list [-c]`
#[derive(Parser, Debug)]
#[command(name = "list")]
pub struct ListArgs {
    /// Always pick the field instead of taking the single concealed one
    #[arg(short = 'c', long)]
    pub choose: bool,
}

/// `opclip signin [--force]`
#[derive(Parser, Debug)]
#[command(name = "signin")]
pub struct SigninArgs {
    /// Sign in again even if the cached session is still live
    #[arg(short, long)]
    pub force: bool,
}

const USAGE: &str = "\
Usage: opclip [OPTIONS] [COMMAND] [ARGS...]

Commands:
  list [-c]         Pick an item and copy its secret to the clipboard (default)
  -c, --choose      Same as 'list -c': always pick the field
  signin [--force]  Sign in and cache the session token
  clear             Forget the cached session token
  help              Show this help

Options:
  --session-file <PATH>  Session token cache [env: OPCLIP_SESSION_FILE]
  --extensions <PATH>    Extension manifest [env: OPCLIP_EXTENSIONS]
  --timeout <SECS>       Clipboard exposure window [env: OPCLIP_CLIP_TIMEOUT] [default: 15]
  --op <BIN>             1Password CLI [env: OPCLIP_OP] [default: op]
  --selector <BIN>       Fuzzy finder [env: OPCLIP_SELECTOR] [default: fzf]
";

/// Render the usage text, followed by the extension commands if any.
pub fn usage(extensions: &[(&str, Option<&str>)]) -> String {
    let mut out = String::from(USAGE);
    if extensions.is_empty() {
        return out;
    }

    let width = extensions.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    out.push_str("\nExtension commands:\n");
    for (name, help) in extensions {
        match help {
            Some(help) => out.push_str(&format!("  {name:<width$}  {help}\n")),
            None => out.push_str(&format!("  {name}\n")),
        }
    }
    out
}
