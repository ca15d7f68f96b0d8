mod cli;
mod clipboard;
mod config;
mod dispatch;
mod extension;
mod resolver;
mod selector;
mod session;
mod store;
#[cfg(test)]
mod testing;

use clap::Parser;
use cli::Cli;
use clipboard::presets;
use config::Settings;
use dispatch::Dispatcher;
use extension::{Manifest, Registry};
use selector::FzfSelector;
use store::OpCli;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut dispatcher = match build(&cli) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("opclip: {e}");
            std::process::exit(1);
        }
    };

    match dispatcher.dispatch(&cli.argv).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("opclip: {e}");
            std::process::exit(1);
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Extension(#[from] extension::ExtensionError),
}

fn build(cli: &Cli) -> Result<Dispatcher, StartupError> {
    let settings = Settings::from_cli(cli)?;
    tracing::debug!(
        session_file = %settings.session_file.display(),
        extensions = %settings.extensions_file.display(),
        window_secs = settings.window.as_secs(),
        "settings resolved"
    );

    let manifest = Manifest::load(&settings.extensions_file)?;
    let detected = presets::detect_backend(|name| std::env::var(name).ok());
    let capabilities = manifest.capabilities(detected)?;

    let mut registry = Registry::new();
    manifest.register_commands(&mut registry)?;

    let store = OpCli::new(settings.op_program.clone());
    let selector = FzfSelector::new(settings.selector_program.clone());
    Ok(Dispatcher::new(
        settings,
        Box::new(store),
        Box::new(selector),
        capabilities,
        registry,
    ))
}
