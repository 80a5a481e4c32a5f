mod app;
mod clipboard;
mod crypto;
mod filter;
mod frame;
mod index;
mod keymap;
mod models;
mod otp;
mod reveal;
mod selection;
mod session;
mod storage;
mod ui;

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs go to a file under the config dir; the terminal belongs to the TUI.
fn init_logging() {
    let Ok(path) = storage::log_path() else { return };
    if let Some(dir) = path.parent() {
        if fs::create_dir_all(dir).is_err() || storage::restrict_dir(dir).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aegis_tui=info"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(env_filter)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting aegis-tui");
    app::run()
}
