use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::clipboard::{ClipboardSink, SystemClipboard};
use crate::keymap::map_key;
use crate::models::Db;
use crate::otp::{generate, unix_now_secs, VaultOtp};
use crate::session::Session;
use crate::storage::{default_base_dir, find_vault_path, load_config, open_vault, save_config, Config};
use crate::ui::{draw, page_size_for, Theme};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const PASSWORD_ENV: &str = "AEGIS_TUI_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "aegis-tui", version, about = "Browse the one-time passwords of an Aegis vault")]
pub struct Cli {
    /// Vault file to open
    #[arg(short = 'v', long = "vault-path")]
    pub vault_path: Option<PathBuf>,
    /// Directory searched for the newest aegis-backup/export file
    #[arg(short = 'd', long = "vault-dir", default_value = ".")]
    pub vault_dir: PathBuf,
    /// Print the code of one entry and exit
    #[arg(short = 'u', long = "uuid")]
    pub uuid: Option<String>,
    /// Start filtered to this group
    #[arg(short = 'g', long = "group")]
    pub group: Option<String>,
    /// Disable colors
    #[arg(long = "no-color")]
    pub no_color: bool,
    #[arg(hide = true)]
    pub positional: Option<PathBuf>,
}

/// One terminal event at a time, waiting at most `timeout`.
pub trait InputSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>>;
}

struct CrosstermInput;

impl InputSource for CrosstermInput {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        if event::poll(timeout).map_err(|e| anyhow!("Input stream closed: {e}"))? {
            let ev = event::read().map_err(|e| anyhow!("Input stream closed: {e}"))?;
            Ok(Some(ev))
        } else {
            Ok(None)
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config().unwrap_or_else(|e| {
        warn!(error = %e, "config unavailable, using defaults");
        Config::default()
    });

    let vault_path = resolve_vault_path(&cli, &config)?;
    info!(path = %vault_path.display(), "using vault");
    let db = open_vault(&vault_path, read_password)?;

    config.remember_vault(&std::fs::canonicalize(&vault_path).unwrap_or(vault_path));
    if let Err(e) = save_config(&config) {
        warn!(error = %e, "could not save config");
    }

    if let Some(uuid) = &cli.uuid {
        let code = lookup_code(&db, uuid, unix_now_secs())?;
        println!("OTP for {uuid}: {code}");
        return Ok(());
    }

    if let Some(group) = &cli.group {
        if !db.groups.iter().any(|g| &g.name == group) {
            warn!(%group, "initial group filter matches no vault group");
        }
    }

    let theme = Theme {
        color: !cli.no_color && config.default_color_mode,
    };
    let clipboard = SystemClipboard::probe().map(|c| Box::new(c) as Box<dyn ClipboardSink>);
    let mut session = Session::new(&db, Box::new(VaultOtp::new(&db)), clipboard, cli.group.clone());
    run_tui(&mut session, &theme)
}

fn read_password() -> Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(password));
    }
    let password = rpassword::prompt_password("Enter Aegis Password: ")
        .map_err(|e| anyhow!("Could not read password: {e}"))?;
    Ok(Zeroizing::new(password))
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Explicit path, positional `.json`, last opened vault, then the newest
/// vault in the given, remembered and default directories.
pub fn resolve_vault_path(cli: &Cli, config: &Config) -> Result<PathBuf> {
    if let Some(path) = &cli.vault_path {
        return Ok(path.clone());
    }
    if let Some(path) = cli.positional.as_ref().filter(|p| is_json(p)) {
        return Ok(path.clone());
    }
    if let Some(path) = config.last_opened_vault.as_ref().filter(|p| p.is_file()) {
        return Ok(path.clone());
    }

    let mut search_dirs = vec![cli.vault_dir.clone()];
    search_dirs.extend(config.last_vault_dir.clone());
    if let Ok(base) = default_base_dir() {
        search_dirs.push(base);
    }
    for dir in &search_dirs {
        match find_vault_path(dir) {
            Ok(path) => return Ok(path),
            Err(e) => info!(dir = %dir.display(), error = %e, "no vault here"),
        }
    }
    Err(anyhow!(
        "No vault files found in {}. Pass one with --vault-path.",
        cli.vault_dir.display()
    ))
}

pub fn lookup_code(db: &Db, uuid: &str, unix_secs: u64) -> Result<String> {
    let entry = db
        .entries
        .iter()
        .find(|e| e.uuid == uuid)
        .ok_or_else(|| anyhow!("No entry found with UUID {uuid}."))?;
    generate(entry, unix_secs).map_err(|e| anyhow!("Cannot generate code for {uuid}: {e}"))
}

fn run_tui(session: &mut Session, theme: &Theme) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
        disable_raw_mode().ok();
        return Err(e.into());
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut input = CrosstermInput;

    let result = run_loop(&mut terminal, session, &mut input, theme);
    teardown_terminal(&mut terminal);
    if let Err(e) = &result {
        warn!(error = %e, "session ended with error");
    }
    result
}

/// Polls input, advances the session clock and redraws when needed,
/// until the session asks to quit or the input source fails.
pub fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    input: &mut dyn InputSource,
    theme: &Theme,
) -> Result<()> {
    let mut dirty = true;
    loop {
        if session.should_quit() {
            info!("quit requested");
            return Ok(());
        }
        if session.tick(Instant::now()) {
            dirty = true;
        }
        if dirty {
            let height = terminal.size()?.height;
            session.set_page_size(page_size_for(height, session.mode()));
            let model = session.frame();
            terminal.draw(|f| draw(f, &model, theme))?;
            dirty = false;
        }

        match input.next_event(POLL_INTERVAL)? {
            Some(Event::Key(key)) => {
                let now = Instant::now();
                if key.kind != KeyEventKind::Release {
                    session.note_input(now);
                }
                if let Some(action) = map_key(key) {
                    session.apply(action, now);
                    dirty = true;
                }
            }
            Some(Event::Resize(_, _)) => {
                terminal.autoresize()?;
                dirty = true;
            }
            Some(_) | None => {}
        }
    }
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show).ok();
    terminal.show_cursor().ok();
}
