use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::decrypt_vault;
use crate::models::{Db, VaultFile};

pub const APP_DIR: &str = "aegis-tui";
pub const CONFIG_FILE: &str = "config.json";
pub const LOG_FILE: &str = "aegis-tui.log";
const VAULT_FILE_PATTERN: &str = r"^aegis-(backup|export)-\d+(-\d+)*\.json$";

fn default_color_mode() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub last_opened_vault: Option<PathBuf>,
    #[serde(default)]
    pub last_vault_dir: Option<PathBuf>,
    #[serde(default = "default_color_mode")]
    pub default_color_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            last_opened_vault: None,
            last_vault_dir: None,
            default_color_mode: default_color_mode(),
        }
    }
}

impl Config {
    pub fn remember_vault(&mut self, vault: &Path) {
        self.last_opened_vault = Some(vault.to_path_buf());
        self.last_vault_dir = vault.parent().map(Path::to_path_buf);
    }
}

pub fn default_base_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(base.join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(default_base_dir()?.join(CONFIG_FILE))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(default_base_dir()?.join(LOG_FILE))
}

/// Missing file means defaults; an unreadable one is logged and replaced by defaults.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
            Ok(Config::default())
        }
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            restrict_dir(parent)?;
        }
    }
    let data = serde_json::to_string_pretty(cfg)?;
    atomic_write(path, data.as_bytes())?;
    restrict_file(path)?;
    Ok(())
}

pub fn save_config(cfg: &Config) -> Result<()> {
    save_config_to(&config_path()?, cfg)
}

fn vault_pattern() -> Result<Regex> {
    Regex::new(VAULT_FILE_PATTERN).map_err(|e| anyhow!("Invalid vault pattern: {e}"))
}

/// Newest `aegis-backup-*.json` / `aegis-export-*.json` in `dir` by mtime.
pub fn find_vault_path(dir: &Path) -> Result<PathBuf> {
    let re = vault_pattern()?;
    let entries = fs::read_dir(dir)
        .map_err(|e| anyhow!("Cannot read vault directory {}: {e}", dir.display()))?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !re.is_match(name) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }
    newest
        .map(|(_, path)| path)
        .ok_or_else(|| anyhow!("No vault files found in {}", dir.display()))
}

pub fn read_vault_file(path: &Path) -> Result<VaultFile> {
    let raw = fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read vault {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| anyhow!("Invalid vault file {}: {e}", path.display()))
}

pub fn is_encrypted(file: &VaultFile) -> bool {
    file.db.is_string()
}

/// Loads the vault database, asking for the password only when the vault is encrypted.
pub fn open_vault<F>(path: &Path, password: F) -> Result<Db>
where
    F: FnOnce() -> Result<Zeroizing<String>>,
{
    let file = read_vault_file(path)?;
    if !is_encrypted(&file) {
        tracing::info!(path = %path.display(), "opening plaintext vault");
        return serde_json::from_value(file.db)
            .map_err(|e| anyhow!("Invalid vault database: {e}"));
    }
    let password = password()?;
    let db = decrypt_vault(&file, &password)?;
    tracing::info!(path = %path.display(), entries = db.entries.len(), "vault unlocked");
    Ok(db)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| anyhow!("Invalid target path"))?;
    if !parent.exists() {
        fs::create_dir_all(parent)?;
        restrict_dir(parent)?;
    }

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| anyhow!("Atomic write failed: {}", e.error))?;
    Ok(())
}

fn restrict_file(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
    }
    Ok(())
}

pub fn restrict_dir(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
        }
    }
    Ok(())
}
