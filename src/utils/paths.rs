use dirs::home_dir;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::errors::Result;

const DEFAULT_DIR_NAME: &str = ".payment_planner";
const HOME_ENV: &str = "PAYMENT_PLANNER_HOME";
const PLANS_DIR: &str = "plans";
const BACKUP_DIR: &str = "backups";
const CONFIG_FILE: &str = "config.json";

/// Application data directory: `$PAYMENT_PLANNER_HOME`, else `~/.payment_planner`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn resolve_base(custom: Option<PathBuf>) -> PathBuf {
    custom.unwrap_or_else(app_data_dir)
}

pub fn plans_dir_in(base: &Path) -> PathBuf {
    base.join(PLANS_DIR)
}

pub fn backups_dir_in(base: &Path) -> PathBuf {
    base.join(BACKUP_DIR)
}

pub fn config_file_in(base: &Path) -> PathBuf {
    base.join(CONFIG_FILE)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
