use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    currency::MoneyFormat,
    errors::{PlannerError, Result},
    utils::{
        paths::{app_data_dir, config_file_in, ensure_dir},
        persistence::DEFAULT_RETENTION,
    },
};

const DEFAULT_RECOMPUTE_DELAY_MS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    /// Quiet period after the last edit before a recompute commits.
    pub recompute_delay_ms: u64,
    pub backup_retention: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_plan: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-CA".into(),
            currency: "CAD".into(),
            recompute_delay_ms: DEFAULT_RECOMPUTE_DELAY_MS,
            backup_retention: DEFAULT_RETENTION,
            last_opened_plan: None,
        }
    }
}

impl Config {
    pub fn recompute_delay(&self) -> Duration {
        Duration::from_millis(self.recompute_delay_ms)
    }

    pub fn money_format(&self) -> MoneyFormat {
        MoneyFormat::new(&self.currency, &self.locale)
    }

    /// Sets a field from its key; used by the CLI `config` command.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "locale" => self.locale = value.to_string(),
            "currency" => self.currency = value.to_uppercase(),
            "recompute_delay_ms" => {
                self.recompute_delay_ms = value.trim().parse().map_err(|_| {
                    PlannerError::ConfigError(format!("`{value}` is not a delay in ms"))
                })?
            }
            "backup_retention" => {
                self.backup_retention = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| PlannerError::ConfigError(format!("`{value}` is not a count")))?
                    .max(1)
            }
            other => {
                return Err(PlannerError::ConfigError(format!(
                    "unknown setting `{other}`"
                )))
            }
        }
        Ok(())
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: config_file_in(&base),
        })
    }

    /// Reads the config file, falling back to defaults when it does not exist yet.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|err| PlannerError::ConfigError(err.to_string()))
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_returns_defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.recompute_delay(), Duration::from_millis(120));
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let mut config = Config::default();
        config.set("currency", "usd").unwrap();
        config.set("recompute_delay_ms", "250").unwrap();
        config.last_opened_plan = Some("tower".into());
        manager.save(&config).unwrap();
        assert_eq!(manager.load().unwrap(), config);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_numbers() {
        let mut config = Config::default();
        assert!(config.set("theme", "dark").is_err());
        assert!(config.set("recompute_delay_ms", "soon").is_err());
        config.set("backup_retention", "0").unwrap();
        assert_eq!(config.backup_retention, 1);
    }
}
