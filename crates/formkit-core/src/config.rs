//! Formkit configuration
//!
//! Read from `~/.formkit/config.toml`, or `config.<profile>.toml` for a named
//! profile. Missing files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::clock::Clock;
use crate::error::{FormError, Result};
use crate::formula::{FormulaEvaluator, DEFAULT_DATE_FORMATS};
use crate::reconciler::{DerivedPass, FormReconciler};

/// Key the saved-forms blob is stored under
pub const DEFAULT_STORAGE_KEY: &str = "formkit-forms";

/// Keys accepted by [`FormkitConfig::get`] and [`FormkitConfig::set`]
pub const CONFIG_KEYS: [&str; 4] = ["storage_key", "data_dir", "derived_pass", "date_formats"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormkitConfig {
    pub storage_key: String,
    /// Directory for the file-backed store; `None` uses the platform data dir
    pub data_dir: Option<PathBuf>,
    pub derived_pass: DerivedPass,
    pub date_formats: Vec<String>,
}

impl Default for FormkitConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            data_dir: None,
            derived_pass: DerivedPass::default(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl FormkitConfig {
    pub fn load(profile: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::config_path(profile)?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Write to the profile's config file, returning its path
    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf> {
        let path = Self::config_path(profile)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn config_path(profile: Option<&str>) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(FormError::NoHomeDirectory)?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".formkit").join(filename))
    }

    /// Configured data dir, else `<platform data dir>/formkit`, else `./.formkit`
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("formkit")))
            .unwrap_or_else(|| PathBuf::from(".formkit"))
    }

    /// Display value of a config key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "storage_key" => self.storage_key.clone(),
            "data_dir" => self.resolved_data_dir().display().to_string(),
            "derived_pass" => match self.derived_pass {
                DerivedPass::Sequential => "sequential".to_string(),
                DerivedPass::Snapshot => "snapshot".to_string(),
            },
            "date_formats" => self.date_formats.join(","),
            _ => return Err(FormError::UnknownConfigKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a config key from its text form. `date_formats` takes a comma-separated list.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || FormError::InvalidConfigValue { key: key.to_string(), value: value.to_string() };
        match key {
            "storage_key" if !value.trim().is_empty() => self.storage_key = value.trim().to_string(),
            "storage_key" => return Err(invalid()),
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            "derived_pass" => {
                self.derived_pass = match value.trim().to_ascii_lowercase().as_str() {
                    "sequential" => DerivedPass::Sequential,
                    "snapshot" => DerivedPass::Snapshot,
                    _ => return Err(invalid()),
                }
            }
            "date_formats" => {
                let formats: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(String::from)
                    .collect();
                if formats.is_empty() {
                    return Err(invalid());
                }
                self.date_formats = formats;
            }
            _ => return Err(FormError::UnknownConfigKey(key.to_string())),
        }
        Ok(())
    }

    /// Reconciler wired with this config's pass and date formats
    pub fn reconciler<C: Clock>(&self, clock: C) -> FormReconciler<C> {
        let evaluator = FormulaEvaluator::with_clock(clock).with_date_formats(self.date_formats.clone());
        FormReconciler::with_evaluator(evaluator).with_pass(self.derived_pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn test_defaults() {
        let config = FormkitConfig::default();
        assert_eq!(config.storage_key, "formkit-forms");
        assert_eq!(config.derived_pass, DerivedPass::Sequential);
        assert_eq!(config.date_formats.len(), 3);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FormkitConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, FormkitConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = FormkitConfig::default();
        config.set("derived_pass", "Snapshot").unwrap();
        config.set("data_dir", "/tmp/forms").unwrap();
        config.set("date_formats", "%d.%m.%Y, %Y-%m-%d").unwrap();
        config.save_to(&path).unwrap();

        let loaded = FormkitConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.get("date_formats").unwrap(), "%d.%m.%Y,%Y-%m-%d");
        assert_eq!(loaded.get("derived_pass").unwrap(), "snapshot");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "storage_key = \"other\"\n").unwrap();

        let config = FormkitConfig::load_from(&path).unwrap();
        assert_eq!(config.storage_key, "other");
        assert_eq!(config.derived_pass, DerivedPass::Sequential);
    }

    #[test]
    fn test_bad_keys_and_values() {
        let mut config = FormkitConfig::default();
        assert!(matches!(config.set("colour", "x"), Err(FormError::UnknownConfigKey(_))));
        assert!(matches!(config.set("derived_pass", "loop"), Err(FormError::InvalidConfigValue { .. })));
        assert!(matches!(config.set("date_formats", " , "), Err(FormError::InvalidConfigValue { .. })));
        assert!(config.get("colour").is_err());
    }

    #[test]
    fn test_reconciler_uses_config() {
        let mut config = FormkitConfig::default();
        config.derived_pass = DerivedPass::Snapshot;
        let reconciler = config.reconciler(FixedClock::ymd(2024, 1, 1).unwrap());
        assert_eq!(reconciler.pass(), DerivedPass::Snapshot);
    }
}
