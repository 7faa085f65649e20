use anyhow::{Context, Result};
use cashier_core::billing::stripe::DEFAULT_API_BASE;
use cashier_core::reconcile::job::{DEFAULT_BATCH_DELAY, DEFAULT_CHUNK_SIZE};
use cashier_core::{ReconcileOptions, SecretKey, StripeConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::args::parse_bool;
use crate::paths;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub stripe: StripeSettings,

    #[serde(default)]
    pub reconcile: ReconcileSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StripeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_base: String,
    pub max_retries: u32,
    pub timeout_seconds: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ReconcileSettings {
    pub chunk_size: i64,
    pub empty_only: bool,
    pub batch_delay_ms: u64,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct DatabaseSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for StripeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            max_retries: 3,
            timeout_seconds: 30,
        }
    }
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE as i64,
            empty_only: true,
            batch_delay_ms: DEFAULT_BATCH_DELAY.as_millis() as u64,
        }
    }
}

impl AppConfig {
    /// Client settings for the live billing provider
    ///
    /// Fails when no API key is configured.
    pub fn stripe_config(&self) -> Result<StripeConfig> {
        let api_key = self
            .stripe
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .context(
                "No Stripe API key configured; set stripe.api_key or CASHIER_STRIPE__API_KEY",
            )?;

        Ok(StripeConfig::new(SecretKey::new(api_key))
            .with_api_base(self.stripe.api_base.clone())
            .with_max_retries(self.stripe.max_retries)
            .with_timeout(Duration::from_secs(self.stripe.timeout_seconds)))
    }

    /// Reconciliation options, with command-line values taking precedence
    pub fn reconcile_options(
        &self,
        chunk_size: Option<i64>,
        empty_only: Option<bool>,
    ) -> cashier_core::Result<ReconcileOptions> {
        let options = ReconcileOptions::new(
            chunk_size.unwrap_or(self.reconcile.chunk_size),
            empty_only.unwrap_or(self.reconcile.empty_only),
        )?;
        Ok(options.with_batch_delay(Duration::from_millis(self.reconcile.batch_delay_ms)))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(paths::get_database_path)
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed("CASHIER_").split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let value = toml::Value::try_from(self.load()?)?;

        let mut current = &value;
        for part in key.split('.') {
            current = match current {
                toml::Value::Table(table) => table
                    .get(part)
                    .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?,
                _ => anyhow::bail!("Invalid key path: {}", key),
            };
        }

        scalar_to_string(current)
            .map(|value| display_value(key, value))
            .ok_or_else(|| anyhow::anyhow!("Value at '{}' is not a simple type", key))
    }

    /// Set a configuration value by key (dot notation)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed_value = parse_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, sections)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for part in sections {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }

        match current {
            toml::Value::Table(table) => {
                table.insert(last.to_string(), parsed_value);
            }
            _ => anyhow::bail!("Cannot set value on non-table"),
        }

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.config_path, toml::to_string_pretty(&config)?)?;
        log::debug!("Wrote {key} to {}", self.config_path.display());

        Ok(())
    }

    /// List all configuration values, secrets redacted
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let value = toml::Value::try_from(self.load()?)?;

        let mut items = Vec::new();
        collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
    if let toml::Value::Table(table) = value {
        for (key, val) in table {
            let new_prefix = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            collect_values(val, new_prefix, items);
        }
    } else if let Some(scalar) = scalar_to_string(value) {
        let shown = display_value(&prefix, scalar);
        items.push((prefix, shown));
    }
}

/// Mask secrets, keeping the key prefix and last four characters
fn display_value(key: &str, value: String) -> String {
    if !key.ends_with("api_key") || value.len() <= 12 {
        return value;
    }
    let prefix: String = value.chars().take(8).collect();
    let suffix: String = value.chars().skip(value.chars().count() - 4).collect();
    format!("{prefix}...{suffix}")
}

/// Validate a value and convert it to its TOML type
fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
    match key {
        "reconcile.chunk_size" => {
            let size: i64 = value
                .parse()
                .context("chunk_size must be a positive integer")?;
            if size <= 0 {
                anyhow::bail!("chunk_size must be a positive integer");
            }
            Ok(toml::Value::Integer(size))
        }
        "reconcile.empty_only" => parse_bool(value)
            .map(toml::Value::Boolean)
            .map_err(anyhow::Error::msg),
        "reconcile.batch_delay_ms" | "stripe.max_retries" => {
            let number: u32 = value
                .parse()
                .with_context(|| format!("{key} must be a non-negative integer"))?;
            Ok(toml::Value::Integer(i64::from(number)))
        }
        "stripe.timeout_seconds" => {
            let timeout: u64 = value
                .parse()
                .context("timeout_seconds must be a positive integer")?;
            if timeout == 0 {
                anyhow::bail!("timeout_seconds must be greater than 0");
            }
            Ok(toml::Value::Integer(timeout as i64))
        }
        "stripe.api_key" => {
            SecretKey::parse(value)?;
            Ok(toml::Value::String(value.to_string()))
        }
        "stripe.api_base" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                anyhow::bail!("api_base must be an http(s) URL");
            }
            Ok(toml::Value::String(value.to_string()))
        }
        "database.path" => Ok(toml::Value::String(value.to_string())),
        _ => anyhow::bail!("Unknown configuration key '{key}'"),
    }
}

/// Load the configuration from the default location
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}
