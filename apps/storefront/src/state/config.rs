//! # Storefront Configuration
//!
//! Store settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`PRINTHOUSE_*`)
//! 2. Config file (`storefront.toml` in the platform config dir, or `--config`)
//! 3. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use printhouse_core::{Money, TaxRate, DEFAULT_VAT_BPS};

/// Configuration load/validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Storefront configuration.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Store name (shown in the CLI banner and receipts)
    pub store_name: String,

    /// Currency code (ISO 4217)
    pub currency_code: String,

    /// Currency symbol used when formatting prices
    pub currency_symbol: String,

    /// VAT rate in basis points, e.g. 1600 = 16%
    pub tax_rate_bps: u32,

    /// Order number prefix, e.g. `TPH` → `TPH-123456`
    pub order_prefix: String,

    /// WhatsApp number orders are sent to (digits only, country code first)
    pub whatsapp_number: String,

    /// City pre-filled on the checkout form
    pub default_city: String,

    /// Base URL of the hosted image bucket. Relative image paths are
    /// served as-is when unset.
    pub image_base_url: Option<String>,

    /// SQLite database file. Defaults to the platform data dir.
    pub database_path: Option<PathBuf>,

    /// Directory the cart file lives in. Defaults to the platform data dir.
    pub cart_dir: Option<PathBuf>,

    /// Simulated payment gateway latency
    pub payment_latency_ms: u64,

    /// Currency PayPal payments are requested in
    pub paypal_currency: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        StorefrontConfig {
            store_name: "Turkana Printing House".to_string(),
            currency_code: "KES".to_string(),
            currency_symbol: "KES".to_string(),
            tax_rate_bps: DEFAULT_VAT_BPS,
            order_prefix: "TPH".to_string(),
            whatsapp_number: "254769752124".to_string(),
            default_city: "Lodwar".to_string(),
            image_base_url: None,
            database_path: None,
            cart_dir: None,
            payment_latency_ms: 2000,
            paypal_currency: "USD".to_string(),
        }
    }
}

impl StorefrontConfig {
    // =========================================================================
    // Loading
    // =========================================================================

    /// Loads configuration from file, environment, and defaults.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Applies `PRINTHOUSE_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any `PRINTHOUSE_*` lookup.
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("PRINTHOUSE_STORE_NAME") {
            self.store_name = name;
        }

        if let Some(rate) = lookup("PRINTHOUSE_TAX_RATE_BPS") {
            if let Ok(bps) = rate.parse::<u32>() {
                debug!(bps, "Overriding tax rate from environment");
                self.tax_rate_bps = bps;
            }
        }

        if let Some(prefix) = lookup("PRINTHOUSE_ORDER_PREFIX") {
            self.order_prefix = prefix;
        }

        if let Some(number) = lookup("PRINTHOUSE_WHATSAPP_NUMBER") {
            self.whatsapp_number = number;
        }

        if let Some(url) = lookup("PRINTHOUSE_IMAGE_BASE_URL") {
            self.image_base_url = Some(url);
        }

        if let Some(path) = lookup("PRINTHOUSE_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(dir) = lookup("PRINTHOUSE_CART_DIR") {
            self.cart_dir = Some(PathBuf::from(dir));
        }

        if let Some(latency) = lookup("PRINTHOUSE_PAYMENT_LATENCY_MS") {
            if let Ok(ms) = latency.parse::<u64>() {
                self.payment_latency_ms = ms;
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 100% VAT is already absurd
        if self.tax_rate_bps > 10_000 {
            return Err(ConfigError::Invalid(format!(
                "tax_rate_bps must be at most 10000, got {}",
                self.tax_rate_bps
            )));
        }

        if self.order_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("order_prefix must not be empty".into()));
        }

        if self.whatsapp_number.is_empty()
            || !self.whatsapp_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::Invalid(format!(
                "whatsapp_number must be digits only, got: {}",
                self.whatsapp_number
            )));
        }

        if let Some(ref base) = self.image_base_url {
            let url = Url::parse(base)
                .map_err(|e| ConfigError::Invalid(format!("image_base_url: {}", e)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::Invalid(format!(
                    "image_base_url must be http(s), got: {}",
                    base
                )));
            }
        }

        Ok(())
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "turkana", "printhouse")
    }

    /// `<config dir>/storefront.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("storefront.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Configured database path, else `<data dir>/printhouse.db`, else
    /// `./printhouse.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            Self::project_dirs()
                .map(|dirs| dirs.data_dir().join("printhouse.db"))
                .unwrap_or_else(|| PathBuf::from("printhouse.db"))
        })
    }

    /// Configured cart directory, else the platform data dir, else `.`.
    pub fn cart_dir(&self) -> PathBuf {
        self.cart_dir.clone().unwrap_or_else(|| {
            Self::project_dirs()
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    /// Formats an amount with the configured currency symbol.
    pub fn format_price(&self, amount: Money) -> String {
        amount.format_with_symbol(&self.currency_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = StorefrontConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.tax_rate(), TaxRate::from_bps(1600));
        assert_eq!(config.format_price(Money::from_major(2400)), "KES 2,400.00");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: StorefrontConfig = toml::from_str(
            r#"
            order_prefix = "TUR"
            payment_latency_ms = 0
            image_base_url = "https://cdn.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.order_prefix, "TUR");
        assert_eq!(config.payment_latency_ms, 0);
        assert_eq!(config.whatsapp_number, "254769752124");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("PRINTHOUSE_TAX_RATE_BPS", "800"),
            ("PRINTHOUSE_PAYMENT_LATENCY_MS", "not-a-number"),
            ("PRINTHOUSE_CART_DIR", "/tmp/carts"),
        ]
        .into_iter()
        .collect();

        let mut config = StorefrontConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.tax_rate_bps, 800);
        assert_eq!(config.payment_latency_ms, 2000);
        assert_eq!(config.cart_dir(), PathBuf::from("/tmp/carts"));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = StorefrontConfig {
            whatsapp_number: "+254 769".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.whatsapp_number = "254769752124".to_string();
        config.image_base_url = Some("ftp://files".to_string());
        assert!(config.validate().is_err());

        config.image_base_url = None;
        config.tax_rate_bps = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("missing-{}.toml", uuid::Uuid::new_v4()));
        let config = StorefrontConfig::load(Some(path)).unwrap();

        assert_eq!(config.order_prefix, "TPH");
    }
}
