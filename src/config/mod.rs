//! Environment settings and the subjects file

use crate::engine::retry::{
    RetryingFetcher, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY,
};
use crate::error::ConfigError;
use crate::models::condition::Condition;
use crate::models::subject::Subject;
use crate::services::calendar::DEFAULT_CALENDAR_URL;
use crate::services::market_data::DEFAULT_QUOTE_URL;
use crate::services::notify::telegram::DEFAULT_TELEGRAM_URL;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_COOLDOWN_SECS: u64 = 3600;
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_SITE_WAIT_MS: u64 = 3000;

/// Deployment environment (`production`/`prod` or anything else)
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

/// Process settings read from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: String,
    pub config_path: String,
    pub telegram: Option<TelegramSettings>,
    pub webhook_url: Option<String>,
    pub render_service_url: Option<String>,
    pub quote_api_url: String,
    pub calendar_url: String,
    pub check_interval_seconds: u64,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let telegram = match (optional_var("TELEGRAM_BOT_TOKEN"), optional_var("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramSettings {
                bot_token,
                chat_id,
                api_url: var_or("TELEGRAM_API_URL", DEFAULT_TELEGRAM_URL),
            }),
            (Some(_), None) => return Err(ConfigError::MissingEnv("TELEGRAM_CHAT_ID")),
            (None, Some(_)) => return Err(ConfigError::MissingEnv("TELEGRAM_BOT_TOKEN")),
            (None, None) => None,
        };

        let check_interval_seconds = match optional_var("CHECK_INTERVAL_SECONDS") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::Invalid(format!("CHECK_INTERVAL_SECONDS must be an integer, got {}", raw))
            })?,
            None => DEFAULT_CHECK_INTERVAL_SECS,
        };

        let port = match optional_var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT must be a port number, got {}", raw)))?,
            None => 8080,
        };

        Ok(Self {
            environment: get_environment(),
            config_path: var_or("MONITOR_CONFIG", "monitor.json"),
            telegram,
            webhook_url: optional_var("WEBHOOK_URL"),
            render_service_url: optional_var("RENDER_SERVICE_URL"),
            quote_api_url: var_or("QUOTE_API_URL", DEFAULT_QUOTE_URL),
            calendar_url: var_or("CALENDAR_URL", DEFAULT_CALENDAR_URL),
            check_interval_seconds,
            port,
        })
    }

    pub fn has_channels(&self) -> bool {
        self.telegram.is_some() || self.webhook_url.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64
}

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_wait_ms() -> u64 {
    DEFAULT_SITE_WAIT_MS
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
        }
    }
}

impl RetrySettings {
    pub fn fetcher(&self) -> RetryingFetcher {
        RetryingFetcher::new(self.max_attempts, Duration::from_millis(self.delay_ms))
            .with_attempt_timeout(Duration::from_millis(self.attempt_timeout_ms))
    }
}

/// How to read stock status off one site's product page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRule {
    pub selector: String,
    pub out_of_stock_text: String,
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
}

impl SiteRule {
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

/// Site rules keyed by host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteRules(HashMap<String, SiteRule>);

impl SiteRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, site: impl Into<String>, rule: SiteRule) -> Self {
        self.0.insert(site.into(), rule);
        self
    }

    /// Exact host first, then the `app.` subdomain of it.
    pub fn resolve(&self, site: &str) -> Result<&SiteRule, ConfigError> {
        self.0
            .get(site)
            .or_else(|| self.0.get(&format!("app.{}", site)))
            .ok_or_else(|| ConfigError::UnknownSite {
                site: site.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockEntry {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub cooldown_secs: Option<u64>,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub cooldown_secs: Option<u64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Contents of the subjects file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub stocks: Vec<StockEntry>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
    #[serde(default)]
    pub sites: SiteRules,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default = "default_cooldown_secs")]
    pub default_cooldown_secs: u64,
}

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stocks.is_empty() && self.products.is_empty() {
            return Err(ConfigError::Invalid("no stocks or products configured".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        for stock in &self.stocks {
            if stock.conditions.is_empty() {
                return Err(ConfigError::Invalid(format!("stock {} has no conditions", stock.code)));
            }
            for condition in &stock.conditions {
                condition
                    .validate()
                    .map_err(|e| ConfigError::Invalid(format!("stock {}: {}", stock.code, e)))?;
            }
            if !seen.insert(stock.code.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate subject {}", stock.code)));
            }
        }
        for product in &self.products {
            for condition in &product.conditions {
                condition
                    .validate()
                    .map_err(|e| ConfigError::Invalid(format!("product {}: {}", product.name, e)))?;
            }
            if !seen.insert(product.url.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate subject {}", product.url)));
            }
        }
        Ok(())
    }

    pub fn default_cooldown(&self) -> Duration {
        Duration::from_secs(self.default_cooldown_secs)
    }

    /// Longest cooldown any subject uses
    pub fn max_cooldown(&self) -> Duration {
        self.stocks
            .iter()
            .filter_map(|s| s.cooldown_secs)
            .chain(self.products.iter().filter_map(|p| p.cooldown_secs))
            .map(Duration::from_secs)
            .fold(self.default_cooldown(), Duration::max)
    }

    pub fn subjects(&self) -> Vec<Subject> {
        let stocks = self.stocks.iter().map(|stock| {
            let subject = Subject::quote(&stock.code, &stock.name, stock.conditions.clone());
            match stock.cooldown_secs {
                Some(secs) => subject.with_cooldown(Duration::from_secs(secs)),
                None => subject,
            }
        });
        let products = self.products.iter().map(|product| {
            let mut subject = Subject::listing(&product.url, &product.name, product.conditions.clone());
            if let Some(ref site) = product.site {
                subject = subject.with_site(site);
            }
            match product.cooldown_secs {
                Some(secs) => subject.with_cooldown(Duration::from_secs(secs)),
                None => subject,
            }
        });
        stocks.chain(products).collect()
    }

    pub fn has_listings(&self) -> bool {
        !self.products.is_empty()
    }

    pub fn has_quotes(&self) -> bool {
        !self.stocks.is_empty()
    }
}
