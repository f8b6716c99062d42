//! Configuration types for poly-arb

use crate::feed::POLYMARKET_WS_URL;
use crate::market::{MarketSubscription, OutcomeAsset, GAMMA_API_URL};
use crate::matching::MatchingConfig;
use crate::telemetry::LogFormat;
use anyhow::Context;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

/// Market channel connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Gamma API base URL for market discovery
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,
    /// Seconds between text keep-alives
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Consecutive failed connects before a feed gives up (0 = never)
    #[serde(default)]
    pub max_reconnects: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// Raw messages buffered between a feed and its pipeline
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_ws_url() -> String {
    POLYMARKET_WS_URL.to_string()
}
fn default_gamma_url() -> String {
    GAMMA_API_URL.to_string()
}
fn default_ping_interval_secs() -> u64 {
    10
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_max_delay_secs() -> u64 {
    30
}
fn default_buffer_size() -> usize {
    256
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            gamma_url: default_gamma_url(),
            ping_interval_secs: default_ping_interval_secs(),
            max_reconnects: 0,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
            buffer_size: default_buffer_size(),
        }
    }
}

/// Execution engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Fee charged on simulated fills, as a fraction of notional
    #[serde(default)]
    pub fee_rate: Decimal,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Paper,
            fee_rate: Decimal::ZERO,
        }
    }
}

/// Where instructions go after matching
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Simulated immediate fills
    #[default]
    Paper,
    /// Instructions are only logged, recorded, and kept in the ledger
    Disabled,
}

/// Data capture configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// File rotation interval, e.g. "30m", "1h", "1d"
    #[serde(default = "default_rotation_interval")]
    pub rotation_interval: String,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Capture every raw market message, replayable with `replay`
    #[serde(default = "default_record_messages")]
    pub record_messages: bool,
    /// Also capture both ask ladders after every applied batch
    #[serde(default)]
    pub record_ladders: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_rotation_interval() -> String {
    "1h".to_string()
}
fn default_record_messages() -> bool {
    true
}

fn default_flush_interval_secs() -> u64 {
    60
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_output_dir(),
            rotation_interval: default_rotation_interval(),
            flush_interval_secs: default_flush_interval_secs(),
            record_messages: default_record_messages(),
            record_ladders: false,
        }
    }
}

impl DataConfig {
    pub fn rotation_interval_secs(&self) -> anyhow::Result<u64> {
        parse_interval(&self.rotation_interval)
    }
}

/// Parse an interval such as "90s", "30m", "1h" or "1d" into seconds
pub fn parse_interval(value: &str) -> anyhow::Result<u64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);

    let amount: u64 = amount
        .parse()
        .with_context(|| format!("Invalid interval '{}'", value))?;
    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        other => anyhow::bail!("Unknown interval unit '{}' in '{}'", other, value),
    };

    if amount == 0 {
        anyhow::bail!("Interval must be positive: '{}'", value);
    }
    amount
        .checked_mul(multiplier)
        .with_context(|| format!("Interval too long: '{}'", value))
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub metrics_enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_port: default_metrics_port(),
        }
    }
}

/// One market to sync.
///
/// With `market_id` and `outcomes` set the market is used as declared;
/// otherwise it is resolved by slug through the Gamma API.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub slug: String,
    #[serde(default)]
    pub market_id: Option<String>,
    #[serde(default)]
    pub outcomes: Option<Vec<OutcomeAsset>>,
}

impl MarketConfig {
    /// The declared subscription, if fully specified
    pub fn static_subscription(&self) -> Option<MarketSubscription> {
        match (&self.market_id, &self.outcomes) {
            (Some(market_id), Some(outcomes)) => Some(MarketSubscription::new(
                self.slug.clone(),
                market_id.clone(),
                outcomes.clone(),
            )),
            _ => None,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.matching.payout <= Decimal::ZERO {
            anyhow::bail!("matching.payout must be positive");
        }
        if self.matching.min_tradable_size <= Decimal::ZERO {
            anyhow::bail!("matching.min_tradable_size must be positive");
        }
        if self.execution.fee_rate < Decimal::ZERO {
            anyhow::bail!("execution.fee_rate must not be negative");
        }
        if self.feed.ping_interval_secs == 0 {
            anyhow::bail!("feed.ping_interval_secs must be positive");
        }
        if self.feed.buffer_size == 0 {
            anyhow::bail!("feed.buffer_size must be positive");
        }
        self.data.rotation_interval_secs()?;

        for market in &self.markets {
            if market.slug.trim().is_empty() {
                anyhow::bail!("market slug must not be empty");
            }
            if let Some(subscription) = market.static_subscription() {
                subscription
                    .validate()
                    .with_context(|| format!("Invalid market '{}'", market.slug))?;
            } else if market.outcomes.is_some() || market.market_id.is_some() {
                anyhow::bail!(
                    "Market '{}' must declare both market_id and outcomes, or neither",
                    market.slug
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FULL: &str = r#"
        [telemetry]
        log_level = "debug"
        log_format = "json"
        metrics_enabled = true
        metrics_port = 9100

        [feed]
        ping_interval_secs = 5

        [matching]
        payout = 1.0
        min_tradable_size = 5

        [execution]
        mode = "disabled"
        fee_rate = 0.002

        [data]
        enabled = true
        output_dir = "/tmp/polyarb"
        rotation_interval = "30m"

        [[markets]]
        slug = "mlb-tex-bal-2025-06-01"
        market_id = "512"
        outcomes = [
            { asset_id = "tok-a", outcome_name = "Rangers" },
            { asset_id = "tok-b", outcome_name = "Orioles" },
        ]

        [[markets]]
        slug = "nba-finals-game-7"
    "#;

    #[test]
    fn test_config_deserialize() {
        let config = Config::from_toml(FULL).unwrap();

        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.telemetry.metrics_port, 9100);
        assert_eq!(config.feed.ping_interval_secs, 5);
        assert_eq!(config.feed.ws_url, POLYMARKET_WS_URL);
        assert_eq!(config.matching.min_tradable_size, dec!(5));
        assert_eq!(config.execution.mode, ExecutionMode::Disabled);
        assert_eq!(config.execution.fee_rate, dec!(0.002));
        assert_eq!(config.data.rotation_interval_secs().unwrap(), 1800);
        assert_eq!(config.markets.len(), 2);

        let subscription = config.markets[0].static_subscription().unwrap();
        assert_eq!(subscription.asset_ids(), vec!["tok-a", "tok-b"]);
        assert!(config.markets[1].static_subscription().is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.feed.ping_interval_secs, 10);
        assert_eq!(config.matching.payout, dec!(1));
        assert_eq!(config.execution.mode, ExecutionMode::Paper);
        assert!(!config.data.enabled);
        assert!(config.data.record_messages);
        assert!(!config.data.record_ladders);
        assert!(config.markets.is_empty());
    }

    #[test]
    fn test_rejects_non_binary_market() {
        let toml = r#"
            [[markets]]
            slug = "three-way"
            market_id = "9"
            outcomes = [
                { asset_id = "a", outcome_name = "A" },
                { asset_id = "b", outcome_name = "B" },
                { asset_id = "c", outcome_name = "C" },
            ]
        "#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_rejects_half_declared_market() {
        let toml = r#"
            [[markets]]
            slug = "half"
            market_id = "9"
        "#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_rejects_non_positive_min_size() {
        assert!(Config::from_toml("[matching]\nmin_tradable_size = 0").is_err());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("90").unwrap(), 90);
        assert_eq!(parse_interval("90s").unwrap(), 90);
        assert_eq!(parse_interval("30m").unwrap(), 1800);
        assert_eq!(parse_interval("1h").unwrap(), 3600);
        assert_eq!(parse_interval("1d").unwrap(), 86_400);
        assert!(parse_interval("0h").is_err());
        assert!(parse_interval("1w").is_err());
        assert!(parse_interval("h").is_err());
        assert!(parse_interval("18446744073709551615d").is_err());
    }

    #[test]
    fn test_config_load_nonexistent() {
        assert!(Config::load("/nonexistent/path/config.toml").is_err());
    }
}
