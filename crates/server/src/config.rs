// Server configuration loaded from environment variables.
// Decision: Unset or unparsable values fall back to defaults with a warning

use std::str::FromStr;
use std::time::Duration;

use herald_delivery::{DeliveryConfig, RecipientPolicy, RetryPolicy};

const DEFAULT_DATABASE_URL: &str = "sqlite://herald.db?mode=rwc";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:9000";

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite connection string
    pub database_url: String,
    /// HTTP listen address
    pub bind_address: String,
    /// Sessions registered as authenticated at startup
    pub sessions: Vec<String>,
    /// Artificial latency of the dry-run transport
    pub dry_run_latency: Duration,
    /// Scheduler, retry and recipient settings
    pub delivery: DeliveryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            sessions: Vec::new(),
            dry_run_latency: Duration::ZERO,
            delivery: DeliveryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").unwrap_or(defaults.database_url);
        let bind_address = var("BIND_ADDRESS").unwrap_or(defaults.bind_address);
        let sessions = var("HERALD_SESSIONS")
            .map(|s| split_list(&s))
            .unwrap_or_default();
        let dry_run_latency = parse::<u64>(&var, "DRY_RUN_LATENCY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.dry_run_latency);

        let mut delivery = defaults.delivery;

        if let Some(ms) = parse::<u64>(&var, "TICK_INTERVAL_MS") {
            delivery = delivery.with_tick_interval(Duration::from_millis(ms.max(1)));
        }
        if let Some(secs) = parse::<u64>(&var, "DELIVERY_TIMEOUT_SECS") {
            delivery = delivery.with_delivery_timeout(Duration::from_secs(secs.max(1)));
        }

        let max_retries = parse::<u32>(&var, "MAX_RETRIES")
            .map(|n| n.max(1))
            .unwrap_or(delivery.retry.max_retries);
        let retry_delay = parse::<u64>(&var, "RETRY_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(delivery.retry.delay);
        delivery = delivery.with_retry(RetryPolicy::fixed(retry_delay, max_retries));

        let mut recipient = RecipientPolicy::default();
        if let Some(code) = var("COUNTRY_CODE") {
            recipient = recipient.with_country_code(code.trim());
        }
        if let Some(blocked) = var("BLOCKED_NUMBERS") {
            for number in split_list(&blocked) {
                recipient = recipient.with_blocked_number(number);
            }
        }
        delivery = delivery.with_recipient(recipient);

        if let Some(number) = var("OVERRIDE_PHONE_NUMBER") {
            delivery = delivery.with_override_recipient(number.trim());
        }

        Self {
            database_url,
            bind_address,
            sessions,
            dry_run_latency,
            delivery,
        }
    }
}

fn parse<T: FromStr>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring invalid value");
            None
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
