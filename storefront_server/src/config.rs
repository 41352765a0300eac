use std::env;

use chrono::Duration;
use gateway_tools::GatewayConfig;
use log::*;
use storefront_common::{
    helpers::{parse_boolean_flag, parse_env_var},
    Secret,
    STORE_CURRENCY_CODE,
};
use storefront_engine::helpers::{
    CoinPolicy,
    DEFAULT_COD_EARN_RATE_BPS,
    DEFAULT_COIN_HOLD_DAYS,
    DEFAULT_ONLINE_EARN_RATE_BPS,
    DEFAULT_RETURN_WINDOW_HOURS,
};

const DEFAULT_SF_HOST: &str = "127.0.0.1";
const DEFAULT_SF_PORT: u16 = 8480;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
const DEFAULT_SETTLEMENT_INTERVAL_HOURS: i64 = 24;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The single currency that the store charges in
    pub currency: String,
    pub coin_policy: CoinPolicy,
    /// Time between coin settlement runs
    pub settlement_interval: Duration,
    pub gateway: GatewayConfig,
    pub webhook: WebhookConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub hmac_secret: Secret<String>,
    /// If false, gateway webhooks are accepted without checking their signature. Only for local testing.
    pub hmac_checks: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { hmac_secret: Secret::default(), hmac_checks: true }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SF_HOST.to_string(),
            port: DEFAULT_SF_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            currency: STORE_CURRENCY_CODE.to_string(),
            coin_policy: CoinPolicy::default(),
            settlement_interval: Duration::hours(DEFAULT_SETTLEMENT_INTERVAL_HOURS),
            gateway: GatewayConfig::default(),
            webhook: WebhookConfig::default(),
            use_x_forwarded_for: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SF_HOST").ok().unwrap_or_else(|| DEFAULT_SF_HOST.into());
        let port = env_or_default("SF_PORT", DEFAULT_SF_PORT);
        let database_url = env::var("SF_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SF_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let currency = env::var("SF_CURRENCY").ok().unwrap_or_else(|| STORE_CURRENCY_CODE.to_string());
        let coin_policy = configure_coin_policy();
        let settlement_interval = env_or_default("SF_SETTLEMENT_INTERVAL_HOURS", DEFAULT_SETTLEMENT_INTERVAL_HOURS);
        let settlement_interval = if settlement_interval > 0 {
            Duration::hours(settlement_interval)
        } else {
            warn!("🪛️ SF_SETTLEMENT_INTERVAL_HOURS must be positive. Using {DEFAULT_SETTLEMENT_INTERVAL_HOURS} hrs.");
            Duration::hours(DEFAULT_SETTLEMENT_INTERVAL_HOURS)
        };
        let gateway = GatewayConfig::new_from_env_or_default();
        let webhook = WebhookConfig::from_env_or_default();
        let use_x_forwarded_for = parse_boolean_flag(env::var("SF_USE_X_FORWARDED_FOR").ok(), false);
        Self {
            host,
            port,
            database_url,
            currency,
            coin_policy,
            settlement_interval,
            gateway,
            webhook,
            use_x_forwarded_for,
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("SF_GATEWAY_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SF_GATEWAY_WEBHOOK_SECRET is not set. Please set it to the webhook secret configured on the payment \
                 gateway dashboard."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("SF_GATEWAY_WEBHOOK_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Gateway webhook signature checks are DISABLED. Do not run a production server like this.");
        }
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}

fn configure_coin_policy() -> CoinPolicy {
    let cod_earn_rate_bps = env_or_default("SF_COD_EARN_RATE_BPS", DEFAULT_COD_EARN_RATE_BPS);
    let online_earn_rate_bps = env_or_default("SF_ONLINE_EARN_RATE_BPS", DEFAULT_ONLINE_EARN_RATE_BPS);
    let hold_days = env_or_default("SF_COIN_HOLD_DAYS", DEFAULT_COIN_HOLD_DAYS);
    let return_hours = env_or_default("SF_RETURN_WINDOW_HOURS", DEFAULT_RETURN_WINDOW_HOURS);
    let policy = CoinPolicy {
        cod_earn_rate_bps,
        online_earn_rate_bps,
        hold_period: Duration::days(hold_days.max(0)),
        return_window: Duration::hours(return_hours.max(0)),
    };
    info!(
        "🪛️ Coin policy: COD earns {} bps, online earns {} bps, {hold_days} day hold, {return_hours} hr return window",
        policy.cod_earn_rate_bps, policy.online_earn_rate_bps
    );
    policy
}

fn env_or_default<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    match parse_env_var::<T>(name) {
        Ok(v) => v,
        Err(e) if env::var(name).is_ok() => {
            warn!("🪛️ {e} Using the default, {default}, instead.");
            default
        },
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}
