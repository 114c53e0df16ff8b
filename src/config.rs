use std::str::FromStr;

/// Runtime configuration, read from the environment with per-field
/// defaults. None of this is part of the core's algorithmic contract.
#[derive(Debug, Clone)]
pub struct Config {
    pub symbols: Vec<String>,
    pub interval: String,
    pub poll_interval_ms: u64,
    pub price_bins: usize,
    pub fva_target_pct: f64,
    pub grace_secs: i64,
    pub usdt_budget: f64,
    pub leverage: u32,
    pub risk_pct: f64,
    pub reward_multiplier: f64,
    pub api_key: String,
    pub api_secret: String,
    pub use_testnet: bool,
    pub http_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: parse_symbols("BTCUSDT,ETHUSDT,XRPUSDT,SOLUSDT"),
            interval: "1h".to_string(),
            poll_interval_ms: 3000,
            price_bins: 40,
            fva_target_pct: 0.7,
            grace_secs: 5,
            usdt_budget: 100.0,
            leverage: 3,
            risk_pct: 0.01,
            reward_multiplier: 1.5,
            api_key: String::new(),
            api_secret: String::new(),
            use_testnet: true,
            http_port: 3000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            symbols: std::env::var("SYMBOLS")
                .map(|raw| parse_symbols(&raw))
                .unwrap_or(defaults.symbols),
            interval: env_or("CANDLE_INTERVAL", defaults.interval),
            poll_interval_ms: env_or("POLL_INTERVAL_MS", defaults.poll_interval_ms),
            price_bins: env_or("PRICE_BINS", defaults.price_bins),
            fva_target_pct: env_or("FVA_PCT", defaults.fva_target_pct),
            grace_secs: env_or("DECISION_GRACE_SEC", defaults.grace_secs),
            usdt_budget: env_or("USDT_QTY", defaults.usdt_budget),
            leverage: env_or("LEVERAGE", defaults.leverage),
            risk_pct: env_or("RISK_PCT", defaults.risk_pct),
            reward_multiplier: env_or("REWARD_MULTIPLIER", defaults.reward_multiplier),
            api_key: std::env::var("BINANCE_API_KEY").unwrap_or_default(),
            api_secret: std::env::var("BINANCE_API_SECRET").unwrap_or_default(),
            use_testnet: env_or("BINANCE_USE_TESTNET", true),
            http_port: env_or("PORT", defaults.http_port),
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.symbols.is_empty() {
            anyhow::bail!("SYMBOLS must name at least one symbol");
        }
        if self.price_bins == 0 {
            anyhow::bail!("PRICE_BINS must be positive");
        }
        if !(0.0..=1.0).contains(&self.fva_target_pct) {
            anyhow::bail!("FVA_PCT must be within [0, 1]");
        }
        if self.usdt_budget <= 0.0 {
            anyhow::bail!("USDT_QTY must be positive");
        }
        if self.leverage == 0 {
            anyhow::bail!("LEVERAGE must be at least 1");
        }
        if self.risk_pct <= 0.0 || self.risk_pct >= 1.0 {
            anyhow::bail!("RISK_PCT must be within (0, 1)");
        }
        if self.reward_multiplier <= 0.0 {
            anyhow::bail!("REWARD_MULTIPLIER must be positive");
        }
        Ok(())
    }
}

fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();

        assert_eq!(
            config.symbols,
            vec!["BTCUSDT", "ETHUSDT", "XRPUSDT", "SOLUSDT"]
        );
        assert_eq!(config.interval, "1h");
        assert_eq!(config.poll_interval_ms, 3000);
        assert_eq!(config.price_bins, 40);
        assert_eq!(config.fva_target_pct, 0.7);
        assert_eq!(config.grace_secs, 5);
        assert_eq!(config.usdt_budget, 100.0);
        assert!(config.use_testnet);
    }

    #[test]
    fn test_parse_symbols_trims_and_uppercases() {
        let symbols = parse_symbols(" btcusdt , ETHUSDT ,,solusdt");
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.price_bins = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.symbols.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.risk_pct = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.leverage = 0;
        assert!(config.validate().is_err());
    }
}
