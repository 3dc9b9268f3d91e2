//! Configuration management for the compounder
//!
//! Loads configuration from a TOML file with environment variable substitution.
//! Placeholders take the form `${VAR}` or `${VAR:-default}`; a `.env` file in the
//! working directory is loaded into the environment first.

use crate::error::{CompounderError, CompounderResult};

use ethers::types::Address;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable pointing at the configuration file
pub const CONFIG_ENV: &str = "COMPOUNDER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub chain: ChainConfig,
    pub wallet: WalletConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub receipts: ReceiptConfig,
    #[serde(default)]
    pub liquidity: LiquidityConfig,
    pub addresses: AddressBook,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub address: String,
    /// Name of the environment variable holding the private key
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
    /// Slippage tolerance passed to the aggregator, in percent
    pub slippage_percent: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.1inch.com/swap/v6.1".to_string(),
            api_key: String::new(),
            request_timeout_secs: 30,
            slippage_percent: 0.1,
        }
    }
}

/// Fee policy knobs. The jitter range and floor multiplier are policy, not
/// protocol constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub block_count: u64,
    pub reward_percentile: f64,
    pub jitter_min: f64,
    pub jitter_max: f64,
    pub floor_multiplier: f64,
    pub fallback_priority_ratio: f64,
    pub gas_limit_buffer_percent: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            block_count: 5,
            reward_percentile: 50.0,
            jitter_min: 1.01,
            jitter_max: 1.03,
            floor_multiplier: 1.05,
            fallback_priority_ratio: 0.1,
            gas_limit_buffer_percent: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    /// Tolerance applied to the pool's expected LP mint, in percent
    pub slippage_percent: f64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            slippage_percent: 0.1,
        }
    }
}

/// Contract addresses as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct AddressBook {
    pub crv: String,
    pub crvusd: String,
    pub oneinch_router: String,
    pub curve_pool: String,
    #[serde(default)]
    pub stake_dao_gauge: Option<String>,
    #[serde(default)]
    pub stake_dao_vault: Option<String>,
    #[serde(default)]
    pub stake_dao_harvester: Option<String>,
}

impl AddressBook {
    pub fn crv(&self) -> CompounderResult<Address> {
        parse_address("addresses.crv", &self.crv)
    }

    pub fn crvusd(&self) -> CompounderResult<Address> {
        parse_address("addresses.crvusd", &self.crvusd)
    }

    pub fn oneinch_router(&self) -> CompounderResult<Address> {
        parse_address("addresses.oneinch_router", &self.oneinch_router)
    }

    /// The Curve pool doubles as its LP token
    pub fn curve_pool(&self) -> CompounderResult<Address> {
        parse_address("addresses.curve_pool", &self.curve_pool)
    }

    pub fn stake_dao_gauge(&self) -> CompounderResult<Address> {
        require_address("addresses.stake_dao_gauge", &self.stake_dao_gauge)
    }

    pub fn stake_dao_vault(&self) -> CompounderResult<Address> {
        require_address("addresses.stake_dao_vault", &self.stake_dao_vault)
    }

    pub fn stake_dao_harvester(&self) -> CompounderResult<Address> {
        require_address("addresses.stake_dao_harvester", &self.stake_dao_harvester)
    }

    fn validate(&self) -> CompounderResult<()> {
        self.crv()?;
        self.crvusd()?;
        self.oneinch_router()?;
        self.curve_pool()?;

        // Optional entries only need to be well formed when present
        for (name, value) in [
            ("addresses.stake_dao_gauge", &self.stake_dao_gauge),
            ("addresses.stake_dao_vault", &self.stake_dao_vault),
            ("addresses.stake_dao_harvester", &self.stake_dao_harvester),
        ] {
            if let Some(raw) = value.as_deref().filter(|s| !s.trim().is_empty()) {
                parse_address(name, raw)?;
            }
        }

        Ok(())
    }
}

impl Settings {
    /// Load settings from the configured file
    pub fn load() -> CompounderResult<Self> {
        dotenvy::dotenv().ok();

        let config_path = env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self::load_from(&config_path)
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &Path) -> CompounderResult<Self> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            CompounderError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_toml(&config_str)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(input: &str) -> CompounderResult<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input);

        let settings: Settings = toml::from_str(&config_str)
            .map_err(|e| CompounderError::Config(format!("Failed to parse configuration: {}", e)))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> CompounderResult<()> {
        if self.chain.rpc_url.trim().is_empty() {
            return Err(CompounderError::Config(format!(
                "Chain {} has no RPC URL configured",
                self.chain.name
            )));
        }
        if self.chain.chain_id == 0 {
            return Err(CompounderError::Config("chain.chain_id must be non-zero".into()));
        }

        self.wallet_address()?;
        self.addresses.validate()?;

        let fees = &self.fees;
        for (name, value) in [
            ("fees.reward_percentile", fees.reward_percentile),
            ("fees.jitter_min", fees.jitter_min),
            ("fees.jitter_max", fees.jitter_max),
            ("fees.floor_multiplier", fees.floor_multiplier),
            ("fees.fallback_priority_ratio", fees.fallback_priority_ratio),
            ("aggregator.slippage_percent", self.aggregator.slippage_percent),
            ("liquidity.slippage_percent", self.liquidity.slippage_percent),
        ] {
            if !value.is_finite() {
                return Err(CompounderError::Config(format!("{} must be a finite number", name)));
            }
        }

        if fees.block_count == 0 {
            return Err(CompounderError::Config("fees.block_count must be positive".into()));
        }
        if !(0.0..=100.0).contains(&fees.reward_percentile) {
            return Err(CompounderError::Config(
                "fees.reward_percentile must be within [0, 100]".into(),
            ));
        }
        if fees.jitter_min < 1.0 || fees.jitter_min > fees.jitter_max {
            return Err(CompounderError::Config(format!(
                "fees jitter range [{}, {}] must be ordered and at least 1",
                fees.jitter_min, fees.jitter_max
            )));
        }
        if fees.floor_multiplier < 1.0 {
            return Err(CompounderError::Config("fees.floor_multiplier must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&fees.fallback_priority_ratio) {
            return Err(CompounderError::Config(
                "fees.fallback_priority_ratio must be within [0, 1)".into(),
            ));
        }

        for (name, value) in [
            ("aggregator.slippage_percent", self.aggregator.slippage_percent),
            ("liquidity.slippage_percent", self.liquidity.slippage_percent),
        ] {
            if !(0.0..100.0).contains(&value) {
                return Err(CompounderError::Config(format!("{} must be within [0, 100)", name)));
            }
        }

        if self.receipts.poll_interval_ms == 0 || self.receipts.timeout_secs == 0 {
            return Err(CompounderError::Config("receipt polling bounds must be positive".into()));
        }

        Ok(())
    }

    /// Configured wallet address
    pub fn wallet_address(&self) -> CompounderResult<Address> {
        parse_address("wallet.address", &self.wallet.address)
    }

    /// Read the private key from the environment variable named in the config
    pub fn private_key(&self) -> CompounderResult<String> {
        match env::var(&self.wallet.private_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(CompounderError::Config(format!(
                "Private key not set. Export {}",
                self.wallet.private_key_env
            ))),
        }
    }
}

fn default_private_key_env() -> String {
    "PRIVATE_KEY".to_string()
}

fn parse_address(name: &str, raw: &str) -> CompounderResult<Address> {
    Address::from_str(raw.trim()).map_err(|e| {
        CompounderError::Config(format!(
            "Invalid address for {} ({:?}): {}",
            name, raw, e
        ))
    })
}

fn require_address(name: &str, raw: &Option<String>) -> CompounderResult<Address> {
    match raw.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(value) => parse_address(name, value),
        None => Err(CompounderError::Config(format!("{} is not configured", name))),
    }
}

/// Substitute environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("placeholder pattern is valid");

    re.replace_all(input, |cap: &regex::Captures| {
        match env::var(&cap[1]) {
            Ok(value) if !value.is_empty() => value,
            _ => cap.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        }
    })
    .into_owned()
}
