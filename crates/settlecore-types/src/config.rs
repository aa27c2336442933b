//! Configuration types for the three settlement engines.

use serde::{Deserialize, Serialize};

use crate::{Result, SettleError, TokenPair, constants};

/// Configuration of the atomic swap engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Timeout used when `initiate` is called with 0 seconds.
    pub default_timeout_secs: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: constants::DEFAULT_SWAP_TIMEOUT_SECS,
        }
    }
}

impl SwapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_secs == 0 {
            return Err(SettleError::Configuration(
                "default_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration of the escrow pool engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Fee taken from every swap input, in basis points.
    pub fee_bps: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            fee_bps: constants::POOL_FEE_BPS,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        validate_fee("pool", self.fee_bps)
    }
}

/// Configuration of the route aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Aggregator fee in basis points, taken before routing.
    pub fee_bps: u64,
    /// The pair routed: the user pays `x` and receives `y`.
    pub pair: TokenPair,
    /// Venue names. Ids are assigned 1..=N in this order.
    pub venues: Vec<String>,
}

impl AggregatorConfig {
    /// Default registry of five venues for `pair`.
    #[must_use]
    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            fee_bps: constants::AGGREGATOR_FEE_BPS,
            pair,
            venues: ["Liquidswap", "PancakeSwap", "Thala", "SushiSwap", "Cellana"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_fee("aggregator", self.fee_bps)?;
        if self.venues.is_empty() {
            return Err(SettleError::Configuration(
                "aggregator needs at least one venue".into(),
            ));
        }
        if self.venues.len() > constants::MAX_VENUES {
            return Err(SettleError::Configuration(format!(
                "at most {} venues supported, got {}",
                constants::MAX_VENUES,
                self.venues.len()
            )));
        }
        Ok(())
    }
}

/// Full configuration for a settlement deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleConfig {
    pub swap: SwapConfig,
    pub pool: PoolConfig,
    pub aggregator: AggregatorConfig,
}

impl SettleConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.swap.validate()?;
        self.pool.validate()?;
        self.aggregator.validate()
    }
}

fn validate_fee(component: &str, fee_bps: u64) -> Result<()> {
    if fee_bps >= constants::BPS_DENOMINATOR {
        return Err(SettleError::Configuration(format!(
            "{component} fee_bps must be < {}, got {fee_bps}",
            constants::BPS_DENOMINATOR
        )));
    }
    Ok(())
}
