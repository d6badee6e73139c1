use std::time::Duration;

use alloy::primitives::{address, Address};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::CacheTtls;
use crate::slippage::{DEFAULT_FEE_DENOMINATOR, DEFAULT_FEE_NUMERATOR};
use crate::types::BaseToken;

/// PancakeSwap V2 factory on BSC mainnet.
pub const PANCAKESWAP_V2_FACTORY: Address = address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73");
/// Wrapped BNB.
pub const WBNB_ADDRESS: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
const BUSD_ADDRESS: Address = address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56");
const USDT_ADDRESS: Address = address!("55d398326f99059fF775485246999027B3197955");
const USDC_ADDRESS: Address = address!("8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d");

pub const DEFAULT_RPC_URL: &str = "https://bsc-dataseed.binance.org/";

/// Runtime configuration. Defaults target the PancakeSwap V2 deployment
/// on BSC mainnet; every field can be overridden through the environment
/// or set programmatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub rpc_url: String,
    pub factory: Address,
    pub wrapped_native: Address,
    pub fee_numerator: u64,
    pub fee_denominator: u64,
    /// Percent move of the reserve ratio that flags a poll as significant.
    pub liquidity_alert_threshold: Decimal,
    /// Market-cap percentages used when the caller does not supply a set.
    pub market_cap_percentages: Vec<Decimal>,
    /// Delay between polls in watch mode.
    pub monitoring_interval: Duration,
    pub cache_ttls: CacheTtls,
    /// Counter-token fallback list, in priority order.
    pub base_tokens: Vec<BaseToken>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            factory: PANCAKESWAP_V2_FACTORY,
            wrapped_native: WBNB_ADDRESS,
            fee_numerator: DEFAULT_FEE_NUMERATOR,
            fee_denominator: DEFAULT_FEE_DENOMINATOR,
            liquidity_alert_threshold: Decimal::new(1, 1), // 0.1%
            market_cap_percentages: vec![Decimal::new(5, 1), Decimal::from(5)],
            monitoring_interval: Duration::from_millis(10_000),
            cache_ttls: CacheTtls::default(),
            base_tokens: default_base_tokens(WBNB_ADDRESS),
        }
    }
}

impl AnalyzerConfig {
    /// Read overrides from the environment, keeping defaults for unset or
    /// unparseable values. Call `dotenvy::dotenv()` first if a `.env`
    /// file should be honored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("BSC_RPC_URL") {
            cfg.rpc_url = url;
        }
        env_parse("PANCAKESWAP_V2_FACTORY", &mut cfg.factory);
        env_parse("WBNB_ADDRESS", &mut cfg.wrapped_native);
        env_parse("FEE_NUMERATOR", &mut cfg.fee_numerator);
        env_parse("FEE_DENOMINATOR", &mut cfg.fee_denominator);
        env_parse(
            "LIQUIDITY_ALERT_THRESHOLD",
            &mut cfg.liquidity_alert_threshold,
        );
        for (i, key) in ["MARKET_CAP_PERCENTAGE_1", "MARKET_CAP_PERCENTAGE_2"]
            .iter()
            .enumerate()
        {
            if let Some(slot) = cfg.market_cap_percentages.get_mut(i) {
                env_parse(key, slot);
            }
        }
        let mut interval_ms = cfg.monitoring_interval.as_millis() as u64;
        env_parse("MONITORING_INTERVAL_MS", &mut interval_ms);
        cfg.monitoring_interval = Duration::from_millis(interval_ms);
        // The fallback list leads with whatever the wrapped native asset
        // resolved to.
        cfg.base_tokens = default_base_tokens(cfg.wrapped_native);
        cfg
    }
}

/// The well-known BSC base tokens, in priority order.
fn default_base_tokens(wrapped_native: Address) -> Vec<BaseToken> {
    vec![
        BaseToken {
            address: wrapped_native,
            symbol: "WBNB".to_string(),
        },
        BaseToken {
            address: BUSD_ADDRESS,
            symbol: "BUSD".to_string(),
        },
        BaseToken {
            address: USDT_ADDRESS,
            symbol: "USDT".to_string(),
        },
        BaseToken {
            address: USDC_ADDRESS,
            symbol: "USDC".to_string(),
        },
    ]
}

fn env_parse<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => warn!("ignoring unparseable {key}={raw}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_the_bsc_deployment() {
        let cfg = AnalyzerConfig::default();
        assert_eq!(cfg.fee_numerator, 9_975);
        assert_eq!(cfg.fee_denominator, 10_000);
        assert_eq!(cfg.liquidity_alert_threshold, dec!(0.1));
        assert_eq!(cfg.market_cap_percentages, vec![dec!(0.5), dec!(5)]);
        assert_eq!(cfg.cache_ttls.token_info, Duration::from_secs(300));
        assert_eq!(cfg.cache_ttls.pair_address, Duration::from_secs(600));
        assert_eq!(cfg.cache_ttls.reserves, Duration::from_secs(30));
    }

    #[test]
    fn base_token_list_leads_with_the_wrapped_native_asset() {
        let cfg = AnalyzerConfig::default();
        assert_eq!(cfg.base_tokens.len(), 4);
        assert_eq!(cfg.base_tokens[0].address, cfg.wrapped_native);
        assert_eq!(cfg.base_tokens[0].symbol, "WBNB");
        assert_eq!(cfg.base_tokens[1].symbol, "BUSD");
    }
}
