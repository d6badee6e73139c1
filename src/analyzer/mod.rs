//! The engine facade.
//!
//! [`PoolAnalyzer`] is an owned context value wiring the cached gateway,
//! pair resolver, pool monitor and fee schedule together. It holds no
//! global state; concurrent callers share it by reference.

use alloy::primitives::{Address, U256};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::batch::{self, BatchEntry, BatchOutcome, BatchReport};
use crate::cache::CacheStats;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::gateway::{CachedGateway, DataGateway};
use crate::impact::{self, ImpactReport};
use crate::monitor::{MonitorOutcome, MonitorResult, PoolMonitor};
use crate::ratio::ratio_to_decimal;
use crate::resolver::PairResolver;
use crate::slippage::{self, FeeSchedule, SlippageQuote};
use crate::types::{pow10, to_base_units, BaseToken, ReserveSnapshot, TokenInfo};

/// A slippage quote together with the pair it was priced against.
#[derive(Debug, Clone, Serialize)]
pub struct SlippageReport {
    pub token: Address,
    pub counter_token: Address,
    pub quote: SlippageQuote,
}

/// Current price and market capitalization of a token, in counter-token
/// units.
#[derive(Debug, Clone, Serialize)]
pub struct MarketCapInfo {
    pub token: TokenInfo,
    pub counter_token: Address,
    /// Pool price of one whole token.
    pub price: Decimal,
    /// Adjusted supply times price.
    pub market_cap: Decimal,
    pub reserves: ReserveSnapshot,
}

pub struct PoolAnalyzer<G> {
    gateway: CachedGateway<G>,
    resolver: PairResolver,
    monitor: PoolMonitor,
    fee: FeeSchedule,
    wrapped_native: Address,
    market_cap_percentages: Vec<Decimal>,
}

impl<G: DataGateway> PoolAnalyzer<G> {
    pub fn new(gateway: G, config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        Ok(Self {
            gateway: CachedGateway::new(gateway, &config.cache_ttls),
            resolver: PairResolver::new(config.base_tokens.clone()),
            monitor: PoolMonitor::new(config.liquidity_alert_threshold),
            fee: FeeSchedule::new(config.fee_numerator, config.fee_denominator)?,
            wrapped_native: config.wrapped_native,
            market_cap_percentages: config.market_cap_percentages.clone(),
        })
    }

    /// Quote the slippage of selling `amount_in` base units of `token_in`.
    pub async fn quote_slippage(
        &self,
        token_in: Address,
        amount_in: U256,
        counter_token: Option<Address>,
    ) -> Result<SlippageReport, AnalyzerError> {
        let counter = self.resolve_counter(token_in, counter_token).await?;
        let (_, reserve_in, reserve_out) =
            self.oriented_reserves(token_in, counter, false).await?;
        let quote = slippage::quote(reserve_in, reserve_out, amount_in, self.fee)?;
        Ok(SlippageReport {
            token: token_in,
            counter_token: counter,
            quote,
        })
    }

    /// Simulate selling the given market-cap percentages of `token_in`.
    /// Falls back to the configured percentage set when none are supplied.
    pub async fn price_impact(
        &self,
        token_in: Address,
        percentages: Option<&[Decimal]>,
        counter_token: Option<Address>,
    ) -> Result<ImpactReport, AnalyzerError> {
        let counter = self.resolve_counter(token_in, counter_token).await?;
        let (token, base, (_, reserve_a, reserve_b)) = futures::try_join!(
            self.gateway.token_info(token_in),
            self.gateway.token_info(counter),
            self.oriented_reserves(token_in, counter, false),
        )?;
        let price = pool_price(reserve_a, reserve_b, token.decimals, base.decimals)?;
        let percentages = percentages.unwrap_or(&self.market_cap_percentages);
        impact::analyze(&token, price, percentages, reserve_a, reserve_b, self.fee)
    }

    /// Quote a list of whole-token sell amounts, in order, isolating
    /// per-entry failures.
    pub async fn batch_slippage(
        &self,
        token_in: Address,
        amounts: &[Decimal],
        counter_token: Option<Address>,
    ) -> Result<BatchReport, AnalyzerError> {
        let counter = self.resolve_counter(token_in, counter_token).await?;
        let token = self.gateway.token_info(token_in).await?;
        let mut entries = Vec::with_capacity(amounts.len());
        for &amount in amounts {
            let outcome = match self.batch_entry(token_in, counter, &token, amount).await {
                Ok(outcome) => outcome,
                Err(e) => BatchOutcome::Failed {
                    error: e.to_string(),
                },
            };
            entries.push(BatchEntry { amount, outcome });
        }
        Ok(batch::summarize(token, entries))
    }

    /// Poll the pool for `token_in`, reporting reserve-ratio drift since
    /// the previous poll of the same pair.
    pub async fn poll_pool(
        &self,
        token_in: Address,
        counter_token: Option<Address>,
    ) -> Result<MonitorResult, AnalyzerError> {
        let counter = self.resolve_counter(token_in, counter_token).await?;
        let (token, base) = futures::try_join!(
            self.gateway.token_info(token_in),
            self.gateway.token_info(counter),
        )?;
        let (snapshot, reserve_a, reserve_b) =
            self.oriented_reserves(token_in, counter, true).await?;
        let observed_at = Utc::now();
        let outcome = self
            .monitor
            .observe(token_in, counter, reserve_a, reserve_b, observed_at)?;
        let pair_name = format!("{}/{}", token.symbol, base.symbol);
        if let MonitorOutcome::Observed {
            significant: true,
            ratio_change_percentage,
            ..
        } = &outcome
        {
            info!(
                pair = %pair_name,
                change = %ratio_change_percentage,
                "significant liquidity shift detected"
            );
        }
        Ok(MonitorResult {
            token: token_in,
            token_symbol: token.symbol,
            base_token: counter,
            base_token_symbol: base.symbol,
            pair_name,
            observed_at,
            block_timestamp: snapshot.block_timestamp,
            reserve_a,
            reserve_b,
            outcome,
        })
    }

    /// Current price and market capitalization of `token_in`.
    pub async fn market_cap_info(
        &self,
        token_in: Address,
        counter_token: Option<Address>,
    ) -> Result<MarketCapInfo, AnalyzerError> {
        let counter = self.resolve_counter(token_in, counter_token).await?;
        let (token, base, (snapshot, reserve_a, reserve_b)) = futures::try_join!(
            self.gateway.token_info(token_in),
            self.gateway.token_info(counter),
            self.oriented_reserves(token_in, counter, false),
        )?;
        let price = pool_price(reserve_a, reserve_b, token.decimals, base.decimals)?;
        let market_cap = token
            .total_supply_tokens()?
            .checked_mul(price)
            .ok_or(AnalyzerError::Overflow("market capitalization"))?;
        Ok(MarketCapInfo {
            token,
            counter_token: counter,
            price,
            market_cap,
            reserves: snapshot,
        })
    }

    /// Cached ERC-20 metadata lookup.
    pub async fn token_info(&self, token: Address) -> Result<TokenInfo, AnalyzerError> {
        self.gateway.token_info(token).await
    }

    /// Base tokens that form a pool with `token`, in priority order.
    pub async fn suggest_pairs(&self, token: Address) -> Result<Vec<BaseToken>, AnalyzerError> {
        self.resolver
            .suggest_alternative_pairs(&self.gateway, token)
            .await
    }

    pub fn clear_cache(&self) {
        self.gateway.clear_cache();
        info!("cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.gateway.cache_stats()
    }

    /// Pick the counter-token: an explicit one wins unless it equals the
    /// input token; otherwise the wrapped native asset, falling back to
    /// the resolver when the input token is the wrapped native asset
    /// itself.
    async fn resolve_counter(
        &self,
        token: Address,
        counter: Option<Address>,
    ) -> Result<Address, AnalyzerError> {
        let counter = counter.unwrap_or(self.wrapped_native);
        if counter != token {
            return Ok(counter);
        }
        match self.resolver.find_best_base_pair(&self.gateway, token).await? {
            Some(base) => {
                info!(token = %token, base = %base.symbol, "auto-selected counter token");
                Ok(base.address)
            }
            None => Err(AnalyzerError::PairNotFound {
                token,
                base: counter,
                suggestions: vec![],
            }),
        }
    }

    /// Pair lookup plus a reserve snapshot oriented to `token`. `live`
    /// bypasses the reserve cache.
    async fn oriented_reserves(
        &self,
        token: Address,
        counter: Address,
        live: bool,
    ) -> Result<(ReserveSnapshot, U256, U256), AnalyzerError> {
        let Some(pair) = self.gateway.pair_address(token, counter).await? else {
            let suggestions = self
                .resolver
                .suggest_alternative_pairs(&self.gateway, token)
                .await?;
            return Err(AnalyzerError::PairNotFound {
                token,
                base: counter,
                suggestions,
            });
        };
        let snapshot = if live {
            self.gateway.live_reserves(pair).await?
        } else {
            self.gateway.reserves(pair).await?
        };
        let (reserve_a, reserve_b) = snapshot.oriented(token);
        Ok((snapshot, reserve_a, reserve_b))
    }

    async fn batch_entry(
        &self,
        token_in: Address,
        counter: Address,
        token: &TokenInfo,
        amount: Decimal,
    ) -> Result<BatchOutcome, AnalyzerError> {
        let base_units = to_base_units(amount, token.decimals)?;
        let (_, reserve_in, reserve_out) =
            self.oriented_reserves(token_in, counter, false).await?;
        let quote = slippage::quote(reserve_in, reserve_out, base_units, self.fee)?;
        Ok(BatchOutcome::Quoted {
            slippage_percentage: quote.slippage_percentage,
            actual_amount_out: quote.actual_amount_out,
        })
    }
}

/// Price of one whole unit of token A in whole units of token B, adjusted
/// for the decimals of both sides.
fn pool_price(
    reserve_a: U256,
    reserve_b: U256,
    decimals_a: u8,
    decimals_b: u8,
) -> Result<Decimal, AnalyzerError> {
    let pow_a = pow10(u32::from(decimals_a)).ok_or(AnalyzerError::Overflow("price scale"))?;
    let pow_b = pow10(u32::from(decimals_b)).ok_or(AnalyzerError::Overflow("price scale"))?;
    let num = reserve_b
        .checked_mul(pow_a)
        .ok_or(AnalyzerError::Overflow("pool price numerator"))?;
    let den = reserve_a
        .checked_mul(pow_b)
        .ok_or(AnalyzerError::Overflow("pool price denominator"))?;
    ratio_to_decimal(num, den).ok_or(AnalyzerError::Overflow("pool price"))
}
