//! Read-only access to on-chain pool data.
//!
//! The engine consumes token metadata, pair addresses and reserve
//! snapshots through the narrow [`DataGateway`] trait. [`OnchainGateway`]
//! reads PancakeSwap V2 contracts over an alloy provider;
//! [`CachedGateway`] layers the per-category TTL cache on top of any
//! gateway.

use std::future::IntoFuture;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol;
use async_trait::async_trait;
use tracing::debug;

use crate::cache::{pair_key, reserves_key, token_key, AnalyzerCache, CacheStats, CacheTtls};
use crate::error::AnalyzerError;
use crate::types::{ReserveSnapshot, TokenInfo};

sol! {
    #[sol(rpc)]
    interface IPancakeFactory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

sol! {
    #[sol(rpc)]
    interface IPancakePair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IErc20Metadata {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
    }
}

/// The narrow read interface the engine depends on.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// ERC-20 metadata for `token`.
    async fn token_info(&self, token: Address) -> Result<TokenInfo, AnalyzerError>;

    /// Pool address for the pair, or `None` when the factory reports none.
    async fn pair_address(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, AnalyzerError>;

    /// Reserve snapshot for `pair`.
    async fn reserves(&self, pair: Address) -> Result<ReserveSnapshot, AnalyzerError>;
}

fn upstream(context: &str, err: impl std::fmt::Display) -> AnalyzerError {
    AnalyzerError::Upstream(format!("{context}: {err}"))
}

/// Direct contract reads over an alloy provider.
#[derive(Clone)]
pub struct OnchainGateway<P> {
    provider: P,
    factory: Address,
}

impl<P: Provider + Clone + Send + Sync + 'static> OnchainGateway<P> {
    pub fn new(provider: P, factory: Address) -> Self {
        Self { provider, factory }
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> DataGateway for OnchainGateway<P> {
    async fn token_info(&self, token: Address) -> Result<TokenInfo, AnalyzerError> {
        let erc20 = IErc20Metadata::new(token, self.provider.clone());
        let name_call = erc20.name();
        let symbol_call = erc20.symbol();
        let decimals_call = erc20.decimals();
        let total_supply_call = erc20.totalSupply();
        let (name, symbol, decimals, total_supply) = futures::try_join!(
            name_call.call().into_future(),
            symbol_call.call().into_future(),
            decimals_call.call().into_future(),
            total_supply_call.call().into_future(),
        )
        .map_err(|e| upstream("token metadata", e))?;
        Ok(TokenInfo {
            address: token,
            name,
            symbol,
            decimals,
            total_supply,
        })
    }

    async fn pair_address(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, AnalyzerError> {
        let factory = IPancakeFactory::new(self.factory, self.provider.clone());
        let pair = factory
            .getPair(token_a, token_b)
            .call()
            .await
            .map_err(|e| upstream("factory getPair", e))?;
        Ok((pair != Address::ZERO).then_some(pair))
    }

    async fn reserves(&self, pair: Address) -> Result<ReserveSnapshot, AnalyzerError> {
        let contract = IPancakePair::new(pair, self.provider.clone());
        let reserves_call = contract.getReserves();
        let token0_call = contract.token0();
        let token1_call = contract.token1();
        let (reserves, token0, token1) = futures::try_join!(
            reserves_call.call().into_future(),
            token0_call.call().into_future(),
            token1_call.call().into_future(),
        )
        .map_err(|e| upstream("pair reserves", e))?;
        Ok(ReserveSnapshot {
            pair_address: pair,
            token0,
            token1,
            reserve0: U256::from(reserves.reserve0.to::<u128>()),
            reserve1: U256::from(reserves.reserve1.to::<u128>()),
            block_timestamp: reserves.blockTimestampLast,
        })
    }
}

/// Gateway wrapper serving reads from the TTL cache.
///
/// Token metadata is keyed by the lower-cased address, pair addresses by
/// the unordered pair, reserves by the pool address. Absent pairs are never
/// cached: a pool can be created at any time, so the not-found case is
/// always re-verified live.
pub struct CachedGateway<G> {
    inner: G,
    cache: AnalyzerCache,
}

impl<G: DataGateway> CachedGateway<G> {
    pub fn new(inner: G, ttls: &CacheTtls) -> Self {
        Self {
            inner,
            cache: AnalyzerCache::new(ttls),
        }
    }

    /// Bypass the reserve cache. The pool monitor needs live reserves for
    /// drift detection to mean anything; the fresh snapshot still lands in
    /// the cache for ordinary readers.
    pub async fn live_reserves(&self, pair: Address) -> Result<ReserveSnapshot, AnalyzerError> {
        let snapshot = self.inner.reserves(pair).await?;
        self.cache
            .reserves
            .insert(reserves_key(pair), snapshot.clone());
        Ok(snapshot)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[async_trait]
impl<G: DataGateway> DataGateway for CachedGateway<G> {
    async fn token_info(&self, token: Address) -> Result<TokenInfo, AnalyzerError> {
        let key = token_key(token);
        if let Some(hit) = self.cache.token_info.get(&key) {
            debug!(%token, "token info served from cache");
            return Ok(hit);
        }
        let info = self.inner.token_info(token).await?;
        self.cache.token_info.insert(key, info.clone());
        Ok(info)
    }

    async fn pair_address(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, AnalyzerError> {
        let key = pair_key(token_a, token_b);
        if let Some(hit) = self.cache.pair_address.get(&key) {
            return Ok(Some(hit));
        }
        match self.inner.pair_address(token_a, token_b).await? {
            Some(pair) => {
                self.cache.pair_address.insert(key, pair);
                Ok(Some(pair))
            }
            None => Ok(None),
        }
    }

    async fn reserves(&self, pair: Address) -> Result<ReserveSnapshot, AnalyzerError> {
        if let Some(hit) = self.cache.reserves.get(&reserves_key(pair)) {
            return Ok(hit);
        }
        self.live_reserves(pair).await
    }
}
