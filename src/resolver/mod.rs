//! Counter-token fallback search.
//!
//! When a caller does not name a counter-token, a usable one is picked
//! from a fixed, priority-ordered list of well-known base tokens by
//! probing pair existence through the data gateway.

use alloy::primitives::Address;
use tracing::debug;

use crate::error::AnalyzerError;
use crate::gateway::DataGateway;
use crate::types::BaseToken;

pub struct PairResolver {
    base_tokens: Vec<BaseToken>,
}

impl PairResolver {
    /// `base_tokens` in priority order: the wrapped native asset first,
    /// then the major stablecoins.
    pub fn new(base_tokens: Vec<BaseToken>) -> Self {
        Self { base_tokens }
    }

    pub fn base_tokens(&self) -> &[BaseToken] {
        &self.base_tokens
    }

    /// First base token that forms a pool with `token`, skipping `token`
    /// itself. First match wins, so the same gateway answers always pick
    /// the same base token.
    pub async fn find_best_base_pair<G: DataGateway>(
        &self,
        gateway: &G,
        token: Address,
    ) -> Result<Option<BaseToken>, AnalyzerError> {
        for base in self.candidates(token) {
            if gateway.pair_address(token, base.address).await?.is_some() {
                debug!(token = %token, base = %base.symbol, "base pair found");
                return Ok(Some(base.clone()));
            }
        }
        Ok(None)
    }

    /// Every base token that forms a pool with `token`, in priority order.
    /// Used to suggest alternatives when a requested pair does not exist.
    pub async fn suggest_alternative_pairs<G: DataGateway>(
        &self,
        gateway: &G,
        token: Address,
    ) -> Result<Vec<BaseToken>, AnalyzerError> {
        let mut matches = Vec::new();
        for base in self.candidates(token) {
            if gateway.pair_address(token, base.address).await?.is_some() {
                matches.push(base.clone());
            }
        }
        Ok(matches)
    }

    fn candidates(&self, token: Address) -> impl Iterator<Item = &BaseToken> {
        self.base_tokens.iter().filter(move |b| b.address != token)
    }
}
