use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

/// ERC-20 metadata snapshot. Immutable once fetched; cached for five minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
}

impl TokenInfo {
    /// Total supply in whole tokens.
    pub fn total_supply_tokens(&self) -> Result<Decimal, AnalyzerError> {
        from_base_units(self.total_supply, self.decimals).ok_or_else(|| {
            AnalyzerError::InvalidInput(format!(
                "total supply of {} is outside the representable range",
                self.symbol
            ))
        })
    }
}

/// Well-known high-liquidity counter-token used to price arbitrary tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseToken {
    pub address: Address,
    pub symbol: String,
}

/// Point-in-time pair reserves. Reserves are volatile: a snapshot must never
/// be reused across polling cycles without a re-fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveSnapshot {
    pub pair_address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub block_timestamp: u32,
}

impl ReserveSnapshot {
    /// Reserves reordered so the first element belongs to `token_a`.
    pub fn oriented(&self, token_a: Address) -> (U256, U256) {
        if token_a == self.token0 {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }
}

/// 10^exp as U256, `None` once the power no longer fits 256 bits.
pub(crate) fn pow10(exp: u32) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(exp))
}

/// Convert a whole-token amount into integer base units, flooring.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, AnalyzerError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(AnalyzerError::InvalidInput(format!(
            "amount must be positive, got {amount}"
        )));
    }
    let mantissa = u128::try_from(amount.mantissa())
        .map_err(|_| AnalyzerError::InvalidInput(format!("amount {amount} is not representable")))?;
    let mantissa = U256::from(mantissa);
    let scale = amount.scale();
    let decimals = u32::from(decimals);
    if decimals >= scale {
        let pow = pow10(decimals - scale).ok_or(AnalyzerError::Overflow("base-unit scale"))?;
        mantissa
            .checked_mul(pow)
            .ok_or(AnalyzerError::Overflow("base-unit conversion"))
    } else {
        let pow = pow10(scale - decimals).ok_or(AnalyzerError::Overflow("base-unit scale"))?;
        Ok(mantissa / pow)
    }
}

/// Base units back to a whole-token decimal, truncated to the precision
/// `Decimal` can carry.
pub fn from_base_units(amount: U256, decimals: u8) -> Option<Decimal> {
    crate::ratio::ratio_to_decimal(amount, pow10(u32::from(decimals))?)
}
