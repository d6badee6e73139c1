use alloy::primitives::Address;
use thiserror::Error;

use crate::types::BaseToken;

/// Failure kinds for the analytics engine.
///
/// Every fallible operation returns this enum so callers can branch on the
/// kind instead of matching message strings. All variants are recoverable
/// at the caller boundary; nothing here terminates the process.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The caller supplied an amount or percentage outside the accepted range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A reserve is empty or the trade denominator degenerated to zero.
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(String),

    /// No pool exists for the resolved token pair. `suggestions` lists base
    /// tokens that do form a pool with `token`, in priority order.
    #[error("no liquidity pool for {token}/{base}")]
    PairNotFound {
        token: Address,
        base: Address,
        suggestions: Vec<BaseToken>,
    },

    /// The data gateway failed. The message carries provider detail; the
    /// kind itself stays opaque to the engine.
    #[error("upstream data source unavailable: {0}")]
    Upstream(String),

    /// Checked U256 arithmetic overflowed while computing the named value.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// A computed quote failed its own consistency checks. This signals a
    /// defect, never legitimate output.
    #[error("quote violates invariant: {0}")]
    InvariantViolation(&'static str),
}
