//! Constant-product trade simulation.
//!
//! [`quote`] is a pure function over a reserve snapshot: it prices a
//! hypothetical sell against the x*y=k curve with a proportional fee and
//! reports the shortfall versus the fee-only baseline. All arithmetic is
//! checked U256; `Decimal` fields are derived by exact scaled division.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::error::AnalyzerError;
use crate::ratio::{percentage, ratio_to_decimal, signed_change_percentage};

/// PancakeSwap V2 keeps 99.75% of the input: a 0.25% fee.
pub const DEFAULT_FEE_NUMERATOR: u64 = 9_975;
pub const DEFAULT_FEE_DENOMINATOR: u64 = 10_000;

/// Proportional fee retained by the pool, as the rational
/// `numerator / denominator` kept of every input amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeSchedule {
    numerator: u64,
    denominator: u64,
}

impl FeeSchedule {
    /// Fails unless `0 < numerator <= denominator`.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, AnalyzerError> {
        if denominator == 0 || numerator == 0 || numerator > denominator {
            return Err(AnalyzerError::InvalidInput(format!(
                "fee {numerator}/{denominator} is not a rate in (0, 1]"
            )));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            numerator: DEFAULT_FEE_NUMERATOR,
            denominator: DEFAULT_FEE_DENOMINATOR,
        }
    }
}

/// Outcome of simulating a sell of `amount_in` against the pool.
///
/// Recomputed on every call and never cached: reserves are volatile.
#[derive(Debug, Clone, Serialize)]
pub struct SlippageQuote {
    pub amount_in: U256,
    /// Fee-adjusted output at the pre-trade rate, ignoring curve movement.
    pub theoretical_amount_out: U256,
    /// Output the constant-product curve actually yields.
    pub actual_amount_out: U256,
    pub pre_trading_rate: Decimal,
    /// Average execution rate, `actual_amount_out / amount_in`.
    pub effective_rate: Decimal,
    pub post_trading_rate: Decimal,
    /// Shortfall of actual vs theoretical output, in percent. This is the
    /// price impact of the trade.
    pub slippage_percentage: Decimal,
    /// Signed move of the pool rate caused by the trade, in percent.
    pub rate_change_percentage: Decimal,
    pub reserve_in_before: U256,
    pub reserve_out_before: U256,
    pub reserve_in_after: U256,
    pub reserve_out_after: U256,
    pub k_before: U256,
    pub k_after: U256,
    /// Set when `amount_in` is at least half the input reserve. Advisory:
    /// the quote is still returned.
    pub high_impact: bool,
}

/// Price a hypothetical sell of `amount_in` (base units of the input token)
/// against a pool holding `reserve_in` / `reserve_out`.
pub fn quote(
    reserve_in: U256,
    reserve_out: U256,
    amount_in: U256,
    fee: FeeSchedule,
) -> Result<SlippageQuote, AnalyzerError> {
    if amount_in.is_zero() {
        return Err(AnalyzerError::InvalidInput(
            "amount in must be positive".into(),
        ));
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(AnalyzerError::InsufficientLiquidity(format!(
            "pool reserves {reserve_in}/{reserve_out} cannot price a trade"
        )));
    }

    let fee_num = U256::from(fee.numerator());
    let fee_den = U256::from(fee.denominator());

    let amount_in_with_fee = amount_in
        .checked_mul(fee_num)
        .ok_or(AnalyzerError::Overflow("amount in with fee"))?;
    let denominator = reserve_in
        .checked_mul(fee_den)
        .and_then(|v| v.checked_add(amount_in_with_fee))
        .ok_or(AnalyzerError::Overflow("trade denominator"))?;
    if denominator.is_zero() {
        return Err(AnalyzerError::InsufficientLiquidity(
            "degenerate trade denominator".into(),
        ));
    }
    let actual_amount_out = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or(AnalyzerError::Overflow("curve output numerator"))?
        / denominator;

    // Fee-only baseline at the pre-trade rate: amount_in * (r_out / r_in) * fee.
    let theoretical_amount_out = amount_in
        .checked_mul(reserve_out)
        .and_then(|v| v.checked_mul(fee_num))
        .ok_or(AnalyzerError::Overflow("baseline output numerator"))?
        / reserve_in
            .checked_mul(fee_den)
            .ok_or(AnalyzerError::Overflow("baseline output denominator"))?;

    if actual_amount_out > theoretical_amount_out {
        return Err(AnalyzerError::InvariantViolation(
            "curve output exceeds the fee-only baseline",
        ));
    }

    let reserve_in_after = reserve_in
        .checked_add(amount_in)
        .ok_or(AnalyzerError::Overflow("post-trade input reserve"))?;
    let reserve_out_after = reserve_out
        .checked_sub(actual_amount_out)
        .ok_or(AnalyzerError::InvariantViolation(
            "curve output exceeds the output reserve",
        ))?;

    let k_before = reserve_in
        .checked_mul(reserve_out)
        .ok_or(AnalyzerError::Overflow("constant product before trade"))?;
    let k_after = reserve_in_after
        .checked_mul(reserve_out_after)
        .ok_or(AnalyzerError::Overflow("constant product after trade"))?;
    if k_after < k_before {
        return Err(AnalyzerError::InvariantViolation("constant product shrank"));
    }

    // Rate sanity, checked by cross-multiplication: the average execution
    // rate and the post-trade marginal rate can never beat the pre-trade
    // spot rate.
    let pre_ordering_holds = cross_le(actual_amount_out, amount_in, reserve_out, reserve_in)?
        && cross_le(reserve_out_after, reserve_in_after, reserve_out, reserve_in)?;
    if !pre_ordering_holds {
        return Err(AnalyzerError::InvariantViolation(
            "trade rate exceeds the pre-trade spot rate",
        ));
    }

    let slippage_percentage = if theoretical_amount_out.is_zero() {
        Decimal::ZERO
    } else {
        percentage(
            theoretical_amount_out - actual_amount_out,
            theoretical_amount_out,
        )
        .ok_or(AnalyzerError::Overflow("slippage percentage"))?
    };

    let rate_change_percentage = signed_change_percentage(
        reserve_out,
        reserve_in,
        reserve_out_after,
        reserve_in_after,
    )
    .ok_or(AnalyzerError::Overflow("rate change percentage"))?;

    let pre_trading_rate =
        ratio_to_decimal(reserve_out, reserve_in).ok_or(AnalyzerError::Overflow("pre rate"))?;
    let effective_rate = ratio_to_decimal(actual_amount_out, amount_in)
        .ok_or(AnalyzerError::Overflow("effective rate"))?;
    let post_trading_rate = ratio_to_decimal(reserve_out_after, reserve_in_after)
        .ok_or(AnalyzerError::Overflow("post rate"))?;

    let high_impact = amount_in
        .checked_mul(U256::from(2u8))
        .is_none_or(|double| double >= reserve_in);
    if high_impact {
        warn!(
            %amount_in,
            %reserve_in,
            "trade consumes at least half the input reserve; quote is high impact"
        );
    }

    Ok(SlippageQuote {
        amount_in,
        theoretical_amount_out,
        actual_amount_out,
        pre_trading_rate,
        effective_rate,
        post_trading_rate,
        slippage_percentage,
        rate_change_percentage,
        reserve_in_before: reserve_in,
        reserve_out_before: reserve_out,
        reserve_in_after,
        reserve_out_after,
        k_before,
        k_after,
        high_impact,
    })
}

/// `a/b <= c/d` without dividing.
fn cross_le(a: U256, b: U256, c: U256, d: U256) -> Result<bool, AnalyzerError> {
    let lhs = a
        .checked_mul(d)
        .ok_or(AnalyzerError::Overflow("rate comparison"))?;
    let rhs = c
        .checked_mul(b)
        .ok_or(AnalyzerError::Overflow("rate comparison"))?;
    Ok(lhs <= rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn reference_scenario_is_exact() {
        // reserves 1_000_000 / 2_000_000, sell 10_000, fee 9975/10000.
        // amount_in_with_fee = 99_750_000
        // actual  = 99_750_000 * 2_000_000 / (10_000_000_000 + 99_750_000) = 19_752
        // theoretical = 10_000 * 2_000_000 * 9_975 / 10_000_000_000 = 19_950
        // slippage = 198 / 19_950 * 100 = 0.992481...%
        let q = quote(u(1_000_000), u(2_000_000), u(10_000), FeeSchedule::default()).unwrap();
        assert_eq!(q.actual_amount_out, u(19_752));
        assert_eq!(q.theoretical_amount_out, u(19_950));
        assert_eq!(q.slippage_percentage, dec!(0.992481));
        assert_eq!(q.pre_trading_rate, dec!(2));
        assert_eq!(q.reserve_in_after, u(1_010_000));
        assert_eq!(q.reserve_out_after, u(1_980_248));
        assert!(!q.high_impact);
        assert!(q.rate_change_percentage < Decimal::ZERO);
    }

    #[test]
    fn zero_amount_is_invalid_input() {
        assert!(matches!(
            quote(u(1_000), u(1_000), U256::ZERO, FeeSchedule::default()),
            Err(AnalyzerError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_reserves_are_insufficient_liquidity() {
        assert!(matches!(
            quote(U256::ZERO, u(1_000), u(10), FeeSchedule::default()),
            Err(AnalyzerError::InsufficientLiquidity(_))
        ));
        assert!(matches!(
            quote(u(1_000), U256::ZERO, u(10), FeeSchedule::default()),
            Err(AnalyzerError::InsufficientLiquidity(_))
        ));
    }

    #[test]
    fn fee_schedule_rejects_degenerate_rates() {
        assert!(FeeSchedule::new(0, 10_000).is_err());
        assert!(FeeSchedule::new(10_000, 0).is_err());
        assert!(FeeSchedule::new(10_001, 10_000).is_err());
        assert!(FeeSchedule::new(10_000, 10_000).is_ok());
    }

    #[test]
    fn half_reserve_trade_is_flagged_high_impact() {
        let q = quote(u(1_000), u(1_000), u(500), FeeSchedule::default()).unwrap();
        assert!(q.high_impact);
        let q = quote(u(1_000), u(1_000), u(499), FeeSchedule::default()).unwrap();
        assert!(!q.high_impact);
    }

    #[test]
    fn output_and_constant_product_invariants_hold() {
        for (r_in, r_out, amount) in [
            (1_000u64, 1_000u64, 1u64),
            (1_000, 1_000, 999),
            (1_000_000, 3, 500_000),
            (5, 2_000_000, 4),
            (u64::MAX, u64::MAX, u64::MAX / 2),
        ] {
            let q = quote(u(r_in), u(r_out), u(amount), FeeSchedule::default()).unwrap();
            assert!(q.actual_amount_out <= q.theoretical_amount_out);
            assert!(q.k_after >= q.k_before);
            assert!(q.effective_rate <= q.pre_trading_rate);
            assert!(q.post_trading_rate <= q.pre_trading_rate);
        }
    }

    #[test]
    fn effective_rate_stays_below_post_rate_for_small_trades() {
        // Holds while amount * fee <= reserve_in * (1 - fee); beyond that the
        // average execution rate overtakes the post-trade marginal rate.
        let q = quote(u(1_000_000), u(2_000_000), u(100), FeeSchedule::default()).unwrap();
        assert!(q.effective_rate <= q.post_trading_rate);
    }
}
