//! Market-cap sell simulation and risk classification.
//!
//! For each requested percentage of market capitalization, derives the
//! token amount such a sell represents, prices it through the slippage
//! engine and classifies the resulting impact.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::error::AnalyzerError;
use crate::slippage::{self, FeeSchedule};
use crate::types::{from_base_units, pow10, TokenInfo};

/// Four-tier classification shared by per-entry risk and the aggregate
/// liquidity assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskLevel {
    /// Tier for a price-impact percentage: below 1 low, below 3 moderate,
    /// below 10 high, anything else extreme.
    pub fn for_impact(impact: Decimal) -> Self {
        if impact < Decimal::ONE {
            Self::Low
        } else if impact < Decimal::from(3) {
            Self::Moderate
        } else if impact < Decimal::from(10) {
            Self::High
        } else {
            Self::Extreme
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low risk"),
            Self::Moderate => write!(f, "moderate risk"),
            Self::High => write!(f, "high risk"),
            Self::Extreme => write!(f, "extreme risk"),
        }
    }
}

/// Per-entry guidance, derived from the same thresholds as [`RiskLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    SafeToTrade,
    SplitIntoBatches,
    ReduceAmount,
    DoNotTrade,
}

impl Recommendation {
    pub fn for_impact(impact: Decimal) -> Self {
        match RiskLevel::for_impact(impact) {
            RiskLevel::Low => Self::SafeToTrade,
            RiskLevel::Moderate => Self::SplitIntoBatches,
            RiskLevel::High => Self::ReduceAmount,
            RiskLevel::Extreme => Self::DoNotTrade,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SafeToTrade => write!(f, "safe to trade"),
            Self::SplitIntoBatches => write!(f, "split the order into batches"),
            Self::ReduceAmount => write!(f, "trade cautiously and consider a smaller amount"),
            Self::DoNotTrade => write!(f, "do not trade, the impact is too large"),
        }
    }
}

/// Result for a single market-cap percentage.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactEntry {
    pub market_cap_percentage: Decimal,
    pub outcome: ImpactOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImpactOutcome {
    /// The sell amount floored below one base unit; no quote was attempted.
    AmountTooSmall,
    Quoted {
        /// Sell amount in base units.
        sell_amount: U256,
        /// Sell value in counter-token units.
        sell_value: Decimal,
        price_impact: Decimal,
        actual_amount_out: U256,
        risk_level: RiskLevel,
        recommendation: Recommendation,
    },
    /// The quote failed; the failure is captured here and does not abort
    /// the remaining percentages.
    Failed { error: String },
}

/// Aggregate view over the quoted entries.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactAnalysis {
    /// Largest percentage whose impact stayed under 3%, if any did.
    pub max_safe_percentage: Option<Decimal>,
    pub average_impact: Decimal,
    pub highest_impact: Decimal,
    pub liquidity_assessment: RiskLevel,
    pub overall: OverallRecommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallRecommendation {
    SuitableForNormalTrading,
    TradeInBatches,
    Caution,
}

impl fmt::Display for OverallRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuitableForNormalTrading => {
                write!(f, "liquidity is good, suitable for normal trading")
            }
            Self::TradeInBatches => write!(f, "medium liquidity, trade in batches"),
            Self::Caution => write!(
                f,
                "poor liquidity, trade with caution or seek an alternative pair"
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub token: TokenInfo,
    /// Pool price of one whole token, in counter-token units.
    pub current_price: Decimal,
    /// Adjusted supply times price, in counter-token units.
    pub market_cap: Decimal,
    pub entries: Vec<ImpactEntry>,
    /// Absent when no percentage produced a quote.
    pub analysis: Option<ImpactAnalysis>,
}

/// Simulate selling the given market-cap percentages of `token` against a
/// pool holding `reserve_in` / `reserve_out` (oriented to the token).
pub fn analyze(
    token: &TokenInfo,
    current_price: Decimal,
    percentages: &[Decimal],
    reserve_in: U256,
    reserve_out: U256,
    fee: FeeSchedule,
) -> Result<ImpactReport, AnalyzerError> {
    let supply_tokens = token.total_supply_tokens()?;
    let market_cap = supply_tokens
        .checked_mul(current_price)
        .ok_or(AnalyzerError::Overflow("market capitalization"))?;

    let entries: Vec<ImpactEntry> = percentages
        .iter()
        .map(|&pct| ImpactEntry {
            market_cap_percentage: pct,
            outcome: entry_outcome(token, current_price, pct, reserve_in, reserve_out, fee),
        })
        .collect();
    let analysis = analyze_entries(&entries);

    Ok(ImpactReport {
        token: token.clone(),
        current_price,
        market_cap,
        entries,
        analysis,
    })
}

fn entry_outcome(
    token: &TokenInfo,
    price: Decimal,
    pct: Decimal,
    reserve_in: U256,
    reserve_out: U256,
    fee: FeeSchedule,
) -> ImpactOutcome {
    match quote_percentage(token, price, pct, reserve_in, reserve_out, fee) {
        Ok(outcome) => outcome,
        Err(e) => ImpactOutcome::Failed {
            error: e.to_string(),
        },
    }
}

fn quote_percentage(
    token: &TokenInfo,
    price: Decimal,
    pct: Decimal,
    reserve_in: U256,
    reserve_out: U256,
    fee: FeeSchedule,
) -> Result<ImpactOutcome, AnalyzerError> {
    if pct <= Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(AnalyzerError::InvalidInput(format!(
            "market-cap percentage {pct} is outside (0, 100]"
        )));
    }
    // Selling p% of the market cap is selling p% of the supply: the price
    // cancels out of value / price, so the amount is derived exactly.
    let sell_amount = percent_of_supply(token.total_supply, pct)?;
    if sell_amount.is_zero() {
        return Ok(ImpactOutcome::AmountTooSmall);
    }

    let q = slippage::quote(reserve_in, reserve_out, sell_amount, fee)?;
    let sell_tokens = from_base_units(sell_amount, token.decimals)
        .ok_or(AnalyzerError::Overflow("sell amount in tokens"))?;
    let sell_value = sell_tokens
        .checked_mul(price)
        .ok_or(AnalyzerError::Overflow("sell value"))?;
    let impact = q.slippage_percentage;

    Ok(ImpactOutcome::Quoted {
        sell_amount,
        sell_value,
        price_impact: impact,
        actual_amount_out: q.actual_amount_out,
        risk_level: RiskLevel::for_impact(impact),
        recommendation: Recommendation::for_impact(impact),
    })
}

/// `supply * pct / 100`, floored to base units.
fn percent_of_supply(supply: U256, pct: Decimal) -> Result<U256, AnalyzerError> {
    let mantissa = u128::try_from(pct.mantissa())
        .map_err(|_| AnalyzerError::InvalidInput(format!("percentage {pct} is not representable")))?;
    let scale_pow = pow10(pct.scale()).ok_or(AnalyzerError::Overflow("percentage scale"))?;
    let denominator = scale_pow
        .checked_mul(U256::from(100u8))
        .ok_or(AnalyzerError::Overflow("percentage scale"))?;
    supply
        .checked_mul(U256::from(mantissa))
        .ok_or(AnalyzerError::Overflow("sell amount"))
        .map(|v| v / denominator)
}

fn analyze_entries(entries: &[ImpactEntry]) -> Option<ImpactAnalysis> {
    let quoted: Vec<(Decimal, Decimal)> = entries
        .iter()
        .filter_map(|e| match &e.outcome {
            ImpactOutcome::Quoted { price_impact, .. } => {
                Some((e.market_cap_percentage, *price_impact))
            }
            _ => None,
        })
        .collect();
    if quoted.is_empty() {
        return None;
    }

    let total = quoted.len();
    let three = Decimal::from(3);
    let ten = Decimal::from(10);
    let safe = quoted.iter().filter(|(_, i)| *i < three).count();
    let moderate = quoted
        .iter()
        .filter(|(_, i)| *i >= three && *i < ten)
        .count();

    let max_safe_percentage = quoted
        .iter()
        .filter(|(_, i)| *i < three)
        .map(|(p, _)| *p)
        .max();
    let sum: Decimal = quoted.iter().map(|(_, i)| *i).sum();
    let average_impact = sum / Decimal::from(total as u64);
    let highest_impact = quoted.iter().map(|(_, i)| *i).max().unwrap_or_default();

    let overall = if safe * 10 >= total * 7 {
        OverallRecommendation::SuitableForNormalTrading
    } else if moderate * 2 >= total {
        OverallRecommendation::TradeInBatches
    } else {
        OverallRecommendation::Caution
    };

    Some(ImpactAnalysis {
        max_safe_percentage,
        average_impact,
        highest_impact,
        liquidity_assessment: RiskLevel::for_impact(average_impact),
        overall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use rust_decimal_macros::dec;

    fn token(decimals: u8, supply: U256) -> TokenInfo {
        TokenInfo {
            address: Address::repeat_byte(0x01),
            name: "Test Token".into(),
            symbol: "TST".into(),
            decimals,
            total_supply: supply,
        }
    }

    fn u(v: u128) -> U256 {
        U256::from(v)
    }

    #[test]
    fn risk_tiers_follow_the_thresholds() {
        assert_eq!(RiskLevel::for_impact(dec!(0.99)), RiskLevel::Low);
        assert_eq!(RiskLevel::for_impact(dec!(1)), RiskLevel::Moderate);
        assert_eq!(RiskLevel::for_impact(dec!(2.99)), RiskLevel::Moderate);
        assert_eq!(RiskLevel::for_impact(dec!(3)), RiskLevel::High);
        assert_eq!(RiskLevel::for_impact(dec!(9.99)), RiskLevel::High);
        assert_eq!(RiskLevel::for_impact(dec!(10)), RiskLevel::Extreme);
    }

    #[test]
    fn percent_of_supply_is_exact() {
        assert_eq!(percent_of_supply(u(1_000_000), dec!(0.5)).unwrap(), u(5_000));
        assert_eq!(percent_of_supply(u(1_000_000), dec!(5)).unwrap(), u(50_000));
        // 0.3% of 1000 floors from 3.0 exactly.
        assert_eq!(percent_of_supply(u(1_000), dec!(0.3)).unwrap(), u(3));
        // 0.5% of 100 floors 0.5 down to zero.
        assert_eq!(percent_of_supply(u(100), dec!(0.5)).unwrap(), U256::ZERO);
    }

    #[test]
    fn sub_unit_sell_amount_is_tagged_too_small() {
        let token = token(0, u(100));
        let report = analyze(
            &token,
            dec!(1),
            &[dec!(0.5)],
            u(1_000_000),
            u(1_000_000),
            FeeSchedule::default(),
        )
        .unwrap();
        assert!(matches!(
            report.entries[0].outcome,
            ImpactOutcome::AmountTooSmall
        ));
        assert!(report.analysis.is_none());
    }

    #[test]
    fn out_of_range_percentage_becomes_an_error_entry() {
        let token = token(0, u(1_000_000));
        let report = analyze(
            &token,
            dec!(1),
            &[dec!(0), dec!(101)],
            u(1_000_000),
            u(1_000_000),
            FeeSchedule::default(),
        )
        .unwrap();
        assert!(matches!(
            report.entries[0].outcome,
            ImpactOutcome::Failed { .. }
        ));
        assert!(matches!(
            report.entries[1].outcome,
            ImpactOutcome::Failed { .. }
        ));
    }

    #[test]
    fn quoted_entries_carry_consistent_classification() {
        // Deep pool, small sells: every entry should be low risk.
        let token = token(0, u(1_000_000));
        let report = analyze(
            &token,
            dec!(2),
            &[dec!(0.1), dec!(0.5)],
            u(100_000_000),
            u(200_000_000),
            FeeSchedule::default(),
        )
        .unwrap();
        for entry in &report.entries {
            match &entry.outcome {
                ImpactOutcome::Quoted {
                    risk_level,
                    recommendation,
                    price_impact,
                    ..
                } => {
                    assert!(*price_impact < dec!(1));
                    assert_eq!(*risk_level, RiskLevel::Low);
                    assert_eq!(*recommendation, Recommendation::SafeToTrade);
                }
                other => panic!("expected a quote, got {other:?}"),
            }
        }
        let analysis = report.analysis.unwrap();
        assert_eq!(analysis.max_safe_percentage, Some(dec!(0.5)));
        assert_eq!(
            analysis.overall,
            OverallRecommendation::SuitableForNormalTrading
        );
        assert_eq!(analysis.liquidity_assessment, RiskLevel::Low);
    }

    #[test]
    fn overall_recommendation_follows_the_safe_fraction() {
        let entry = |pct: Decimal, impact: Decimal| ImpactEntry {
            market_cap_percentage: pct,
            outcome: ImpactOutcome::Quoted {
                sell_amount: u(1),
                sell_value: dec!(1),
                price_impact: impact,
                actual_amount_out: u(1),
                risk_level: RiskLevel::for_impact(impact),
                recommendation: Recommendation::for_impact(impact),
            },
        };

        // 7 of 10 safe: normal trading.
        let entries: Vec<ImpactEntry> = (0..10)
            .map(|i| {
                let impact = if i < 7 { dec!(1) } else { dec!(20) };
                entry(Decimal::from(i + 1), impact)
            })
            .collect();
        assert_eq!(
            analyze_entries(&entries).unwrap().overall,
            OverallRecommendation::SuitableForNormalTrading
        );

        // Half moderate, rest extreme: batches.
        let entries: Vec<ImpactEntry> = (0..4)
            .map(|i| {
                let impact = if i < 2 { dec!(5) } else { dec!(20) };
                entry(Decimal::from(i + 1), impact)
            })
            .collect();
        assert_eq!(
            analyze_entries(&entries).unwrap().overall,
            OverallRecommendation::TradeInBatches
        );

        // Everything extreme: caution.
        let entries: Vec<ImpactEntry> =
            (0..3).map(|i| entry(Decimal::from(i + 1), dec!(30))).collect();
        let analysis = analyze_entries(&entries).unwrap();
        assert_eq!(analysis.overall, OverallRecommendation::Caution);
        assert_eq!(analysis.max_safe_percentage, None);
        assert_eq!(analysis.liquidity_assessment, RiskLevel::Extreme);
    }
}
