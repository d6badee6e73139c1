//! Slippage-curve analysis over an ordered list of sell amounts.
//!
//! Entries are processed in input order and failures are isolated per
//! entry; the summary statistics only ever cover the quotes that
//! succeeded. Callers are expected to pass amounts in ascending order if
//! they want the warning-point scan to mean anything.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::TokenInfo;

/// One tested amount and what became of it.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    /// Whole-token amount as supplied by the caller.
    pub amount: Decimal,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchOutcome {
    Quoted {
        slippage_percentage: Decimal,
        actual_amount_out: U256,
    },
    Failed {
        error: String,
    },
}

/// Jump of more than two percentage points between adjacent valid samples.
#[derive(Debug, Clone, Serialize)]
pub struct WarningPoint {
    pub from_amount: Decimal,
    pub to_amount: Decimal,
    pub slippage_jump: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecommendedMax {
    /// Largest tested amount whose slippage stayed at or under five percent.
    Amount {
        amount: Decimal,
        slippage_percentage: Decimal,
    },
    /// Every tested amount exceeded five percent.
    NoneSafe,
}

/// Statistics over the valid subset of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub min_slippage: Decimal,
    pub max_slippage: Decimal,
    pub average_slippage: Decimal,
    /// Number of amounts that produced a quote.
    pub samples: usize,
    pub warning_points: Vec<WarningPoint>,
    pub recommended_max: RecommendedMax,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub token: TokenInfo,
    pub entries: Vec<BatchEntry>,
    /// Absent when no entry produced a quote.
    pub summary: Option<BatchSummary>,
}

/// Fold quoted-or-failed entries into the final report.
pub fn summarize(token: TokenInfo, entries: Vec<BatchEntry>) -> BatchReport {
    let valid: Vec<(Decimal, Decimal)> = entries
        .iter()
        .filter_map(|e| match &e.outcome {
            BatchOutcome::Quoted {
                slippage_percentage,
                ..
            } => Some((e.amount, *slippage_percentage)),
            BatchOutcome::Failed { .. } => None,
        })
        .collect();

    let summary = build_summary(&valid);
    BatchReport {
        token,
        entries,
        summary,
    }
}

fn build_summary(valid: &[(Decimal, Decimal)]) -> Option<BatchSummary> {
    if valid.is_empty() {
        return None;
    }
    let slippages = valid.iter().map(|(_, s)| *s);
    let min_slippage = slippages.clone().min()?;
    let max_slippage = slippages.clone().max()?;
    let sum: Decimal = slippages.sum();
    let average_slippage = sum / Decimal::from(valid.len() as u64);

    Some(BatchSummary {
        min_slippage,
        max_slippage,
        average_slippage,
        samples: valid.len(),
        warning_points: warning_points(valid),
        recommended_max: recommended_max(valid),
    })
}

fn warning_points(valid: &[(Decimal, Decimal)]) -> Vec<WarningPoint> {
    valid
        .windows(2)
        .filter_map(|w| {
            let (from_amount, prev) = w[0];
            let (to_amount, cur) = w[1];
            let jump = cur - prev;
            (jump > Decimal::TWO).then_some(WarningPoint {
                from_amount,
                to_amount,
                slippage_jump: jump,
            })
        })
        .collect()
}

fn recommended_max(valid: &[(Decimal, Decimal)]) -> RecommendedMax {
    valid
        .iter()
        .filter(|(_, s)| *s <= Decimal::from(5))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map_or(RecommendedMax::NoneSafe, |&(amount, slippage)| {
            RecommendedMax::Amount {
                amount,
                slippage_percentage: slippage,
            }
        })
}
