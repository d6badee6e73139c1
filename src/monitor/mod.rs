//! Stateful liquidity-pool drift tracking.
//!
//! One slot per pool key holds the most recent observation; every later
//! poll reports the signed percentage change of the reserve ratio and
//! overwrites the slot. No history is kept beyond that single snapshot.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::AnalyzerError;
use crate::ratio::{ratio_to_decimal, signed_change_percentage};

type PoolKey = (Address, Address);

#[derive(Debug, Clone)]
struct PoolState {
    reserve_a: U256,
    reserve_b: U256,
    #[allow(dead_code)]
    observed_at: DateTime<Utc>,
}

/// What a poll observed relative to the previous one.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MonitorOutcome {
    /// First observation of this pool; a change is undefined.
    Initialized { initial_ratio: Decimal },
    Observed {
        previous_ratio: Decimal,
        current_ratio: Decimal,
        /// Signed percentage move of reserveB/reserveA since the last poll.
        ratio_change_percentage: Decimal,
        /// The absolute change exceeded the alert threshold. Advisory only.
        significant: bool,
    },
}

/// Full poll result as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorResult {
    pub token: Address,
    pub token_symbol: String,
    pub base_token: Address,
    pub base_token_symbol: String,
    pub pair_name: String,
    pub observed_at: DateTime<Utc>,
    pub block_timestamp: u32,
    pub reserve_a: U256,
    pub reserve_b: U256,
    #[serde(flatten)]
    pub outcome: MonitorOutcome,
}

/// Keyed single-slot reserve-ratio tracker.
///
/// Updates are independent across pools, so one mapping-level mutex with
/// short critical sections is enough for concurrent callers.
pub struct PoolMonitor {
    states: Mutex<HashMap<PoolKey, PoolState>>,
    alert_threshold: Decimal,
}

impl PoolMonitor {
    /// `alert_threshold` is the percent move of the reserve ratio above
    /// which an observation is flagged significant.
    pub fn new(alert_threshold: Decimal) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            alert_threshold,
        }
    }

    /// Record a fresh observation and report what changed since the last
    /// one. Reserves must come from a live read, never the cache.
    ///
    /// A failed observation leaves the stored slot untouched.
    pub fn observe(
        &self,
        token: Address,
        base: Address,
        reserve_a: U256,
        reserve_b: U256,
        observed_at: DateTime<Utc>,
    ) -> Result<MonitorOutcome, AnalyzerError> {
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Err(AnalyzerError::InsufficientLiquidity(format!(
                "pool reserves {reserve_a}/{reserve_b} cannot be monitored"
            )));
        }
        let current_ratio = ratio_to_decimal(reserve_b, reserve_a)
            .ok_or(AnalyzerError::Overflow("reserve ratio"))?;

        let mut states = self.states.lock().expect("monitor lock poisoned");
        let key = (token, base);
        let outcome = match states.get(&key) {
            None => MonitorOutcome::Initialized {
                initial_ratio: current_ratio,
            },
            Some(prev) => {
                let change = signed_change_percentage(
                    prev.reserve_b,
                    prev.reserve_a,
                    reserve_b,
                    reserve_a,
                )
                .ok_or(AnalyzerError::Overflow("ratio change"))?;
                let previous_ratio = ratio_to_decimal(prev.reserve_b, prev.reserve_a)
                    .ok_or(AnalyzerError::Overflow("previous reserve ratio"))?;
                MonitorOutcome::Observed {
                    previous_ratio,
                    current_ratio,
                    ratio_change_percentage: change,
                    significant: change.abs() > self.alert_threshold,
                }
            }
        };
        states.insert(
            key,
            PoolState {
                reserve_a,
                reserve_b,
                observed_at,
            },
        );
        Ok(outcome)
    }

    /// Number of pools currently tracked.
    pub fn tracked_pools(&self) -> usize {
        self.states.lock().expect("monitor lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn first_observation_initializes() {
        let monitor = PoolMonitor::new(dec!(0.1));
        let outcome = monitor
            .observe(addr(1), addr(2), u(1_000_000), u(2_000_000), Utc::now())
            .unwrap();
        match outcome {
            MonitorOutcome::Initialized { initial_ratio } => {
                assert_eq!(initial_ratio, dec!(2));
            }
            other => panic!("expected initialization, got {other:?}"),
        }
        assert_eq!(monitor.tracked_pools(), 1);
    }

    #[test]
    fn second_identical_observation_reports_zero_change() {
        let monitor = PoolMonitor::new(dec!(0.1));
        monitor
            .observe(addr(1), addr(2), u(1_000_000), u(2_000_000), Utc::now())
            .unwrap();
        let outcome = monitor
            .observe(addr(1), addr(2), u(1_000_000), u(2_000_000), Utc::now())
            .unwrap();
        match outcome {
            MonitorOutcome::Observed {
                ratio_change_percentage,
                significant,
                previous_ratio,
                current_ratio,
            } => {
                assert_eq!(ratio_change_percentage, Decimal::ZERO);
                assert!(!significant);
                assert_eq!(previous_ratio, current_ratio);
            }
            other => panic!("expected an observation, got {other:?}"),
        }
    }

    #[test]
    fn drift_is_signed_and_flagged_against_the_threshold() {
        let monitor = PoolMonitor::new(dec!(0.1));
        monitor
            .observe(addr(1), addr(2), u(1_000_000), u(2_000_000), Utc::now())
            .unwrap();
        // Ratio drops from 2.0 to 1.0: -50%.
        let outcome = monitor
            .observe(addr(1), addr(2), u(1_000_000), u(1_000_000), Utc::now())
            .unwrap();
        match outcome {
            MonitorOutcome::Observed {
                ratio_change_percentage,
                significant,
                ..
            } => {
                assert_eq!(ratio_change_percentage, dec!(-50));
                assert!(significant);
            }
            other => panic!("expected an observation, got {other:?}"),
        }
    }

    #[test]
    fn sub_threshold_drift_is_not_significant() {
        let monitor = PoolMonitor::new(dec!(0.1));
        monitor
            .observe(addr(1), addr(2), u(1_000_000), u(2_000_000), Utc::now())
            .unwrap();
        // 2.0 -> 2.001 is +0.05%, under the 0.1% threshold.
        let outcome = monitor
            .observe(addr(1), addr(2), u(1_000_000), u(2_001_000), Utc::now())
            .unwrap();
        match outcome {
            MonitorOutcome::Observed {
                ratio_change_percentage,
                significant,
                ..
            } => {
                assert_eq!(ratio_change_percentage, dec!(0.05));
                assert!(!significant);
            }
            other => panic!("expected an observation, got {other:?}"),
        }
    }

    #[test]
    fn pools_are_tracked_independently() {
        let monitor = PoolMonitor::new(dec!(0.1));
        monitor
            .observe(addr(1), addr(2), u(100), u(200), Utc::now())
            .unwrap();
        let outcome = monitor
            .observe(addr(1), addr(3), u(100), u(300), Utc::now())
            .unwrap();
        assert!(matches!(outcome, MonitorOutcome::Initialized { .. }));
        assert_eq!(monitor.tracked_pools(), 2);
    }

    #[test]
    fn empty_reserves_fail_without_touching_state() {
        let monitor = PoolMonitor::new(dec!(0.1));
        monitor
            .observe(addr(1), addr(2), u(100), u(200), Utc::now())
            .unwrap();
        let err = monitor.observe(addr(1), addr(2), U256::ZERO, u(200), Utc::now());
        assert!(matches!(
            err,
            Err(AnalyzerError::InsufficientLiquidity(_))
        ));
        // The stored slot still reflects the first poll.
        let outcome = monitor
            .observe(addr(1), addr(2), u(100), u(200), Utc::now())
            .unwrap();
        match outcome {
            MonitorOutcome::Observed {
                ratio_change_percentage,
                ..
            } => assert_eq!(ratio_change_percentage, Decimal::ZERO),
            other => panic!("expected an observation, got {other:?}"),
        }
    }
}
