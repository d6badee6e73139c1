//! Exact ratio reporting.
//!
//! All engine math stays in raw integer units; `Decimal` values are produced
//! only here, by scaled integer division, so reported figures carry no float
//! rounding.

use alloy::primitives::U256;
use rust_decimal::Decimal;

/// Highest scale attempted when fitting a quotient into `Decimal`'s
/// 96-bit mantissa.
const MAX_SCALE: u32 = 18;

/// Percentages are computed in micro-percent units (1e-6 of a percent):
/// `part * 100 * 1_000_000 / whole`.
const MICRO_PERCENT: u64 = 100_000_000;

/// `num / den` as a `Decimal`, truncated, at the highest scale (up to 18)
/// whose result still fits. `None` when `den` is zero or even the integer
/// part exceeds the mantissa.
pub fn ratio_to_decimal(num: U256, den: U256) -> Option<Decimal> {
    if den.is_zero() {
        return None;
    }
    for scale in (0..=MAX_SCALE).rev() {
        let Some(pow) = U256::from(10u8).checked_pow(U256::from(scale)) else {
            continue;
        };
        let Some(scaled) = num.checked_mul(pow) else {
            continue;
        };
        let Ok(q) = i128::try_from(scaled / den) else {
            continue;
        };
        if let Ok(d) = Decimal::try_from_i128_with_scale(q, scale) {
            return Some(d.normalize());
        }
    }
    None
}

/// `part / whole * 100`, truncated to six fractional digits.
pub fn percentage(part: U256, whole: U256) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    let micro = part.checked_mul(U256::from(MICRO_PERCENT))? / whole;
    let micro = i128::try_from(micro).ok()?;
    Decimal::try_from_i128_with_scale(micro, 6)
        .ok()
        .map(|d| d.normalize())
}

/// Signed percentage change between two ratios given as numerator/denominator
/// pairs, computed by cross-multiplication so neither ratio is rounded before
/// the comparison.
pub fn signed_change_percentage(
    prev_num: U256,
    prev_den: U256,
    cur_num: U256,
    cur_den: U256,
) -> Option<Decimal> {
    let prev_cross = prev_num.checked_mul(cur_den)?;
    let cur_cross = cur_num.checked_mul(prev_den)?;
    if prev_cross.is_zero() {
        return None;
    }
    let (delta, negative) = if cur_cross >= prev_cross {
        (cur_cross - prev_cross, false)
    } else {
        (prev_cross - cur_cross, true)
    };
    let micro = delta.checked_mul(U256::from(MICRO_PERCENT))? / prev_cross;
    let micro = i128::try_from(micro).ok()?;
    let magnitude = Decimal::try_from_i128_with_scale(micro, 6).ok()?.normalize();
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn simple_ratio() {
        assert_eq!(ratio_to_decimal(u(2_000_000), u(1_000_000)).unwrap(), dec!(2));
        assert_eq!(ratio_to_decimal(u(1), u(4)).unwrap(), dec!(0.25));
    }

    #[test]
    fn ratio_of_zero_denominator_is_none() {
        assert!(ratio_to_decimal(u(1), U256::ZERO).is_none());
    }

    #[test]
    fn huge_ratio_drops_fractional_digits_instead_of_failing() {
        // 10^20 does not fit the mantissa at scale 18 but does at a lower one.
        let num = U256::from(10u8).pow(U256::from(20u8));
        let d = ratio_to_decimal(num, u(1)).unwrap();
        assert_eq!(d.to_string(), "100000000000000000000".to_string());
    }

    #[test]
    fn percentage_truncates_to_micro_percent() {
        // 198 / 19950 * 100 = 0.99248120...%
        assert_eq!(percentage(u(198), u(19_950)).unwrap(), dec!(0.992481));
    }

    #[test]
    fn percentage_of_zero_whole_is_none() {
        assert!(percentage(u(1), U256::ZERO).is_none());
    }

    #[test]
    fn signed_change_detects_direction() {
        // 2/1 -> 3/1 is +50%; 2/1 -> 1/1 is -50%.
        assert_eq!(
            signed_change_percentage(u(2), u(1), u(3), u(1)).unwrap(),
            dec!(50)
        );
        assert_eq!(
            signed_change_percentage(u(2), u(1), u(1), u(1)).unwrap(),
            dec!(-50)
        );
    }

    #[test]
    fn signed_change_is_exact_across_denominators() {
        // 10/4 -> 15/5: 2.5 -> 3.0 is +20%.
        assert_eq!(
            signed_change_percentage(u(10), u(4), u(15), u(5)).unwrap(),
            dec!(20)
        );
    }

    #[test]
    fn signed_change_of_identical_ratios_is_zero() {
        assert_eq!(
            signed_change_percentage(u(7), u(3), u(14), u(6)).unwrap(),
            Decimal::ZERO
        );
    }
}
