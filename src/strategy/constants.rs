//! Named thresholds used throughout the Strategy Engine. Kept as a
//! dedicated module (rather than scattered literals) so a reader can audit
//! every magic number in one place, matching how the teacher's pool
//! calculator centralizes its fee/slippage constants.

use rust_decimal::Decimal;

/// Above this imbalance percentage, a position is not delta-neutral.
pub const IMBALANCE_THRESHOLD_PCT: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

/// Below this spot USD value, health verdict is WARN.
pub const SPOT_WARN_USD: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Below this spot USD value, health verdict is CRITICAL (cannot close
/// cleanly without leaving dust or tripping min-notional).
pub const SPOT_CRITICAL_USD: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Perp unrealized PnL percent below this is WARN.
pub const PNL_WARN_PCT: Decimal = Decimal::from_parts(25, 0, 0, true, 0);

/// Perp unrealized PnL percent below this is CRITICAL.
pub const PNL_CRITICAL_PCT: Decimal = Decimal::from_parts(50, 0, 0, true, 0);

/// Total round-trip fee percentage the funding income must earn back.
pub const FEE_COVERAGE_THRESHOLD_PCT: Decimal = Decimal::from_parts(135, 0, 0, false, 3);

/// 8-hour funding cycle: three settlements per day.
pub const FUNDING_PERIODS_PER_DAY: i64 = 3;

/// `fundingRate -> annualized percent`: `rate * 3 * 365 * 100`.
pub const APR_MULTIPLIER: Decimal = Decimal::from_parts(109_500, 0, 0, false, 0);

/// Minimum capital (USD) `validate_strategy_preconditions` requires on
/// each wallet, halved, before opening a new delta-neutral position.
pub const DEFAULT_MIN_CAPITAL_USD: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn apr_multiplier_matches_funding_periods_times_days_times_100() {
        assert_eq!(APR_MULTIPLIER, dec!(3) * dec!(365) * dec!(100));
    }

    #[test]
    fn pnl_thresholds_are_negative() {
        assert!(PNL_WARN_PCT.is_sign_negative());
        assert!(PNL_CRITICAL_PCT.is_sign_negative());
        assert!(PNL_CRITICAL_PCT < PNL_WARN_PCT);
    }
}
