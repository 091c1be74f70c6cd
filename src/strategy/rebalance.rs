//! Supplemental to the distilled feature list (see SPEC_FULL.md §4.7.1):
//! concrete rebalance-quantity planning and pre-trade capital/leverage
//! validation, both present in the original Python strategy module.

use crate::types::AnalyzedPosition;
use crate::types::OrderSide;
use rust_decimal::Decimal;
use serde::Serialize;

use super::POSITION_EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RebalanceTradeAction {
    ReduceSpotIncreaseShort,
    IncreaseSpotReduceShort,
    NoAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerpRebalanceAction {
    IncreaseShort,
    ReduceShort,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalancePlan {
    pub action: RebalanceTradeAction,
    pub spot_quantity: Decimal,
    pub spot_action: Option<OrderSide>,
    pub perp_action: Option<PerpRebalanceAction>,
    pub estimated_cost_usd: Decimal,
}

/// Splits the correction to `net_delta` in half between trimming one leg
/// and growing the other, the same halving the original applies so both
/// legs' average cost stays close to the book rather than chasing one
/// side all the way back to zero.
pub fn calculate_rebalance_quantities(position: &AnalyzedPosition) -> RebalancePlan {
    if position.net_delta.abs() <= POSITION_EPSILON {
        return RebalancePlan {
            action: RebalanceTradeAction::NoAction,
            spot_quantity: Decimal::ZERO,
            spot_action: None,
            perp_action: None,
            estimated_cost_usd: Decimal::ZERO,
        };
    }

    let spot_quantity = position.net_delta.abs() / Decimal::TWO;
    let estimated_cost_usd = spot_quantity * position.mark_price;

    // net_delta > 0 means the long spot leg outweighs the short perp leg:
    // trim spot, grow the short. net_delta < 0 is the mirror image.
    if position.net_delta.is_sign_positive() {
        RebalancePlan {
            action: RebalanceTradeAction::ReduceSpotIncreaseShort,
            spot_quantity,
            spot_action: Some(OrderSide::Sell),
            perp_action: Some(PerpRebalanceAction::IncreaseShort),
            estimated_cost_usd,
        }
    } else {
        RebalancePlan {
            action: RebalanceTradeAction::IncreaseSpotReduceShort,
            spot_quantity,
            spot_action: Some(OrderSide::Buy),
            perp_action: Some(PerpRebalanceAction::ReduceShort),
            estimated_cost_usd,
        }
    }
}

/// Pure precondition guard invoked before committing capital to a new
/// delta-neutral position. Distinct from the Orchestrator's
/// `set_perp_leverage` call, which enforces the same 1x invariant at the
/// venue as a side effect; this function only checks the caller's stated
/// intent before any network call is made.
pub fn validate_strategy_preconditions(
    spot_usdt_balance: Decimal,
    perp_usdt_balance: Decimal,
    leverage: u32,
    min_capital_usd: Decimal,
) -> (bool, Vec<String>) {
    let mut errors = Vec::new();
    let half = min_capital_usd / Decimal::TWO;

    if spot_usdt_balance < half {
        errors.push("insufficient spot USDT balance".to_string());
    }
    if perp_usdt_balance < half {
        errors.push("insufficient perp USDT balance".to_string());
    }
    if leverage != 1 {
        errors.push("leverage must be 1x for delta-neutral strategy".to_string());
    }

    (errors.is_empty(), errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn analyzed(net_delta: Decimal, mark_price: Decimal) -> AnalyzedPosition {
        AnalyzedPosition {
            symbol: "BTCUSDT".to_string(),
            spot_qty: dec!(0),
            perp_qty: dec!(0),
            net_delta,
            total_size: dec!(1),
            imbalance_pct: dec!(5),
            is_delta_neutral: false,
            mark_price,
            position_value_usd: dec!(0),
        }
    }

    #[test]
    fn positive_net_delta_reduces_spot_and_increases_short() {
        let plan = calculate_rebalance_quantities(&analyzed(dec!(0.1), dec!(20000)));
        assert_eq!(plan.action, RebalanceTradeAction::ReduceSpotIncreaseShort);
        assert_eq!(plan.spot_quantity, dec!(0.05));
        assert_eq!(plan.spot_action, Some(OrderSide::Sell));
        assert_eq!(plan.estimated_cost_usd, dec!(1000));
    }

    #[test]
    fn negative_net_delta_increases_spot_and_reduces_short() {
        let plan = calculate_rebalance_quantities(&analyzed(dec!(-0.1), dec!(20000)));
        assert_eq!(plan.action, RebalanceTradeAction::IncreaseSpotReduceShort);
        assert_eq!(plan.spot_action, Some(OrderSide::Buy));
    }

    #[test]
    fn near_zero_net_delta_needs_no_action() {
        let plan = calculate_rebalance_quantities(&analyzed(dec!(0.0000000001), dec!(20000)));
        assert_eq!(plan.action, RebalanceTradeAction::NoAction);
    }

    #[test]
    fn preconditions_flag_insufficient_balances_and_leverage() {
        let (valid, errors) = validate_strategy_preconditions(dec!(5), dec!(5), 3, dec!(20));
        assert!(!valid);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn preconditions_pass_with_sufficient_capital_and_1x_leverage() {
        let (valid, errors) = validate_strategy_preconditions(dec!(10), dec!(10), 1, dec!(20));
        assert!(valid);
        assert!(errors.is_empty());
    }
}
