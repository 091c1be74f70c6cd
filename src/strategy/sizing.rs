use rust_decimal::Decimal;
use serde::Serialize;

/// Result of sizing a new delta-neutral position. The invariant
/// `existing_spot_usd_utilized + new_spot_capital_required == total_usd_capital`
/// always holds; `total_perp_quantity_to_short` equals the total spot
/// quantity the operator will hold after the trade.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PositionSizePlan {
    pub spot_quantity_to_buy: Decimal,
    pub new_spot_capital_required: Decimal,
    pub total_perp_quantity_to_short: Decimal,
    pub existing_spot_usd_utilized: Decimal,
    pub perp_capital_required: Decimal,
}

/// Sizes a new spot-buy/perp-short pair against `total_usd_capital`,
/// crediting whatever spot position already exists. Leverage is advisory
/// metadata only — the plan is always 1x by contract (see
/// `validate_strategy_preconditions`, which enforces this at the venue).
pub fn calculate_position_size(total_usd_capital: Decimal, spot_price: Decimal, existing_spot_usd: Decimal) -> PositionSizePlan {
    let existing_spot_usd_utilized = existing_spot_usd.min(total_usd_capital);
    let new_spot_capital_required = total_usd_capital - existing_spot_usd_utilized;
    let existing_spot_qty = if spot_price > Decimal::ZERO {
        existing_spot_usd_utilized / spot_price
    } else {
        Decimal::ZERO
    };
    let spot_quantity_to_buy = if spot_price > Decimal::ZERO {
        new_spot_capital_required / spot_price
    } else {
        Decimal::ZERO
    };
    let total_perp_quantity_to_short = existing_spot_qty + spot_quantity_to_buy;

    PositionSizePlan {
        spot_quantity_to_buy,
        new_spot_capital_required,
        total_perp_quantity_to_short,
        existing_spot_usd_utilized,
        perp_capital_required: total_perp_quantity_to_short * spot_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sizing_with_no_existing_position() {
        let plan = calculate_position_size(dec!(1000), dec!(50), dec!(0));
        assert_eq!(plan.spot_quantity_to_buy, dec!(20));
        assert_eq!(plan.total_perp_quantity_to_short, dec!(20));
        assert_eq!(plan.new_spot_capital_required, dec!(1000));
        assert_eq!(plan.existing_spot_usd_utilized, dec!(0));
    }

    #[test]
    fn sizing_credits_existing_spot_position() {
        let plan = calculate_position_size(dec!(1000), dec!(50), dec!(200));
        assert_eq!(plan.existing_spot_usd_utilized, dec!(200));
        assert_eq!(plan.new_spot_capital_required, dec!(800));
        assert_eq!(plan.spot_quantity_to_buy, dec!(16));
        // existing 4 + new 16 = 20, matching total_usd_capital / spot_price.
        assert_eq!(plan.total_perp_quantity_to_short, dec!(20));
    }

    #[test]
    fn capital_conservation_invariant_holds() {
        let plan = calculate_position_size(dec!(1234), dec!(37), dec!(300));
        assert_eq!(plan.existing_spot_usd_utilized + plan.new_spot_capital_required, dec!(1234));
    }
}
