//! Pure, deterministic position classification, sizing, health, and
//! rebalance-planning functions. No I/O; every function takes snapshot
//! inputs and returns a fresh value (§4.7).

mod constants;
mod funding;
mod health;
mod rebalance;
mod sizing;

pub use constants::*;
pub use funding::{analyze_funding_opportunities, FundingOpportunity};
pub use health::{check_position_health, determine_rebalance_action};
pub use rebalance::{calculate_rebalance_quantities, validate_strategy_preconditions, RebalancePlan};
pub use sizing::{calculate_position_size, PositionSizePlan};

use crate::types::{AnalyzedPosition, PerpPosition, SpotBalance};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Epsilon below which a perp position is treated as flat.
pub const POSITION_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

/// Matches each open perp position against its spot counterpart (resolved
/// through `perp_symbol_map: perp symbol -> base asset`) and derives the
/// delta-neutral classification defined in the data model.
pub fn analyze_position_data(
    perp_positions: &[PerpPosition],
    spot_balances: &HashMap<String, Decimal>,
    perp_symbol_map: &HashMap<String, String>,
) -> Vec<AnalyzedPosition> {
    perp_positions
        .iter()
        .filter(|p| p.position_amt.abs() > POSITION_EPSILON)
        .map(|position| {
            let base_asset = perp_symbol_map.get(&position.symbol).cloned().unwrap_or_default();
            let spot_qty = spot_balances.get(&base_asset).copied().unwrap_or(Decimal::ZERO);
            let perp_qty = position.position_amt;

            let net_delta = spot_qty + perp_qty;
            let total_size = spot_qty.abs().max(perp_qty.abs());
            let imbalance_pct = if total_size > Decimal::ZERO {
                (net_delta.abs() / total_size) * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            };
            let is_delta_neutral = imbalance_pct <= IMBALANCE_THRESHOLD_PCT;
            let position_value_usd = perp_qty.abs() * position.mark_price;

            AnalyzedPosition {
                symbol: position.symbol.clone(),
                spot_qty,
                perp_qty,
                net_delta,
                total_size,
                imbalance_pct,
                is_delta_neutral,
                mark_price: position.mark_price,
                position_value_usd,
            }
        })
        .collect()
}

/// Spot-only assets (no matching perp position) still get an analyzed
/// entry per the boundary case in §8: `perp_position = 0`,
/// `imbalance_pct = 100`, never delta-neutral.
pub fn analyze_spot_only_balance(asset_symbol: &str, spot_qty: Decimal, mark_price: Decimal) -> AnalyzedPosition {
    AnalyzedPosition {
        symbol: asset_symbol.to_string(),
        spot_qty,
        perp_qty: Decimal::ZERO,
        net_delta: spot_qty,
        total_size: spot_qty.abs(),
        imbalance_pct: Decimal::ONE_HUNDRED,
        is_delta_neutral: false,
        mark_price,
        position_value_usd: spot_qty.abs() * mark_price,
    }
}

/// Sorted intersection of two symbol sets.
pub fn find_delta_neutral_pairs(spot_symbols: &[String], perp_symbols: &[String]) -> Vec<String> {
    let perp_set: std::collections::HashSet<&String> = perp_symbols.iter().collect();
    let mut pairs: Vec<String> = spot_symbols
        .iter()
        .filter(|s| perp_set.contains(s))
        .cloned()
        .collect();
    pairs.sort();
    pairs
}

/// Keeps only symbols where both legs' 24h volume clears `min_liquidity_usd`.
pub fn filter_viable_pairs(
    pairs: &[String],
    min_liquidity_usd: Decimal,
    spot_vol_24h: &HashMap<String, Decimal>,
    perp_vol_24h: &HashMap<String, Decimal>,
) -> Vec<String> {
    pairs
        .iter()
        .filter(|symbol| {
            let spot_ok = spot_vol_24h.get(*symbol).copied().unwrap_or(Decimal::ZERO) >= min_liquidity_usd;
            let perp_ok = perp_vol_24h.get(*symbol).copied().unwrap_or(Decimal::ZERO) >= min_liquidity_usd;
            spot_ok && perp_ok
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn perp_position(symbol: &str, amt: Decimal, mark: Decimal) -> PerpPosition {
        PerpPosition {
            symbol: symbol.to_string(),
            position_amt: amt,
            entry_price: mark,
            mark_price: mark,
            unrealized_profit: Decimal::ZERO,
            liquidation_price: None,
            leverage: 1,
        }
    }

    #[test]
    fn healthy_btc_position_is_delta_neutral() {
        let positions = vec![perp_position("BTCUSDT", dec!(-0.5), dec!(20000))];
        let mut spot = HashMap::new();
        spot.insert("BTC".to_string(), dec!(0.5));
        let mut map = HashMap::new();
        map.insert("BTCUSDT".to_string(), "BTC".to_string());

        let analyzed = analyze_position_data(&positions, &spot, &map);
        assert_eq!(analyzed.len(), 1);
        let position = &analyzed[0];
        assert_eq!(position.net_delta, dec!(0));
        assert!(position.is_delta_neutral);
        assert_eq!(position.position_value_usd, dec!(10000));
    }

    #[test]
    fn imbalanced_eth_position_warns() {
        let positions = vec![perp_position("ETHUSDT", dec!(-2.0), dec!(2000))];
        let mut spot = HashMap::new();
        spot.insert("ETH".to_string(), dec!(1.95));
        let mut map = HashMap::new();
        map.insert("ETHUSDT".to_string(), "ETH".to_string());

        let analyzed = analyze_position_data(&positions, &spot, &map);
        let position = &analyzed[0];
        assert!(!position.is_delta_neutral);
        assert!(position.imbalance_pct > dec!(2.4) && position.imbalance_pct < dec!(2.6));
    }

    #[test]
    fn spot_only_balance_is_never_delta_neutral() {
        let analyzed = analyze_spot_only_balance("SOL", dec!(10), dec!(150));
        assert_eq!(analyzed.imbalance_pct, dec!(100));
        assert!(!analyzed.is_delta_neutral);
        assert_eq!(analyzed.position_value_usd, dec!(1500));
    }

    #[test]
    fn find_delta_neutral_pairs_returns_sorted_intersection() {
        let spot = vec!["ETHUSDT".to_string(), "BTCUSDT".to_string(), "SOLUSDT".to_string()];
        let perp = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()];
        assert_eq!(find_delta_neutral_pairs(&spot, &perp), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn filter_viable_pairs_requires_both_legs_liquid() {
        let pairs = vec!["BTCUSDT".to_string(), "DOGEUSDT".to_string()];
        let mut spot_vol = HashMap::new();
        spot_vol.insert("BTCUSDT".to_string(), dec!(1000000));
        spot_vol.insert("DOGEUSDT".to_string(), dec!(1000000));
        let mut perp_vol = HashMap::new();
        perp_vol.insert("BTCUSDT".to_string(), dec!(1000000));
        perp_vol.insert("DOGEUSDT".to_string(), dec!(100));

        let viable = filter_viable_pairs(&pairs, dec!(500000), &spot_vol, &perp_vol);
        assert_eq!(viable, vec!["BTCUSDT"]);
    }
}
