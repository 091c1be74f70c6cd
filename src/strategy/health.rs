use super::constants::IMBALANCE_THRESHOLD_PCT;
use crate::types::{LiquidationRiskLevel, PerpPosition, PositionHealthReport, RebalanceAction};
use crate::types::{HealthKind, HealthVerdict};
use rust_decimal::Decimal;

/// Computes imbalance, the liquidation-buffer percent, and a coarse risk
/// level for a single perp position against its spot counterpart. A
/// `leverage != 1` always forces `CRITICAL`: any leverage other than 1x
/// violates the delta-neutral contract regardless of how healthy the
/// imbalance otherwise looks.
pub fn check_position_health(position: &PerpPosition, spot_balance_qty: Decimal, leverage: u32) -> PositionHealthReport {
    let perp_qty = position.position_amt;
    let net_delta = spot_balance_qty + perp_qty;
    let total_size = spot_balance_qty.abs().max(perp_qty.abs());
    let imbalance_pct = if total_size > Decimal::ZERO {
        (net_delta.abs() / total_size) * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    let liquidation_buffer_pct = match position.liquidation_price {
        Some(liq) if position.mark_price > Decimal::ZERO => ((position.mark_price - liq) / position.mark_price) * Decimal::ONE_HUNDRED,
        _ => Decimal::ONE_HUNDRED,
    };

    let mut verdict = HealthVerdict::ok();
    let mut risk_level = LiquidationRiskLevel::None;

    if leverage != 1 {
        verdict.escalate(HealthKind::Critical, "leverage violates delta-neutral contract");
        risk_level = LiquidationRiskLevel::Critical;
    } else {
        risk_level = liquidation_risk_from_buffer(liquidation_buffer_pct);
        if matches!(risk_level, LiquidationRiskLevel::High | LiquidationRiskLevel::Critical) {
            verdict.escalate(HealthKind::Critical, "liquidation buffer critically low");
        } else if matches!(risk_level, LiquidationRiskLevel::Medium) {
            verdict.escalate(HealthKind::Warn, "liquidation buffer shrinking");
        }

        if imbalance_pct > IMBALANCE_THRESHOLD_PCT {
            verdict.escalate(HealthKind::Warn, "position imbalance exceeds threshold");
        }
    }

    PositionHealthReport {
        symbol: position.symbol.clone(),
        imbalance_pct,
        liquidation_buffer_pct,
        liquidation_risk_level: risk_level,
        verdict,
    }
}

fn liquidation_risk_from_buffer(buffer_pct: Decimal) -> LiquidationRiskLevel {
    if buffer_pct.is_sign_negative() {
        // Mark price has already crossed the liquidation line.
        LiquidationRiskLevel::Critical
    } else if buffer_pct >= Decimal::from(50) {
        LiquidationRiskLevel::None
    } else if buffer_pct >= Decimal::from(25) {
        LiquidationRiskLevel::Low
    } else if buffer_pct >= Decimal::from(10) {
        LiquidationRiskLevel::Medium
    } else if buffer_pct >= Decimal::from(5) {
        LiquidationRiskLevel::High
    } else {
        LiquidationRiskLevel::Critical
    }
}

/// Precedence: liquidation risk HIGH/CRITICAL wins outright (close now);
/// otherwise an imbalance above threshold calls for a rebalance; else hold.
pub fn determine_rebalance_action(report: &PositionHealthReport) -> RebalanceAction {
    if matches!(report.liquidation_risk_level, LiquidationRiskLevel::High | LiquidationRiskLevel::Critical) {
        RebalanceAction::ClosePosition
    } else if report.imbalance_pct > IMBALANCE_THRESHOLD_PCT {
        RebalanceAction::Rebalance
    } else {
        RebalanceAction::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(amt: Decimal, mark: Decimal, liq: Option<Decimal>) -> PerpPosition {
        PerpPosition {
            symbol: "BTCUSDT".to_string(),
            position_amt: amt,
            entry_price: mark,
            mark_price: mark,
            unrealized_profit: Decimal::ZERO,
            liquidation_price: liq,
            leverage: 1,
        }
    }

    #[test]
    fn leverage_other_than_one_forces_critical() {
        let report = check_position_health(&position(dec!(-0.5), dec!(20000), Some(dec!(18000))), dec!(0.5), 5);
        assert_eq!(report.verdict.kind, HealthKind::Critical);
        assert!(report.verdict.reasons.iter().any(|r| r.contains("leverage violates")));
    }

    #[test]
    fn healthy_position_holds() {
        let report = check_position_health(&position(dec!(-0.5), dec!(20000), Some(dec!(10000))), dec!(0.5), 1);
        assert_eq!(determine_rebalance_action(&report), RebalanceAction::Hold);
    }

    #[test]
    fn imbalanced_position_triggers_rebalance() {
        let report = check_position_health(&position(dec!(-2.0), dec!(2000), Some(dec!(1000))), dec!(1.95), 1);
        assert_eq!(determine_rebalance_action(&report), RebalanceAction::Rebalance);
    }

    #[test]
    fn thin_liquidation_buffer_triggers_close() {
        let report = check_position_health(&position(dec!(-1.0), dec!(20000), Some(dec!(19400))), dec!(1.0), 1);
        assert_eq!(determine_rebalance_action(&report), RebalanceAction::ClosePosition);
    }

    #[test]
    fn breached_liquidation_line_reports_negative_buffer_and_critical() {
        let report = check_position_health(&position(dec!(-1.0), dec!(20000), Some(dec!(22000))), dec!(1.0), 1);
        assert_eq!(report.liquidation_buffer_pct, dec!(-10));
        assert_eq!(report.liquidation_risk_level, LiquidationRiskLevel::Critical);
        assert_eq!(determine_rebalance_action(&report), RebalanceAction::ClosePosition);
    }
}
