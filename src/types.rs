//! Domain and wire types shared across the exchange access layer, the
//! strategy engine, and the orchestrator.
//!
//! All monetary amounts use `rust_decimal::Decimal`. Wire DTOs deserialize
//! venue JSON where numeric fields are transmitted as strings (the venue's
//! convention, shared with most CEX REST APIs) via
//! `rust_decimal::serde::str`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A case-sensitive `<BASE><QUOTE>` symbol, e.g. `"BTCUSDT"`.
pub type Symbol = String;

/// Which of the two parallel markets a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Spot,
    Perp,
}

/// Direction of an internal wallet transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    SpotToPerp,
    PerpToSpot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

/// Per-symbol, per-market filter metadata derived from exchange info.
#[derive(Debug, Clone)]
pub struct ExchangeFilter {
    pub step_size: Decimal,
    pub tick_size: Decimal,
    pub min_qty: Decimal,
    pub min_notional: Decimal,
    /// Spot-only; absent (`None`) on perp symbols.
    pub quote_asset_precision: Option<u32>,
}

/// A single symbol's raw exchange-info record, as needed by the Filter
/// Cache. The venue nests filters in an array of tagged objects; this is
/// the post-extraction, flattened shape the rest of the crate consumes.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub symbol: Symbol,
    pub base_asset: String,
    pub quote_asset: String,
    pub status: String,
    pub filter: ExchangeFilter,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotBalance {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub free: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub locked: Decimal,
}

impl SpotBalance {
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpAsset {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub wallet_balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub available_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpPosition {
    pub symbol: Symbol,
    #[serde(with = "rust_decimal::serde::str")]
    pub position_amt: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub entry_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub mark_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unrealized_profit: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub liquidation_price: Option<Decimal>,
    #[serde(deserialize_with = "deserialize_leverage_str")]
    pub leverage: u32,
}

fn deserialize_leverage_str<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<u32>().map_err(serde::de::Error::custom)
}

impl PerpPosition {
    pub fn is_open(&self) -> bool {
        !self.position_amt.is_zero()
    }

    pub fn is_short(&self) -> bool {
        self.position_amt.is_sign_negative() && !self.position_amt.is_zero()
    }

    pub fn notional(&self) -> Decimal {
        self.position_amt.abs() * self.mark_price
    }
}

#[derive(Debug, Clone)]
pub struct PerpAccountInfo {
    pub assets: Vec<PerpAsset>,
    pub positions: Vec<PerpPosition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub symbol: Symbol,
    #[serde(with = "rust_decimal::serde::str")]
    pub bid_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ask_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub bid_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ask_qty: Decimal,
}

impl BookTicker {
    pub fn mid(&self) -> Decimal {
        (self.bid_price + self.ask_price) / Decimal::TWO
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRateRecord {
    pub symbol: Symbol,
    #[serde(with = "rust_decimal::serde::str")]
    pub funding_rate: Decimal,
    pub funding_time: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRecord {
    pub symbol: Symbol,
    pub income_type: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub income: Decimal,
    pub asset: String,
    pub time: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTrade {
    pub symbol: Symbol,
    pub id: i64,
    pub order_id: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub qty: Decimal,
    pub side: OrderSide,
    pub time: i64,
}

/// A perp position matched against its spot counterpart, with derived
/// delta-neutral classification. See crate root docs for the formulas.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedPosition {
    pub symbol: Symbol,
    pub spot_qty: Decimal,
    pub perp_qty: Decimal,
    pub net_delta: Decimal,
    pub total_size: Decimal,
    pub imbalance_pct: Decimal,
    pub is_delta_neutral: bool,
    pub mark_price: Decimal,
    pub position_value_usd: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthKind {
    Ok,
    Warn,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthVerdict {
    pub kind: HealthKind,
    pub reasons: Vec<String>,
}

impl HealthVerdict {
    pub fn ok() -> Self {
        Self {
            kind: HealthKind::Ok,
            reasons: Vec::new(),
        }
    }

    pub fn escalate(&mut self, kind: HealthKind, reason: impl Into<String>) {
        if rank(kind) > rank(self.kind) {
            self.kind = kind;
        }
        self.reasons.push(reason.into());
    }
}

fn rank(kind: HealthKind) -> u8 {
    match kind {
        HealthKind::Ok => 0,
        HealthKind::Warn => 1,
        HealthKind::Critical => 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiquidationRiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionHealthReport {
    pub symbol: Symbol,
    pub imbalance_pct: Decimal,
    pub liquidation_buffer_pct: Decimal,
    pub liquidation_risk_level: LiquidationRiskLevel,
    pub verdict: HealthVerdict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RebalanceAction {
    Hold,
    Rebalance,
    ClosePosition,
}

/// Plan for opening a new delta-neutral pair, returned either as the
/// dry-run result or as the input used to place live orders.
#[derive(Debug, Clone, Serialize)]
pub struct TradePlan {
    pub symbol: Symbol,
    pub spot_price: Decimal,
    pub ideal_perp_qty: Decimal,
    pub final_perp_qty: Decimal,
    pub existing_spot_qty: Decimal,
    pub spot_qty_to_buy: Decimal,
    pub spot_capital_to_buy: Decimal,
    pub step_size: Decimal,
}

/// The structured, non-throwing result every public orchestrator
/// operation returns: `success=false` carries the human-readable
/// explanation in `message`.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub details: Option<T>,
}

impl<T: Serialize> OperationResult<T> {
    pub fn ok(message: impl Into<String>, details: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }
}

/// Symbols treated as USD-pegged for portfolio valuation purposes; no
/// book-ticker probe is attempted for these.
pub static STABLECOINS: once_cell::sync::Lazy<std::collections::HashSet<&'static str>> =
    once_cell::sync::Lazy::new(|| ["USDT", "USDC", "BUSD", "DAI", "FDUSD"].into_iter().collect());

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn spot_balance_total_sums_free_and_locked() {
        let balance = SpotBalance {
            asset: "BTC".to_string(),
            free: dec!(1.5),
            locked: dec!(0.5),
        };
        assert_eq!(balance.total(), dec!(2.0));
    }

    #[test]
    fn perp_position_sign_encodes_direction() {
        let short = PerpPosition {
            symbol: "BTCUSDT".to_string(),
            position_amt: dec!(-0.5),
            entry_price: dec!(20000),
            mark_price: dec!(20000),
            unrealized_profit: dec!(0),
            liquidation_price: None,
            leverage: 1,
        };
        assert!(short.is_short());
        assert!(short.is_open());
        assert_eq!(short.notional(), dec!(10000));
    }

    #[test]
    fn book_ticker_mid_is_average_of_bid_ask() {
        let ticker = BookTicker {
            symbol: "ETHUSDT".to_string(),
            bid_price: dec!(1000),
            ask_price: dec!(1002),
            bid_qty: dec!(1),
            ask_qty: dec!(1),
        };
        assert_eq!(ticker.mid(), dec!(1001));
    }

    #[test]
    fn health_verdict_escalates_monotonically() {
        let mut verdict = HealthVerdict::ok();
        verdict.escalate(HealthKind::Warn, "spot value low");
        assert_eq!(verdict.kind, HealthKind::Warn);
        verdict.escalate(HealthKind::Critical, "pnl breach");
        assert_eq!(verdict.kind, HealthKind::Critical);
        verdict.escalate(HealthKind::Warn, "should not downgrade");
        assert_eq!(verdict.kind, HealthKind::Critical);
        assert_eq!(verdict.reasons.len(), 3);
    }

    #[test]
    fn stablecoins_contains_usdt() {
        assert!(STABLECOINS.contains("USDT"));
        assert!(!STABLECOINS.contains("BTC"));
    }
}
