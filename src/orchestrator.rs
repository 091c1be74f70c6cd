//! Composes the Exchange Access Layer and Strategy Engine into the
//! high-level transactions an operator or the scheduler actually invokes
//! (§4.8). Every public method returns `OperationResult<T>` rather than
//! propagating `CoreError` — expected failures become `{success:false,
//! message}`; only a logic bug should ever surface a raw `CoreError` out of
//! this module.

use crate::client::AsterClient;
use crate::types::{
    AnalyzedPosition, Market, OperationResult, OrderSide, SpotBalance, Symbol, TradePlan, TransferDirection, STABLECOINS,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

pub struct Orchestrator {
    client: AsterClient,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSnapshot {
    pub perp_account_assets_usdt: Decimal,
    pub raw_perp_positions: Vec<crate::types::PerpPosition>,
    pub spot_balances: Vec<ValuedSpotBalance>,
    pub analyzed_positions: Vec<AnalyzedPositionWithApr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuedSpotBalance {
    pub asset: String,
    pub total: Decimal,
    pub value_usd: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedPositionWithApr {
    #[serde(flatten)]
    pub position: AnalyzedPosition,
    pub current_apr: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundingRateQuote {
    pub symbol: Symbol,
    pub funding_rate: Decimal,
    pub apr_pct: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalanceRecord {
    pub transfer_needed: bool,
    pub amount: Decimal,
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundingAnalysisReport {
    pub symbol: Symbol,
    pub effective_value_usd: Decimal,
    pub total_funding_usd: Decimal,
    pub funding_pct: Decimal,
    pub fee_coverage_progress_pct: Option<Decimal>,
    pub position_opened_at_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckReport {
    pub warnings: Vec<String>,
    pub criticals: Vec<String>,
    pub dn_position_count: usize,
    pub per_position_pnl: Vec<PositionPnlEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionPnlEntry {
    pub symbol: Symbol,
    pub position_value_usd: Decimal,
    pub spot_value_usd: Decimal,
    pub imbalance_pct: Decimal,
    pub pnl_pct: Decimal,
}

impl Orchestrator {
    pub fn new(client: AsterClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AsterClient {
        &self.client
    }

    /// The canonical dashboard snapshot (§4.8). Every fan-out branch is
    /// collected with `join_all`-style folding: a failing branch degrades
    /// to an empty/zero placeholder rather than aborting the whole
    /// snapshot, matching the fork-join contract in §5.
    pub async fn get_comprehensive_portfolio_data(&self) -> OperationResult<PortfolioSnapshot> {
        let (perp_account, spot_balances, _spot_info, _perp_info) = tokio::join!(
            self.client.get_perp_account_info(),
            self.client.get_spot_account_balances(),
            self.client.ensure_exchange_info(Market::Spot, false),
            self.client.ensure_exchange_info(Market::Perp, false),
        );

        let perp_account = match perp_account {
            Ok(account) => account,
            Err(e) => {
                warn!(error = %e, "perp account fetch failed; returning partial snapshot");
                crate::types::PerpAccountInfo {
                    assets: Vec::new(),
                    positions: Vec::new(),
                }
            }
        };
        let spot_balances: Vec<SpotBalance> = spot_balances.unwrap_or_else(|e| {
            warn!(error = %e, "spot balances fetch failed; returning partial snapshot");
            Vec::new()
        });

        let active_positions: Vec<_> = perp_account.positions.iter().filter(|p| p.is_open()).cloned().collect();

        let refreshed_positions = self.refresh_mark_prices(active_positions).await;

        let valued_balances = self.value_spot_balances(&spot_balances).await;
        let spot_qty_by_asset: HashMap<String, Decimal> = valued_balances
            .iter()
            .map(|b| (b.asset.clone(), b.total))
            .collect();
        let perp_symbol_map: HashMap<String, String> = refreshed_positions
            .iter()
            .map(|p| (p.symbol.clone(), base_asset_of(&p.symbol)))
            .collect();

        let analyzed = crate::strategy::analyze_position_data(&refreshed_positions, &spot_qty_by_asset, &perp_symbol_map);

        let annotated = self.annotate_with_current_apr(analyzed).await;

        let perp_account_assets_usdt = perp_account
            .assets
            .iter()
            .find(|a| a.asset == "USDT")
            .map(|a| a.wallet_balance)
            .unwrap_or(Decimal::ZERO);

        OperationResult::ok(
            "portfolio snapshot retrieved",
            PortfolioSnapshot {
                perp_account_assets_usdt,
                raw_perp_positions: refreshed_positions,
                spot_balances: valued_balances,
                analyzed_positions: annotated,
            },
        )
    }

    async fn refresh_mark_prices(&self, positions: Vec<crate::types::PerpPosition>) -> Vec<crate::types::PerpPosition> {
        let futures = positions.into_iter().map(|mut position| async move {
            match self.client.get_perp_book_ticker(&position.symbol).await {
                Ok(ticker) => position.mark_price = ticker.mid(),
                Err(e) => warn!(symbol = %position.symbol, error = %e, "mark price refresh failed; keeping stale price"),
            }
            position
        });
        futures::future::join_all(futures).await
    }

    async fn value_spot_balances(&self, balances: &[SpotBalance]) -> Vec<ValuedSpotBalance> {
        let futures = balances
            .iter()
            .filter(|b| b.total() > Decimal::ZERO)
            .map(|balance| async move {
                let total = balance.total();
                let value_usd = if STABLECOINS.contains(balance.asset.as_str()) {
                    total
                } else {
                    let probe_symbol = format!("{}USDT", balance.asset);
                    match self.client.get_spot_book_ticker(&probe_symbol).await {
                        Ok(ticker) => total * ticker.mid(),
                        Err(_) => Decimal::ZERO,
                    }
                };
                ValuedSpotBalance {
                    asset: balance.asset.clone(),
                    total,
                    value_usd,
                }
            });
        futures::future::join_all(futures).await
    }

    async fn annotate_with_current_apr(&self, positions: Vec<AnalyzedPosition>) -> Vec<AnalyzedPositionWithApr> {
        let futures = positions.into_iter().map(|position| async move {
            let current_apr = if position.is_delta_neutral {
                match self.client.get_funding_rate_history(&position.symbol, 1).await {
                    Ok(records) => records.first().map(|r| r.funding_rate * crate::strategy::APR_MULTIPLIER),
                    Err(_) => None,
                }
            } else {
                None
            };
            AnalyzedPositionWithApr { position, current_apr }
        });
        futures::future::join_all(futures).await
    }

    pub async fn get_all_funding_rates(&self) -> OperationResult<Vec<FundingRateQuote>> {
        let pairs = match self.client.discover_delta_neutral_pairs().await {
            Ok(pairs) => pairs,
            Err(e) => return OperationResult::failure(format!("failed to discover pairs: {e}")),
        };

        let futures = pairs.into_iter().map(|symbol| async move {
            self.client
                .get_funding_rate_history(&symbol, 1)
                .await
                .ok()
                .and_then(|records| records.first().cloned())
                .map(|record| FundingRateQuote {
                    symbol: record.symbol,
                    funding_rate: record.funding_rate,
                    apr_pct: record.funding_rate * crate::strategy::APR_MULTIPLIER,
                })
        });
        let mut quotes: Vec<FundingRateQuote> = futures::future::join_all(futures).await.into_iter().flatten().collect();
        quotes.sort_by(|a, b| b.apr_pct.cmp(&a.apr_pct));
        OperationResult::ok("funding rates retrieved", quotes)
    }

    /// Opens a new delta-neutral pair. See §4.8 for the exact ordering
    /// contract: `set_perp_leverage` strictly precedes the parallel
    /// price/filter/balance fetch, which strictly precedes execution.
    pub async fn prepare_and_execute_dn_position(&self, symbol: &str, capital_usd: Decimal, dry_run: bool) -> OperationResult<TradePlan> {
        let perp_account = match self.client.get_perp_account_info().await {
            Ok(account) => account,
            Err(e) => return OperationResult::failure(format!("failed to fetch perp account: {e}")),
        };
        if perp_account.positions.iter().any(|p| p.symbol == symbol && p.is_short()) {
            return OperationResult::failure("already have a short position");
        }

        match self.client.set_perp_leverage(symbol, 1).await {
            Ok(true) => {}
            Ok(false) => return OperationResult::failure("failed to set leverage to 1x"),
            Err(e) => return OperationResult::failure(format!("failed to set leverage: {e}")),
        }

        let (ticker, filter_refresh, spot_balances, perp_account) = tokio::join!(
            self.client.get_perp_book_ticker(symbol),
            self.client.ensure_exchange_info(Market::Perp, false),
            self.client.get_spot_account_balances(),
            self.client.get_perp_account_info(),
        );

        let spot_price = match ticker {
            Ok(t) => t.bid_price,
            Err(e) => return OperationResult::failure(format!("failed to fetch book ticker: {e}")),
        };
        if let Err(e) = filter_refresh {
            return OperationResult::failure(format!("failed to refresh exchange info: {e}"));
        }
        let spot_balances = match spot_balances {
            Ok(b) => b,
            Err(e) => return OperationResult::failure(format!("failed to fetch spot balances: {e}")),
        };
        let _perp_account = match perp_account {
            Ok(a) => a,
            Err(e) => return OperationResult::failure(format!("failed to fetch perp account: {e}")),
        };

        let base_asset = base_asset_of(symbol);
        let existing_spot_qty = spot_balances
            .iter()
            .find(|b| b.asset == base_asset)
            .map(SpotBalance::total)
            .unwrap_or(Decimal::ZERO);
        let existing_spot_usd = existing_spot_qty * spot_price;

        let sizing = crate::strategy::calculate_position_size(capital_usd, spot_price, existing_spot_usd);

        let symbol_info = match self.client.filters.get(Market::Perp, symbol) {
            Ok(info) => info,
            Err(e) => return OperationResult::failure(format!("failed to read lot size filter: {e}")),
        };
        let step_size = symbol_info.filter.step_size;

        let final_perp_qty = crate::filters::truncate(sizing.total_perp_quantity_to_short, crate::filters::decimal_precision(step_size));
        if final_perp_qty <= Decimal::ZERO {
            return OperationResult::failure("sized quantity truncates to zero at this symbol's lot size");
        }

        let spot_qty_to_buy = (final_perp_qty - existing_spot_qty).max(Decimal::ZERO);
        let spot_capital_to_buy = spot_qty_to_buy * spot_price;

        let plan = TradePlan {
            symbol: symbol.to_string(),
            spot_price,
            ideal_perp_qty: sizing.total_perp_quantity_to_short,
            final_perp_qty,
            existing_spot_qty,
            spot_qty_to_buy,
            spot_capital_to_buy,
            step_size,
        };

        if dry_run {
            return OperationResult::ok("dry run plan computed", plan);
        }

        let perp_leg = self.client.place_perp_market(symbol, final_perp_qty, OrderSide::Sell);
        let spot_leg = async {
            if spot_capital_to_buy > Decimal::ONE {
                Some(self.client.place_spot_buy_market(symbol, spot_capital_to_buy).await)
            } else {
                None
            }
        };
        let (perp_result, spot_result) = tokio::join!(perp_leg, spot_leg);

        if let Err(e) = &perp_result {
            warn!(symbol, error = %e, "perp leg failed");
        }
        if let Some(Err(e)) = &spot_result {
            warn!(symbol, error = %e, "spot leg failed");
        }

        match (perp_result, spot_result) {
            (Ok(_), None) | (Ok(_), Some(Ok(_))) => {
                info!(symbol, %final_perp_qty, "delta-neutral position opened");
                OperationResult::ok("delta-neutral position opened", plan)
            }
            (Err(e), _) => OperationResult::failure(format!("perp leg failed, spot leg not rolled back: {e}")),
            (Ok(_), Some(Err(e))) => OperationResult::failure(format!("spot leg failed, perp leg not rolled back: {e}")),
        }
    }

    pub async fn execute_dn_position_close(&self, symbol: &str) -> OperationResult<()> {
        let snapshot = self.get_comprehensive_portfolio_data().await;
        let snapshot = match snapshot.details {
            Some(details) => details,
            None => return OperationResult::failure(snapshot.message),
        };

        let analyzed = snapshot.analyzed_positions.iter().find(|p| p.position.symbol == symbol);
        let analyzed = match analyzed {
            Some(a) => a,
            None => return OperationResult::failure(format!("{symbol} is not a valid delta-neutral pair")),
        };

        if analyzed.position.perp_qty.is_zero() || analyzed.position.spot_qty.is_zero() {
            return OperationResult::failure(format!("{symbol} is not a valid delta-neutral pair"));
        }

        let close_side = if analyzed.position.perp_qty.is_sign_negative() {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        let perp_qty = analyzed.position.perp_qty.abs();
        let spot_qty = analyzed.position.spot_qty.abs();

        let (perp_result, spot_result) = tokio::join!(
            self.client.close_perp_position(symbol, perp_qty, close_side),
            self.client.place_spot_sell_market(symbol, spot_qty),
        );

        match (perp_result, spot_result) {
            (Ok(_), Ok(_)) => {
                info!(symbol, "delta-neutral position closed");
                OperationResult::ok("delta-neutral position closed", ())
            }
            (perp, spot) => OperationResult::failure(format!(
                "close did not fully succeed: perp={:?} spot={:?}",
                perp.err().map(|e| e.to_string()),
                spot.err().map(|e| e.to_string())
            )),
        }
    }

    pub async fn rebalance_usdt_50_50(&self) -> OperationResult<RebalanceRecord> {
        let (spot_balances, perp_account) = tokio::join!(self.client.get_spot_account_balances(), self.client.get_perp_account_info());

        let spot_balances = match spot_balances {
            Ok(b) => b,
            Err(e) => return OperationResult::failure(format!("failed to fetch spot balances: {e}")),
        };
        let perp_account = match perp_account {
            Ok(a) => a,
            Err(e) => return OperationResult::failure(format!("failed to fetch perp account: {e}")),
        };

        let current_spot_usdt = spot_balances.iter().find(|b| b.asset == "USDT").map(SpotBalance::total).unwrap_or(Decimal::ZERO);
        let current_perp_usdt = perp_account.assets.iter().find(|a| a.asset == "USDT").map(|a| a.wallet_balance).unwrap_or(Decimal::ZERO);

        let target = (current_spot_usdt + current_perp_usdt) / Decimal::TWO;
        let delta = target - current_spot_usdt;

        if delta.abs() <= Decimal::ONE {
            return OperationResult::ok(
                "already balanced",
                RebalanceRecord {
                    transfer_needed: false,
                    amount: Decimal::ZERO,
                    direction: None,
                },
            );
        }

        let amount = delta.abs().round_dp(6);
        let direction = if delta.is_sign_positive() {
            TransferDirection::PerpToSpot
        } else {
            TransferDirection::SpotToPerp
        };

        match self.client.transfer_between_spot_and_perp("USDT", amount, direction).await {
            Ok(_) => OperationResult::ok(
                "rebalance transfer executed",
                RebalanceRecord {
                    transfer_needed: true,
                    amount,
                    direction: Some(direction_label(direction)),
                },
            ),
            Err(e) => OperationResult::failure(format!("transfer failed: {e}")),
        }
    }

    /// Preserves the original's opening-trade reconstruction: walk user
    /// trades newest-to-oldest accumulating signed quantity until the
    /// running total matches the current position size within 1e-6. This
    /// misattributes funding for symbols with intervening partial
    /// add-ons/reductions; a corrected algorithm is out of scope here (see
    /// DESIGN.md's Open Question decisions).
    pub async fn perform_funding_analysis(&self, symbol: &str) -> OperationResult<FundingAnalysisReport> {
        let perp_account = match self.client.get_perp_account_info().await {
            Ok(a) => a,
            Err(e) => return OperationResult::failure(format!("failed to fetch perp account: {e}")),
        };
        let position = match perp_account.positions.iter().find(|p| p.symbol == symbol && p.is_open()) {
            Some(p) => p.clone(),
            None => return OperationResult::failure(format!("no open position for {symbol}")),
        };

        let (spot_balances, ticker) = tokio::join!(self.client.get_spot_account_balances(), self.client.get_perp_book_ticker(symbol));
        let spot_balances = spot_balances.unwrap_or_default();
        let mark_price = ticker.map(|t| t.bid_price).unwrap_or(position.mark_price);

        let base_asset = base_asset_of(symbol);
        let spot_value_usd = spot_balances
            .iter()
            .find(|b| b.asset == base_asset)
            .map(|b| b.total() * mark_price)
            .unwrap_or(Decimal::ZERO);

        let effective_value_usd = spot_value_usd + position.notional() + position.unrealized_profit;

        let trades = match self.client.get_user_trades(symbol, 1000).await {
            Ok(t) => t,
            Err(e) => return OperationResult::failure(format!("failed to fetch user trades: {e}")),
        };
        let mut sorted = trades;
        sorted.sort_by_key(|t| t.time);

        let tolerance = Decimal::new(1, 6);
        let mut running = Decimal::ZERO;
        let mut opened_at_ms: Option<i64> = None;
        for trade in sorted.iter().rev() {
            let signed_qty = if trade.side == OrderSide::Sell { -trade.qty } else { trade.qty };
            running += signed_qty;
            if (running - position.position_amt).abs() < tolerance {
                opened_at_ms = Some(trade.time);
                break;
            }
        }

        let opened_at_ms = match opened_at_ms {
            Some(t) => t,
            None => return OperationResult::failure("position older than trade window"),
        };

        let income = match self
            .client
            .get_income_history(Some(symbol), Some("FUNDING_FEE"), Some(opened_at_ms), None, 1000)
            .await
        {
            Ok(records) => records,
            Err(e) => return OperationResult::failure(format!("failed to fetch income history: {e}")),
        };
        let total_funding_usd: Decimal = income.iter().map(|r| r.income).sum();

        let funding_pct = if effective_value_usd > Decimal::ZERO {
            (total_funding_usd / effective_value_usd) * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        let fee_coverage_progress_pct = if funding_pct > Decimal::ZERO {
            Some((funding_pct / crate::strategy::FEE_COVERAGE_THRESHOLD_PCT) * Decimal::ONE_HUNDRED)
        } else {
            None
        };

        OperationResult::ok(
            "funding analysis computed",
            FundingAnalysisReport {
                symbol: symbol.to_string(),
                effective_value_usd,
                total_funding_usd,
                funding_pct,
                fee_coverage_progress_pct,
                position_opened_at_ms: opened_at_ms,
            },
        )
    }

    /// Applies §4.7's health rules plus the PnL and spot-USD-value
    /// thresholds to the current snapshot. Spot-USD valuation in this
    /// check deliberately reuses the perp leg's `markPrice` rather than a
    /// separate spot mid-price lookup, preserving the original's choice
    /// (see DESIGN.md's Open Question decisions).
    pub async fn perform_health_check_analysis(&self) -> OperationResult<HealthCheckReport> {
        let snapshot = self.get_comprehensive_portfolio_data().await;
        let snapshot = match snapshot.details {
            Some(d) => d,
            None => return OperationResult::failure(snapshot.message),
        };

        let mut warnings = Vec::new();
        let mut criticals = Vec::new();
        let mut per_position_pnl = Vec::new();
        let mut dn_position_count = 0usize;

        for entry in &snapshot.analyzed_positions {
            let position = &entry.position;
            if position.is_delta_neutral {
                dn_position_count += 1;
            }

            let spot_value_usd = position.spot_qty.abs() * position.mark_price;
            let pnl_pct = if position.position_value_usd > Decimal::ZERO {
                let matching_perp = snapshot
                    .raw_perp_positions
                    .iter()
                    .find(|p| p.symbol == position.symbol)
                    .map(|p| p.unrealized_profit)
                    .unwrap_or(Decimal::ZERO);
                (matching_perp / position.position_value_usd) * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            };

            if spot_value_usd < crate::strategy::SPOT_CRITICAL_USD {
                criticals.push(format!("{}: spot value ${spot_value_usd} below critical threshold", position.symbol));
            } else if spot_value_usd < crate::strategy::SPOT_WARN_USD {
                warnings.push(format!("{}: spot value ${spot_value_usd} below warn threshold", position.symbol));
            }

            if pnl_pct <= crate::strategy::PNL_CRITICAL_PCT {
                criticals.push(format!("{}: unrealized PnL {pnl_pct}% below critical threshold", position.symbol));
            } else if pnl_pct <= crate::strategy::PNL_WARN_PCT {
                warnings.push(format!("{}: unrealized PnL {pnl_pct}% below warn threshold", position.symbol));
            }

            per_position_pnl.push(PositionPnlEntry {
                symbol: position.symbol.clone(),
                position_value_usd: position.position_value_usd,
                spot_value_usd,
                imbalance_pct: position.imbalance_pct,
                pnl_pct,
            });
        }

        OperationResult::ok(
            "health check computed",
            HealthCheckReport {
                warnings,
                criticals,
                dn_position_count,
                per_position_pnl,
            },
        )
    }
}

fn base_asset_of(symbol: &str) -> String {
    symbol.strip_suffix("USDT").unwrap_or(symbol).to_string()
}

fn direction_label(direction: TransferDirection) -> String {
    match direction {
        TransferDirection::SpotToPerp => "SPOT_TO_PERP".to_string(),
        TransferDirection::PerpToSpot => "PERP_TO_SPOT".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_asset_strips_usdt_suffix() {
        assert_eq!(base_asset_of("BTCUSDT"), "BTC");
        assert_eq!(base_asset_of("ETHUSDT"), "ETH");
    }

    #[test]
    fn direction_label_matches_venue_strings() {
        assert_eq!(direction_label(TransferDirection::SpotToPerp), "SPOT_TO_PERP");
        assert_eq!(direction_label(TransferDirection::PerpToSpot), "PERP_TO_SPOT");
    }
}
