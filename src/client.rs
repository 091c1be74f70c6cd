//! `AsterClient` is the Exchange Access Layer entry point: it owns the two
//! HTTP clients (spot/perp share nothing but a timeout setting), the two
//! signers, and the filter cache. The Market Data, Account, and Execution
//! API surfaces (§4.4-4.6) are implemented as separate `impl AsterClient`
//! blocks in sibling modules, grounded the same way the teacher splits a
//! single long-lived handle's behavior across `arbitrage/`, `pool/`, and
//! `tax/` rather than one monolithic struct.

use crate::config::{Config, Credentials};
use crate::error::CoreError;
use crate::filters::FilterCache;
use crate::http::HttpClient;
use crate::signer::{PerpSigner, SpotSigner};
use crate::types::{ExchangeFilter, Market, SymbolInfo};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub struct AsterClient {
    pub(crate) config: Config,
    pub(crate) http: HttpClient,
    pub(crate) spot_signer: SpotSigner,
    pub(crate) perp_signer: PerpSigner,
    pub(crate) filters: FilterCache,
}

impl AsterClient {
    pub fn new(config: Config, credentials: Credentials) -> Result<Self, CoreError> {
        let spot_signer = SpotSigner::new(
            credentials.apiv1_public.clone(),
            credentials.apiv1_private.clone(),
            config.hmac_recv_window_ms,
        );
        let perp_signer = PerpSigner::new(
            &credentials.api_private_key,
            &credentials.api_user,
            &credentials.api_signer,
            config.eip712_recv_window_ms,
        )?;
        Ok(Self {
            http: HttpClient::new(config.request_timeout),
            config,
            spot_signer,
            perp_signer,
            filters: FilterCache::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ensures the cache for `market` is populated, re-fetching when
    /// `force_refresh` is set or nothing has been cached yet.
    pub async fn ensure_exchange_info(&self, market: Market, force_refresh: bool) -> Result<(), CoreError> {
        if !self.filters.needs_refresh(market, force_refresh) {
            return Ok(());
        }
        let symbols = self.fetch_exchange_info(market).await?;
        self.filters.store(market, symbols);
        Ok(())
    }

    async fn fetch_exchange_info(&self, market: Market) -> Result<HashMap<String, SymbolInfo>, CoreError> {
        let (base_url, path) = match market {
            Market::Spot => (self.config.spot_base_url.as_str(), "/api/v1/exchangeInfo"),
            Market::Perp => (self.config.perp_base_url.as_str(), "/fapi/v1/exchangeInfo"),
        };
        let url = format!("{base_url}{path}");
        let body = self.http.get(&url, &[], None, false).await?;
        parse_exchange_info(&body)
    }
}

fn parse_exchange_info(body: &serde_json::Value) -> Result<HashMap<String, SymbolInfo>, CoreError> {
    let mut out = HashMap::new();
    let symbols = body
        .get("symbols")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| CoreError::Transport {
            status: 0,
            body: "exchangeInfo response missing symbols array".to_string(),
        })?;

    for entry in symbols {
        let symbol = match entry.get("symbol").and_then(serde_json::Value::as_str) {
            Some(s) => s.to_string(),
            None => continue,
        };
        let base_asset = entry
            .get("baseAsset")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let quote_asset = entry
            .get("quoteAsset")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let status = entry
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        let quote_asset_precision = entry
            .get("quoteAssetPrecision")
            .and_then(serde_json::Value::as_u64)
            .map(|p| p as u32);

        let mut step_size = Decimal::ZERO;
        let mut tick_size = Decimal::ZERO;
        let mut min_qty = Decimal::ZERO;
        let mut min_notional = Decimal::ZERO;

        if let Some(filters) = entry.get("filters").and_then(serde_json::Value::as_array) {
            for filter in filters {
                let filter_type = filter.get("filterType").and_then(serde_json::Value::as_str).unwrap_or("");
                match filter_type {
                    "LOT_SIZE" => {
                        step_size = decimal_field(filter, "stepSize");
                        min_qty = decimal_field(filter, "minQty");
                    }
                    "PRICE_FILTER" => {
                        tick_size = decimal_field(filter, "tickSize");
                    }
                    "MIN_NOTIONAL" => {
                        min_notional = decimal_field(filter, "minNotional");
                    }
                    _ => {}
                }
            }
        }

        out.insert(
            symbol.clone(),
            SymbolInfo {
                symbol,
                base_asset,
                quote_asset,
                status,
                filter: ExchangeFilter {
                    step_size,
                    tick_size,
                    min_qty,
                    min_notional,
                    quote_asset_precision,
                },
            },
        );
    }

    Ok(out)
}

fn decimal_field(value: &serde_json::Value, key: &str) -> rust_decimal::Decimal {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(rust_decimal::Decimal::ZERO)
}
