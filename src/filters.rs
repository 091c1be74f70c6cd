//! Per-symbol exchange filter cache and precision formatting.
//!
//! Modeled on the read-mostly `RwLock`-guarded cache the teacher uses for
//! its stablecoin price table: one writer path (`refresh`), many readers,
//! and a freshly-built map swapped in atomically so readers never observe
//! a half-populated cache.

use crate::error::CoreError;
use crate::types::{Market, Symbol, SymbolInfo};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

pub struct FilterCache {
    spot: RwLock<Option<CacheEntry>>,
    perp: RwLock<Option<CacheEntry>>,
}

struct CacheEntry {
    symbols: HashMap<Symbol, SymbolInfo>,
    refreshed_at: Instant,
}

impl Default for FilterCache {
    fn default() -> Self {
        Self {
            spot: RwLock::new(None),
            perp: RwLock::new(None),
        }
    }
}

impl FilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the given market's cache has never been populated
    /// or a `forceRefresh` has been requested by the caller.
    pub fn needs_refresh(&self, market: Market, force_refresh: bool) -> bool {
        if force_refresh {
            return true;
        }
        let lock = self.lock_for(market);
        lock.read().expect("filter cache poisoned").is_none()
    }

    pub fn store(&self, market: Market, symbols: HashMap<Symbol, SymbolInfo>) {
        let mut guard = self.lock_for(market).write().expect("filter cache poisoned");
        *guard = Some(CacheEntry {
            symbols,
            refreshed_at: Instant::now(),
        });
    }

    pub fn get(&self, market: Market, symbol: &str) -> Result<SymbolInfo, CoreError> {
        let guard = self.lock_for(market).read().expect("filter cache poisoned");
        guard
            .as_ref()
            .and_then(|entry| entry.symbols.get(symbol).cloned())
            .ok_or_else(|| CoreError::unknown_symbol(symbol))
    }

    pub fn last_refreshed_at(&self, market: Market) -> Option<Instant> {
        self.lock_for(market)
            .read()
            .expect("filter cache poisoned")
            .as_ref()
            .map(|entry| entry.refreshed_at)
    }

    fn lock_for(&self, market: Market) -> &RwLock<Option<CacheEntry>> {
        match market {
            Market::Spot => &self.spot,
            Market::Perp => &self.perp,
        }
    }
}

/// The fields a caller may want formatted ahead of an order submission.
#[derive(Debug, Clone, Default)]
pub struct OrderParamsInput {
    pub price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub quote_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct FormattedOrderParams {
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub quote_quantity: Option<String>,
}

pub struct Formatter;

impl Formatter {
    /// Looks up `symbol`'s filters and truncates each present field in
    /// `input` to the implied precision. Fields absent from `input` stay
    /// `None`; a filter missing from the symbol's metadata passes its raw
    /// decimal through unformatted rather than synthesizing a default
    /// precision.
    pub fn format_order_params(
        cache: &FilterCache,
        symbol: &str,
        market: Market,
        input: OrderParamsInput,
    ) -> Result<FormattedOrderParams, CoreError> {
        let info = cache.get(market, symbol)?;
        let filter = &info.filter;

        let price = input.price.map(|p| {
            if filter.tick_size.is_zero() {
                p.normalize().to_string()
            } else {
                let precision = decimal_precision(filter.tick_size);
                truncate(p, precision).to_string()
            }
        });

        let quantity = input.quantity.map(|q| {
            if filter.step_size.is_zero() {
                q.normalize().to_string()
            } else {
                let precision = decimal_precision(filter.step_size);
                truncate(q, precision).to_string()
            }
        });

        let quote_quantity = input.quote_quantity.map(|qq| match filter.quote_asset_precision {
            Some(precision) => truncate(qq, precision).to_string(),
            None => qq.normalize().to_string(),
        });

        Ok(FormattedOrderParams {
            price,
            quantity,
            quote_quantity,
        })
    }
}

/// Number of fractional digits implied by a filter value's own scale, e.g.
/// `"0.0010"` parsed as `Decimal` carries scale 4, but the venue's displayed
/// precision collapses trailing zeros first: `0.001` -> 3 digits.
pub fn decimal_precision(value: Decimal) -> u32 {
    let normalized = value.normalize();
    normalized.scale()
}

/// Floor `value` to `precision` fractional digits. Never rounds.
pub fn truncate(value: Decimal, precision: u32) -> Decimal {
    value.trunc_with_scale(precision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExchangeFilter;
    use rust_decimal_macros::dec;

    fn sample_cache() -> FilterCache {
        let cache = FilterCache::new();
        let mut symbols = HashMap::new();
        symbols.insert(
            "BTCUSDT".to_string(),
            SymbolInfo {
                symbol: "BTCUSDT".to_string(),
                base_asset: "BTC".to_string(),
                quote_asset: "USDT".to_string(),
                status: "TRADING".to_string(),
                filter: ExchangeFilter {
                    step_size: dec!(0.001),
                    tick_size: dec!(0.01),
                    min_qty: dec!(0.001),
                    min_notional: dec!(5),
                    quote_asset_precision: Some(2),
                },
            },
        );
        cache.store(Market::Spot, symbols);
        cache
    }

    #[test]
    fn truncate_never_rounds_up() {
        assert_eq!(truncate(dec!(1.2399), 2), dec!(1.23));
        assert_eq!(truncate(dec!(1.2399), 3), dec!(1.239));
        assert_eq!(truncate(dec!(20.0), 0), dec!(20));
    }

    #[test]
    fn precision_derived_from_displayed_filter_value() {
        assert_eq!(decimal_precision(dec!(0.01)), 2);
        assert_eq!(decimal_precision(dec!(0.0010)), 3);
        assert_eq!(decimal_precision(dec!(1)), 0);
    }

    #[test]
    fn format_order_params_truncates_quantity_to_step_size() {
        let cache = sample_cache();
        let formatted = Formatter::format_order_params(
            &cache,
            "BTCUSDT",
            Market::Spot,
            OrderParamsInput {
                quantity: Some(dec!(0.123456)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(formatted.quantity.unwrap(), "0.123");
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let cache = sample_cache();
        let result = Formatter::format_order_params(&cache, "DOESNOTEXIST", Market::Spot, OrderParamsInput::default());
        assert!(matches!(result, Err(CoreError::UnknownSymbol(_))));
    }

    #[test]
    fn needs_refresh_reports_uninitialized_market() {
        let cache = FilterCache::new();
        assert!(cache.needs_refresh(Market::Spot, false));
        cache.store(Market::Spot, HashMap::new());
        assert!(!cache.needs_refresh(Market::Spot, false));
        assert!(cache.needs_refresh(Market::Spot, true));
    }
}
