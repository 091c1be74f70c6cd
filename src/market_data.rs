//! Unsigned market data plus the two signed history endpoints that happen
//! to live under the same "read-only" umbrella (§4.4).

use crate::client::AsterClient;
use crate::error::CoreError;
use crate::types::{BookTicker, FundingRateRecord, IncomeRecord, Market, UserTrade};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeInfoSymbol {
    symbol: String,
    status: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<ExchangeInfoSymbol>,
}

impl AsterClient {
    pub async fn get_spot_book_ticker(&self, symbol: &str) -> Result<BookTicker, CoreError> {
        self.get_book_ticker(Market::Spot, symbol).await
    }

    pub async fn get_perp_book_ticker(&self, symbol: &str) -> Result<BookTicker, CoreError> {
        self.get_book_ticker(Market::Perp, symbol).await
    }

    async fn get_book_ticker(&self, market: Market, symbol: &str) -> Result<BookTicker, CoreError> {
        let (base_url, path) = match market {
            Market::Spot => (&self.config.spot_base_url, "/api/v1/ticker/bookTicker"),
            Market::Perp => (&self.config.perp_base_url, "/fapi/v1/ticker/bookTicker"),
        };
        let url = format!("{base_url}{path}");
        let params = [("symbol".to_string(), symbol.to_string())];
        let body = self.http.get(&url, &params, None, false).await?;
        serde_json::from_value(body).map_err(|e| CoreError::Transport {
            status: 0,
            body: format!("failed to parse bookTicker: {e}"),
        })
    }

    pub async fn get_funding_rate_history(&self, symbol: &str, limit: u32) -> Result<Vec<FundingRateRecord>, CoreError> {
        let url = format!("{}/fapi/v1/fundingRate", self.config.perp_base_url);
        let params = [
            ("symbol".to_string(), symbol.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let body = self.http.get(&url, &params, None, false).await?;
        let mut records: Vec<FundingRateRecord> = serde_json::from_value(body).map_err(|e| CoreError::Transport {
            status: 0,
            body: format!("failed to parse fundingRate history: {e}"),
        })?;
        // The venue returns oldest-first; preserve "newest-first" per the
        // contract by reversing once here rather than at every call site.
        records.reverse();
        Ok(records)
    }

    pub async fn get_available_spot_symbols(&self) -> Result<Vec<String>, CoreError> {
        self.get_available_symbols(Market::Spot).await
    }

    pub async fn get_available_perp_symbols(&self) -> Result<Vec<String>, CoreError> {
        self.get_available_symbols(Market::Perp).await
    }

    async fn get_available_symbols(&self, market: Market) -> Result<Vec<String>, CoreError> {
        let (base_url, path) = match market {
            Market::Spot => (&self.config.spot_base_url, "/api/v1/exchangeInfo"),
            Market::Perp => (&self.config.perp_base_url, "/fapi/v1/exchangeInfo"),
        };
        let url = format!("{base_url}{path}");
        let body = self.http.get(&url, &[], None, false).await?;
        let parsed: ExchangeInfoResponse = serde_json::from_value(body).map_err(|e| CoreError::Transport {
            status: 0,
            body: format!("failed to parse exchangeInfo: {e}"),
        })?;
        let mut symbols: Vec<String> = parsed
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| s.symbol)
            .collect();
        symbols.sort();
        Ok(symbols)
    }

    pub async fn discover_delta_neutral_pairs(&self) -> Result<Vec<String>, CoreError> {
        let (spot, perp) = tokio::try_join!(self.get_available_spot_symbols(), self.get_available_perp_symbols())?;
        Ok(crate::strategy::find_delta_neutral_pairs(&spot, &perp))
    }

    pub async fn get_income_history(
        &self,
        symbol: Option<&str>,
        income_type: Option<&str>,
        start_time: Option<i64>,
        end_time: Option<i64>,
        limit: u32,
    ) -> Result<Vec<IncomeRecord>, CoreError> {
        let url = format!("{}/fapi/v1/income", self.config.perp_base_url);
        let mut params = Vec::new();
        if let Some(s) = symbol {
            params.push(("symbol".to_string(), s.to_string()));
        }
        if let Some(t) = income_type {
            params.push(("incomeType".to_string(), t.to_string()));
        }
        if let Some(t) = start_time {
            params.push(("startTime".to_string(), t.to_string()));
        }
        if let Some(t) = end_time {
            params.push(("endTime".to_string(), t.to_string()));
        }
        params.push(("limit".to_string(), limit.to_string()));

        let signed = self.spot_signer.sign(params)?;
        let body = self.http.get(&url, &signed, Some(self.spot_signer.api_key()), false).await?;
        serde_json::from_value(body).map_err(|e| CoreError::Transport {
            status: 0,
            body: format!("failed to parse income history: {e}"),
        })
    }

    pub async fn get_user_trades(&self, symbol: &str, limit: u32) -> Result<Vec<UserTrade>, CoreError> {
        let url = format!("{}/fapi/v1/userTrades", self.config.perp_base_url);
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let signed = self.spot_signer.sign(params)?;
        let body = self.http.get(&url, &signed, Some(self.spot_signer.api_key()), false).await?;
        serde_json::from_value(body).map_err(|e| CoreError::Transport {
            status: 0,
            body: format!("failed to parse user trades: {e}"),
        })
    }
}
