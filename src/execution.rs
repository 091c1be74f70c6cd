//! Order placement (§4.6). Every write goes through the Formatter first;
//! callers pass `Decimal`, this module emits only precision-correct
//! strings on the wire.

use crate::client::AsterClient;
use crate::error::CoreError;
use crate::filters::{Formatter, OrderParamsInput};
use crate::types::{Market, OrderSide};
use rust_decimal::Decimal;
use serde_json::{json, Value};

impl AsterClient {
    pub async fn place_spot_buy_market(&self, symbol: &str, quote_quantity: Decimal) -> Result<Value, CoreError> {
        self.ensure_exchange_info(Market::Spot, false).await?;
        let formatted = Formatter::format_order_params(
            &self.filters,
            symbol,
            Market::Spot,
            OrderParamsInput {
                quote_quantity: Some(quote_quantity),
                ..Default::default()
            },
        )?;
        let quote_quantity = formatted.quote_quantity.ok_or_else(|| CoreError::validation("missing quoteOrderQty"))?;

        let url = format!("{}/api/v1/order", self.config.spot_base_url);
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), OrderSide::Buy.as_str().to_string()),
            ("type".to_string(), "MARKET".to_string()),
            ("quoteOrderQty".to_string(), quote_quantity),
        ];
        let signed = self.spot_signer.sign(params)?;
        self.http.post(&url, &signed, Some(self.spot_signer.api_key()), false).await
    }

    pub async fn place_spot_sell_market(&self, symbol: &str, base_quantity: Decimal) -> Result<Value, CoreError> {
        self.ensure_exchange_info(Market::Spot, false).await?;
        let formatted = Formatter::format_order_params(
            &self.filters,
            symbol,
            Market::Spot,
            OrderParamsInput {
                quantity: Some(base_quantity),
                ..Default::default()
            },
        )?;
        let quantity = formatted.quantity.ok_or_else(|| CoreError::validation("missing quantity"))?;

        let url = format!("{}/api/v1/order", self.config.spot_base_url);
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), OrderSide::Sell.as_str().to_string()),
            ("type".to_string(), "MARKET".to_string()),
            ("quantity".to_string(), quantity),
        ];
        let signed = self.spot_signer.sign(params)?;
        self.http.post(&url, &signed, Some(self.spot_signer.api_key()), false).await
    }

    pub async fn place_perp_limit(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
        side: OrderSide,
        reduce_only: bool,
    ) -> Result<Value, CoreError> {
        self.ensure_exchange_info(Market::Perp, false).await?;
        let formatted = Formatter::format_order_params(
            &self.filters,
            symbol,
            Market::Perp,
            OrderParamsInput {
                price: Some(price),
                quantity: Some(quantity),
                ..Default::default()
            },
        )?;
        let price = formatted.price.ok_or_else(|| CoreError::validation("missing price"))?;
        let quantity = formatted.quantity.ok_or_else(|| CoreError::validation("missing quantity"))?;

        let payload = json!({
            "symbol": symbol,
            "side": side.as_str(),
            "type": "LIMIT",
            "timeInForce": "GTC",
            "price": price,
            "quantity": quantity,
            "reduceOnly": reduce_only,
        });
        self.post_perp_order(&payload).await
    }

    pub async fn place_perp_market(&self, symbol: &str, quantity: Decimal, side: OrderSide) -> Result<Value, CoreError> {
        self.ensure_exchange_info(Market::Perp, false).await?;
        let formatted = Formatter::format_order_params(
            &self.filters,
            symbol,
            Market::Perp,
            OrderParamsInput {
                quantity: Some(quantity),
                ..Default::default()
            },
        )?;
        let quantity = formatted.quantity.ok_or_else(|| CoreError::validation("missing quantity"))?;

        let payload = json!({
            "symbol": symbol,
            "side": side.as_str(),
            "type": "MARKET",
            "quantity": quantity,
        });
        self.post_perp_order(&payload).await
    }

    /// Submits a reduce-only MARKET order against `positionSide=BOTH`,
    /// guaranteeing the fill cannot flip the position's sign.
    pub async fn close_perp_position(&self, symbol: &str, quantity: Decimal, side_to_close: OrderSide) -> Result<Value, CoreError> {
        self.ensure_exchange_info(Market::Perp, false).await?;
        let formatted = Formatter::format_order_params(
            &self.filters,
            symbol,
            Market::Perp,
            OrderParamsInput {
                quantity: Some(quantity),
                ..Default::default()
            },
        )?;
        let quantity = formatted.quantity.ok_or_else(|| CoreError::validation("missing quantity"))?;

        let payload = json!({
            "symbol": symbol,
            "side": side_to_close.as_str(),
            "type": "MARKET",
            "quantity": quantity,
            "reduceOnly": true,
            "positionSide": "BOTH",
        });
        self.post_perp_order(&payload).await
    }

    async fn post_perp_order(&self, payload: &Value) -> Result<Value, CoreError> {
        let url = format!("{}/fapi/v3/order", self.config.perp_base_url);
        let auth = self.perp_signer.sign(payload)?;
        let mut params = vec![
            ("user".to_string(), auth.user.clone()),
            ("signer".to_string(), auth.signer.clone()),
            ("nonce".to_string(), auth.nonce.to_string()),
            ("recvWindow".to_string(), auth.recv_window_ms.to_string()),
            ("signature".to_string(), auth.signature.clone()),
        ];
        if let Some(object) = payload.as_object() {
            for (key, value) in object.iter() {
                params.push((key.clone(), value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string())));
            }
        }
        self.http.post(&url, &params, None, false).await
    }
}
