//! Balances, positions, leverage, and inter-wallet transfers (§4.5).

use crate::client::AsterClient;
use crate::error::CoreError;
use crate::types::{PerpAccountInfo, PerpAsset, PerpPosition, SpotBalance, TransferDirection};
use serde::Deserialize;
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Deserialize)]
struct SpotAccountResponse {
    balances: Vec<SpotBalance>,
}

#[derive(Debug, Deserialize)]
struct PerpAccountResponse {
    assets: Vec<PerpAsset>,
    positions: Vec<PerpPosition>,
}

impl AsterClient {
    pub async fn get_spot_account_balances(&self) -> Result<Vec<SpotBalance>, CoreError> {
        let url = format!("{}/api/v1/account", self.config.spot_base_url);
        let signed = self.spot_signer.sign(vec![])?;
        let body = self.http.get(&url, &signed, Some(self.spot_signer.api_key()), false).await?;
        let parsed: SpotAccountResponse = serde_json::from_value(body).map_err(|e| CoreError::Transport {
            status: 0,
            body: format!("failed to parse spot account: {e}"),
        })?;
        Ok(parsed.balances)
    }

    pub async fn get_perp_account_info(&self) -> Result<PerpAccountInfo, CoreError> {
        let url = format!("{}/fapi/v3/account", self.config.perp_base_url);
        let auth = self.perp_signer.sign(&json!({}))?;
        let params = perp_auth_params(&auth);
        let body = self.http.get(&url, &params, None, false).await?;
        let parsed: PerpAccountResponse = serde_json::from_value(body).map_err(|e| CoreError::Transport {
            status: 0,
            body: format!("failed to parse perp account: {e}"),
        })?;
        Ok(PerpAccountInfo {
            assets: parsed.assets,
            positions: parsed.positions,
        })
    }

    pub async fn get_perp_leverage(&self, symbol: &str) -> Result<u32, CoreError> {
        let info = self.get_perp_account_info().await?;
        Ok(info
            .positions
            .into_iter()
            .find(|p| p.symbol == symbol)
            .map(|p| p.leverage)
            .unwrap_or(1))
    }

    /// HMAC-signed, despite living on the perp account surface (the venue
    /// mixes auth schemes per endpoint, not per host; see §6.1).
    pub async fn set_perp_leverage(&self, symbol: &str, leverage: u32) -> Result<bool, CoreError> {
        let url = format!("{}/fapi/v1/leverage", self.config.perp_base_url);
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("leverage".to_string(), leverage.to_string()),
        ];
        let signed = self.spot_signer.sign(params)?;
        let body = self.http.post(&url, &signed, Some(self.spot_signer.api_key()), false).await?;
        let returned_leverage = body.get("leverage").and_then(serde_json::Value::as_u64);
        Ok(returned_leverage == Some(leverage as u64))
    }

    pub async fn transfer_between_spot_and_perp(
        &self,
        asset: &str,
        amount: rust_decimal::Decimal,
        direction: TransferDirection,
    ) -> Result<serde_json::Value, CoreError> {
        let kind = match direction {
            TransferDirection::SpotToPerp => "SPOT_TO_PERP",
            TransferDirection::PerpToSpot => "PERP_TO_SPOT",
        };
        let client_tran_id = format!(
            "transfer_{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| CoreError::validation(format!("system clock error: {e}")))?
                .as_micros()
        );

        let url = format!("{}/fapi/v3/asset/wallet/transfer", self.config.perp_base_url);
        let payload = json!({
            "amount": amount.to_string(),
            "asset": asset,
            "clientTranId": client_tran_id,
            "kind": kind,
        });
        let auth = self.perp_signer.sign(&payload)?;
        let mut params = perp_auth_params(&auth);
        for (key, value) in payload.as_object().expect("object payload").iter() {
            params.push((key.clone(), value.as_str().unwrap_or_default().to_string()));
        }
        self.http.post(&url, &params, None, false).await
    }
}

fn perp_auth_params(auth: &crate::signer::PerpAuth) -> Vec<(String, String)> {
    vec![
        ("user".to_string(), auth.user.clone()),
        ("signer".to_string(), auth.signer.clone()),
        ("nonce".to_string(), auth.nonce.to_string()),
        ("recvWindow".to_string(), auth.recv_window_ms.to_string()),
        ("signature".to_string(), auth.signature.clone()),
    ]
}
