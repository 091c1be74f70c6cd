//! EIP-712-style signing for the perp account surface (`/fapi/v3/*`).
//!
//! The business payload is canonicalized to JSON with keys sorted
//! (recursively; `serde_json::Map`'s default `BTreeMap` backing already
//! guarantees this, so no bespoke sort step is needed as long as the
//! `preserve_order` feature is never enabled on `serde_json`), ABI-encoded
//! as the tuple `(string, address, address, uint256)` of
//! `(json(payload), user, signer, nonce)`, keccak256'd, and personally
//! signed (EIP-191) with `api_private_key`.

use crate::error::CoreError;
use alloy_primitives::{keccak256, Address, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolValue;
use serde_json::Value;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct PerpSigner {
    signer: PrivateKeySigner,
    user: Address,
    signer_address: Address,
    recv_window_ms: i64,
}

/// The attached auth fields every EIP-712-signed request carries alongside
/// the business payload.
#[derive(Debug, Clone)]
pub struct PerpAuth {
    pub user: String,
    pub signer: String,
    pub nonce: u128,
    pub recv_window_ms: i64,
    pub signature: String,
}

impl PerpSigner {
    pub fn new(api_private_key: &str, api_user: &str, api_signer: &str, recv_window_ms: i64) -> Result<Self, CoreError> {
        let signer = PrivateKeySigner::from_str(api_private_key)
            .map_err(|e| CoreError::Signature(format!("invalid private key: {e}")))?;
        let user = Address::from_str(api_user)
            .map_err(|e| CoreError::Signature(format!("invalid user address: {e}")))?;
        let signer_address = Address::from_str(api_signer)
            .map_err(|e| CoreError::Signature(format!("invalid signer address: {e}")))?;
        Ok(Self {
            signer,
            user,
            signer_address,
            recv_window_ms,
        })
    }

    /// Signs a business payload, returning the auth fields to attach to the
    /// request alongside the (untouched) payload itself.
    pub fn sign(&self, payload: &Value) -> Result<PerpAuth, CoreError> {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CoreError::Signature(format!("system clock error: {e}")))?
            .as_micros();

        let canonical_payload = serde_json::to_string(payload)
            .map_err(|e| CoreError::Signature(format!("failed to canonicalize payload: {e}")))?;

        let encoded = (
            canonical_payload,
            self.user,
            self.signer_address,
            U256::from(nonce),
        )
            .abi_encode();

        let digest = keccak256(&encoded);

        let signature = self
            .signer
            .sign_message_sync(digest.as_slice())
            .map_err(|e| CoreError::Signature(format!("failed to sign payload: {e}")))?;

        Ok(PerpAuth {
            user: self.user.to_string(),
            signer: self.signer_address.to_string(),
            nonce,
            recv_window_ms: self.recv_window_ms,
            signature: format!("0x{}", hex::encode(signature.as_bytes())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Deterministic 32-byte test key; not a real credential.
    const TEST_KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
    const TEST_USER: &str = "0x0000000000000000000000000000000000000001";
    const TEST_SIGNER: &str = "0x0000000000000000000000000000000000000002";

    fn signer() -> PerpSigner {
        PerpSigner::new(TEST_KEY, TEST_USER, TEST_SIGNER, 50_000).unwrap()
    }

    #[test]
    fn signing_is_deterministic_modulo_nonce() {
        let signer = signer();
        let payload = json!({ "symbol": "BTCUSDT", "side": "SELL" });
        let auth_a = signer.sign(&payload).unwrap();
        let auth_b = signer.sign(&payload).unwrap();
        // Same payload, same keys -> same addresses; nonces may legitimately
        // differ by microsecond timing, so compare the stable fields only.
        assert_eq!(auth_a.user, auth_b.user);
        assert_eq!(auth_a.signer, auth_b.signer);
        assert_eq!(auth_a.recv_window_ms, 50_000);
        assert!(auth_a.signature.starts_with("0x"));
    }

    #[test]
    fn changing_payload_changes_signature() {
        let signer = signer();
        let btc = signer.sign(&json!({ "symbol": "BTCUSDT" })).unwrap();
        let eth = signer.sign(&json!({ "symbol": "ETHUSDT" })).unwrap();
        assert_ne!(btc.signature, eth.signature);
    }
}
