//! Construction-time configuration.
//!
//! Nothing in this module reads the environment or a config file; callers
//! (typically the `run-bot` demonstration binary) are responsible for
//! sourcing these values and handing them to `AsterClient::new`.

use std::time::Duration;

/// The five secrets the venue requires. `api_user`/`api_signer` are
/// Ethereum addresses (hex strings, `0x`-prefixed); `api_private_key` signs
/// the perp EIP-712-style payloads; `apiv1_public`/`apiv1_private` are the
/// spot HMAC key pair.
#[derive(Clone)]
pub struct Credentials {
    pub api_user: String,
    pub api_signer: String,
    pub api_private_key: String,
    pub apiv1_public: String,
    pub apiv1_private: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_user", &self.api_user)
            .field("api_signer", &self.api_signer)
            .field("api_private_key", &"<redacted>")
            .field("apiv1_public", &self.apiv1_public)
            .field("apiv1_private", &"<redacted>")
            .finish()
    }
}

/// Non-secret tuning knobs.
#[derive(Debug, Clone)]
pub struct Config {
    pub spot_base_url: String,
    pub perp_base_url: String,
    pub request_timeout: Duration,
    pub hmac_recv_window_ms: i64,
    pub eip712_recv_window_ms: i64,
    pub refresh_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spot_base_url: "https://sapi.asterdex.com".to_string(),
            perp_base_url: "https://fapi.asterdex.com".to_string(),
            request_timeout: Duration::from_secs(10),
            hmac_recv_window_ms: 5_000,
            eip712_recv_window_ms: 50_000,
            refresh_interval: Duration::from_secs(30),
        }
    }
}
