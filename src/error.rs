//! Error taxonomy for the delta-neutral core.
//!
//! Every fallible operation in this crate returns `Result<T, CoreError>`.
//! Nothing below the orchestrator layer panics on bad venue data; the
//! orchestrator is responsible for collapsing `CoreError` into the
//! operator-facing `{success, message}` shape.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad caller input: unknown transfer direction, non-positive quantity,
    /// negative capital, and similar synchronous validation failures.
    #[error("validation error: {0}")]
    Validation(String),

    /// A symbol absent from the relevant market's exchange info.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Non-2xx HTTP response, network timeout, or malformed body.
    #[error("transport error: status={status} body={body}")]
    Transport { status: u16, body: String },

    /// A 2xx response whose JSON body signals venue-side rejection
    /// (`code < 0`).
    #[error("venue error {code}: {message}")]
    Venue { code: i64, message: String },

    /// Signing failed. Never carries key material or signature bytes.
    #[error("signature error: {0}")]
    Signature(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unknown_symbol(symbol: impl Into<String>) -> Self {
        Self::UnknownSymbol(symbol.into())
    }

    pub fn is_venue(&self) -> bool {
        matches!(self, Self::Venue { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
