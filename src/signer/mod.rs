//! Two signature schemes live on this venue: classic HMAC-SHA256 over the
//! spot/legacy-futures surface, and an EIP-712-style typed signature over
//! the newer perp account surface. Call sites pick one per endpoint, not
//! per host — `set_perp_leverage` lives on the perp account surface but
//! signs HMAC, for instance.

pub mod perp;
mod spot;

pub use perp::{PerpAuth, PerpSigner};
pub use spot::SpotSigner;
