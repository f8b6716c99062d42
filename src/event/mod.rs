//! Market event module
//!
//! Typed snapshot/delta events, their validation, and decoding of
//! market-channel messages enriched with subscription identity.

mod context;
mod decode;
mod types;

pub use context::MarketContext;
pub use decode::{DecodedBatch, EventDecoder, PONG};
pub use types::{EventMeta, MarketEvent, ValidationError};
