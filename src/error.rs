//! Caller-facing error type
//!
//! Only precondition violations are reported through `PoiError`. Expected
//! absence (unknown names, missing keys) resolves to defaults and partial
//! external failures (terrain sampling) are logged and absorbed.

use thiserror::Error;

use crate::poi::PoiType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoiError {
    /// An attribute value that breaks an entity invariant
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A default-radius formula or default slot was requested for a type that has none
    #[error("unsupported operation for POI type {poi_type:?}")]
    Unsupported { poi_type: PoiType },

    /// Seal/reset/save called in a state that does not allow it
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}
