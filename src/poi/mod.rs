//! Points of interest
//!
//! - **kind**: `PoiType` and the typed change vocabulary
//! - **entity**: `PoiEntity`, the attribute bag and its default formulas
//! - **resettable**: `ResettablePoi`, the seal/dirty/reset state machine
//! - **shared**: `SharedPoi`, the handle consumers hold and subscribe to

pub mod entity;
pub mod kind;
pub mod resettable;
pub mod shared;

pub use entity::{
    PoiEntity, approx_eq, default_enabled_for_type, default_resolution_for_type, radius_for_type,
};
pub use kind::{PoiAttribute, PoiEdit, PoiEvent, PoiType};
pub use resettable::{ResettablePoi, SealState};
pub use shared::{ListenerId, PoiId, PoiListener, SharedPoi};
