//! Configuration management for POI overlays
//!
//! - **node** / **values**: the abstract key-value tree and its value encodings
//! - **codec**: POI records and the override set inside that tree
//! - **resolver**: `ConfigResolver`, the three-tier merge and promote/demote logic
//! - **persistent**: JSON files on disk, used by the command line front end

pub mod codec;
pub mod node;
pub mod persistent;
pub mod resolver;
pub mod values;

pub use codec::{load_overrides, poi_from_node, poi_to_node, save_overrides};
pub use node::ConfigNode;
pub use persistent::{BodyCatalog, ConfigPaths};
pub use resolver::{ConfigResolver, OverridesChanged, OverridesListener, ResolverSettings};
