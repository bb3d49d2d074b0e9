//! Stashgrid - spatial inventory placement engine
//!
//! Entities with a cell footprint live in rectangular grids, composite
//! grids, equip slots and accessory sockets. A drag gesture is resolved
//! into a placement, swap, stack merge, ammo load or attachment while
//! keeping every entity in exactly one place.

pub mod items;
pub mod inventory;
pub mod data;
pub mod config;

// Re-export commonly used types
pub use config::{ConfigError, Settings};
pub use data::{Catalog, CatalogError, Preset};
pub use inventory::{DragGesture, DragSession, DropOutcome, GridEvent, PlacementResolver, RejectReason, Stash};
pub use items::{Cell, CompositeGrid, CompositeId, Entity, EntityId, GridId, SpatialGrid};
