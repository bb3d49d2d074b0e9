//! Entities and the grids that hold them

pub mod entity;
pub mod grid;
pub mod composite;
pub mod loot;

pub use entity::{CarrierClass, CatalogId, CompositeId, Entity, EntityId, Firearm, Grade, GridId, Socket};
pub use grid::{Cell, Placement, Rect, SpatialGrid, DEFAULT_CELL_SIZE};
pub use composite::{layout_is_disjoint, CompositeGrid, LayoutRect};
pub use loot::{generate_entity, generate_spoils, loot_rng, roll_category, LootCategory};
