//! Data loading and external content
//!
//! Entity definitions, socket rules and scene presets load from RON
//! (or JSON) files, falling back to the built-in catalog.

pub mod catalog;
pub mod preset;

pub use catalog::{
    default_catalog, export_default_catalog, Catalog, CatalogError, EntityTemplate, FirearmSpec, SocketCompatibility,
    SocketRule, CATALOG_FILE,
};
pub use preset::{populate, AmmoPreset, ChildPreset, EntityPreset, PopulateReport, Preset, PresetPosition, SlotPreset};
