//! Scene presets
//!
//! Serialized lists of slot contents used to bulk-populate a region at
//! scene setup. Explicit positions are tried first; anything without a
//! position (or whose position is taken) falls back to auto-search, and
//! entities bound for composites are queued and auto-arranged at the end.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::inventory::{Region, SlotTarget, Stash};
use crate::items::{CatalogId, Cell, CompositeId, EntityId};

use super::catalog::{Catalog, CatalogError};

/// Anchor of a preset entity: sub-grid index (composites only), cell, rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetPosition {
    #[serde(default)]
    pub subgrid: usize,
    pub col: u8,
    pub row: u8,
    #[serde(default)]
    pub rotated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoPreset {
    pub id: CatalogId,
    pub rounds: u32,
}

/// Accessory attached to a socket of its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildPreset {
    pub slot: String,
    pub id: CatalogId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPreset {
    pub id: CatalogId,
    #[serde(default)]
    pub position: Option<PresetPosition>,
    #[serde(default)]
    pub stack: Option<u32>,
    #[serde(default)]
    pub ammo: Vec<AmmoPreset>,
    #[serde(default)]
    pub children: Vec<ChildPreset>,
}

impl EntityPreset {
    pub fn new(id: CatalogId) -> Self {
        Self {
            id,
            position: None,
            stack: None,
            ammo: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn at(mut self, subgrid: usize, col: u8, row: u8, rotated: bool) -> Self {
        self.position = Some(PresetPosition { subgrid, col, row, rotated });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPreset {
    pub slot: String,
    pub entities: Vec<EntityPreset>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub title: String,
    pub slots: Vec<SlotPreset>,
}

impl Preset {
    /// Load a preset file (RON, or JSON by extension)
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        let preset: Preset = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => ron::from_str(&content)?,
        };
        Ok(preset)
    }
}

/// Outcome counts of a `populate` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Placed directly into their slot
    pub placed: usize,
    /// Placed by the closing auto-arrange
    pub arranged: usize,
    /// Unknown ids, unknown slots, or no room in a plain grid
    pub skipped: usize,
    /// Still queued on a composite after auto-arrange
    pub left_over: usize,
}

/// Spawn and place every entity of a preset into a region
pub fn populate(stash: &mut Stash, catalog: &Catalog, region: &Region, preset: &Preset) -> PopulateReport {
    let mut report = PopulateReport::default();
    let mut touched: Vec<CompositeId> = Vec::new();

    for slot in &preset.slots {
        let Some(target) = region.slot(&slot.slot) else {
            log::warn!("Preset '{}' names unknown slot '{}'", preset.title, slot.slot);
            report.skipped += slot.entities.len();
            continue;
        };
        for entry in &slot.entities {
            let Some(id) = build_entity(stash, catalog, entry) else {
                report.skipped += 1;
                continue;
            };
            match target {
                SlotTarget::Grid(grid) => {
                    let at = entry.position.map(|p| Cell::new(p.col, p.row));
                    if stash.place(id, grid, at) {
                        report.placed += 1;
                    } else {
                        log::warn!("No room for {} in slot '{}'", id, slot.slot);
                        stash.discard(id);
                        report.skipped += 1;
                    }
                }
                SlotTarget::Composite(composite) => {
                    if !touched.contains(&composite) {
                        touched.push(composite);
                    }
                    let sub_grid = entry.position.and_then(|p| {
                        stash
                            .composite(composite)
                            .and_then(|c| c.grids().get(p.subgrid).copied())
                            .map(|grid| (grid, Cell::new(p.col, p.row)))
                    });
                    let placed = match sub_grid {
                        Some((grid, cell)) => stash.place_at(id, grid, cell, false),
                        None => false,
                    };
                    if placed {
                        report.placed += 1;
                    } else {
                        stash.queue_in_composite(composite, id);
                    }
                }
            }
        }
    }

    for composite in touched {
        let queued = stash.composite(composite).map_or(0, |c| c.pending().len());
        let left = stash.auto_arrange(composite);
        report.arranged += queued.saturating_sub(left);
        report.left_over += left;
    }

    log::info!(
        "Populated '{}': {} placed, {} arranged, {} skipped, {} left over",
        preset.title,
        report.placed,
        report.arranged,
        report.skipped,
        report.left_over
    );
    report
}

/// Spawn one entry with its stack size, rotation, loaded ammo and attachments
fn build_entity(stash: &mut Stash, catalog: &Catalog, entry: &EntityPreset) -> Option<EntityId> {
    let id = stash.spawn(catalog, entry.id)?;
    if let Some(stack) = entry.stack {
        stash.set_stack_count(id, stack.max(1));
    }
    if entry.position.is_some_and(|p| p.rotated) {
        stash.rotate(id);
    }

    for child in &entry.children {
        let socket = stash
            .entity(id)
            .and_then(|e| e.socket(&child.slot))
            .map(|s| s.grid);
        let Some(socket) = socket else {
            log::warn!("Entity {} has no socket '{}'", entry.id, child.slot);
            continue;
        };
        let Some(accessory) = stash.spawn(catalog, child.id) else {
            continue;
        };
        if !stash.place(accessory, socket, None) {
            log::warn!("Accessory {} does not fit socket '{}'", child.id, child.slot);
            stash.discard(accessory);
        }
    }

    for ammo in &entry.ammo {
        let capacity = stash.effective_capacity(id);
        let loaded = stash
            .entity_mut(id)
            .and_then(|e| e.firearm.as_mut())
            .map_or(0, |f| f.load(ammo.id, ammo.rounds, capacity));
        if loaded < ammo.rounds {
            log::warn!("Entity {} took {} of {} rounds", entry.id, loaded, ammo.rounds);
        }
    }
    Some(id)
}
