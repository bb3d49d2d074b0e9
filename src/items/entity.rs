//! Entity definitions
//!
//! Placeable units, their identifiers, quality grades, carrier classes
//! and firearm magazines.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::composite::LayoutRect;

/// Catalog object id (identifies a definition, not an instance)
pub type CatalogId = u32;

/// Unique runtime id of an entity instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Unique runtime id of a spatial grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridId(pub u64);

/// Unique runtime id of a composite grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Quality tier. Only affects display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Grade {
    #[default]
    Unrated,
    White,
    Green,
    Blue,
    Purple,
    Gold,
    Red,
}

impl Grade {
    /// Map a catalog grade level (0-6) to a tier
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Grade::Unrated,
            1 => Grade::White,
            2 => Grade::Green,
            3 => Grade::Blue,
            4 => Grade::Purple,
            5 => Grade::Gold,
            _ => Grade::Red,
        }
    }

    /// Get display color RGB
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Grade::Unrated => (128, 128, 128),
            Grade::White => (200, 200, 200),
            Grade::Green => (100, 200, 100),
            Grade::Blue => (90, 140, 230),
            Grade::Purple => (170, 100, 230),
            Grade::Gold => (240, 180, 60),
            Grade::Red => (230, 70, 70),
        }
    }
}

/// Entities that own internal capacity (bags and chest rigs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarrierClass {
    Bag,
    Chest,
}

impl CarrierClass {
    pub fn name(&self) -> &'static str {
        match self {
            CarrierClass::Bag => "bag",
            CarrierClass::Chest => "chest",
        }
    }
}

/// Loaded ammunition of a firearm
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Firearm {
    /// Ammo kind this weapon chambers
    pub caliber: String,
    /// Base magazine capacity, before attachments
    pub capacity: u32,
    /// Rounds loaded, per ammo catalog id
    pub loaded: BTreeMap<CatalogId, u32>,
}

impl Firearm {
    pub fn new(caliber: impl Into<String>, capacity: u32) -> Self {
        Self {
            caliber: caliber.into(),
            capacity,
            loaded: BTreeMap::new(),
        }
    }

    /// Total rounds currently loaded
    pub fn loaded_rounds(&self) -> u32 {
        self.loaded.values().sum()
    }

    /// Load up to `rounds` of one ammo type, bounded by `capacity`.
    /// Returns how many rounds went in.
    pub fn load(&mut self, ammo: CatalogId, rounds: u32, capacity: u32) -> u32 {
        let free = capacity.saturating_sub(self.loaded_rounds());
        let moved = free.min(rounds);
        if moved > 0 {
            *self.loaded.entry(ammo).or_insert(0) += moved;
        }
        moved
    }

    /// Empty the magazine
    pub fn unload(&mut self) -> BTreeMap<CatalogId, u32> {
        std::mem::take(&mut self.loaded)
    }
}

/// Named accessory socket hosted by an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socket {
    /// Catalog slot id the socket was built from
    pub slot: String,
    /// Display name of the socket
    pub name: String,
    pub grid: GridId,
}

/// A placeable unit occupying a rectangular cell footprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub catalog_id: CatalogId,
    pub name: String,
    /// Category tag used for accept/reject filtering
    pub kind: String,
    pub width: u8,
    pub height: u8,
    /// Value of a single unit
    pub value: u64,
    pub grade: Grade,
    pub stack_count: u32,
    pub stack_max: u32,
    /// Extra magazine capacity granted to a host firearm when attached
    pub capacity_bonus: u32,
    pub carrier: Option<CarrierClass>,
    /// Sub-layout applied to the bound composite when a carrier is equipped
    pub layout: Vec<LayoutRect>,
    /// Accessory sockets
    pub sockets: Vec<Socket>,
    /// Carrier compartments, kept on the entity while it is not equipped
    pub compartments: Vec<GridId>,
    pub firearm: Option<Firearm>,
    /// Contents are revealed; only searched entities can be picked up
    /// while searching is required
    #[serde(default)]
    pub searched: bool,
}

impl Entity {
    /// Create a plain 1x1 entity
    pub fn new(id: EntityId, catalog_id: CatalogId, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id,
            catalog_id,
            name: name.into(),
            kind: kind.into(),
            width: 1,
            height: 1,
            value: 0,
            grade: Grade::Unrated,
            stack_count: 1,
            stack_max: 1,
            capacity_bonus: 0,
            carrier: None,
            layout: Vec::new(),
            sockets: Vec::new(),
            compartments: Vec::new(),
            firearm: None,
            searched: false,
        }
    }

    /// Current footprint
    pub fn size(&self) -> (u8, u8) {
        (self.width, self.height)
    }

    /// Swap width and height
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.width, &mut self.height);
    }

    /// Cell area of the footprint
    pub fn area(&self) -> u16 {
        self.width as u16 * self.height as u16
    }

    pub fn is_stackable(&self) -> bool {
        self.stack_max > 1
    }

    pub fn is_carrier(&self) -> bool {
        self.carrier.is_some()
    }

    /// Whether `other` may merge into this stack
    pub fn stacks_with(&self, other: &Entity) -> bool {
        self.is_stackable() && self.id != other.id && self.name == other.name && self.kind == other.kind
    }

    /// Whether this entity chambers the ammo kind of `other`
    pub fn chambers(&self, other: &Entity) -> bool {
        self.firearm.as_ref().is_some_and(|f| f.caliber == other.kind)
    }

    /// Value of this entity's own stack, excluding nested contents
    pub fn stack_value(&self) -> u64 {
        self.value * self.stack_count as u64
    }

    /// Grids nested directly under this entity
    pub fn nested_grids(&self) -> impl Iterator<Item = GridId> + '_ {
        self.sockets.iter().map(|s| s.grid).chain(self.compartments.iter().copied())
    }

    /// Find a socket by display name or slot id
    pub fn socket(&self, name: &str) -> Option<&Socket> {
        self.sockets.iter().find(|s| s.name == name || s.slot == name)
    }
}
