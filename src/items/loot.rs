//! Loot generation
//!
//! Rolls spoils-box contents as presets: a weighted category per entity,
//! a random definition of that category, random ammo stack sizes and a
//! chance for each weapon socket to come with an accessory.

use rand::distributions::WeightedIndex;
use rand::prelude::*;

use crate::data::{Catalog, ChildPreset, EntityPreset, EntityTemplate, Preset, SlotPreset};

/// Chance for each weapon socket to roll an accessory
const ACCESSORY_CHANCE: f64 = 0.5;

/// Largest ammo stack a spoils box rolls
const MAX_AMMO_STACK: u32 = 60;

/// Broad loot categories used for drop weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LootCategory {
    Collection,
    Consumable,
    Ammo,
    PrimaryWeapon,
    SecondaryWeapon,
    Accessory,
    Armor,
    Helmet,
    Backpack,
    ChestRig,
}

impl LootCategory {
    pub const ALL: [LootCategory; 10] = [
        LootCategory::Collection,
        LootCategory::Consumable,
        LootCategory::Ammo,
        LootCategory::PrimaryWeapon,
        LootCategory::SecondaryWeapon,
        LootCategory::Accessory,
        LootCategory::Armor,
        LootCategory::Helmet,
        LootCategory::Backpack,
        LootCategory::ChestRig,
    ];

    /// Relative drop weight
    pub fn weight(&self) -> f64 {
        match self {
            LootCategory::Collection => 0.25,
            LootCategory::Consumable => 0.12,
            LootCategory::Ammo => 0.18,
            LootCategory::PrimaryWeapon => 0.08,
            LootCategory::SecondaryWeapon => 0.03,
            LootCategory::Accessory => 0.25,
            LootCategory::Armor => 0.03,
            LootCategory::Helmet => 0.03,
            LootCategory::Backpack => 0.02,
            LootCategory::ChestRig => 0.02,
        }
    }

    /// Category of an entity kind tag
    pub fn of_kind(kind: &str) -> Option<Self> {
        let category = match kind {
            "collection" => LootCategory::Collection,
            "consume" => LootCategory::Consumable,
            "gunPistol" => LootCategory::SecondaryWeapon,
            "armor" => LootCategory::Armor,
            "helmet" => LootCategory::Helmet,
            "bag" => LootCategory::Backpack,
            "chest" => LootCategory::ChestRig,
            k if k.starts_with("ammo") => LootCategory::Ammo,
            k if k.starts_with("gun") => LootCategory::PrimaryWeapon,
            k if k.starts_with("acc") => LootCategory::Accessory,
            _ => return None,
        };
        Some(category)
    }
}

/// Roll a category among those the catalog can supply
pub fn roll_category(catalog: &Catalog, rng: &mut impl Rng) -> Option<LootCategory> {
    let available: Vec<LootCategory> = LootCategory::ALL
        .iter()
        .copied()
        .filter(|c| {
            catalog
                .entities
                .iter()
                .any(|t| LootCategory::of_kind(&t.kind) == Some(*c))
        })
        .collect();
    let weights = WeightedIndex::new(available.iter().map(LootCategory::weight)).ok()?;
    Some(available[weights.sample(rng)])
}

/// Roll one entity preset with no position
pub fn generate_entity(catalog: &Catalog, rng: &mut impl Rng) -> Option<EntityPreset> {
    let category = roll_category(catalog, rng)?;
    let candidates: Vec<&EntityTemplate> = catalog
        .entities
        .iter()
        .filter(|t| LootCategory::of_kind(&t.kind) == Some(category))
        .collect();
    let template = candidates.choose(rng)?;

    let mut preset = EntityPreset::new(template.id);
    if category == LootCategory::Ammo {
        preset.stack = Some(rng.gen_range(1..=MAX_AMMO_STACK.min(template.stack_max.max(1))));
    }
    for slot in &template.sockets {
        if !rng.gen_bool(ACCESSORY_CHANCE) {
            continue;
        }
        let accessory = catalog
            .socket_compatibility(template.id, slot)
            .and_then(|compat| compat.accepted_ids.choose(&mut *rng).copied());
        if let Some(id) = accessory {
            preset.children.push(ChildPreset { slot: slot.clone(), id });
        }
    }
    Some(preset)
}

/// Roll the contents of one spoils box
pub fn generate_spoils(catalog: &Catalog, slot: &str, count: usize, rng: &mut impl Rng) -> Preset {
    let entities: Vec<EntityPreset> = (0..count)
        .filter_map(|_| generate_entity(catalog, rng))
        .collect();
    log::debug!("Rolled {} entities for '{}'", entities.len(), slot);
    Preset {
        title: slot.to_string(),
        slots: vec![SlotPreset {
            slot: slot.to_string(),
            entities,
        }],
    }
}

/// Seeded generator when a seed is given, entropy otherwise
pub fn loot_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
