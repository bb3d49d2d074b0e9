//! Standard scenes
//!
//! The player loadout (equip slots, carrier containers, pockets, secure
//! case), spoils boxes and the ground container.

use crate::items::{CompositeGrid, CompositeId, GridId, LayoutRect, SpatialGrid, DEFAULT_CELL_SIZE};

use super::stash::Stash;

/// Weapon kinds accepted by the primary weapon slots
pub const PRIMARY_WEAPON_KINDS: [&str; 6] = ["gunRifle", "gunSMG", "gunShotgun", "gunLMG", "gunMP", "gunSniper"];

/// Accessory kinds
pub const ACCESSORY_KINDS: [&str; 5] = ["accScope", "accMuzzle", "accMagazine", "accStock", "accGrip"];

/// Default ground size in cells
pub const GROUND_SIZE: (u8, u8) = (15, 8);

/// What a named slot of a region resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTarget {
    Grid(GridId),
    Composite(CompositeId),
}

/// A named set of slots shown together (a player, a loot box)
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub title: String,
    pub slots: Vec<(String, SlotTarget)>,
}

impl Region {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slots: Vec::new(),
        }
    }

    fn with(mut self, name: &str, target: SlotTarget) -> Self {
        self.slots.push((name.to_string(), target));
        self
    }

    pub fn slot(&self, name: &str) -> Option<SlotTarget> {
        self.slots.iter().find(|(n, _)| n == name).map(|(_, t)| *t)
    }

    /// Plain grid behind a slot name
    pub fn grid(&self, name: &str) -> Option<GridId> {
        match self.slot(name)? {
            SlotTarget::Grid(grid) => Some(grid),
            SlotTarget::Composite(_) => None,
        }
    }

    pub fn composite(&self, name: &str) -> Option<CompositeId> {
        match self.slot(name)? {
            SlotTarget::Composite(composite) => Some(composite),
            SlotTarget::Grid(_) => None,
        }
    }

    /// Running total of everything in the region, each entity counted once
    pub fn value(&self, stash: &Stash) -> u64 {
        self.slots
            .iter()
            .map(|(_, target)| match target {
                SlotTarget::Grid(grid) => stash.grid_value(*grid),
                // bound composites show the carrier's compartments,
                // already counted through the carrier slot
                SlotTarget::Composite(c) if stash.composite(*c).is_some_and(|c| c.carrier().is_some()) => 0,
                SlotTarget::Composite(c) => stash.composite_value(*c),
            })
            .sum()
    }
}

fn equip_slot<S: Into<String>>(kinds: impl IntoIterator<Item = S>) -> SpatialGrid {
    SpatialGrid::slot().accepting(kinds)
}

/// Build the player's equipment: weapon and gear slots, chest rig and
/// backpack slots bound to their containers, pockets and the secure case
pub fn player_loadout(stash: &mut Stash) -> Region {
    let wide = DEFAULT_CELL_SIZE;
    let primary1 = stash.add_grid(
        "PrimaryWeapon1",
        equip_slot(PRIMARY_WEAPON_KINDS).with_cell_size(wide, 2.0),
    );
    let secondary = stash.add_grid("Secondary", equip_slot(["gunPistol"]));
    let primary2 = stash.add_grid(
        "PrimaryWeapon2",
        equip_slot(PRIMARY_WEAPON_KINDS).with_cell_size(wide, 2.0),
    );
    let knife = stash.add_grid("Knife", equip_slot(["knife"]));
    let helmet = stash.add_grid("Helmet", equip_slot(["helmet"]));
    let armor = stash.add_grid("Armor", equip_slot(["armor"]));

    let chest_slot = stash.add_grid("ChestRig", equip_slot(["chest"]));
    let chest = stash.add_composite(CompositeGrid::unbound("ContainerChestRigs"));
    stash.bind_carrier_slot(chest_slot, chest);

    let pockets: Vec<LayoutRect> = (0..5).map(|x| LayoutRect::new(1, 1, x, 0)).collect();
    let pocket = stash.add_composite(CompositeGrid::new("Pocket", pockets));

    let backpack_slot = stash.add_grid("Backpack", equip_slot(["bag"]));
    let backpack = stash.add_composite(CompositeGrid::unbound("ContainerBackpack"));
    stash.bind_carrier_slot(backpack_slot, backpack);

    let mut secure_reject = PRIMARY_WEAPON_KINDS.to_vec();
    secure_reject.extend(["gunPistol", "armor", "helmet", "bag", "chest", "knife"]);
    secure_reject.extend(ACCESSORY_KINDS);
    let secure = stash.add_composite(
        CompositeGrid::new("ContainerSecure", vec![LayoutRect::new(3, 3, 0, 0)]).rejecting(secure_reject),
    );

    log::info!("Built player loadout");
    Region::new("Player")
        .with("PrimaryWeapon1", SlotTarget::Grid(primary1))
        .with("Secondary", SlotTarget::Grid(secondary))
        .with("PrimaryWeapon2", SlotTarget::Grid(primary2))
        .with("Knife", SlotTarget::Grid(knife))
        .with("Helmet", SlotTarget::Grid(helmet))
        .with("Armor", SlotTarget::Grid(armor))
        .with("ChestRig", SlotTarget::Grid(chest_slot))
        .with("ContainerChestRigs", SlotTarget::Composite(chest))
        .with("Pocket", SlotTarget::Composite(pocket))
        .with("Backpack", SlotTarget::Grid(backpack_slot))
        .with("ContainerBackpack", SlotTarget::Composite(backpack))
        .with("ContainerSecure", SlotTarget::Composite(secure))
}

/// A loot container with one open grid
pub fn spoils_box(stash: &mut Stash, title: &str, width: u8, height: u8) -> Region {
    let grid = stash.add_grid(title, SpatialGrid::new(width, height));
    Region::new(title).with(title, SlotTarget::Grid(grid))
}

/// The ground: receives dropped entities and emptied carriers
pub fn ground(stash: &mut Stash, width: u8, height: u8) -> Region {
    let grid = stash.add_grid("Ground", SpatialGrid::new(width, height));
    stash.set_ground(grid);
    Region::new("Ground").with("Ground", SlotTarget::Grid(grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{DragGesture, DropOutcome, PlacementResolver};
    use crate::items::{Cell, Entity, EntityId};

    fn make_test_entity(stash: &mut Stash, kind: &str, width: u8, height: u8) -> EntityId {
        let mut entity = Entity::new(EntityId(0), 1, kind, kind);
        entity.width = width;
        entity.height = height;
        entity.value = 50;
        stash.insert(entity)
    }

    #[test]
    fn test_loadout_slots() {
        let mut stash = Stash::new();
        let player = player_loadout(&mut stash);

        assert_eq!(player.slots.len(), 12);
        let pocket = player.composite("Pocket").expect("pocket");
        assert_eq!(stash.composite(pocket).map(|c| c.grids().len()), Some(5));
        let backpack = player.composite("ContainerBackpack").expect("backpack");
        assert_eq!(stash.carrier_slot(backpack), player.grid("Backpack"));
        assert!(player.grid("Pocket").is_none());
    }

    #[test]
    fn test_secure_case_rejects_gear() {
        let mut stash = Stash::new();
        let player = player_loadout(&mut stash);
        let secure = player.composite("ContainerSecure").expect("secure");
        let knife = make_test_entity(&mut stash, "knife", 1, 2);
        let watch = make_test_entity(&mut stash, "collection", 1, 1);

        assert!(!stash.place_in_composite(secure, knife, None));
        assert!(stash.place_in_composite(secure, watch, None));
    }

    #[test]
    fn test_weapon_slot_filters() {
        let mut stash = Stash::new();
        let player = player_loadout(&mut stash);
        let secondary = player.grid("Secondary").expect("slot");
        let rifle = make_test_entity(&mut stash, "gunRifle", 4, 2);
        let pistol = make_test_entity(&mut stash, "gunPistol", 2, 1);

        let release = |stash: &mut Stash, entity| {
            PlacementResolver::new(stash).resolve(DragGesture { entity, target: secondary, cell: Cell::new(0, 0) })
        };
        assert!(release(&mut stash, rifle).is_rejected());
        assert!(matches!(release(&mut stash, pistol), DropOutcome::Placed { .. }));
    }

    #[test]
    fn test_region_value_counts_once() {
        let mut stash = Stash::new();
        let player = player_loadout(&mut stash);
        let mut bag = Entity::new(EntityId(0), 10501, "Assault Pack", "bag");
        bag.width = 3;
        bag.height = 3;
        bag.value = 1000;
        bag.carrier = Some(crate::items::CarrierClass::Bag);
        bag.layout = vec![LayoutRect::new(2, 2, 0, 0)];
        let bag = stash.insert(bag);
        let watch = make_test_entity(&mut stash, "collection", 1, 1);

        stash.place(bag, player.grid("Backpack").expect("slot"), None);
        stash.place_in_composite(player.composite("ContainerBackpack").expect("c"), watch, None);
        assert_eq!(player.value(&stash), 1050);
    }

    #[test]
    fn test_ground_is_designated() {
        let mut stash = Stash::new();
        let region = ground(&mut stash, GROUND_SIZE.0, GROUND_SIZE.1);
        assert_eq!(stash.ground(), region.grid("Ground"));
        assert_eq!(stash.grid_by_name("Ground"), stash.ground());
    }
}
