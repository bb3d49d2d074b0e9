//! Stash
//!
//! The placement context. Owns every entity, spatial grid and composite,
//! keeps the ownership index (entity -> grid, grid -> owner) and records
//! grid notifications. All moves go through here so an entity is always
//! removed from its previous grid before it enters a new one.

use std::cmp::Reverse;
use std::collections::HashMap;

use crate::data::Catalog;
use crate::items::{
    layout_is_disjoint, CatalogId, Cell, CompositeGrid, CompositeId, Entity, EntityId, GridId,
    LayoutRect, Socket, SpatialGrid,
};

use super::events::GridEvent;

/// Owner of a spatial grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridOwner {
    /// Top-level grid of a scene (equip slot, spoils box, ground)
    Root { name: String },
    /// Accessory socket or carrier compartment of an entity
    Socket { entity: EntityId },
    /// Sub-grid of a composite that has no carrier
    Composite { composite: CompositeId },
}

/// Where an entity currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub grid: GridId,
    pub cell: Cell,
}

#[derive(Debug, Default)]
pub struct Stash {
    next_id: u64,
    pub(super) entities: HashMap<EntityId, Entity>,
    pub(super) grids: HashMap<GridId, SpatialGrid>,
    pub(super) composites: HashMap<CompositeId, CompositeGrid>,
    pub(super) owners: HashMap<GridId, GridOwner>,
    locations: HashMap<EntityId, Location>,
    /// Root grids in creation order
    roots: Vec<GridId>,
    /// Carrier equip slot -> composite mirroring the equipped carrier
    pub(super) bindings: HashMap<GridId, CompositeId>,
    ground: Option<GridId>,
    events: Vec<GridEvent>,
    /// Unsearched entities cannot be picked up
    need_search: bool,
}

impl Stash {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Instantiate an entity from its catalog definition, building its
    /// accessory sockets from the slot-compatibility table
    pub fn spawn(&mut self, catalog: &Catalog, catalog_id: CatalogId) -> Option<EntityId> {
        let Some(template) = catalog.entity_definition(catalog_id) else {
            log::warn!("Unknown catalog id {}, nothing spawned", catalog_id);
            return None;
        };
        let id = EntityId(self.next_id());
        self.entities.insert(id, template.instantiate(id));

        for slot in &template.sockets {
            match catalog.socket_compatibility(catalog_id, slot) {
                Some(compat) if !compat.accepted_ids.is_empty() => {
                    let grid = SpatialGrid::slot()
                        .titled(compat.socket_name.clone())
                        .accepting_ids(compat.accepted_ids);
                    self.add_socket(id, slot, &compat.socket_name, grid);
                }
                Some(_) => log::warn!(
                    "Socket '{}' of {} lists no compatible entities, omitted",
                    slot,
                    template.name
                ),
                None => log::warn!(
                    "No compatibility data for socket '{}' of {}, omitted",
                    slot,
                    template.name
                ),
            }
        }
        Some(id)
    }

    /// Take ownership of a hand-built entity, assigning it a fresh id
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_id());
        entity.id = id;
        entity.sockets.clear();
        entity.compartments.clear();
        self.entities.insert(id, entity);
        id
    }

    /// Give an entity a new accessory socket backed by `grid`
    pub fn add_socket(&mut self, entity: EntityId, slot: &str, name: &str, grid: SpatialGrid) -> Option<GridId> {
        if !self.entities.contains_key(&entity) {
            return None;
        }
        let grid_id = GridId(self.next_id());
        self.grids.insert(grid_id, grid);
        self.owners.insert(grid_id, GridOwner::Socket { entity });
        if let Some(host) = self.entities.get_mut(&entity) {
            host.sockets.push(Socket {
                slot: slot.to_string(),
                name: name.to_string(),
                grid: grid_id,
            });
        }
        Some(grid_id)
    }

    /// Register a top-level grid under a scene name
    pub fn add_grid(&mut self, name: &str, mut grid: SpatialGrid) -> GridId {
        let id = GridId(self.next_id());
        if grid.title.is_empty() {
            grid.title = name.to_string();
        }
        self.grids.insert(id, grid);
        self.owners.insert(id, GridOwner::Root { name: name.to_string() });
        self.roots.push(id);
        id
    }

    /// Register a composite and build its sub-grids
    pub fn add_composite(&mut self, composite: CompositeGrid) -> CompositeId {
        let id = CompositeId(self.next_id());
        if !layout_is_disjoint(composite.layout()) {
            log::warn!("Layout of {} has overlapping sub-grids", composite.title);
        }
        self.composites.insert(id, composite);
        self.rebuild(id);
        id
    }

    /// Replace the layout of an unbound composite and rebuild it
    pub fn set_composite_layout(&mut self, composite: CompositeId, layout: Vec<LayoutRect>) -> bool {
        if !layout_is_disjoint(&layout) {
            log::warn!("Rejected layout with overlapping sub-grids");
            return false;
        }
        let Some(c) = self.composites.get_mut(&composite) else {
            return false;
        };
        if c.carrier().is_some() {
            return false;
        }
        let grids = c.grids().to_vec();
        c.set_layout(layout, grids);
        self.rebuild(composite)
    }

    /// Destroy the sub-grids of an unbound composite and build one grid per
    /// layout entry. Entities held by the old grids are queued for the next
    /// auto-arrange. Bound composites take their grids from the carrier and
    /// are left alone.
    pub fn rebuild(&mut self, composite: CompositeId) -> bool {
        let Some(c) = self.composites.get(&composite) else {
            return false;
        };
        if c.carrier().is_some() {
            log::debug!("{} is bound to a carrier, not rebuilt", c.title);
            return false;
        }
        let old = c.grids().to_vec();
        let layout = c.layout().to_vec();
        let title = c.title.clone();
        let accept = c.accept_kinds.clone();
        let reject = c.reject_kinds.clone();

        let mut orphans = Vec::new();
        for grid in old {
            for entity in self.entities_in(grid) {
                self.detach(entity);
                orphans.push(entity);
            }
            self.grids.remove(&grid);
            self.owners.remove(&grid);
        }

        let mut grids = Vec::with_capacity(layout.len());
        for (i, rect) in layout.iter().enumerate() {
            let id = GridId(self.next_id());
            let grid = SpatialGrid::new(rect.width, rect.height)
                .titled(format!("{}_{}", title, i))
                .accepting(accept.iter().cloned())
                .rejecting(reject.iter().cloned());
            self.grids.insert(id, grid);
            self.owners.insert(id, GridOwner::Composite { composite });
            grids.push(id);
        }

        if let Some(c) = self.composites.get_mut(&composite) {
            c.set_layout(layout, grids);
            for entity in orphans {
                c.queue(entity);
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn grid(&self, id: GridId) -> Option<&SpatialGrid> {
        self.grids.get(&id)
    }

    pub fn composite(&self, id: CompositeId) -> Option<&CompositeGrid> {
        self.composites.get(&id)
    }

    pub fn owner(&self, grid: GridId) -> Option<&GridOwner> {
        self.owners.get(&grid)
    }

    pub fn location(&self, entity: EntityId) -> Option<Location> {
        self.locations.get(&entity).copied()
    }

    /// Root grid registered under `name`
    pub fn grid_by_name(&self, name: &str) -> Option<GridId> {
        self.roots.iter().copied().find(|id| {
            matches!(self.owners.get(id), Some(GridOwner::Root { name: n }) if n == name)
        })
    }

    pub fn composite_by_name(&self, title: &str) -> Option<CompositeId> {
        self.composites
            .iter()
            .find(|(_, c)| c.title == title)
            .map(|(id, _)| *id)
    }

    /// Root grids in creation order
    pub fn roots(&self) -> &[GridId] {
        &self.roots
    }

    /// Entities placed in a grid, in insertion order
    pub fn entities_in(&self, grid: GridId) -> Vec<EntityId> {
        self.grids
            .get(&grid)
            .map(|g| g.entities().collect())
            .unwrap_or_default()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn ground(&self) -> Option<GridId> {
        self.ground
    }

    /// Designate the grid that receives dropped and evacuated entities
    pub fn set_ground(&mut self, grid: GridId) {
        self.ground = Some(grid);
    }

    // ------------------------------------------------------------------
    // Ownership index
    // ------------------------------------------------------------------

    /// Entities enclosing a grid, innermost first. Follows the index:
    /// grid -> owning entity -> grid holding that entity -> ...
    pub fn enclosing_entities(&self, grid: GridId) -> Vec<EntityId> {
        let mut chain = Vec::new();
        let mut current = Some(grid);
        while let Some(g) = current.take() {
            if let Some(GridOwner::Socket { entity }) = self.owners.get(&g) {
                if chain.contains(entity) {
                    break;
                }
                chain.push(*entity);
                current = self.locations.get(entity).map(|loc| loc.grid);
            }
        }
        chain
    }

    /// Carrier whose compartment `grid` is
    pub fn compartment_owner(&self, grid: GridId) -> Option<EntityId> {
        match self.owners.get(&grid) {
            Some(GridOwner::Socket { entity }) => self
                .entities
                .get(entity)
                .filter(|e| e.compartments.contains(&grid))
                .map(|e| e.id),
            _ => None,
        }
    }

    /// Whether an entity sits in a carrier equip slot
    pub fn is_equipped(&self, entity: EntityId) -> bool {
        self.locations
            .get(&entity)
            .is_some_and(|loc| self.bindings.contains_key(&loc.grid))
    }

    /// Compartments of an unequipped carrier are closed
    pub fn is_open(&self, grid: GridId) -> bool {
        self.compartment_owner(grid)
            .map_or(true, |carrier| self.is_equipped(carrier))
    }

    /// Nesting rules: never inside itself, no carrier inside a carrier,
    /// no placement into a closed compartment
    pub fn containment_allows(&self, entity: EntityId, grid: GridId) -> bool {
        let Some(e) = self.entities.get(&entity) else {
            return false;
        };
        if !self.is_open(grid) {
            return false;
        }
        let chain = self.enclosing_entities(grid);
        if chain.contains(&entity) {
            return false;
        }
        if e.is_carrier()
            && chain
                .iter()
                .any(|id| self.entities.get(id).is_some_and(Entity::is_carrier))
        {
            return false;
        }
        true
    }

    // ------------------------------------------------------------------
    // Placement primitives
    // ------------------------------------------------------------------

    /// Full validity check for an exact position
    pub fn can_place(&self, entity: EntityId, grid: GridId, cell: Cell, rotated: bool) -> bool {
        let (Some(e), Some(g)) = (self.entities.get(&entity), self.grids.get(&grid)) else {
            return false;
        };
        self.containment_allows(entity, grid) && g.check_accept(e) && g.can_place_at(e, cell, rotated)
    }

    /// First free position for an entity in a grid, unrotated first
    pub fn find_space(&self, entity: EntityId, grid: GridId) -> Option<(Cell, bool)> {
        let e = self.entities.get(&entity)?;
        let g = self.grids.get(&grid)?;
        if !self.containment_allows(entity, grid) {
            return None;
        }
        g.find_space_for(e)
    }

    /// Place an entity, at `at` if that cell is valid, otherwise at the
    /// first free cell. On failure nothing changes.
    pub fn place(&mut self, entity: EntityId, grid: GridId, at: Option<Cell>) -> bool {
        if let Some(cell) = at {
            if self.can_place(entity, grid, cell, false) {
                self.commit(entity, grid, cell, false);
                return true;
            }
            log::debug!("{} does not fit at ({}, {}) in {}, searching", entity, cell.col, cell.row, grid);
        }
        match self.find_space(entity, grid) {
            Some((cell, rotated)) => {
                self.commit(entity, grid, cell, rotated);
                true
            }
            None => false,
        }
    }

    /// Place an entity at exactly `cell`, rotating it first if asked
    pub fn place_at(&mut self, entity: EntityId, grid: GridId, cell: Cell, rotated: bool) -> bool {
        if !self.can_place(entity, grid, cell, rotated) {
            return false;
        }
        self.commit(entity, grid, cell, rotated);
        true
    }

    /// Detach an entity from its grid; it stays alive, unplaced
    pub fn remove(&mut self, entity: EntityId) -> bool {
        self.detach(entity).is_some()
    }

    /// Put an entity back where it was, skipping validation (rollback only)
    pub(super) fn restore(&mut self, entity: EntityId, loc: Location) {
        self.commit(entity, loc.grid, loc.cell, false);
    }

    fn commit(&mut self, entity: EntityId, grid: GridId, cell: Cell, rotated: bool) {
        let from = self.detach(entity).map(|loc| loc.grid);
        for composite in self.composites.values_mut() {
            composite.dequeue(entity);
        }
        if rotated {
            if let Some(e) = self.entities.get_mut(&entity) {
                e.rotate();
            }
        }
        self.attach(entity, grid, cell, from);
        log::debug!("Placed {} in {} at ({}, {})", entity, grid, cell.col, cell.row);
    }

    pub(super) fn detach(&mut self, entity: EntityId) -> Option<Location> {
        let loc = self.locations.remove(&entity)?;
        if let Some(grid) = self.grids.get_mut(&loc.grid) {
            grid.take(entity);
        }
        self.events.push(GridEvent::Left { grid: loc.grid, entity });
        self.on_left(loc.grid, entity);
        Some(loc)
    }

    fn attach(&mut self, entity: EntityId, grid: GridId, cell: Cell, from: Option<GridId>) {
        let (Some(e), Some(g)) = (self.entities.get(&entity), self.grids.get_mut(&grid)) else {
            return;
        };
        g.insert(e, cell);
        let equipped = g.is_fullfill();
        self.locations.insert(entity, Location { grid, cell });
        if equipped {
            if let Some(e) = self.entities.get_mut(&entity) {
                e.searched = true;
            }
        }
        self.events.push(GridEvent::Entered { grid, entity, cell, from });
        self.on_entered(grid, entity);
    }

    /// Destroy an entity together with everything nested inside it
    pub fn discard(&mut self, entity: EntityId) -> bool {
        if !self.entities.contains_key(&entity) {
            return false;
        }
        self.detach(entity);
        for composite in self.composites.values_mut() {
            composite.dequeue(entity);
        }
        let Some(removed) = self.entities.remove(&entity) else {
            return false;
        };
        for grid in removed.nested_grids() {
            for child in self.entities_in(grid) {
                self.discard(child);
            }
            self.grids.remove(&grid);
            self.owners.remove(&grid);
        }
        self.events.push(GridEvent::Destroyed { entity });
        log::debug!("Destroyed {} ({})", removed.name, entity);
        true
    }

    /// Rotate an entity. A placed entity rotates in place only if the new
    /// footprint fits at its anchor.
    pub fn rotate(&mut self, entity: EntityId) -> bool {
        let Some(loc) = self.locations.get(&entity).copied() else {
            return match self.entities.get_mut(&entity) {
                Some(e) => {
                    e.rotate();
                    true
                }
                None => false,
            };
        };
        let (Some(e), Some(grid)) = (self.entities.get_mut(&entity), self.grids.get_mut(&loc.grid)) else {
            return false;
        };
        if !grid.is_fullfill() && !grid.can_place_at(e, loc.cell, true) {
            return false;
        }
        grid.take(entity);
        e.rotate();
        grid.insert(e, loc.cell);
        true
    }

    // ------------------------------------------------------------------
    // Stacks
    // ------------------------------------------------------------------

    /// Set a stack size; zero destroys the entity
    pub fn set_stack_count(&mut self, entity: EntityId, count: u32) -> bool {
        if count == 0 {
            return self.discard(entity);
        }
        match self.entities.get_mut(&entity) {
            Some(e) => {
                e.stack_count = count.min(e.stack_max.max(1));
                true
            }
            None => false,
        }
    }

    /// Move as many units as fit from `source` into `host`.
    /// An exhausted source is destroyed. Returns the units moved.
    pub fn merge_stack(&mut self, host: EntityId, source: EntityId) -> u32 {
        let (Some(o), Some(d)) = (self.entities.get(&host), self.entities.get(&source)) else {
            return 0;
        };
        if !o.stacks_with(d) {
            return 0;
        }
        let moved = o.stack_max.saturating_sub(o.stack_count).min(d.stack_count);
        if moved == 0 {
            return 0;
        }
        if let Some(o) = self.entities.get_mut(&host) {
            o.stack_count += moved;
        }
        let left = match self.entities.get_mut(&source) {
            Some(d) => {
                d.stack_count -= moved;
                d.stack_count
            }
            None => 0,
        };
        if left == 0 {
            self.discard(source);
        }
        moved
    }

    // ------------------------------------------------------------------
    // Value
    // ------------------------------------------------------------------

    /// Own stack value plus everything nested in sockets and compartments
    pub fn value(&self, entity: EntityId) -> u64 {
        let Some(e) = self.entities.get(&entity) else {
            return 0;
        };
        e.stack_value() + e.nested_grids().map(|g| self.grid_value(g)).sum::<u64>()
    }

    pub fn grid_value(&self, grid: GridId) -> u64 {
        self.grids
            .get(&grid)
            .map(|g| g.entities().map(|id| self.value(id)).sum())
            .unwrap_or(0)
    }

    /// Value held by a composite's sub-grids. For a bound composite these
    /// are the carrier's compartments, already part of the carrier's value.
    pub fn composite_value(&self, composite: CompositeId) -> u64 {
        self.composites
            .get(&composite)
            .map(|c| c.grids().iter().map(|g| self.grid_value(*g)).sum())
            .unwrap_or(0)
    }

    pub fn total_value(&self, grids: &[GridId]) -> u64 {
        grids.iter().map(|g| self.grid_value(*g)).sum()
    }

    // ------------------------------------------------------------------
    // Composites
    // ------------------------------------------------------------------

    /// Place into a composite: a composite-space cell routes to the sub-grid
    /// containing it, otherwise sub-grids are tried in layout order
    pub fn place_in_composite(&mut self, composite: CompositeId, entity: EntityId, at: Option<Cell>) -> bool {
        let Some(c) = self.composites.get(&composite) else {
            return false;
        };
        if let Some((grid, local)) = at.and_then(|cell| c.sub_grid_at(cell)) {
            return self.place(entity, grid, Some(local));
        }
        let grids = c.grids().to_vec();
        grids.into_iter().any(|grid| self.place(entity, grid, None))
    }

    /// Hold an entity back until the next auto-arrange
    pub fn queue_in_composite(&mut self, composite: CompositeId, entity: EntityId) -> bool {
        if !self.entities.contains_key(&entity) {
            return false;
        }
        match self.composites.get_mut(&composite) {
            Some(c) => {
                c.queue(entity);
                true
            }
            None => false,
        }
    }

    /// Re-pack a composite largest-first. Returns how many entities could
    /// not be placed; those stay queued on the composite.
    pub fn auto_arrange(&mut self, composite: CompositeId) -> usize {
        let Some(c) = self.composites.get_mut(&composite) else {
            return 0;
        };
        let pending = c.take_pending();
        let grids = c.grids().to_vec();
        let title = c.title.clone();

        let mut collected: Vec<EntityId> = grids.iter().flat_map(|g| self.entities_in(*g)).collect();
        // queued entities placed elsewhere since stay where they are
        for id in pending {
            let loose = self.entities.contains_key(&id) && !self.locations.contains_key(&id);
            if loose && !collected.contains(&id) {
                collected.push(id);
            }
        }
        for grid in &grids {
            for id in self.entities_in(*grid) {
                self.detach(id);
            }
        }

        collected.sort_by_key(|id| Reverse(self.entities.get(id).map_or(0, Entity::area)));

        let mut unplaced = 0;
        for id in collected {
            if !self.place_in_composite(composite, id, None) {
                log::warn!("No room for {} in {} after auto-arrange", id, title);
                if let Some(c) = self.composites.get_mut(&composite) {
                    c.queue(id);
                }
                unplaced += 1;
            }
        }
        log::info!("Auto-arranged {} ({} left over)", title, unplaced);
        unplaced
    }

    // ------------------------------------------------------------------
    // Ground
    // ------------------------------------------------------------------

    /// Move an entity onto the ground; destroyed if there is no room.
    /// Carriers arrive empty.
    pub fn discard_to_ground(&mut self, entity: EntityId) -> bool {
        let Some(ground) = self.ground else {
            log::warn!("No ground container, destroying {}", entity);
            self.discard(entity);
            return false;
        };
        if !self.place(entity, ground, None) {
            log::warn!("No room on the ground for {}, destroying it", entity);
            self.discard(entity);
            return false;
        }
        if self.entities.get(&entity).is_some_and(Entity::is_carrier) {
            self.evacuate_to_ground(entity);
        }
        true
    }

    /// Empty a carrier's compartments onto the ground. Returns how many
    /// entities were moved; those without room are destroyed.
    pub fn evacuate_to_ground(&mut self, carrier: EntityId) -> usize {
        let Some(ground) = self.ground else {
            return 0;
        };
        let compartments = self
            .entities
            .get(&carrier)
            .map(|e| e.compartments.clone())
            .unwrap_or_default();

        let mut moved = 0;
        for grid in compartments {
            for id in self.entities_in(grid) {
                if self.place(id, ground, None) {
                    moved += 1;
                } else {
                    let name = self.entities.get(&id).map(|e| e.name.clone()).unwrap_or_default();
                    log::warn!("No room on the ground for {} ({}), destroying it", name, id);
                    self.discard(id);
                }
            }
        }
        if moved > 0 {
            log::debug!("Evacuated {} entities from {}", moved, carrier);
        }
        moved
    }

    // ------------------------------------------------------------------
    // Firearms
    // ------------------------------------------------------------------

    /// Base magazine capacity plus bonuses of attached accessories
    pub fn effective_capacity(&self, firearm: EntityId) -> u32 {
        let Some(e) = self.entities.get(&firearm) else {
            return 0;
        };
        let Some(magazine) = &e.firearm else {
            return 0;
        };
        let bonus: u32 = e
            .sockets
            .iter()
            .flat_map(|s| self.entities_in(s.grid))
            .filter_map(|id| self.entities.get(&id))
            .map(|a| a.capacity_bonus)
            .sum();
        magazine.capacity + bonus
    }

    /// Feed rounds from an ammo stack into a firearm. A fully used stack is
    /// destroyed. Returns rounds moved.
    pub fn load_ammo(&mut self, firearm: EntityId, ammo: EntityId) -> u32 {
        let capacity = self.effective_capacity(firearm);
        let (Some(f), Some(a)) = (self.entities.get(&firearm), self.entities.get(&ammo)) else {
            return 0;
        };
        if !f.chambers(a) {
            return 0;
        }
        let (ammo_id, rounds) = (a.catalog_id, a.stack_count);

        let moved = match self.entities.get_mut(&firearm).and_then(|e| e.firearm.as_mut()) {
            Some(magazine) => magazine.load(ammo_id, rounds, capacity),
            None => 0,
        };
        if moved == 0 {
            return 0;
        }
        if moved == rounds {
            self.discard(ammo);
        } else if let Some(a) = self.entities.get_mut(&ammo) {
            a.stack_count -= moved;
        }
        moved
    }

    /// Empty a firearm's magazine into fresh ammo stacks, placed next to the
    /// firearm when its grid has room and on the ground otherwise
    pub fn unload_ammo(&mut self, catalog: &Catalog, firearm: EntityId) -> Vec<EntityId> {
        let loaded = match self.entities.get_mut(&firearm).and_then(|e| e.firearm.as_mut()) {
            Some(magazine) => magazine.unload(),
            None => return Vec::new(),
        };
        let target = self
            .locations
            .get(&firearm)
            .map(|loc| loc.grid)
            .filter(|g| self.grids.get(g).is_some_and(|g| !g.is_fullfill()));

        let mut spawned = Vec::new();
        for (ammo_id, mut rounds) in loaded {
            while rounds > 0 {
                let Some(id) = self.spawn(catalog, ammo_id) else {
                    log::warn!("Lost {} rounds of unknown ammo {}", rounds, ammo_id);
                    break;
                };
                let stack_max = self.entities.get(&id).map_or(1, |e| e.stack_max.max(1));
                let count = rounds.min(stack_max);
                self.set_stack_count(id, count);
                rounds -= count;

                let placed = target.is_some_and(|grid| self.place(id, grid, None));
                if placed || self.discard_to_ground(id) {
                    spawned.push(id);
                }
            }
        }
        spawned
    }

    /// Catalog value of rounds loaded in an entity and everything nested in it
    pub fn loaded_ammo_value(&self, catalog: &Catalog, entity: EntityId) -> u64 {
        let Some(e) = self.entities.get(&entity) else {
            return 0;
        };
        let own: u64 = e
            .firearm
            .iter()
            .flat_map(|f| f.loaded.iter())
            .map(|(id, rounds)| {
                catalog.entity_definition(*id).map_or(0, |t| t.value) * *rounds as u64
            })
            .sum();
        let nested: u64 = e
            .nested_grids()
            .flat_map(|g| self.entities_in(g))
            .map(|id| self.loaded_ammo_value(catalog, id))
            .sum();
        own + nested
    }

    // ------------------------------------------------------------------
    // Searching
    // ------------------------------------------------------------------

    /// Require entities to be searched before they can be picked up
    pub fn set_need_search(&mut self, on: bool) {
        self.need_search = on;
    }

    pub fn need_search(&self) -> bool {
        self.need_search
    }

    pub fn is_searched(&self, entity: EntityId) -> bool {
        self.entities.get(&entity).is_some_and(|e| e.searched)
    }

    /// Whether a press on this entity may start a drag
    pub fn can_pick_up(&self, entity: EntityId) -> bool {
        match self.entities.get(&entity) {
            Some(e) => !self.need_search || e.searched,
            None => false,
        }
    }

    /// Reveal an entity. False when it is unknown or already searched.
    pub fn search(&mut self, entity: EntityId) -> bool {
        match self.entities.get_mut(&entity) {
            Some(e) if !e.searched => {
                e.searched = true;
                log::debug!("Searched {}", entity);
                true
            }
            _ => false,
        }
    }

    /// First unsearched entity, scanning the grids in order and each grid
    /// in placement order
    pub fn next_unsearched(&self, grids: &[GridId]) -> Option<EntityId> {
        grids
            .iter()
            .filter_map(|g| self.grids.get(g))
            .flat_map(|g| g.entities())
            .find(|id| !self.is_searched(*id))
    }

    /// Search everything in the grids; returns how many were revealed
    pub fn search_all(&mut self, grids: &[GridId]) -> usize {
        let mut revealed = 0;
        while let Some(id) = self.next_unsearched(grids) {
            if !self.search(id) {
                break;
            }
            revealed += 1;
        }
        revealed
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Take all pending notifications
    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[GridEvent] {
        &self.events
    }

    pub(super) fn event_mark(&self) -> usize {
        self.events.len()
    }

    pub(super) fn rewind_events(&mut self, mark: usize) {
        self.events.truncate(mark);
    }

    // ------------------------------------------------------------------
    // Consistency
    // ------------------------------------------------------------------

    /// Describe every broken placement invariant (empty when consistent)
    pub fn audit(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen: HashMap<EntityId, GridId> = HashMap::new();

        for (gid, grid) in &self.grids {
            let placements = grid.placements();
            if grid.is_fullfill() && placements.len() > 1 {
                problems.push(format!("fullfill grid {} holds {} entities", gid, placements.len()));
            }
            for (i, p) in placements.iter().enumerate() {
                if let Some(prev) = seen.insert(p.entity, *gid) {
                    problems.push(format!("{} placed in both {} and {}", p.entity, prev, gid));
                }
                if self.locations.get(&p.entity) != Some(&Location { grid: *gid, cell: p.cell }) {
                    problems.push(format!("{} has a stale location", p.entity));
                }
                let rect = p.rect();
                let in_bounds = if grid.is_fullfill() {
                    p.cell == Cell::default()
                } else {
                    rect.right() <= grid.width() as u16 && rect.bottom() <= grid.height() as u16
                };
                if !in_bounds {
                    problems.push(format!("{} is out of bounds in {}", p.entity, gid));
                }
                for q in &placements[i + 1..] {
                    if rect.intersects(&q.rect()) {
                        problems.push(format!("{} overlaps {} in {}", p.entity, q.entity, gid));
                    }
                }
            }
        }

        for (id, loc) in &self.locations {
            if !seen.contains_key(id) {
                problems.push(format!("{} located in {} but not placed there", id, loc.grid));
            }
        }

        for (id, e) in &self.entities {
            let Some(loc) = self.locations.get(id) else {
                continue;
            };
            let chain = self.enclosing_entities(loc.grid);
            if chain.contains(id) {
                problems.push(format!("{} is nested inside itself", id));
            }
            if e.is_carrier()
                && chain
                    .iter()
                    .any(|c| self.entities.get(c).is_some_and(Entity::is_carrier))
            {
                problems.push(format!("carrier {} is nested inside another carrier", id));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::CarrierClass;

    fn make_test_entity(stash: &mut Stash, name: &str, kind: &str, width: u8, height: u8) -> EntityId {
        let mut entity = Entity::new(EntityId(0), 1, name, kind);
        entity.width = width;
        entity.height = height;
        entity.value = 100;
        stash.insert(entity)
    }

    fn make_test_bag(stash: &mut Stash) -> EntityId {
        let id = make_test_entity(stash, "Pack", "bag", 3, 3);
        if let Some(e) = stash.entity_mut(id) {
            e.carrier = Some(CarrierClass::Bag);
        }
        id
    }

    fn assert_consistent(stash: &Stash) {
        let problems = stash.audit();
        assert!(problems.is_empty(), "invariants broken: {:?}", problems);
    }

    #[test]
    fn test_auto_place_row_major() {
        let mut stash = Stash::new();
        let grid = stash.add_grid("box", SpatialGrid::new(2, 2));
        let a = make_test_entity(&mut stash, "A", "collection", 1, 1);
        let b = make_test_entity(&mut stash, "B", "collection", 1, 1);

        assert!(stash.place(a, grid, Some(Cell::new(0, 0))));
        assert!(stash.place(b, grid, None));
        assert_eq!(stash.location(b).map(|l| l.cell), Some(Cell::new(1, 0)));
        assert_consistent(&stash);
    }

    #[test]
    fn test_explicit_cell_falls_back_to_search() {
        let mut stash = Stash::new();
        let grid = stash.add_grid("box", SpatialGrid::new(3, 1));
        let a = make_test_entity(&mut stash, "A", "collection", 1, 1);
        let b = make_test_entity(&mut stash, "B", "collection", 1, 1);
        stash.place(a, grid, Some(Cell::new(1, 0)));

        assert!(stash.place(b, grid, Some(Cell::new(1, 0))));
        assert_eq!(stash.location(b).map(|l| l.cell), Some(Cell::new(0, 0)));
        assert!(!stash.place_at(a, grid, Cell::new(0, 0), false));
    }

    #[test]
    fn test_failed_place_leaves_entity_in_place() {
        let mut stash = Stash::new();
        let src = stash.add_grid("src", SpatialGrid::new(4, 4));
        let dst = stash.add_grid("dst", SpatialGrid::new(1, 1));
        let big = make_test_entity(&mut stash, "Big", "collection", 2, 2);
        stash.place(big, src, Some(Cell::new(2, 2)));
        stash.drain_events();

        assert!(!stash.place(big, dst, None));
        assert_eq!(stash.location(big), Some(Location { grid: src, cell: Cell::new(2, 2) }));
        assert!(stash.events().is_empty());
    }

    #[test]
    fn test_move_keeps_single_owner() {
        let mut stash = Stash::new();
        let a_grid = stash.add_grid("a", SpatialGrid::new(2, 2));
        let b_grid = stash.add_grid("b", SpatialGrid::new(2, 2));
        let item = make_test_entity(&mut stash, "Watch", "collection", 1, 1);
        stash.place(item, a_grid, None);
        stash.drain_events();

        assert!(stash.place(item, b_grid, None));
        assert!(stash.grid(a_grid).is_some_and(SpatialGrid::is_empty));
        assert_eq!(stash.entities_in(b_grid), vec![item]);
        assert_eq!(
            stash.drain_events(),
            vec![
                GridEvent::Left { grid: a_grid, entity: item },
                GridEvent::Entered { grid: b_grid, entity: item, cell: Cell::new(0, 0), from: Some(a_grid) },
            ]
        );
        assert_consistent(&stash);
    }

    #[test]
    fn test_entity_cannot_enter_own_socket() {
        let mut stash = Stash::new();
        let rifle = make_test_entity(&mut stash, "Rifle", "gunRifle", 4, 2);
        let socket = stash.add_socket(rifle, "scope", "Scope", SpatialGrid::slot());
        let socket = socket.expect("socket");

        assert!(!stash.place(rifle, socket, None));
    }

    #[test]
    fn test_bag_rejected_in_bag_socket() {
        let mut stash = Stash::new();
        let outer = make_test_bag(&mut stash);
        let inner = make_test_bag(&mut stash);
        let pouch = stash.add_socket(outer, "pouch", "Pouch", SpatialGrid::new(5, 5)).expect("socket");

        assert!(!stash.place(inner, pouch, None));

        let watch = make_test_entity(&mut stash, "Watch", "collection", 1, 1);
        assert!(stash.place(watch, pouch, None));
    }

    #[test]
    fn test_value_includes_nested_sockets() {
        let mut stash = Stash::new();
        let rifle = make_test_entity(&mut stash, "Rifle", "gunRifle", 4, 2);
        let scope_slot = stash.add_socket(rifle, "scope", "Scope", SpatialGrid::slot()).expect("socket");
        let scope = make_test_entity(&mut stash, "Red Dot", "accScope", 1, 1);
        stash.place(scope, scope_slot, None);

        if let Some(e) = stash.entity_mut(rifle) {
            e.value = 1000;
        }
        assert_eq!(stash.value(rifle), 1000 + 100);
        assert_eq!(stash.value(rifle), stash.entity(rifle).map_or(0, Entity::stack_value) + stash.value(scope));
    }

    #[test]
    fn test_rotate_in_place_needs_room() {
        let mut stash = Stash::new();
        let grid = stash.add_grid("box", SpatialGrid::new(3, 3));
        let long = make_test_entity(&mut stash, "Long", "collection", 3, 1);
        stash.place(long, grid, Some(Cell::new(0, 0)));

        assert!(stash.rotate(long));
        assert_eq!(stash.entity(long).map(Entity::size), Some((1, 3)));

        let blocker = make_test_entity(&mut stash, "Block", "collection", 1, 1);
        stash.place(blocker, grid, Some(Cell::new(2, 0)));
        assert!(!stash.rotate(long));
        assert_eq!(stash.entity(long).map(Entity::size), Some((1, 3)));
        assert_consistent(&stash);
    }

    #[test]
    fn test_discard_destroys_nested() {
        let mut stash = Stash::new();
        let grid = stash.add_grid("box", SpatialGrid::new(5, 5));
        let rifle = make_test_entity(&mut stash, "Rifle", "gunRifle", 4, 2);
        let socket = stash.add_socket(rifle, "muzzle", "Muzzle", SpatialGrid::slot()).expect("socket");
        let muzzle = make_test_entity(&mut stash, "Suppressor", "accMuzzle", 2, 1);
        stash.place(rifle, grid, None);
        stash.place(muzzle, socket, None);

        assert!(stash.discard(rifle));
        assert!(stash.entity(muzzle).is_none());
        assert!(stash.grid(socket).is_none());
        assert!(stash.grid(grid).is_some_and(SpatialGrid::is_empty));
        assert_consistent(&stash);
    }

    #[test]
    fn test_merge_stack_partial() {
        let mut stash = Stash::new();
        let host = make_test_entity(&mut stash, "5.56", "ammo556", 1, 1);
        let source = make_test_entity(&mut stash, "5.56", "ammo556", 1, 1);
        for id in [host, source] {
            if let Some(e) = stash.entity_mut(id) {
                e.stack_max = 60;
            }
        }
        stash.set_stack_count(host, 40);
        stash.set_stack_count(source, 30);

        assert_eq!(stash.merge_stack(host, source), 20);
        assert_eq!(stash.entity(host).map(|e| e.stack_count), Some(60));
        assert_eq!(stash.entity(source).map(|e| e.stack_count), Some(10));

        stash.set_stack_count(host, 50);
        assert_eq!(stash.merge_stack(host, source), 10);
        assert!(stash.entity(source).is_none());
    }

    #[test]
    fn test_composite_routes_cells_and_auto_arranges() {
        let mut stash = Stash::new();
        let layout = vec![LayoutRect::new(2, 2, 0, 0), LayoutRect::new(1, 1, 3, 0)];
        let pocket = stash.add_composite(CompositeGrid::new("Rig", layout));
        let grids = stash.composite(pocket).map(|c| c.grids().to_vec()).unwrap_or_default();
        assert_eq!(grids.len(), 2);

        let small = make_test_entity(&mut stash, "Small", "collection", 1, 1);
        assert!(stash.place_in_composite(pocket, small, Some(Cell::new(3, 0))));
        assert_eq!(stash.location(small), Some(Location { grid: grids[1], cell: Cell::new(0, 0) }));

        let big = make_test_entity(&mut stash, "Big", "collection", 2, 2);
        stash.queue_in_composite(pocket, big);
        assert_eq!(stash.auto_arrange(pocket), 0);
        assert_eq!(stash.location(big).map(|l| l.grid), Some(grids[0]));
        assert_eq!(stash.location(small).map(|l| l.grid), Some(grids[1]));
        assert_consistent(&stash);
    }

    #[test]
    fn test_auto_arrange_largest_first() {
        let mut stash = Stash::new();
        let box_id = stash.add_composite(CompositeGrid::new("Box", vec![LayoutRect::new(2, 2, 0, 0)]));
        let grid = stash.composite(box_id).map(|c| c.grids()[0]).expect("grid");
        let small = make_test_entity(&mut stash, "Small", "collection", 1, 1);
        let wide = make_test_entity(&mut stash, "Wide", "collection", 2, 1);
        stash.place(small, grid, Some(Cell::new(1, 0)));
        stash.place(wide, grid, Some(Cell::new(0, 1)));

        assert_eq!(stash.auto_arrange(box_id), 0);
        assert_eq!(stash.location(wide).map(|l| l.cell), Some(Cell::new(0, 0)));
        assert_eq!(stash.location(small).map(|l| l.cell), Some(Cell::new(0, 1)));
    }

    #[test]
    fn test_rebuild_queues_orphans() {
        let mut stash = Stash::new();
        let box_id = stash.add_composite(CompositeGrid::new("Box", vec![LayoutRect::new(2, 2, 0, 0)]));
        let watch = make_test_entity(&mut stash, "Watch", "collection", 1, 1);
        stash.place_in_composite(box_id, watch, None);

        assert!(stash.set_composite_layout(box_id, vec![LayoutRect::new(3, 1, 0, 0)]));
        assert!(stash.location(watch).is_none());
        assert_eq!(stash.composite(box_id).map(|c| c.pending().to_vec()), Some(vec![watch]));
        assert_eq!(stash.auto_arrange(box_id), 0);
        assert!(stash.location(watch).is_some());
    }

    #[test]
    fn test_auto_arrange_keeps_equal_area_order() {
        let mut stash = Stash::new();
        let box_id = stash.add_composite(CompositeGrid::new("Box", vec![LayoutRect::new(4, 1, 0, 0)]));
        let grid = stash.composite(box_id).map(|c| c.grids()[0]).expect("grid");
        let first = make_test_entity(&mut stash, "First", "collection", 1, 1);
        let second = make_test_entity(&mut stash, "Second", "collection", 1, 1);
        let wide = make_test_entity(&mut stash, "Wide", "collection", 2, 1);
        assert!(stash.place(first, grid, Some(Cell::new(3, 0))));
        assert!(stash.place(second, grid, Some(Cell::new(0, 0))));
        assert!(stash.place(wide, grid, Some(Cell::new(1, 0))));

        assert_eq!(stash.auto_arrange(box_id), 0);
        assert_eq!(stash.location(wide).map(|l| l.cell), Some(Cell::new(0, 0)));
        assert_eq!(stash.location(first).map(|l| l.cell), Some(Cell::new(2, 0)));
        assert_eq!(stash.location(second).map(|l| l.cell), Some(Cell::new(3, 0)));
        assert_consistent(&stash);
    }

    #[test]
    fn test_placing_queued_entity_leaves_queue() {
        let mut stash = Stash::new();
        let box_id = stash.add_composite(CompositeGrid::new("Box", vec![LayoutRect::new(2, 2, 0, 0)]));
        let floor = stash.add_grid("Ground", SpatialGrid::new(4, 4));
        let watch = make_test_entity(&mut stash, "Watch", "collection", 1, 1);
        stash.place_in_composite(box_id, watch, None);
        stash.set_composite_layout(box_id, vec![LayoutRect::new(3, 1, 0, 0)]);
        assert_eq!(stash.composite(box_id).map(|c| c.pending().len()), Some(1));

        assert!(stash.place(watch, floor, Some(Cell::new(2, 2))));
        assert_eq!(stash.composite(box_id).map(|c| c.pending().len()), Some(0));

        assert_eq!(stash.auto_arrange(box_id), 0);
        assert_eq!(stash.location(watch).map(|l| (l.grid, l.cell)), Some((floor, Cell::new(2, 2))));
        assert!(stash.entities_in(floor).contains(&watch));
        assert_consistent(&stash);
    }

    #[test]
    fn test_stale_queue_entry_is_skipped() {
        let mut stash = Stash::new();
        let box_id = stash.add_composite(CompositeGrid::new("Box", vec![LayoutRect::new(2, 2, 0, 0)]));
        let floor = stash.add_grid("Ground", SpatialGrid::new(4, 4));
        let watch = make_test_entity(&mut stash, "Watch", "collection", 1, 1);
        assert!(stash.place(watch, floor, Some(Cell::new(1, 1))));
        stash.queue_in_composite(box_id, watch);

        assert_eq!(stash.auto_arrange(box_id), 0);
        assert_eq!(stash.location(watch).map(|l| l.grid), Some(floor));
        assert_consistent(&stash);
    }

    #[test]
    fn test_search_reveals_in_grid_order() {
        let mut stash = Stash::new();
        let first = stash.add_grid("first", SpatialGrid::new(3, 1));
        let second = stash.add_grid("second", SpatialGrid::new(3, 1));
        let a = make_test_entity(&mut stash, "A", "collection", 1, 1);
        let b = make_test_entity(&mut stash, "B", "collection", 1, 1);
        let c = make_test_entity(&mut stash, "C", "collection", 1, 1);
        stash.place(c, second, None);
        stash.place(b, first, Some(Cell::new(2, 0)));
        stash.place(a, first, Some(Cell::new(0, 0)));
        stash.set_need_search(true);

        assert!(!stash.can_pick_up(b));
        assert_eq!(stash.next_unsearched(&[first, second]), Some(b));
        assert!(stash.search(b));
        assert!(!stash.search(b));
        assert!(stash.can_pick_up(b));
        assert_eq!(stash.next_unsearched(&[first, second]), Some(a));

        assert_eq!(stash.search_all(&[first, second]), 2);
        assert!(stash.is_searched(c));
        assert_eq!(stash.next_unsearched(&[first, second]), None);
    }

    #[test]
    fn test_equip_slot_marks_searched() {
        let mut stash = Stash::new();
        let slot = stash.add_grid("Helmet", SpatialGrid::slot());
        let floor = stash.add_grid("Ground", SpatialGrid::new(4, 4));
        let helmet = make_test_entity(&mut stash, "Helmet", "helmet", 2, 2);
        stash.set_need_search(true);

        assert!(stash.place(helmet, floor, None));
        assert!(!stash.is_searched(helmet));
        assert!(stash.place(helmet, slot, None));
        assert!(stash.is_searched(helmet));
        assert!(stash.place(helmet, floor, None));
        assert!(stash.can_pick_up(helmet));
    }

    #[test]
    fn test_pick_up_allowed_without_search_requirement() {
        let mut stash = Stash::new();
        let watch = make_test_entity(&mut stash, "Watch", "collection", 1, 1);
        assert!(stash.can_pick_up(watch));
        assert!(!stash.can_pick_up(EntityId(999)));
    }

    #[test]
    fn test_ground_discard_without_room_destroys() {
        let mut stash = Stash::new();
        let ground = stash.add_grid("Ground", SpatialGrid::new(1, 1));
        stash.set_ground(ground);
        let a = make_test_entity(&mut stash, "A", "collection", 1, 1);
        let b = make_test_entity(&mut stash, "B", "collection", 1, 1);

        assert!(stash.discard_to_ground(a));
        assert!(!stash.discard_to_ground(b));
        assert!(stash.entity(b).is_none());
    }

    #[test]
    fn test_load_ammo_with_capacity_bonus() {
        use crate::items::Firearm;

        let mut stash = Stash::new();
        let mut pistol = Entity::new(EntityId(0), 10003, "G17", "gunPistol");
        pistol.firearm = Some(Firearm::new("ammo9x19", 17));
        let pistol = stash.insert(pistol);
        let mag_slot = stash.add_socket(pistol, "magazine", "Magazine", SpatialGrid::slot()).expect("socket");
        let mag = make_test_entity(&mut stash, "Ext Mag", "accMagazine", 1, 1);
        if let Some(e) = stash.entity_mut(mag) {
            e.capacity_bonus = 8;
        }
        stash.place(mag, mag_slot, None);
        assert_eq!(stash.effective_capacity(pistol), 25);

        let ammo = make_test_entity(&mut stash, "9x19", "ammo9x19", 1, 1);
        if let Some(e) = stash.entity_mut(ammo) {
            e.stack_max = 60;
        }
        stash.set_stack_count(ammo, 30);

        assert_eq!(stash.load_ammo(pistol, ammo), 25);
        assert_eq!(stash.entity(ammo).map(|e| e.stack_count), Some(5));
        assert_eq!(stash.load_ammo(pistol, ammo), 0);

        let wrong = make_test_entity(&mut stash, "5.56", "ammo556", 1, 1);
        assert_eq!(stash.load_ammo(pistol, wrong), 0);
    }

    #[test]
    fn test_unload_ammo_beside_firearm_or_on_ground() {
        let catalog = crate::data::default_catalog();
        let mut stash = Stash::new();
        let crate_grid = stash.add_grid("Crate", SpatialGrid::new(4, 4));
        let holster = stash.add_grid("Secondary", SpatialGrid::slot());
        let ground = stash.add_grid("Ground", SpatialGrid::new(3, 3));
        stash.set_ground(ground);

        let loose = stash.spawn(&catalog, 10003).expect("pistol");
        let worn = stash.spawn(&catalog, 10003).expect("pistol");
        stash.place(loose, crate_grid, None);
        stash.place(worn, holster, None);
        for pistol in [loose, worn] {
            if let Some(f) = stash.entity_mut(pistol).and_then(|e| e.firearm.as_mut()) {
                f.load(10103, 17, 17);
            }
        }
        let round_value = catalog.entity_definition(10103).map_or(0, |t| t.value);
        let before = stash.value(loose);
        assert_eq!(stash.loaded_ammo_value(&catalog, loose), round_value * 17);

        let beside = stash.unload_ammo(&catalog, loose);
        assert_eq!(beside.len(), 1);
        assert_eq!(stash.location(beside[0]).map(|l| l.grid), Some(crate_grid));
        assert_eq!(stash.entity(beside[0]).map(|e| e.stack_count), Some(17));
        assert_eq!(stash.value(loose), before);
        assert_eq!(stash.loaded_ammo_value(&catalog, loose), 0);

        let dropped = stash.unload_ammo(&catalog, worn);
        assert_eq!(dropped.len(), 1);
        assert_eq!(stash.location(dropped[0]).map(|l| l.grid), Some(ground));
        assert_consistent(&stash);
    }

    #[test]
    fn test_lookups_and_totals() {
        let mut stash = Stash::new();
        let a = stash.add_grid("Crate", SpatialGrid::new(2, 2));
        let b = stash.add_grid("Ground", SpatialGrid::new(2, 2));
        let rig = stash.add_composite(CompositeGrid::new("Rig", vec![LayoutRect::new(1, 1, 0, 0)]));
        let watch = make_test_entity(&mut stash, "Watch", "collection", 1, 1);
        let lighter = make_test_entity(&mut stash, "Lighter", "collection", 1, 1);
        stash.place(watch, a, None);
        stash.place(lighter, b, None);

        assert_eq!(stash.roots(), &[a, b]);
        assert_eq!(stash.grid_by_name("Ground"), Some(b));
        assert_eq!(stash.composite_by_name("Rig"), Some(rig));
        assert_eq!(stash.total_value(&[a, b]), 200);
        assert_eq!(stash.grid(a).map(SpatialGrid::count), Some(1));
        assert_eq!(stash.entity_count(), 2);
    }
}
