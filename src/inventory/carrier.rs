//! Carrier binding
//!
//! Links a carrier equip slot (Backpack, ChestRig) to the composite that
//! shows the equipped carrier's compartments. Compartments live on the
//! carrier entity; the composite borrows them while the carrier is equipped
//! and forgets them when it leaves the slot.

use crate::items::{CompositeId, EntityId, GridId, LayoutRect, SpatialGrid};

use super::stash::{GridOwner, Stash};

impl Stash {
    /// Bind an equip slot to a composite. The composite's own sub-grids are
    /// dropped; a carrier already sitting in the slot is bound at once.
    pub fn bind_carrier_slot(&mut self, slot: GridId, composite: CompositeId) -> bool {
        if !self.grids.contains_key(&slot) || !self.composites.contains_key(&composite) {
            return false;
        }
        if self.bindings.contains_key(&slot) || self.bindings.values().any(|c| *c == composite) {
            log::warn!("{} or {} is already part of a carrier binding", slot, composite);
            return false;
        }
        self.set_composite_layout(composite, Vec::new());
        self.bindings.insert(slot, composite);
        for entity in self.entities_in(slot) {
            self.on_entered(slot, entity);
        }
        true
    }

    /// Composite bound to an equip slot
    pub fn binding(&self, slot: GridId) -> Option<CompositeId> {
        self.bindings.get(&slot).copied()
    }

    /// Equip slot a composite is bound to
    pub fn carrier_slot(&self, composite: CompositeId) -> Option<GridId> {
        self.bindings
            .iter()
            .find(|(_, c)| **c == composite)
            .map(|(slot, _)| *slot)
    }

    pub(super) fn on_entered(&mut self, grid: GridId, entity: EntityId) {
        let Some(&composite) = self.bindings.get(&grid) else {
            return;
        };
        let Some(e) = self.entities.get(&entity) else {
            return;
        };
        if !e.is_carrier() {
            return;
        }
        let layout = e.layout.clone();
        let class = e.carrier.map_or("carrier", |c| c.name());
        if e.compartments.is_empty() && !layout.is_empty() {
            self.open_compartments(entity, composite, &layout);
        }
        let compartments = self
            .entities
            .get(&entity)
            .map(|e| e.compartments.clone())
            .unwrap_or_default();

        if let Some(c) = self.composites.get_mut(&composite) {
            c.bind(entity, layout, compartments);
            log::debug!("{} now carries {} {} ({} cells)", c.title, class, entity, c.capacity());
        }
    }

    pub(super) fn on_left(&mut self, grid: GridId, entity: EntityId) {
        let Some(&composite) = self.bindings.get(&grid) else {
            return;
        };
        if let Some(c) = self.composites.get_mut(&composite) {
            if c.carrier() == Some(entity) {
                c.unbind();
                log::debug!("{} released {}", c.title, entity);
            }
        }
    }

    /// First equip: one grid per layout entry, with the composite's filters
    fn open_compartments(&mut self, carrier: EntityId, composite: CompositeId, layout: &[LayoutRect]) {
        let Some(c) = self.composites.get(&composite) else {
            return;
        };
        let title = c.title.clone();
        let accept = c.accept_kinds.clone();
        let reject = c.reject_kinds.clone();

        let mut grids = Vec::with_capacity(layout.len());
        for (i, rect) in layout.iter().enumerate() {
            let id = GridId(self.next_id());
            let grid = SpatialGrid::new(rect.width, rect.height)
                .titled(format!("{}_{}", title, i))
                .accepting(accept.iter().cloned())
                .rejecting(reject.iter().cloned());
            self.grids.insert(id, grid);
            self.owners.insert(id, GridOwner::Socket { entity: carrier });
            grids.push(id);
        }
        if let Some(e) = self.entities.get_mut(&carrier) {
            e.compartments = grids;
        }
    }
}
