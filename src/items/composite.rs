//! Composite grid
//!
//! A named group of spatial grids positioned at cell offsets, forming one
//! logical container with an irregular shape (pockets, backpack interiors).
//! The composite only records layout and membership; placement into its
//! sub-grids goes through the `Stash`.

use serde::{Deserialize, Serialize};

use super::entity::{EntityId, GridId};
use super::grid::{Cell, Rect};

/// One sub-grid of a layout: size and offset in cell units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRect {
    pub width: u8,
    pub height: u8,
    pub x: u8,
    pub y: u8,
}

impl LayoutRect {
    pub fn new(width: u8, height: u8, x: u8, y: u8) -> Self {
        Self { width, height, x, y }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(Cell::new(self.x, self.y), self.width, self.height)
    }

    /// Translate a composite-space cell into this sub-grid's local space
    pub fn localize(&self, cell: Cell) -> Option<Cell> {
        if self.rect().intersects(&Rect::new(cell, 1, 1)) {
            Some(Cell::new(cell.col - self.x, cell.row - self.y))
        } else {
            None
        }
    }
}

/// Check that no two layout entries share a cell
pub fn layout_is_disjoint(layout: &[LayoutRect]) -> bool {
    layout.iter().enumerate().all(|(i, a)| {
        layout[i + 1..].iter().all(|b| !a.rect().intersects(&b.rect()))
    })
}

/// A container assembled from several spatial grids
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompositeGrid {
    pub title: String,
    layout: Vec<LayoutRect>,
    /// One grid per layout entry, same order
    grids: Vec<GridId>,
    /// Inherited by every sub-grid on rebuild
    pub accept_kinds: Vec<String>,
    pub reject_kinds: Vec<String>,
    /// Carrier entity currently providing the layout
    carrier: Option<EntityId>,
    /// Entities waiting for the next auto-arrange
    pending: Vec<EntityId>,
}

impl CompositeGrid {
    /// Create a composite with a fixed layout (sub-grids are built by the stash)
    pub fn new(title: impl Into<String>, layout: Vec<LayoutRect>) -> Self {
        Self {
            title: title.into(),
            layout,
            ..Self::default()
        }
    }

    /// Create an empty composite awaiting a carrier
    pub fn unbound(title: impl Into<String>) -> Self {
        Self::new(title, Vec::new())
    }

    pub fn rejecting<S: Into<String>>(mut self, kinds: impl IntoIterator<Item = S>) -> Self {
        self.reject_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn accepting<S: Into<String>>(mut self, kinds: impl IntoIterator<Item = S>) -> Self {
        self.accept_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn layout(&self) -> &[LayoutRect] {
        &self.layout
    }

    pub fn grids(&self) -> &[GridId] {
        &self.grids
    }

    pub fn carrier(&self) -> Option<EntityId> {
        self.carrier
    }

    pub fn pending(&self) -> &[EntityId] {
        &self.pending
    }

    pub(crate) fn set_layout(&mut self, layout: Vec<LayoutRect>, grids: Vec<GridId>) {
        self.layout = layout;
        self.grids = grids;
    }

    pub(crate) fn bind(&mut self, carrier: EntityId, layout: Vec<LayoutRect>, grids: Vec<GridId>) {
        self.carrier = Some(carrier);
        self.set_layout(layout, grids);
    }

    /// Forget the carrier, returning it; the layout becomes empty
    pub(crate) fn unbind(&mut self) -> Option<EntityId> {
        self.layout.clear();
        self.grids.clear();
        self.carrier.take()
    }

    pub(crate) fn queue(&mut self, entity: EntityId) {
        if !self.pending.contains(&entity) {
            self.pending.push(entity);
        }
    }

    pub(crate) fn dequeue(&mut self, entity: EntityId) {
        self.pending.retain(|id| *id != entity);
    }

    pub(crate) fn take_pending(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending)
    }

    /// Sub-grid whose offset rectangle contains a composite-space cell,
    /// with the cell translated into that grid's local space
    pub fn sub_grid_at(&self, cell: Cell) -> Option<(GridId, Cell)> {
        self.layout
            .iter()
            .zip(&self.grids)
            .find_map(|(rect, grid)| rect.localize(cell).map(|local| (*grid, local)))
    }

    /// Bounding size of the whole layout in cells
    pub fn total_size(&self) -> (u16, u16) {
        self.layout.iter().fold((0, 0), |(w, h), r| {
            (w.max(r.rect().right()), h.max(r.rect().bottom()))
        })
    }

    /// Total number of cells across all sub-grids
    pub fn capacity(&self) -> usize {
        self.layout.iter().map(|r| r.rect().area() as usize).sum()
    }
}
