//! Spatial grid (one rectangular cell lattice)
//!
//! Entities occupy a rectangle of cells anchored at their top-left cell.
//! The grid validates bounds, type filters and overlap; moving entities
//! between grids is the job of the `Stash`.

use serde::{Deserialize, Serialize};

use super::entity::{CatalogId, Entity, EntityId};

/// Default pixel size of one cell (rendering only)
pub const DEFAULT_CELL_SIZE: f32 = 72.0;

/// Cell coordinate inside a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub col: u8,
    pub row: u8,
}

impl Cell {
    pub fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }

    /// Shift by a signed offset, `None` if the result leaves the lattice
    pub fn offset(&self, dcol: i32, drow: i32) -> Option<Cell> {
        let col = u8::try_from(self.col as i32 + dcol).ok()?;
        let row = u8::try_from(self.row as i32 + drow).ok()?;
        Some(Cell { col, row })
    }
}

/// Axis-aligned cell rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub col: u16,
    pub row: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub fn new(cell: Cell, width: u8, height: u8) -> Self {
        Self {
            col: cell.col as u16,
            row: cell.row as u16,
            width: width as u16,
            height: height as u16,
        }
    }

    pub fn right(&self) -> u16 {
        self.col + self.width
    }

    pub fn bottom(&self) -> u16 {
        self.row + self.height
    }

    pub fn area(&self) -> u16 {
        self.width * self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.col < other.right()
            && self.right() > other.col
            && self.row < other.bottom()
            && self.bottom() > other.row
    }

    /// True if `other` lies entirely inside this rectangle
    pub fn covers(&self, other: &Rect) -> bool {
        self.col <= other.col
            && self.right() >= other.right()
            && self.row <= other.row
            && self.bottom() >= other.bottom()
    }
}

/// An entity placed in the grid with its anchor and occupied size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub entity: EntityId,
    pub cell: Cell,
    /// Occupied width; equals the grid width in fullfill grids
    pub width: u8,
    pub height: u8,
}

impl Placement {
    pub fn rect(&self) -> Rect {
        Rect::new(self.cell, self.width, self.height)
    }
}

/// One rectangular cell lattice holding zero or more entities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialGrid {
    pub title: String,
    width: u8,
    height: u8,
    /// Pixel size of one cell (rendering only)
    pub cell_size: f32,
    /// Horizontal stretch of a cell (rendering only)
    pub aspect: f32,
    /// Holds exactly one entity occupying the whole grid
    fullfill: bool,
    pub accept_kinds: Vec<String>,
    pub reject_kinds: Vec<String>,
    pub accept_ids: Vec<CatalogId>,
    placements: Vec<Placement>,
}

impl SpatialGrid {
    /// Create an empty grid accepting every kind
    pub fn new(width: u8, height: u8) -> Self {
        Self {
            title: String::new(),
            width: width.max(1),
            height: height.max(1),
            cell_size: DEFAULT_CELL_SIZE,
            aspect: 1.0,
            fullfill: false,
            accept_kinds: Vec::new(),
            reject_kinds: Vec::new(),
            accept_ids: Vec::new(),
            placements: Vec::new(),
        }
    }

    /// A 1x1 fullfill grid (equip slot or accessory socket)
    pub fn slot() -> Self {
        Self::new(1, 1).fullfill()
    }

    pub fn fullfill(mut self) -> Self {
        self.fullfill = true;
        self
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn accepting<S: Into<String>>(mut self, kinds: impl IntoIterator<Item = S>) -> Self {
        self.accept_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn rejecting<S: Into<String>>(mut self, kinds: impl IntoIterator<Item = S>) -> Self {
        self.reject_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn accepting_ids(mut self, ids: impl IntoIterator<Item = CatalogId>) -> Self {
        self.accept_ids = ids.into_iter().collect();
        self
    }

    pub fn with_cell_size(mut self, cell_size: f32, aspect: f32) -> Self {
        self.cell_size = cell_size;
        self.aspect = aspect;
        self
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn is_fullfill(&self) -> bool {
        self.fullfill
    }

    /// Check if a footprint anchored at `cell` stays inside the grid
    pub fn check_boundary(&self, size: (u8, u8), cell: Cell, rotated: bool) -> bool {
        if self.fullfill {
            return cell.col == 0 && cell.row == 0;
        }
        let (w, h) = if rotated { (size.1, size.0) } else { size };
        let rect = Rect::new(cell, w, h);
        rect.right() <= self.width as u16 && rect.bottom() <= self.height as u16
    }

    /// Check the deny-list, then the id allow-list, then the kind allow-list
    pub fn check_accept(&self, entity: &Entity) -> bool {
        if self.reject_kinds.iter().any(|k| *k == entity.kind) {
            return false;
        }
        if !self.accept_ids.is_empty() {
            return self.accept_ids.contains(&entity.catalog_id);
        }
        self.accept_kinds.is_empty() || self.accept_kinds.iter().any(|k| *k == entity.kind)
    }

    /// All placed entities whose rectangle intersects the footprint,
    /// ignoring `entity` itself
    pub fn overlaps(&self, entity: EntityId, size: (u8, u8), cell: Cell, rotated: bool) -> Vec<EntityId> {
        let (w, h) = if rotated { (size.1, size.0) } else { size };
        let probe = Rect::new(cell, w, h);
        self.placements
            .iter()
            .filter(|p| p.entity != entity && probe.intersects(&p.rect()))
            .map(|p| p.entity)
            .collect()
    }

    /// Check if an entity fits at a position: in bounds and free
    pub fn can_place_at(&self, entity: &Entity, cell: Cell, rotated: bool) -> bool {
        self.check_boundary(entity.size(), cell, rotated)
            && self.overlaps(entity.id, entity.size(), cell, rotated).is_empty()
    }

    /// Find the first free cell in row-major order, unrotated first
    pub fn find_space_for(&self, entity: &Entity) -> Option<(Cell, bool)> {
        if !self.check_accept(entity) {
            return None;
        }

        let scan = |rotated: bool| {
            for row in 0..self.height {
                for col in 0..self.width {
                    let cell = Cell::new(col, row);
                    if self.can_place_at(entity, cell, rotated) {
                        return Some(cell);
                    }
                }
            }
            None
        };

        if let Some(cell) = scan(false) {
            return Some((cell, false));
        }
        if entity.width != entity.height && !self.fullfill {
            if let Some(cell) = scan(true) {
                return Some((cell, true));
            }
        }
        None
    }

    /// Record a placement. Callers validate first.
    pub(crate) fn insert(&mut self, entity: &Entity, cell: Cell) -> Placement {
        let (width, height) = if self.fullfill {
            (self.width, self.height)
        } else {
            entity.size()
        };
        let placement = Placement {
            entity: entity.id,
            cell,
            width,
            height,
        };
        self.placements.push(placement);
        placement
    }

    /// Drop a placement, returning it if it existed
    pub(crate) fn take(&mut self, entity: EntityId) -> Option<Placement> {
        let index = self.placements.iter().position(|p| p.entity == entity)?;
        Some(self.placements.remove(index))
    }

    /// Placement record of an entity in this grid
    pub fn placement(&self, entity: EntityId) -> Option<&Placement> {
        self.placements.iter().find(|p| p.entity == entity)
    }

    /// Entity covering a cell
    pub fn entity_at(&self, cell: Cell) -> Option<EntityId> {
        let probe = Rect::new(cell, 1, 1);
        self.placements
            .iter()
            .find(|p| p.rect().intersects(&probe))
            .map(|p| p.entity)
    }

    /// Placements in insertion order
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Ids of all placed entities, in insertion order
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.placements.iter().map(|p| p.entity)
    }

    pub fn count(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Number of cells not covered by any placement
    pub fn free_cells(&self) -> usize {
        let used: usize = self.placements.iter().map(|p| p.rect().area() as usize).sum();
        (self.width as usize * self.height as usize).saturating_sub(used)
    }

    /// Snap a pointer position (pixels, relative to the grid's top-left)
    /// to the anchor cell of a footprint centred on it, clamped to the grid
    pub fn snap_to_cell(&self, x: f32, y: f32, size: (u8, u8)) -> Cell {
        let cell_w = self.cell_size * self.aspect;
        let col = ((x - size.0 as f32 * cell_w / 2.0) / cell_w).round();
        let row = ((y - size.1 as f32 * self.cell_size / 2.0) / self.cell_size).round();
        let col = col.clamp(0.0, (self.width - 1) as f32) as u8;
        let row = row.clamp(0.0, (self.height - 1) as f32) as u8;
        Cell::new(col, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_entity(id: u64, width: u8, height: u8) -> Entity {
        let mut entity = Entity::new(EntityId(id), 100, "Test Entity", "collection");
        entity.width = width;
        entity.height = height;
        entity
    }

    #[test]
    fn test_boundary() {
        let grid = SpatialGrid::new(4, 3);
        assert!(grid.check_boundary((2, 2), Cell::new(2, 1), false));
        assert!(!grid.check_boundary((2, 2), Cell::new(3, 1), false));
        assert!(!grid.check_boundary((1, 4), Cell::new(0, 0), false));
        assert!(grid.check_boundary((1, 4), Cell::new(0, 0), true));
    }

    #[test]
    fn test_fullfill_boundary_only_at_origin() {
        let slot = SpatialGrid::slot();
        assert!(slot.check_boundary((4, 2), Cell::new(0, 0), false));
        assert!(!slot.check_boundary((1, 1), Cell::new(0, 1), false));
    }

    #[test]
    fn test_accept_order() {
        let mut ammo = make_test_entity(1, 1, 1);
        ammo.kind = "ammo556".to_string();
        ammo.catalog_id = 42;

        let open = SpatialGrid::new(2, 2);
        assert!(open.check_accept(&ammo));

        let rejecting = SpatialGrid::new(2, 2).accepting(["ammo556"]).rejecting(["ammo556"]);
        assert!(!rejecting.check_accept(&ammo));

        let by_id = SpatialGrid::slot().accepting(["gunRifle"]).accepting_ids([42]);
        assert!(by_id.check_accept(&ammo));

        let by_kind = SpatialGrid::new(2, 2).accepting(["collection"]);
        assert!(!by_kind.check_accept(&ammo));
    }

    #[test]
    fn test_overlaps_skip_self() {
        let mut grid = SpatialGrid::new(4, 4);
        let a = make_test_entity(1, 2, 2);
        let b = make_test_entity(2, 1, 1);
        grid.insert(&a, Cell::new(0, 0));
        grid.insert(&b, Cell::new(2, 0));

        assert_eq!(grid.overlaps(a.id, a.size(), Cell::new(1, 0), false), vec![b.id]);
        assert_eq!(grid.overlaps(EntityId(9), (3, 1), Cell::new(0, 1), false), vec![a.id]);
        assert!(grid.overlaps(EntityId(9), (1, 3), Cell::new(3, 0), false).is_empty());
        assert_eq!(grid.overlaps(EntityId(9), (1, 3), Cell::new(2, 0), true), vec![b.id]);
    }

    #[test]
    fn test_find_space_row_major() {
        let mut grid = SpatialGrid::new(2, 2);
        let first = make_test_entity(1, 1, 1);
        grid.insert(&first, Cell::new(0, 0));

        let second = make_test_entity(2, 1, 1);
        assert_eq!(grid.find_space_for(&second), Some((Cell::new(1, 0), false)));
    }

    #[test]
    fn test_find_space_tries_rotation() {
        let grid = SpatialGrid::new(3, 1);
        let tall = make_test_entity(1, 1, 3);
        assert_eq!(grid.find_space_for(&tall), Some((Cell::new(0, 0), true)));

        let wide = make_test_entity(2, 4, 1);
        assert_eq!(grid.find_space_for(&wide), None);
    }

    #[test]
    fn test_fullfill_insert_takes_grid_size() {
        let mut slot = SpatialGrid::slot();
        let rifle = make_test_entity(1, 4, 2);
        let placement = slot.insert(&rifle, Cell::new(0, 0));
        assert_eq!((placement.width, placement.height), (1, 1));
        assert_eq!(rifle.size(), (4, 2));

        let other = make_test_entity(2, 2, 1);
        assert!(!slot.can_place_at(&other, Cell::new(0, 0), false));
    }

    #[test]
    fn test_take_and_entity_at() {
        let mut grid = SpatialGrid::new(3, 3);
        let a = make_test_entity(1, 2, 1);
        grid.insert(&a, Cell::new(1, 1));

        assert_eq!(grid.entity_at(Cell::new(2, 1)), Some(a.id));
        assert_eq!(grid.entity_at(Cell::new(0, 1)), None);
        assert_eq!(grid.free_cells(), 7);

        assert!(grid.take(a.id).is_some());
        assert!(grid.take(a.id).is_none());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_snap_to_cell_clamps() {
        let grid = SpatialGrid::new(4, 4).with_cell_size(10.0, 1.0);
        assert_eq!(grid.snap_to_cell(15.0, 15.0, (1, 1)), Cell::new(1, 1));
        assert_eq!(grid.snap_to_cell(-50.0, 500.0, (1, 1)), Cell::new(0, 3));
    }

    #[test]
    fn test_rect_covers() {
        let outer = Rect::new(Cell::new(0, 0), 2, 2);
        assert!(outer.covers(&Rect::new(Cell::new(1, 0), 1, 1)));
        assert!(!outer.covers(&Rect::new(Cell::new(1, 0), 2, 1)));
    }
}
