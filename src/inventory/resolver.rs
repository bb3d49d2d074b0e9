//! Placement resolver
//!
//! Decides what a finished drag does: place, rotate-place, load ammo,
//! attach to a socket, merge stacks, swap, or reject. A rejected drop
//! leaves every grid exactly as it was.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::items::{Cell, Entity, EntityId, GridId, Rect};

use super::stash::{Location, Stash};

/// A completed drag: what was dragged and where it was released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragGesture {
    pub entity: EntityId,
    pub target: GridId,
    /// Anchor cell in the target grid, already clamped by the caller
    pub cell: Cell,
}

/// Why a drop was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("dragged entity does not exist")]
    UnknownEntity,
    #[error("target grid does not exist")]
    UnknownGrid,
    #[error("an entity cannot go inside itself")]
    SelfNesting,
    #[error("a carrier cannot go inside another carrier")]
    CarrierNesting,
    #[error("the container is closed")]
    ContainerClosed,
    #[error("the grid does not accept this entity")]
    NotAccepted,
    #[error("no room at the drop position")]
    NoRoom,
    #[error("the drop only partly covers another entity")]
    PartialCover,
    #[error("the dragged entity has no grid to swap back into")]
    NoOrigin,
    #[error("displaced entities could not be re-placed")]
    SwapFailed,
    #[error("nothing to do with the covered entity")]
    NoInteraction,
}

/// What a drop did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Placed {
        grid: GridId,
        cell: Cell,
        rotated: bool,
    },
    Swapped {
        grid: GridId,
        cell: Cell,
        rotated: bool,
        /// Entities moved into the vacated grid, in re-placement order
        displaced: Vec<EntityId>,
    },
    Stacked {
        host: EntityId,
        moved: u32,
        source_consumed: bool,
    },
    Loaded {
        firearm: EntityId,
        rounds: u32,
        source_consumed: bool,
    },
    Attached {
        host: EntityId,
        socket: GridId,
    },
    Rejected(RejectReason),
}

impl DropOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, DropOutcome::Rejected(_))
    }
}

/// Read-only verdict for a hovered position, used for drop highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPreview {
    Place { rotated: bool },
    Interact,
    Blocked(RejectReason),
}

/// Runs the drop procedure against a stash
pub struct PlacementResolver<'a> {
    stash: &'a mut Stash,
}

impl<'a> PlacementResolver<'a> {
    pub fn new(stash: &'a mut Stash) -> Self {
        Self { stash }
    }

    /// Resolve one finished drag
    pub fn resolve(&mut self, gesture: DragGesture) -> DropOutcome {
        let outcome = self.run(gesture).unwrap_or_else(DropOutcome::Rejected);
        match &outcome {
            DropOutcome::Rejected(reason) => {
                log::debug!("Drop of {} on {} rejected: {}", gesture.entity, gesture.target, reason)
            }
            other => log::debug!("Drop of {} on {}: {:?}", gesture.entity, gesture.target, other),
        }
        outcome
    }

    /// What releasing here would do, without touching anything
    pub fn preview(stash: &Stash, gesture: DragGesture) -> DropPreview {
        let DragGesture { entity: d, target: g, cell } = gesture;
        if let Err(reason) = gate(stash, d, g) {
            return DropPreview::Blocked(reason);
        }
        let (straight, turned) = match probe(stash, d, g, cell) {
            Ok(lists) => lists,
            Err(reason) => return DropPreview::Blocked(reason),
        };
        if straight.is_empty() || turned.is_empty() {
            return match free_fit(stash, d, g, cell, &straight, &turned) {
                Ok(rotated) => DropPreview::Place { rotated },
                Err(reason) => DropPreview::Blocked(reason),
            };
        }
        let attempt = |list: &[EntityId], rotated: bool| {
            let swap = swap_check(stash, d, g, cell, rotated, list);
            match list.iter().find(|o| !can_interact(stash, d, **o)) {
                Some(_) => swap,
                None => Ok(()),
            }
        };
        match attempt(straight.as_slice(), false)
            .or_else(|first| attempt(turned.as_slice(), true).map_err(|_| first))
        {
            Ok(()) => DropPreview::Interact,
            Err(reason) => DropPreview::Blocked(reason),
        }
    }

    fn run(&mut self, gesture: DragGesture) -> Result<DropOutcome, RejectReason> {
        let DragGesture { entity: d, target: g, cell } = gesture;
        gate(self.stash, d, g)?;
        let (straight, turned) = probe(self.stash, d, g, cell)?;

        if straight.is_empty() || turned.is_empty() {
            let rotated = free_fit(self.stash, d, g, cell, &straight, &turned)?;
            if !self.stash.place_at(d, g, cell, rotated) {
                return Err(RejectReason::NoRoom);
            }
            self.after_landing(d, g);
            return Ok(DropOutcome::Placed { grid: g, cell, rotated });
        }

        match self.interact_all(d, g, cell, &straight, false) {
            Ok(outcome) => Ok(outcome),
            Err(first) => self
                .interact_all(d, g, cell, &turned, true)
                .map_err(|_| first),
        }
    }

    /// Overlap branch for one orientation
    fn interact_all(
        &mut self,
        d: EntityId,
        g: GridId,
        cell: Cell,
        overlapped: &[EntityId],
        rotated: bool,
    ) -> Result<DropOutcome, RejectReason> {
        let swap = swap_check(self.stash, d, g, cell, rotated, overlapped);
        if let Some(blocker) = overlapped.iter().find(|o| !can_interact(self.stash, d, **o)) {
            if let Err(reason) = swap {
                log::debug!("{} cannot interact with {}", d, blocker);
                return Err(reason);
            }
        }

        for &o in overlapped {
            if let Some(outcome) = self.interact(d, o) {
                return Ok(outcome);
            }
        }
        match swap {
            Ok(()) => self.swap(d, g, cell, rotated, overlapped),
            Err(_) => Err(RejectReason::NoInteraction),
        }
    }

    /// Ammo feed, socket attach, stack merge, in that order
    fn interact(&mut self, d: EntityId, o: EntityId) -> Option<DropOutcome> {
        let (dragged, other) = (self.stash.entity(d)?, self.stash.entity(o)?);
        let chambers = other.chambers(dragged);
        let stacks = other.stacks_with(dragged);

        if chambers {
            let rounds = self.stash.load_ammo(o, d);
            if rounds > 0 {
                return Some(DropOutcome::Loaded {
                    firearm: o,
                    rounds,
                    source_consumed: self.stash.entity(d).is_none(),
                });
            }
        }

        if let Some(socket) = open_socket(self.stash, d, o) {
            if self.stash.place_at(d, socket, Cell::default(), false) {
                return Some(DropOutcome::Attached { host: o, socket });
            }
        }

        if stacks {
            let moved = self.stash.merge_stack(o, d);
            if moved > 0 {
                return Some(DropOutcome::Stacked {
                    host: o,
                    moved,
                    source_consumed: self.stash.entity(d).is_none(),
                });
            }
        }
        None
    }

    /// Put `d` over the covered entities and move them into the grid `d`
    /// left, largest first, keeping their offsets relative to the drop cell
    /// when possible. All or nothing.
    fn swap(
        &mut self,
        d: EntityId,
        g: GridId,
        cell: Cell,
        rotated: bool,
        overlapped: &[EntityId],
    ) -> Result<DropOutcome, RejectReason> {
        let origin = self.stash.location(d).ok_or(RejectReason::NoOrigin)?;
        let mark = self.stash.event_mark();
        let snapshot: Vec<(EntityId, Location, (u8, u8))> = std::iter::once(d)
            .chain(overlapped.iter().copied())
            .filter_map(|id| Some((id, self.stash.location(id)?, self.stash.entity(id)?.size())))
            .collect();

        for &o in overlapped {
            self.stash.remove(o);
        }
        if !self.stash.place_at(d, g, cell, rotated) {
            self.rollback(&snapshot, mark);
            return Err(RejectReason::SwapFailed);
        }

        let mut order: Vec<(EntityId, Location)> = snapshot[1..].iter().map(|(id, loc, _)| (*id, *loc)).collect();
        order.sort_by_key(|(id, _)| Reverse(self.stash.entity(*id).map_or(0, Entity::area)));

        let mut displaced = Vec::with_capacity(order.len());
        for (o, was) in order {
            let preferred = origin.cell.offset(
                was.cell.col as i32 - cell.col as i32,
                was.cell.row as i32 - cell.row as i32,
            );
            let placed = preferred.is_some_and(|p| self.stash.place_at(o, origin.grid, p, false))
                || self.stash.place(o, origin.grid, None);
            if !placed {
                log::debug!("No room for {} in {}, undoing swap", o, origin.grid);
                self.rollback(&snapshot, mark);
                return Err(RejectReason::SwapFailed);
            }
            displaced.push(o);
        }

        self.after_landing(d, g);
        for &o in &displaced {
            self.after_landing(o, origin.grid);
        }
        Ok(DropOutcome::Swapped { grid: g, cell, rotated, displaced })
    }

    /// Undo a partial swap: restore sizes, put the covered entities back,
    /// then the dragged one, and forget the notifications in between
    fn rollback(&mut self, snapshot: &[(EntityId, Location, (u8, u8))], mark: usize) {
        for (id, _, _) in snapshot {
            self.stash.remove(*id);
        }
        for (id, loc, (width, height)) in snapshot.iter().rev() {
            if let Some(e) = self.stash.entity_mut(*id) {
                e.width = *width;
                e.height = *height;
            }
            self.stash.restore(*id, *loc);
        }
        self.stash.rewind_events(mark);
    }

    /// Carriers dropped loose arrive empty
    fn after_landing(&mut self, entity: EntityId, grid: GridId) {
        let is_carrier = self.stash.entity(entity).is_some_and(Entity::is_carrier);
        if is_carrier && self.stash.ground() == Some(grid) {
            self.stash.evacuate_to_ground(entity);
        }
    }
}

/// Nesting checks run before anything else
fn gate(stash: &Stash, d: EntityId, g: GridId) -> Result<(), RejectReason> {
    let dragged = stash.entity(d).ok_or(RejectReason::UnknownEntity)?;
    if stash.grid(g).is_none() {
        return Err(RejectReason::UnknownGrid);
    }
    let chain = stash.enclosing_entities(g);
    if chain.contains(&d) {
        return Err(RejectReason::SelfNesting);
    }
    if dragged.is_carrier()
        && chain
            .iter()
            .any(|id| stash.entity(*id).is_some_and(Entity::is_carrier))
    {
        return Err(RejectReason::CarrierNesting);
    }
    if !stash.is_open(g) {
        return Err(RejectReason::ContainerClosed);
    }
    Ok(())
}

/// Entities covered by the footprint, unrotated and rotated
fn probe(stash: &Stash, d: EntityId, g: GridId, cell: Cell) -> Result<(Vec<EntityId>, Vec<EntityId>), RejectReason> {
    let dragged = stash.entity(d).ok_or(RejectReason::UnknownEntity)?;
    let grid = stash.grid(g).ok_or(RejectReason::UnknownGrid)?;
    Ok((
        grid.overlaps(d, dragged.size(), cell, false),
        grid.overlaps(d, dragged.size(), cell, true),
    ))
}

/// No-overlap branch: the orientation to place in, unrotated first
fn free_fit(
    stash: &Stash,
    d: EntityId,
    g: GridId,
    cell: Cell,
    straight: &[EntityId],
    turned: &[EntityId],
) -> Result<bool, RejectReason> {
    let dragged = stash.entity(d).ok_or(RejectReason::UnknownEntity)?;
    let grid = stash.grid(g).ok_or(RejectReason::UnknownGrid)?;
    if !grid.check_accept(dragged) {
        return Err(RejectReason::NotAccepted);
    }
    if straight.is_empty() && grid.check_boundary(dragged.size(), cell, false) {
        return Ok(false);
    }
    if turned.is_empty() && !grid.is_fullfill() && grid.check_boundary(dragged.size(), cell, true) {
        return Ok(true);
    }
    Err(RejectReason::NoRoom)
}

/// Ammo, socket or stack interaction is possible between `d` and `o`
fn can_interact(stash: &Stash, d: EntityId, o: EntityId) -> bool {
    let (Some(dragged), Some(other)) = (stash.entity(d), stash.entity(o)) else {
        return false;
    };
    let ammo = other.chambers(dragged)
        && other
            .firearm
            .as_ref()
            .is_some_and(|f| f.loaded_rounds() < stash.effective_capacity(o));
    let stack = other.stacks_with(dragged) && other.stack_count < other.stack_max;
    ammo || stack || open_socket(stash, d, o).is_some()
}

/// First empty socket of `o` that would take `d`
fn open_socket(stash: &Stash, d: EntityId, o: EntityId) -> Option<GridId> {
    let dragged = stash.entity(d)?;
    let other = stash.entity(o)?;
    other
        .sockets
        .iter()
        .map(|s| s.grid)
        .find(|grid| {
            stash.grid(*grid).is_some_and(|sg| sg.is_empty() && sg.check_accept(dragged))
                && stash.containment_allows(d, *grid)
        })
}

/// A swap is legal when `d` fits and accepts here, fully covers every
/// overlapped entity (or the grid is a fullfill slot), and the vacated
/// grid would take every one of them
fn swap_check(
    stash: &Stash,
    d: EntityId,
    g: GridId,
    cell: Cell,
    rotated: bool,
    overlapped: &[EntityId],
) -> Result<(), RejectReason> {
    let dragged = stash.entity(d).ok_or(RejectReason::UnknownEntity)?;
    let grid = stash.grid(g).ok_or(RejectReason::UnknownGrid)?;
    let origin = stash.location(d).ok_or(RejectReason::NoOrigin)?;
    let origin_grid = stash.grid(origin.grid).ok_or(RejectReason::NoOrigin)?;

    if !grid.check_accept(dragged) {
        return Err(RejectReason::NotAccepted);
    }
    if !grid.check_boundary(dragged.size(), cell, rotated) {
        return Err(RejectReason::NoRoom);
    }
    let (w, h) = if rotated {
        (dragged.height, dragged.width)
    } else {
        dragged.size()
    };
    let footprint = Rect::new(cell, w, h);

    for &o in overlapped {
        let placement = grid.placement(o).ok_or(RejectReason::NoInteraction)?;
        if !grid.is_fullfill() && !footprint.covers(&placement.rect()) {
            return Err(RejectReason::PartialCover);
        }
        let other = stash.entity(o).ok_or(RejectReason::UnknownEntity)?;
        if !origin_grid.check_accept(other) {
            return Err(RejectReason::NotAccepted);
        }
        if !stash.containment_allows(o, origin.grid) {
            return Err(RejectReason::CarrierNesting);
        }
    }
    Ok(())
}

/// One drag from press to release. Releasing consumes the session, so a
/// gesture resolves at most once; dropping it unreleased changes nothing.
#[derive(Debug)]
pub struct DragSession {
    entity: EntityId,
    origin: Option<Location>,
    hover: Option<(GridId, Cell)>,
}

impl DragSession {
    /// Press on an entity. Nothing starts on an unsearched entity while
    /// searching is required.
    pub fn begin(stash: &Stash, entity: EntityId) -> Option<Self> {
        if !stash.can_pick_up(entity) {
            return None;
        }
        Some(Self {
            entity,
            origin: stash.location(entity),
            hover: None,
        })
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Where the entity was when the drag started
    pub fn origin(&self) -> Option<Location> {
        self.origin
    }

    /// Move over a cell; returns the preview for highlighting
    pub fn hover(&mut self, stash: &Stash, grid: GridId, cell: Cell) -> DropPreview {
        self.hover = Some((grid, cell));
        PlacementResolver::preview(stash, DragGesture { entity: self.entity, target: grid, cell })
    }

    /// Move over a pointer position in grid pixels
    pub fn hover_pixels(&mut self, stash: &Stash, grid: GridId, x: f32, y: f32) -> DropPreview {
        let cell = match (stash.grid(grid), stash.entity(self.entity)) {
            (Some(g), Some(e)) => g.snap_to_cell(x, y, e.size()),
            _ => return DropPreview::Blocked(RejectReason::UnknownGrid),
        };
        self.hover(stash, grid, cell)
    }

    /// Release over the last hovered cell
    pub fn release(self, stash: &mut Stash) -> DropOutcome {
        let Some((target, cell)) = self.hover else {
            return DropOutcome::Rejected(RejectReason::NoRoom);
        };
        PlacementResolver::new(stash).resolve(DragGesture {
            entity: self.entity,
            target,
            cell,
        })
    }
}
