//! Grid notifications
//!
//! Recorded by the stash whenever an entity enters or leaves a grid, and
//! drained by the host UI to refresh value displays and socket views.

use serde::{Deserialize, Serialize};

use crate::items::{Cell, EntityId, GridId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridEvent {
    /// An entity was placed into a grid
    Entered {
        grid: GridId,
        entity: EntityId,
        cell: Cell,
        /// Grid the entity came from, if it was placed before
        from: Option<GridId>,
    },
    /// An entity was detached from a grid
    Left { grid: GridId, entity: EntityId },
    /// An entity was destroyed (consumed, merged away or discarded)
    Destroyed { entity: EntityId },
}

impl GridEvent {
    /// Entity the event is about
    pub fn entity(&self) -> EntityId {
        match self {
            GridEvent::Entered { entity, .. }
            | GridEvent::Left { entity, .. }
            | GridEvent::Destroyed { entity } => *entity,
        }
    }

    /// Grid the event touched, if any
    pub fn grid(&self) -> Option<GridId> {
        match self {
            GridEvent::Entered { grid, .. } | GridEvent::Left { grid, .. } => Some(*grid),
            GridEvent::Destroyed { .. } => None,
        }
    }
}
