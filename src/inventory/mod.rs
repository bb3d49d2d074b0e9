//! Stash state and the placement rules that act on it
//!
//! `Stash` owns every entity and grid and keeps the single-owner index;
//! `PlacementResolver` turns drag gestures into placements, swaps,
//! stack merges, ammo loads and accessory attachments.

pub mod events;
pub mod stash;
pub mod carrier;
pub mod resolver;
pub mod loadout;

pub use events::GridEvent;
pub use stash::{GridOwner, Location, Stash};
pub use resolver::{DragGesture, DragSession, DropOutcome, DropPreview, PlacementResolver, RejectReason};
pub use loadout::{ground, player_loadout, spoils_box, Region, SlotTarget, GROUND_SIZE};
