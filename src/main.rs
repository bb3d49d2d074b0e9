//! Stashgrid - Demo
//!
//! Builds a player loadout, a ground container and a few spoils boxes,
//! fills the boxes with generated loot, then drags everything it can
//! from the boxes onto the player and logs the totals.

use anyhow::{Context, Result};
use rand::Rng;

use stashgrid::config::Settings;
use stashgrid::data::{populate, Catalog, ChildPreset, EntityPreset, Preset, SlotPreset};
use stashgrid::inventory::{ground, player_loadout, spoils_box, DragSession, DropOutcome, DropPreview, Region, SlotTarget};
use stashgrid::items::{generate_spoils, loot_rng, GridId};
use stashgrid::Stash;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Stashgrid v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load().context("settings failed to load")?;
    let catalog = Catalog::load(&settings.catalog_path).context("catalog failed to load")?;

    let mut stash = Stash::new();
    let player = player_loadout(&mut stash);
    let floor = ground(&mut stash, settings.ground_size.0, settings.ground_size.1);

    populate(&mut stash, &catalog, &player, &starter_kit());
    stash.set_need_search(settings.need_search);
    // own gear is known
    let own = drop_targets(&stash, &player);
    stash.search_all(&own);

    let mut rng = loot_rng(settings.seed);
    let mut boxes = Vec::with_capacity(settings.spoils_boxes);
    for i in 0..settings.spoils_boxes {
        let title = format!("Spoils{}", i + 1);
        let region = spoils_box(&mut stash, &title, settings.spoils_size.0, settings.spoils_size.1);
        let count = rng.gen_range(settings.loot_range());
        let preset = generate_spoils(&catalog, &title, count, &mut rng);
        populate(&mut stash, &catalog, &region, &preset);
        boxes.push(region);
    }
    stash.drain_events();

    for region in &boxes {
        loot_box(&mut stash, &player, region);
    }

    let events = stash.drain_events();
    log::info!("{} grid events during looting", events.len());
    for region in boxes.iter().chain([&player, &floor]) {
        log::info!("{}: value {}", region.title, region.value(&stash));
    }

    let problems = stash.audit();
    if !problems.is_empty() {
        for problem in &problems {
            log::error!("{}", problem);
        }
        anyhow::bail!("stash invariants broken ({} problems)", problems.len());
    }

    log::info!("Stashgrid demo finished cleanly");
    Ok(())
}

/// What the player starts with: a backpack, a rifle and some spare rounds
fn starter_kit() -> Preset {
    let mut rifle = EntityPreset::new(10001);
    rifle.children.push(ChildPreset {
        slot: "scope".to_string(),
        id: 10201,
    });
    let mut ammo = EntityPreset::new(10101);
    ammo.stack = Some(20);

    Preset {
        title: "Starter".to_string(),
        slots: vec![
            SlotPreset {
                slot: "Backpack".to_string(),
                entities: vec![EntityPreset::new(10501)],
            },
            SlotPreset {
                slot: "PrimaryWeapon1".to_string(),
                entities: vec![rifle],
            },
            SlotPreset {
                slot: "ContainerBackpack".to_string(),
                entities: vec![ammo],
            },
        ],
    }
}

/// Every grid of a region a drop can land in
fn drop_targets(stash: &Stash, region: &Region) -> Vec<GridId> {
    region
        .slots
        .iter()
        .flat_map(|(_, target)| match target {
            SlotTarget::Grid(grid) => vec![*grid],
            SlotTarget::Composite(c) => stash.composite(*c).map(|c| c.grids().to_vec()).unwrap_or_default(),
        })
        .collect()
}

/// Drag each entity of a spoils box onto the first player grid that takes it
fn loot_box(stash: &mut Stash, player: &Region, spoils: &Region) {
    let Some(source) = spoils.grid(&spoils.title) else {
        return;
    };
    if stash.need_search() {
        let revealed = stash.search_all(&[source]);
        log::info!("Searched {} entities in {}", revealed, spoils.title);
    }
    for entity in stash.entities_in(source) {
        let Some(mut session) = DragSession::begin(stash, entity) else {
            continue;
        };
        // compartments open as carriers get equipped
        let target = drop_targets(stash, player).into_iter().find_map(|grid| {
            let (cell, _) = stash.find_space(entity, grid)?;
            matches!(session.hover(&*stash, grid, cell), DropPreview::Place { .. }).then_some(grid)
        });
        if target.is_none() {
            log::debug!("Nowhere to put {} from {}", entity, spoils.title);
            continue;
        }
        match session.release(stash) {
            DropOutcome::Rejected(reason) => log::warn!("Drop of {} rejected: {}", entity, reason),
            outcome => log::debug!("Looted {}: {:?}", entity, outcome),
        }
    }
}
