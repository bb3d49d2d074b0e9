//! Entity catalog
//!
//! Entity definitions and socket-compatibility tables, loaded from RON or
//! JSON files with a fallback to the built-in catalog.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::items::{layout_is_disjoint, CarrierClass, CatalogId, Entity, EntityId, Firearm, Grade, LayoutRect};

/// File name used by `export_default_catalog`
pub const CATALOG_FILE: &str = "catalog.ron";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("failed to write catalog RON: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// Magazine data of a firearm definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirearmSpec {
    /// Ammo kind chambered
    pub caliber: String,
    pub capacity: u32,
}

fn default_stack() -> u32 {
    1
}

/// Definition an entity is instantiated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTemplate {
    pub id: CatalogId,
    pub name: String,
    pub kind: String,
    pub width: u8,
    pub height: u8,
    pub value: u64,
    #[serde(default)]
    pub grade: u8,
    #[serde(default = "default_stack")]
    pub stack_max: u32,
    #[serde(default)]
    pub carrier: Option<CarrierClass>,
    /// Compartment layout of a carrier
    #[serde(default)]
    pub layout: Vec<LayoutRect>,
    /// Socket slot ids, resolved against the socket table
    #[serde(default)]
    pub sockets: Vec<String>,
    #[serde(default)]
    pub firearm: Option<FirearmSpec>,
    #[serde(default)]
    pub capacity_bonus: u32,
}

impl EntityTemplate {
    /// Build a fresh entity (sockets are added by the stash)
    pub fn instantiate(&self, id: EntityId) -> Entity {
        let mut entity = Entity::new(id, self.id, self.name.clone(), self.kind.clone());
        entity.width = self.width;
        entity.height = self.height;
        entity.value = self.value;
        entity.grade = Grade::from_level(self.grade);
        entity.stack_max = self.stack_max.max(1);
        entity.capacity_bonus = self.capacity_bonus;
        entity.carrier = self.carrier;
        entity.layout = self.layout.clone();
        entity.firearm = self
            .firearm
            .as_ref()
            .map(|f| Firearm::new(f.caliber.clone(), f.capacity));
        entity
    }
}

/// Which entities fit one socket of one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketRule {
    pub host: CatalogId,
    pub slot: String,
    pub name: String,
    pub accepts: Vec<CatalogId>,
}

/// Answer to a socket-compatibility lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketCompatibility {
    pub socket_name: String,
    pub accepted_ids: Vec<CatalogId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub entities: Vec<EntityTemplate>,
    #[serde(default)]
    pub sockets: Vec<SocketRule>,
}

impl Catalog {
    /// Load from a file (RON, or JSON by extension); a missing file gives
    /// the built-in catalog
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            log::warn!("Catalog {} not found, using built-in catalog", path.display());
            return Ok(default_catalog());
        }
        let content = fs::read_to_string(path)?;
        let catalog: Catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => ron::from_str(&content)?,
        };
        catalog.validate()?;
        log::info!(
            "Loaded {} entity definitions and {} socket rules from {}",
            catalog.entities.len(),
            catalog.sockets.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Check ids are unique, sizes non-zero and carrier layouts disjoint
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for template in &self.entities {
            if !seen.insert(template.id) {
                return Err(CatalogError::Invalid(format!("duplicate id {}", template.id)));
            }
            if template.width == 0 || template.height == 0 {
                return Err(CatalogError::Invalid(format!("{} has zero size", template.name)));
            }
            if !layout_is_disjoint(&template.layout) {
                return Err(CatalogError::Invalid(format!(
                    "{} has overlapping compartments",
                    template.name
                )));
            }
        }
        for rule in &self.sockets {
            if !seen.contains(&rule.host) {
                log::warn!("Socket rule '{}' names unknown host {}", rule.slot, rule.host);
            }
        }
        Ok(())
    }

    /// Get an entity definition by catalog id
    pub fn entity_definition(&self, id: CatalogId) -> Option<&EntityTemplate> {
        self.entities.iter().find(|t| t.id == id)
    }

    /// Get the compatibility entry for one socket of a host. Unknown ids in
    /// the accept list are dropped with a warning.
    pub fn socket_compatibility(&self, host: CatalogId, slot: &str) -> Option<SocketCompatibility> {
        let rule = self.sockets.iter().find(|r| r.host == host && r.slot == slot)?;
        let accepted_ids = rule
            .accepts
            .iter()
            .copied()
            .filter(|id| {
                let known = self.entity_definition(*id).is_some();
                if !known {
                    log::warn!("Socket '{}' of {} accepts unknown id {}", slot, host, id);
                }
                known
            })
            .collect();
        Some(SocketCompatibility {
            socket_name: rule.name.clone(),
            accepted_ids,
        })
    }

    /// Find a definition by display name
    pub fn find_by_name(&self, name: &str) -> Option<&EntityTemplate> {
        self.entities.iter().find(|t| t.name == name)
    }

    /// All definitions of a kind
    pub fn of_kind(&self, kind: &str) -> Vec<&EntityTemplate> {
        self.entities.iter().filter(|t| t.kind == kind).collect()
    }
}

/// Write the built-in catalog as RON so it can be edited and reloaded
pub fn export_default_catalog(dir: &Path) -> Result<(), CatalogError> {
    fs::create_dir_all(dir)?;
    let pretty = ron::ser::PrettyConfig::new().depth_limit(4);
    let content = ron::ser::to_string_pretty(&default_catalog(), pretty)?;
    fs::write(dir.join(CATALOG_FILE), content)?;
    log::info!("Exported built-in catalog to {}", dir.display());
    Ok(())
}

fn template(id: CatalogId, name: &str, kind: &str, size: (u8, u8), value: u64, grade: u8) -> EntityTemplate {
    EntityTemplate {
        id,
        name: name.to_string(),
        kind: kind.to_string(),
        width: size.0,
        height: size.1,
        value,
        grade,
        stack_max: 1,
        carrier: None,
        layout: Vec::new(),
        sockets: Vec::new(),
        firearm: None,
        capacity_bonus: 0,
    }
}

fn firearm(mut t: EntityTemplate, caliber: &str, capacity: u32, sockets: &[&str]) -> EntityTemplate {
    t.firearm = Some(FirearmSpec {
        caliber: caliber.to_string(),
        capacity,
    });
    t.sockets = sockets.iter().map(|s| s.to_string()).collect();
    t
}

fn stackable(mut t: EntityTemplate, stack_max: u32) -> EntityTemplate {
    t.stack_max = stack_max;
    t
}

fn carrier(mut t: EntityTemplate, class: CarrierClass, layout: &[(u8, u8, u8, u8)]) -> EntityTemplate {
    t.carrier = Some(class);
    t.layout = layout
        .iter()
        .map(|&(w, h, x, y)| LayoutRect::new(w, h, x, y))
        .collect();
    t
}

fn rule(host: CatalogId, slot: &str, name: &str, accepts: &[CatalogId]) -> SocketRule {
    SocketRule {
        host,
        slot: slot.to_string(),
        name: name.to_string(),
        accepts: accepts.to_vec(),
    }
}

/// Built-in catalog
pub fn default_catalog() -> Catalog {
    let mut extended_mag = template(10204, "Extended Mag", "accMagazine", (1, 2), 5200, 3);
    extended_mag.capacity_bonus = 10;
    let mut pistol_mag = template(10205, "Pistol Extended Mag", "accMagazine", (1, 1), 2100, 2);
    pistol_mag.capacity_bonus = 8;

    let entities = vec![
        // Weapons
        firearm(
            template(10001, "M4A1", "gunRifle", (4, 2), 42000, 4),
            "ammo556",
            30,
            &["scope", "muzzle", "magazine", "stock"],
        ),
        firearm(
            template(10002, "AKM", "gunRifle", (4, 2), 38000, 3),
            "ammo762",
            30,
            &["scope", "muzzle"],
        ),
        firearm(
            template(10004, "Vector", "gunSMG", (3, 2), 31000, 4),
            "ammo9x19",
            25,
            &["scope", "muzzle"],
        ),
        firearm(template(10003, "G17", "gunPistol", (2, 1), 9000, 2), "ammo9x19", 17, &["magazine"]),
        // Ammunition
        stackable(template(10101, "5.56x45 M855", "ammo556", (1, 1), 180, 2), 60),
        stackable(template(10102, "7.62x39 PS", "ammo762", (1, 1), 150, 2), 60),
        stackable(template(10103, "9x19 AP6.3", "ammo9x19", (1, 1), 90, 2), 60),
        // Accessories
        template(10201, "Red Dot", "accScope", (1, 1), 2500, 2),
        template(10202, "Holo Sight", "accScope", (1, 1), 3600, 3),
        template(10203, "Suppressor", "accMuzzle", (2, 1), 6400, 3),
        extended_mag,
        pistol_mag,
        template(10206, "Tactical Stock", "accStock", (2, 1), 3000, 2),
        // Gear
        template(10301, "Combat Knife", "knife", (1, 2), 1800, 1),
        template(10401, "Tactical Helmet", "helmet", (2, 2), 14000, 3),
        template(10402, "Plate Carrier", "armor", (3, 3), 26000, 4),
        carrier(
            template(10501, "Assault Pack", "bag", (3, 3), 9000, 2),
            CarrierClass::Bag,
            &[(3, 2, 0, 0), (2, 2, 0, 2), (1, 2, 2, 2)],
        ),
        carrier(
            template(10502, "Field Pack", "bag", (4, 4), 16000, 4),
            CarrierClass::Bag,
            &[(4, 3, 0, 0), (2, 3, 0, 3), (2, 3, 2, 3), (1, 2, 4, 0)],
        ),
        carrier(
            template(10601, "Light Rig", "chest", (3, 2), 7000, 2),
            CarrierClass::Chest,
            &[(1, 2, 0, 0), (1, 2, 1, 0), (1, 2, 2, 0), (2, 1, 3, 0)],
        ),
        // Valuables
        template(10701, "Gold Watch", "collection", (1, 1), 12000, 4),
        template(10702, "Laptop", "collection", (2, 2), 48000, 5),
        template(10703, "Server Blade", "collection", (2, 3), 95000, 6),
        template(10704, "Lighter", "collection", (1, 1), 300, 1),
        template(10705, "Gas Analyzer", "collection", (2, 1), 21000, 4),
        // Consumables
        stackable(template(10801, "Painkillers", "consume", (1, 1), 800, 1), 4),
        template(10802, "Med Kit", "consume", (2, 2), 4000, 2),
    ];

    let sockets = vec![
        rule(10001, "scope", "Scope", &[10201, 10202]),
        rule(10001, "muzzle", "Muzzle", &[10203]),
        rule(10001, "magazine", "Magazine", &[10204]),
        rule(10001, "stock", "Stock", &[10206]),
        rule(10002, "scope", "Scope", &[10201, 10202]),
        rule(10002, "muzzle", "Muzzle", &[10203]),
        rule(10004, "scope", "Scope", &[10201]),
        rule(10004, "muzzle", "Muzzle", &[10203]),
        rule(10003, "magazine", "Magazine", &[10205]),
    ];

    Catalog { entities, sockets }
}
