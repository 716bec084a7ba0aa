use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, ratio};
use crate::hex::HexCoord;
use crate::id::BuildingTypeId;
use crate::resource::{Resource, ResourceMap};
use crate::terrain::{Terrain, TerrainLookup};

// ---------------------------------------------------------------------------
// Building definitions
// ---------------------------------------------------------------------------

/// Economic district a building belongs to, for zone (supercluster) bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneCategory {
    Agricultural,
    Mining,
    Industry,
    Residential,
}

impl ZoneCategory {
    pub const ALL: [ZoneCategory; 4] = [
        ZoneCategory::Agricultural,
        ZoneCategory::Mining,
        ZoneCategory::Industry,
        ZoneCategory::Residential,
    ];
}

/// The flavour of a logistics hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubKind {
    Depot,
    Station,
    /// Ports also join the water-port clique.
    Port,
}

/// Hub behaviour: the building owns every cell within `radius`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubSpec {
    pub kind: HubKind,
    pub radius: u32,
}

/// An immutable building definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingDef {
    pub name: String,
    /// Consumed per tick at full efficiency.
    pub inputs: ResourceMap,
    /// Produced per tick at full efficiency, before bonuses.
    pub outputs: ResourceMap,
    pub era: u32,
    /// The cell must carry at least one of these tags. Empty means no requirement.
    pub required_terrain: Vec<Terrain>,
    pub upgrades_to: Option<BuildingTypeId>,
    pub construction_cost: ResourceMap,
    pub zone: Option<ZoneCategory>,
    pub hub: Option<HubSpec>,
    /// Consumes its inputs for export over a route to the map edge.
    pub exports: bool,
    /// Absorbs leftover producer surplus for export (depots, stations).
    pub absorbs_surplus: bool,
    /// Acts as a zone wildcard and amplifies zone bonuses.
    pub university: bool,
}

impl BuildingDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: ResourceMap::new(),
            outputs: ResourceMap::new(),
            era: 0,
            required_terrain: Vec::new(),
            upgrades_to: None,
            construction_cost: ResourceMap::new(),
            zone: None,
            hub: None,
            exports: false,
            absorbs_surplus: false,
            university: false,
        }
    }

    pub fn with_input(mut self, resource: Resource, amount: Fixed64) -> Self {
        self.inputs.set(resource, amount);
        self
    }

    pub fn with_output(mut self, resource: Resource, amount: Fixed64) -> Self {
        self.outputs.set(resource, amount);
        self
    }

    pub fn with_cost(mut self, resource: Resource, amount: Fixed64) -> Self {
        self.construction_cost.set(resource, amount);
        self
    }

    pub fn in_zone(mut self, zone: ZoneCategory) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn as_hub(mut self, kind: HubKind, radius: u32) -> Self {
        self.hub = Some(HubSpec { kind, radius });
        self
    }

    pub fn requires(mut self, tag: Terrain) -> Self {
        self.required_terrain.push(tag);
        self
    }

    /// No terrain requirement, or at least one required tag present at `at`.
    pub fn terrain_met(&self, terrain: &dyn TerrainLookup, at: HexCoord) -> bool {
        self.required_terrain.is_empty() || self.required_terrain.iter().any(|t| terrain.has(at, *t))
    }

    pub fn is_hub(&self) -> bool {
        self.hub.is_some()
    }

    pub fn is_port(&self) -> bool {
        matches!(self.hub, Some(HubSpec { kind: HubKind::Port, .. }))
    }

    /// Counts as a member of every zone category.
    pub fn is_zone_wildcard(&self) -> bool {
        self.university || self.is_hub()
    }

    /// Gets an export route computed each tick.
    pub fn is_export_capable(&self) -> bool {
        self.exports || self.absorbs_surplus
    }

    /// Export buildings, depots and stations run whether or not anything
    /// downstream wants their outputs.
    pub fn runs_without_demand(&self) -> bool {
        self.is_export_capable() || self.is_hub()
    }
}

// ---------------------------------------------------------------------------
// Infrastructure definitions
// ---------------------------------------------------------------------------

/// Which sub-type slot of an edge an infrastructure type occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceCategory {
    Transport,
    Power,
}

/// Every infrastructure type that can occupy an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfraType {
    Road,
    Rail,
    Canal,
    PowerLine,
    HvLine,
}

impl InfraType {
    pub const ALL: [InfraType; 5] = [
        InfraType::Road,
        InfraType::Rail,
        InfraType::Canal,
        InfraType::PowerLine,
        InfraType::HvLine,
    ];

    pub fn category(self) -> DistanceCategory {
        match self {
            InfraType::Road | InfraType::Rail | InfraType::Canal => DistanceCategory::Transport,
            InfraType::PowerLine | InfraType::HvLine => DistanceCategory::Power,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InfraType::Road => "road",
            InfraType::Rail => "rail",
            InfraType::Canal => "canal",
            InfraType::PowerLine => "power_line",
            InfraType::HvLine => "hv_line",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Per-type infrastructure numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraSpec {
    /// Path cost of one step along an edge of this type.
    pub step_cost: Fixed64,
    pub money_cost: u32,
    pub construction_cost: ResourceMap,
    pub upgrades_to: Option<InfraType>,
}

impl InfraSpec {
    /// Stock numbers used when a catalog does not override a type.
    pub fn default_for(kind: InfraType) -> Self {
        let (step_cost, money_cost, upgrades_to) = match kind {
            InfraType::Road => (ratio(1, 2), 10, Some(InfraType::Rail)),
            InfraType::Rail => (ratio(1, 4), 40, None),
            InfraType::Canal => (ratio(3, 10), 30, None),
            InfraType::PowerLine => (ratio(1, 5), 15, Some(InfraType::HvLine)),
            InfraType::HvLine => (ratio(1, 20), 50, None),
        };
        let mut construction_cost = ResourceMap::new();
        match kind {
            InfraType::Road => construction_cost.set(Resource::Stone, Fixed64::from_num(2)),
            InfraType::Rail => {
                construction_cost.set(Resource::Iron, Fixed64::from_num(2));
                construction_cost.set(Resource::Wood, Fixed64::from_num(2));
            }
            InfraType::Canal => construction_cost.set(Resource::Stone, Fixed64::from_num(4)),
            InfraType::PowerLine => construction_cost.set(Resource::Wood, Fixed64::from_num(1)),
            InfraType::HvLine => construction_cost.set(Resource::Steel, Fixed64::from_num(2)),
        }
        Self {
            step_cost,
            money_cost,
            construction_cost,
            upgrades_to,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`Catalog`].
/// Two-phase lifecycle: registration/mutation -> finalization.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    buildings: Vec<BuildingDef>,
    building_name_to_id: HashMap<String, BuildingTypeId>,
    infrastructure: BTreeMap<InfraType, InfraSpec>,
    base_values: ResourceMap,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a building definition. Returns its ID.
    pub fn register_building(&mut self, def: BuildingDef) -> Result<BuildingTypeId, CatalogError> {
        if self.building_name_to_id.contains_key(&def.name) {
            return Err(CatalogError::DuplicateBuilding(def.name));
        }
        let id = BuildingTypeId(self.buildings.len() as u32);
        self.building_name_to_id.insert(def.name.clone(), id);
        self.buildings.push(def);
        Ok(id)
    }

    /// Mutate an existing building definition by name.
    pub fn mutate_building<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut BuildingDef),
    {
        let id = self
            .building_name_to_id
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        f(&mut self.buildings[id.0 as usize]);
        Ok(())
    }

    /// Declare that `from` upgrades into `to`.
    pub fn set_upgrade(&mut self, from: &str, to: &str) -> Result<(), CatalogError> {
        let target = self
            .building_id(to)
            .ok_or_else(|| CatalogError::NotFound(to.to_string()))?;
        self.mutate_building(from, |b| b.upgrades_to = Some(target))
    }

    pub fn set_infrastructure(&mut self, kind: InfraType, spec: InfraSpec) {
        self.infrastructure.insert(kind, spec);
    }

    /// Fill every infrastructure type not yet set with [`InfraSpec::default_for`].
    pub fn with_default_infrastructure(&mut self) -> &mut Self {
        for kind in InfraType::ALL {
            self.infrastructure
                .entry(kind)
                .or_insert_with(|| InfraSpec::default_for(kind));
        }
        self
    }

    /// Export base value of a resource. Resources without one are not exportable.
    pub fn set_base_value(&mut self, resource: Resource, value: Fixed64) {
        self.base_values.set(resource, value);
    }

    pub fn building_id(&self, name: &str) -> Option<BuildingTypeId> {
        self.building_name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let count = self.buildings.len() as u32;
        for (index, def) in self.buildings.iter().enumerate() {
            if let Some(target) = def.upgrades_to {
                if target.0 >= count {
                    return Err(CatalogError::InvalidUpgrade {
                        building: def.name.clone(),
                        target,
                    });
                }
                if target.0 as usize == index {
                    return Err(CatalogError::SelfUpgrade(def.name.clone()));
                }
            }
            if matches!(def.hub, Some(HubSpec { radius: 0, .. })) {
                return Err(CatalogError::ZeroHubRadius(def.name.clone()));
            }
        }
        for (kind, spec) in &self.infrastructure {
            if spec.step_cost < Fixed64::ZERO {
                return Err(CatalogError::NegativeStepCost(*kind));
            }
            if let Some(next) = spec.upgrades_to {
                if next.category() != kind.category() {
                    return Err(CatalogError::CrossCategoryUpgrade(*kind, next));
                }
            }
        }

        Ok(Catalog {
            buildings: self.buildings,
            building_name_to_id: self.building_name_to_id,
            infrastructure: self.infrastructure,
            base_values: self.base_values,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog. Frozen after build(). Safe to share across threads.
#[derive(Debug, Clone)]
pub struct Catalog {
    buildings: Vec<BuildingDef>,
    building_name_to_id: HashMap<String, BuildingTypeId>,
    infrastructure: BTreeMap<InfraType, InfraSpec>,
    base_values: ResourceMap,
}

impl Catalog {
    pub fn building(&self, id: BuildingTypeId) -> Option<&BuildingDef> {
        self.buildings.get(id.0 as usize)
    }

    pub fn building_id(&self, name: &str) -> Option<BuildingTypeId> {
        self.building_name_to_id.get(name).copied()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn buildings(&self) -> impl Iterator<Item = (BuildingTypeId, &BuildingDef)> {
        self.buildings
            .iter()
            .enumerate()
            .map(|(i, def)| (BuildingTypeId(i as u32), def))
    }

    pub fn infrastructure(&self, kind: InfraType) -> Option<&InfraSpec> {
        self.infrastructure.get(&kind)
    }

    /// Step cost for an edge of `kind`; types missing from the catalog cost
    /// a plain grid step.
    pub fn step_cost(&self, kind: InfraType) -> Fixed64 {
        self.infrastructure
            .get(&kind)
            .map(|s| s.step_cost)
            .unwrap_or(Fixed64::ONE)
    }

    pub fn base_value(&self, resource: Resource) -> Fixed64 {
        self.base_values.get(resource)
    }

    pub fn base_values(&self) -> &ResourceMap {
        &self.base_values
    }

    pub fn is_exportable(&self, resource: Resource) -> bool {
        self.base_values.contains(resource)
    }

    /// Whether `a` and `b` may share a cluster: same type, or one is the
    /// immediate upgrade of the other.
    pub fn cluster_compatible(&self, a: BuildingTypeId, b: BuildingTypeId) -> bool {
        if a == b {
            return true;
        }
        let up = |x: BuildingTypeId| self.building(x).and_then(|d| d.upgrades_to);
        up(a) == Some(b) || up(b) == Some(a)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate building: {0}")]
    DuplicateBuilding(String),
    #[error("building {building} upgrades to unknown type {target:?}")]
    InvalidUpgrade {
        building: String,
        target: BuildingTypeId,
    },
    #[error("building {0} upgrades to itself")]
    SelfUpgrade(String),
    #[error("hub {0} has a zero radius")]
    ZeroHubRadius(String),
    #[error("infrastructure {0:?} has a negative step cost")]
    NegativeStepCost(InfraType),
    #[error("infrastructure {0:?} upgrades across categories to {1:?}")]
    CrossCategoryUpgrade(InfraType, InfraType),
}
