//! Hex cells and the grid snapshot the engine reads and rebuilds each tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::construction::is_complete;
use crate::fixed::Fixed64;
use crate::hex::HexCoord;
use crate::id::BuildingTypeId;
use crate::resource::ResourceMap;

/// A building mid-build on a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionSite {
    pub target: BuildingTypeId,
    pub cost: ResourceMap,
    pub delivered: ResourceMap,
    /// Set when the site replaces an existing building of this type.
    #[serde(default)]
    pub upgrade_from: Option<BuildingTypeId>,
}

impl ConstructionSite {
    pub fn new(target: BuildingTypeId, cost: ResourceMap) -> Self {
        Self {
            target,
            cost,
            delivered: ResourceMap::new(),
            upgrade_from: None,
        }
    }

    pub fn upgrade(from: BuildingTypeId, target: BuildingTypeId, cost: ResourceMap) -> Self {
        Self {
            upgrade_from: Some(from),
            ..Self::new(target, cost)
        }
    }

    /// Resources still owed: `cost - delivered`, clamped at zero.
    pub fn outstanding(&self) -> ResourceMap {
        self.cost.saturating_sub(&self.delivered)
    }

    pub fn is_complete(&self) -> bool {
        is_complete(&self.cost, &self.delivered)
    }
}

/// Per-tick diagnostics written for every built cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    /// Output at full efficiency, bonuses included.
    pub potential: ResourceMap,
    /// Output actually produced (`potential * efficiency`).
    pub realized: ResourceMap,
    pub demand: ResourceMap,
    pub received: ResourceMap,
    pub consumed: ResourceMap,
    pub distance_loss: ResourceMap,
    pub input_shortage: ResourceMap,
    pub efficiency: Fixed64,
    /// Worst `received / demand` ratio, unfloored. 1 when nothing is demanded.
    pub satisfaction: Fixed64,
    pub cluster_size: u32,
    pub cluster_bonus: Fixed64,
    pub zone_bonus: Fixed64,
    pub zone_universities: u32,
    pub zone_size: u32,
    /// Weakest-link route quality to the map edge, for export-capable buildings.
    pub export_efficiency: Option<Fixed64>,
    pub exported: ResourceMap,
    /// The building's required terrain is absent on this cell.
    pub requirement_missing: bool,
    /// Produced or received more than the activity epsilon this tick.
    pub active: bool,
}

/// One tile of the hex grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexCell {
    pub building: Option<BuildingTypeId>,
    pub construction: Option<ConstructionSite>,
    pub flow: Option<FlowState>,
    #[serde(default)]
    pub prioritized: bool,
    #[serde(default)]
    pub paused: bool,
}

impl HexCell {
    pub fn with_building(building: BuildingTypeId) -> Self {
        Self {
            building: Some(building),
            ..Self::default()
        }
    }

    /// A finished building (paused or not) and no site on top of it.
    pub fn built(&self) -> Option<BuildingTypeId> {
        match (self.building, &self.construction) {
            (Some(b), None) => Some(b),
            _ => None,
        }
    }

    /// A finished, unpaused building.
    pub fn operating(&self) -> Option<BuildingTypeId> {
        if self.paused { None } else { self.built() }
    }
}

/// The map: every cell keyed by coordinate, iterated in `(q, r)` order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cells: BTreeMap<HexCoord, HexCell>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hexagon of empty cells centred on the origin.
    pub fn hexagon(radius: u32) -> Self {
        let mut grid = Self::new();
        for coord in HexCoord::new(0, 0).within(radius) {
            grid.insert(coord, HexCell::default());
        }
        grid
    }

    pub fn insert(&mut self, coord: HexCoord, cell: HexCell) {
        self.cells.insert(coord, cell);
    }

    pub fn get(&self, coord: HexCoord) -> Option<&HexCell> {
        self.cells.get(&coord)
    }

    pub fn get_mut(&mut self, coord: HexCoord) -> Option<&mut HexCell> {
        self.cells.get_mut(&coord)
    }

    pub fn contains(&self, coord: HexCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HexCoord, &HexCell)> {
        self.cells.iter().map(|(c, cell)| (*c, cell))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (HexCoord, &mut HexCell)> {
        self.cells.iter_mut().map(|(c, cell)| (*c, cell))
    }

    pub fn coords(&self) -> impl Iterator<Item = HexCoord> + '_ {
        self.cells.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Place a finished building, clearing any site on the cell.
    pub fn place(&mut self, coord: HexCoord, building: BuildingTypeId) {
        let cell = self.cells.entry(coord).or_default();
        cell.building = Some(building);
        cell.construction = None;
    }

    /// Start a construction site, clearing any building on the cell.
    pub fn start_site(&mut self, coord: HexCoord, site: ConstructionSite) {
        let cell = self.cells.entry(coord).or_default();
        cell.building = None;
        cell.construction = Some(site);
    }
}
