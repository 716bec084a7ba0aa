//! Weighted routing over the hex grid.
//!
//! Every pair of adjacent cells is joined by an implicit edge of cost 1.0,
//! overridden by the catalog step cost when an infrastructure edge of the
//! route's category exists. Two virtual topologies extend the graph without
//! materializing edges:
//!
//! - **Water-port clique**: every operating port reaches every other port at
//!   zero additional cost.
//! - **Hub-zone star**: a hub owns the cells within its radius; moving between
//!   the hub and any owned cell costs `hub_hop_cost` in either direction.
//!
//! Shortcuts apply to goods only. Electricity follows the plain grid plus
//! power lines.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::catalog::{BuildingDef, Catalog, DistanceCategory, InfraType};
use crate::fixed::Fixed64;
use crate::grid::{Grid, HexCell};
use crate::hex::HexCoord;
use crate::infra::{EdgeKey, InfraNetwork};
use crate::resource::Resource;
use crate::terrain::TerrainLookup;

// ---------------------------------------------------------------------------
// Profiles and results
// ---------------------------------------------------------------------------

/// How a route is costed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteProfile {
    /// Goods over land, roads, rails and canals, with hub and port shortcuts.
    Transport,
    /// Like `Transport`, but steps touching water cost a canal step. Used for
    /// deliveries into hubs.
    Waterborne,
    /// Electricity over the grid and power lines.
    Power,
}

impl RouteProfile {
    pub fn category(self) -> DistanceCategory {
        match self {
            RouteProfile::Transport | RouteProfile::Waterborne => DistanceCategory::Transport,
            RouteProfile::Power => DistanceCategory::Power,
        }
    }

    /// The profile for delivering `resource` into a consumer.
    pub fn for_delivery(resource: Resource, consumer_is_hub: bool) -> Self {
        if resource.is_electricity() {
            RouteProfile::Power
        } else if consumer_is_hub {
            RouteProfile::Waterborne
        } else {
            RouteProfile::Transport
        }
    }

    fn uses_shortcuts(self) -> bool {
        !matches!(self, RouteProfile::Power)
    }
}

/// Cheapest known cost from one source to every reached cell.
pub type DistanceMap = BTreeMap<HexCoord, Fixed64>;

/// A reconstructed route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Source first, destination last.
    pub cells: Vec<HexCoord>,
    pub cost: Fixed64,
}

// ---------------------------------------------------------------------------
// Hub zones
// ---------------------------------------------------------------------------

/// Cell ownership by hubs. Each cell belongs to exactly its nearest hub;
/// equidistant hubs resolve to the lower coordinate.
#[derive(Debug, Clone, Default)]
pub struct HubZones {
    owner: BTreeMap<HexCoord, HexCoord>,
    members: BTreeMap<HexCoord, Vec<HexCoord>>,
}

/// The building at `coord` if it runs this tick: operating, with its terrain
/// requirement met.
fn working_building<'c>(
    coord: HexCoord,
    cell: &HexCell,
    catalog: &'c Catalog,
    terrain: &dyn TerrainLookup,
) -> Option<&'c BuildingDef> {
    catalog
        .building(cell.operating()?)
        .filter(|def| def.terrain_met(terrain, coord))
}

impl HubZones {
    pub fn compute(grid: &Grid, catalog: &Catalog, terrain: &dyn TerrainLookup) -> Self {
        let hubs: Vec<(HexCoord, u32)> = grid
            .iter()
            .filter_map(|(coord, cell)| {
                let def = working_building(coord, cell, catalog, terrain)?;
                def.hub.map(|spec| (coord, spec.radius))
            })
            .collect();
        let hub_cells: BTreeSet<HexCoord> = hubs.iter().map(|(c, _)| *c).collect();

        let mut best: BTreeMap<HexCoord, (u32, HexCoord)> = BTreeMap::new();
        for &(hub, radius) in &hubs {
            for cell in hub.within(radius) {
                if hub_cells.contains(&cell) || !grid.contains(cell) {
                    continue;
                }
                let d = hub.distance(cell);
                let better = match best.get(&cell) {
                    None => true,
                    Some(&(bd, bh)) => d < bd || (d == bd && hub < bh),
                };
                if better {
                    best.insert(cell, (d, hub));
                }
            }
        }

        let mut zones = HubZones::default();
        for &(hub, _) in &hubs {
            zones.members.insert(hub, Vec::new());
        }
        for (cell, (_, hub)) in best {
            zones.owner.insert(cell, hub);
            zones.members.entry(hub).or_default().push(cell);
        }
        zones
    }

    pub fn owner_of(&self, cell: HexCoord) -> Option<HexCoord> {
        self.owner.get(&cell).copied()
    }

    pub fn members_of(&self, hub: HexCoord) -> &[HexCoord] {
        self.members.get(&hub).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_hub(&self, cell: HexCoord) -> bool {
        self.members.contains_key(&cell)
    }

    pub fn hub_count(&self) -> usize {
        self.members.len()
    }
}

// ---------------------------------------------------------------------------
// Routing graph
// ---------------------------------------------------------------------------

/// Read-only view of the map as a weighted graph.
pub struct RoutingGraph<'a> {
    grid: &'a Grid,
    edges: &'a InfraNetwork,
    catalog: &'a Catalog,
    terrain: &'a dyn TerrainLookup,
    hubs: HubZones,
    /// Sorted, so membership is a binary search.
    water_ports: Vec<HexCoord>,
    hub_hop_cost: Fixed64,
}

impl<'a> RoutingGraph<'a> {
    pub fn new(
        grid: &'a Grid,
        edges: &'a InfraNetwork,
        catalog: &'a Catalog,
        terrain: &'a dyn TerrainLookup,
        hub_hop_cost: Fixed64,
    ) -> Self {
        let water_ports = grid
            .iter()
            .filter(|&(coord, cell)| {
                working_building(coord, cell, catalog, terrain).is_some_and(|def| def.is_port())
            })
            .map(|(coord, _)| coord)
            .collect();
        Self {
            grid,
            edges,
            catalog,
            terrain,
            hubs: HubZones::compute(grid, catalog, terrain),
            water_ports,
            hub_hop_cost,
        }
    }

    pub fn hubs(&self) -> &HubZones {
        &self.hubs
    }

    pub fn water_ports(&self) -> &[HexCoord] {
        &self.water_ports
    }

    /// Cost of one step between adjacent cells.
    pub fn step_cost(&self, from: HexCoord, to: HexCoord, profile: RouteProfile) -> Fixed64 {
        let infra = self
            .edges
            .get(&EdgeKey::new(from, to))
            .and_then(|e| e.in_category(profile.category()));
        if let Some(kind) = infra {
            return self.catalog.step_cost(kind);
        }
        if profile == RouteProfile::Waterborne
            && (self.terrain.is_water(from) || self.terrain.is_water(to))
        {
            return self.catalog.step_cost(InfraType::Canal);
        }
        Fixed64::ONE
    }

    /// Visit every successor of `cell` with the cost of reaching it.
    fn for_each_successor(
        &self,
        cell: HexCoord,
        profile: RouteProfile,
        mut visit: impl FnMut(HexCoord, Fixed64),
    ) {
        for next in cell.neighbors() {
            if self.grid.contains(next) {
                visit(next, self.step_cost(cell, next, profile));
            }
        }
        if !profile.uses_shortcuts() {
            return;
        }
        if self.water_ports.binary_search(&cell).is_ok() {
            for &port in &self.water_ports {
                if port != cell {
                    visit(port, Fixed64::ZERO);
                }
            }
        }
        for &member in self.hubs.members_of(cell) {
            visit(member, self.hub_hop_cost);
        }
        if let Some(hub) = self.hubs.owner_of(cell) {
            visit(hub, self.hub_hop_cost);
        }
    }

    /// Dijkstra from `source`, bounded by `max_cost`. Stops early once
    /// `target` is settled.
    fn dijkstra(
        &self,
        source: HexCoord,
        max_cost: Fixed64,
        profile: RouteProfile,
        target: Option<HexCoord>,
    ) -> (DistanceMap, BTreeMap<HexCoord, HexCoord>) {
        let mut dist = DistanceMap::new();
        let mut parent = BTreeMap::new();
        if !self.grid.contains(source) {
            return (dist, parent);
        }

        let mut settled = BTreeSet::new();
        let mut heap = BinaryHeap::new();
        dist.insert(source, Fixed64::ZERO);
        heap.push(Reverse((Fixed64::ZERO, source)));

        while let Some(Reverse((cost, cell))) = heap.pop() {
            if !settled.insert(cell) {
                continue;
            }
            if Some(cell) == target {
                break;
            }
            self.for_each_successor(cell, profile, |next, step| {
                let candidate = cost + step;
                if candidate > max_cost || settled.contains(&next) {
                    return;
                }
                let improves = dist.get(&next).is_none_or(|known| candidate < *known);
                if improves {
                    dist.insert(next, candidate);
                    parent.insert(next, cell);
                    heap.push(Reverse((candidate, next)));
                }
            });
        }
        (dist, parent)
    }

    /// Distance map from a single source.
    pub fn distances_from(
        &self,
        source: HexCoord,
        max_cost: Fixed64,
        profile: RouteProfile,
    ) -> DistanceMap {
        self.dijkstra(source, max_cost, profile, None).0
    }

    /// One bounded distance map per source. Cells beyond `max_cost` are absent.
    pub fn precompute_distances(
        &self,
        sources: &[HexCoord],
        max_cost: Fixed64,
        profile: RouteProfile,
    ) -> BTreeMap<HexCoord, DistanceMap> {
        sources
            .iter()
            .map(|&s| (s, self.distances_from(s, max_cost, profile)))
            .collect()
    }

    /// Cheapest route from `source` to `dest`, or `None` when it would cost
    /// more than `max_cost`.
    pub fn find_path(
        &self,
        source: HexCoord,
        dest: HexCoord,
        max_cost: Fixed64,
        profile: RouteProfile,
    ) -> Option<Path> {
        let (dist, parent) = self.dijkstra(source, max_cost, profile, Some(dest));
        let cost = *dist.get(&dest)?;
        let mut cells = vec![dest];
        let mut cursor = dest;
        while cursor != source {
            cursor = *parent.get(&cursor)?;
            cells.push(cursor);
        }
        cells.reverse();
        Some(Path { cells, cost })
    }
}

// ---------------------------------------------------------------------------
// Distance cache
// ---------------------------------------------------------------------------

/// Lazily filled distance maps for one tick, keyed by profile and source.
pub struct DistanceCache<'g, 'a> {
    graph: &'g RoutingGraph<'a>,
    max_cost: Fixed64,
    maps: BTreeMap<(RouteProfile, HexCoord), DistanceMap>,
}

impl<'g, 'a> DistanceCache<'g, 'a> {
    pub fn new(graph: &'g RoutingGraph<'a>, max_cost: Fixed64) -> Self {
        Self {
            graph,
            max_cost,
            maps: BTreeMap::new(),
        }
    }

    pub fn graph(&self) -> &'g RoutingGraph<'a> {
        self.graph
    }

    /// Compute maps for every source not cached yet.
    pub fn prime(&mut self, sources: &[HexCoord], profile: RouteProfile) {
        let missing: Vec<HexCoord> = sources
            .iter()
            .copied()
            .filter(|s| !self.maps.contains_key(&(profile, *s)))
            .collect();
        for (source, map) in self
            .graph
            .precompute_distances(&missing, self.max_cost, profile)
        {
            self.maps.insert((profile, source), map);
        }
    }

    /// The distance map from `source`, computing it on first use.
    pub fn map(&mut self, profile: RouteProfile, source: HexCoord) -> &DistanceMap {
        let graph = self.graph;
        let max_cost = self.max_cost;
        self.maps
            .entry((profile, source))
            .or_insert_with(|| graph.distances_from(source, max_cost, profile))
    }

    /// Path cost from `from` to `to`, or `None` when unreachable within the cap.
    pub fn cost(&mut self, profile: RouteProfile, from: HexCoord, to: HexCoord) -> Option<Fixed64> {
        self.map(profile, from).get(&to).copied()
    }

    pub fn cached_maps(&self) -> usize {
        self.maps.len()
    }
}
