//! The tick engine: one pure pass from map snapshots to flows.
//!
//! # Architecture
//!
//! The `Engine` owns only immutable configuration:
//! - A [`Catalog`] (building and infrastructure definitions, export values)
//! - An [`EngineConfig`] (decay constants, reserve, hub hop, zone tuning)
//!
//! Everything else arrives per call in a [`TickInput`] and leaves in a freshly
//! built [`TickOutput`]. The inputs are never mutated, so a tick can be
//! computed off the main thread and discarded if it goes stale.
//!
//! # Seven-Phase Pipeline
//!
//! Each `simulate_tick()` runs:
//! 1. **Sweep** -- convert sites that already meet their cost
//! 2. **Analyze** -- cluster, zone and export-route analysis
//! 3. **Route** -- build the routing graph, register producers and
//!    consumers, precompute distance maps
//! 4. **Converge** -- processor rounds feeding efficiency forward
//! 5. **Settle** -- authoritative processor pass and per-building diagnostics
//! 6. **Construct** -- feed sites from leftovers, released reserve and
//!    recycled surplus; convert finished sites
//! 7. **Export** -- feed export buildings, then let depots absorb surplus

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::allocation::{
    BuildingLink, ConsumerClass, ConsumerState, FlowArena, PassParams, ProducerKind,
    ProducerState, Stage, Transfer, converge_processors,
};
use crate::catalog::{BuildingDef, Catalog};
use crate::cluster::analyze_clusters;
use crate::config::EngineConfig;
use crate::construction::{self, SiteDeliveries};
use crate::export::{absorb_surplus, export_efficiencies};
use crate::fixed::{EPSILON, Fixed64};
use crate::graph::{DistanceCache, RouteProfile, RoutingGraph};
use crate::grid::{FlowState, Grid};
use crate::hex::HexCoord;
use crate::infra::{InfraNetwork, InfraSites};
use crate::resource::{Resource, ResourceMap};
use crate::sim::StateHash;
use crate::terrain::TerrainLookup;
use crate::zone::analyze_zones;

// ---------------------------------------------------------------------------
// Tick inputs and outputs
// ---------------------------------------------------------------------------

/// Read-only snapshots for one tick.
pub struct TickInput<'a> {
    pub grid: &'a Grid,
    pub terrain: &'a dyn TerrainLookup,
    pub infra: &'a InfraNetwork,
    pub infra_sites: &'a InfraSites,
}

impl<'a> TickInput<'a> {
    pub fn new(
        grid: &'a Grid,
        terrain: &'a dyn TerrainLookup,
        infra: &'a InfraNetwork,
        infra_sites: &'a InfraSites,
    ) -> Self {
        Self {
            grid,
            terrain,
            infra,
            infra_sites,
        }
    }
}

/// Tick-wide ledger. Every field is additive over producers and consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub potential: ResourceMap,
    /// What processors asked for.
    pub potential_demand: ResourceMap,
    pub realized: ResourceMap,
    /// Used by processors and construction sites.
    pub consumed: ResourceMap,
    /// Taken by export buildings and depots.
    pub export_consumed: ResourceMap,
    pub lost_to_distance: ResourceMap,
    pub lost_to_shortage: ResourceMap,
}

impl FlowSummary {
    fn maps(&self) -> [&ResourceMap; 7] {
        [
            &self.potential,
            &self.potential_demand,
            &self.realized,
            &self.consumed,
            &self.export_consumed,
            &self.lost_to_distance,
            &self.lost_to_shortage,
        ]
    }
}

/// One aggregated transfer route, for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPair {
    pub source: HexCoord,
    pub dest: HexCoord,
    pub resource: Resource,
    pub amount: Fixed64,
    pub path_cost: Fixed64,
}

/// Everything a tick produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutput {
    pub grid: Grid,
    pub flow_summary: FlowSummary,
    /// Exported volume per resource, after route efficiency.
    pub export_rate: ResourceMap,
    pub infra_edges: InfraNetwork,
    pub infra_construction_sites: InfraSites,
    pub flow_pairs: Vec<FlowPair>,
    /// Sites converted this tick, at the sweep or after feeding.
    pub completed_sites: usize,
}

impl TickOutput {
    /// Deterministic hash of the whole output, for desync detection.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        for (coord, cell) in self.grid.iter() {
            h.write_coord(coord);
            h.write_u32(cell.building.map_or(u32::MAX, |b| b.0));
            h.write_bool(cell.paused);
            if let Some(site) = &cell.construction {
                h.write_u32(site.target.0);
                h.write_resource_map(&site.delivered);
            }
            if let Some(flow) = &cell.flow {
                h.write_resource_map(&flow.realized);
                h.write_resource_map(&flow.received);
                h.write_resource_map(&flow.exported);
                h.write_fixed64(flow.efficiency);
                h.write_fixed64(flow.satisfaction);
            }
        }
        for (key, edge) in &self.infra_edges {
            let (a, b) = key.endpoints();
            h.write_coord(a);
            h.write_coord(b);
            h.write_u32(edge.transport.map_or(0, |k| k as u32 + 1));
            h.write_u32(edge.power.map_or(0, |k| k as u32 + 1));
        }
        for (key, site) in &self.infra_construction_sites {
            let (a, b) = key.endpoints();
            h.write_coord(a);
            h.write_coord(b);
            h.write(site.target.name().as_bytes());
            h.write_resource_map(&site.delivered);
        }
        for map in self.flow_summary.maps() {
            h.write_resource_map(map);
        }
        h.write_resource_map(&self.export_rate);
        for pair in &self.flow_pairs {
            h.write_coord(pair.source);
            h.write_coord(pair.dest);
            h.write(pair.resource.name().as_bytes());
            h.write_fixed64(pair.amount);
            h.write_fixed64(pair.path_cost);
        }
        h.finish()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs ticks against an immutable catalog and tuning.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Catalog,
    config: EngineConfig,
}

/// A building that survived the terrain and pause checks this tick.
struct Plan<'c> {
    coord: HexCoord,
    def: &'c BuildingDef,
    potential: ResourceMap,
    demand: ResourceMap,
    prioritized: bool,
    export_efficiency: Fixed64,
}

struct TickFlows {
    cells: BTreeMap<HexCoord, FlowState>,
    deliveries: SiteDeliveries,
    summary: FlowSummary,
    export_rate: ResourceMap,
    pairs: Vec<FlowPair>,
}

/// Aggregates transfers by `(source, dest, resource)`.
#[derive(Default)]
struct PairLedger {
    pairs: BTreeMap<(HexCoord, HexCoord, Resource), (Fixed64, Fixed64)>,
}

impl PairLedger {
    fn record(&mut self, arena: &FlowArena, transfers: &[Transfer]) {
        for t in transfers {
            let (Some(p), Some(c)) = (arena.producers.get(t.producer), arena.consumers.get(t.consumer))
            else {
                continue;
            };
            let entry = self
                .pairs
                .entry((p.location, c.location, t.resource))
                .or_insert((Fixed64::ZERO, t.path_cost));
            entry.0 += t.delivered;
            entry.1 = entry.1.min(t.path_cost);
        }
    }

    fn finish(self) -> Vec<FlowPair> {
        self.pairs
            .into_iter()
            .filter(|(_, (amount, _))| *amount >= EPSILON)
            .map(|((source, dest, resource), (amount, path_cost))| FlowPair {
                source,
                dest,
                resource,
                amount,
                path_cost,
            })
            .collect()
    }
}

/// Mark producers whose outputs nobody wants. Repeats until stable, since an
/// idle building stops demanding its own inputs.
fn idle_plans(plans: &[Plan<'_>], construction: &BTreeSet<Resource>, catalog: &Catalog) -> Vec<bool> {
    let mut always = construction.clone();
    for plan in plans {
        if plan.export_efficiency <= Fixed64::ZERO {
            continue;
        }
        if plan.def.exports {
            always.extend(plan.demand.resources());
        }
        if plan.def.absorbs_surplus {
            always.extend(Resource::ALL.into_iter().filter(|r| catalog.is_exportable(*r)));
        }
    }

    let mut idle = vec![false; plans.len()];
    loop {
        let mut demanded = always.clone();
        for (plan, &is_idle) in plans.iter().zip(&idle) {
            if !is_idle && !plan.def.exports {
                demanded.extend(plan.demand.resources());
            }
        }
        let mut changed = false;
        for (plan, is_idle) in plans.iter().zip(idle.iter_mut()) {
            if *is_idle || plan.def.runs_without_demand() || plan.potential.is_empty() {
                continue;
            }
            if plan.potential.resources().all(|r| !demanded.contains(&r)) {
                *is_idle = true;
                changed = true;
            }
        }
        if !changed {
            return idle;
        }
    }
}

impl Engine {
    pub fn new(catalog: Catalog, config: EngineConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one tick. Never fails: malformed records are skipped with a warning
    /// and reported through diagnostics instead.
    pub fn simulate_tick(&self, input: &TickInput<'_>) -> TickOutput {
        let mut grid = input.grid.clone();
        let mut infra = input.infra.clone();
        let mut sites = input.infra_sites.clone();

        // Phase 1: Sweep
        let swept = construction::sweep_completed(&mut grid, &mut infra, &mut sites, &self.catalog);
        for (_, cell) in grid.iter_mut() {
            cell.flow = None;
        }
        debug!(swept, cells = grid.len(), "sweep");

        // Phases 2-7
        let TickFlows {
            cells,
            deliveries,
            summary,
            export_rate,
            pairs,
        } = self.compute_flows(&grid, input.terrain, &infra, &sites);

        for (coord, flow) in cells {
            if let Some(cell) = grid.get_mut(coord) {
                cell.flow = Some(flow);
            }
        }
        let completed = construction::apply_deliveries(&mut grid, &mut infra, &mut sites, &deliveries);
        debug!(completed, pairs = pairs.len(), "tick done");

        TickOutput {
            grid,
            flow_summary: summary,
            export_rate,
            infra_edges: infra,
            infra_construction_sites: sites,
            flow_pairs: pairs,
            completed_sites: swept + completed,
        }
    }

    fn compute_flows(
        &self,
        grid: &Grid,
        terrain: &dyn TerrainLookup,
        infra: &InfraNetwork,
        sites: &InfraSites,
    ) -> TickFlows {
        let catalog = &self.catalog;
        let config = &self.config;

        // Phase 2: Analyze
        let clusters = analyze_clusters(grid, catalog);
        let zones = analyze_zones(grid, catalog, &config.zone);
        let export_eff = export_efficiencies(grid, catalog, infra, terrain);
        debug!(
            clustered = clusters.cells.len(),
            zoned = zones.cells.len(),
            exporters = export_eff.len(),
            "analyze"
        );

        let mut cells: BTreeMap<HexCoord, FlowState> = BTreeMap::new();
        let mut plans = Vec::new();
        for (coord, cell) in grid.iter() {
            let Some(building) = cell.built() else {
                continue;
            };
            let Some(def) = catalog.building(building) else {
                warn!(%coord, building = building.0, "unknown building type; skipped");
                continue;
            };
            let cluster = clusters.get(coord);
            let zone = zones.get(coord);
            let mut flow = FlowState {
                satisfaction: Fixed64::ONE,
                cluster_size: cluster.size,
                cluster_bonus: cluster.bonus,
                zone_bonus: zone.bonus,
                zone_universities: zone.universities,
                zone_size: zone.size,
                export_efficiency: export_eff.get(&coord).copied(),
                ..FlowState::default()
            };
            if cell.paused {
                cells.insert(coord, flow);
                continue;
            }
            if !def.terrain_met(terrain, coord) {
                flow.requirement_missing = true;
                cells.insert(coord, flow);
                continue;
            }
            let potential = def
                .outputs
                .scaled(Fixed64::ONE + cluster.bonus + zone.output_bonus(&config.zone));
            let demand = def
                .inputs
                .scaled(Fixed64::ONE - zone.input_reduction(&config.zone));
            flow.potential = potential.clone();
            flow.efficiency = Fixed64::ONE;
            cells.insert(coord, flow);
            plans.push(Plan {
                coord,
                def,
                potential,
                demand,
                prioritized: cell.prioritized,
                export_efficiency: export_eff.get(&coord).copied().unwrap_or(Fixed64::ZERO),
            });
        }

        // Phase 3: Route
        let graph = RoutingGraph::new(grid, infra, catalog, terrain, config.hub_hop_cost);
        let mut routes = DistanceCache::new(&graph, config.max_route_cost);
        let mut arena = FlowArena::new();

        construction::register_sites(&mut arena, grid, sites, catalog);
        let reserved = arena.demanded(Stage::Construction);
        let idle = idle_plans(&plans, &reserved, catalog);

        let mut links: BTreeMap<HexCoord, BuildingLink> = BTreeMap::new();
        for (plan, &is_idle) in plans.iter().zip(&idle) {
            let mut link = BuildingLink::default();
            if !plan.potential.is_empty() {
                let producer = if is_idle {
                    ProducerState::idle(plan.coord, plan.potential.clone())
                } else {
                    ProducerState::new(plan.coord, ProducerKind::Building, plan.potential.clone())
                };
                link.producer = Some(arena.add_producer(producer));
            }
            let hub = plan.def.is_hub();
            if plan.def.exports {
                if plan.export_efficiency > Fixed64::ZERO && !plan.demand.is_empty() {
                    arena.add_consumer(
                        ConsumerState::new(plan.coord, ConsumerClass::Export, plan.demand.clone())
                            .prioritized(plan.prioritized)
                            .hub(hub),
                    );
                }
            } else if !is_idle && !plan.demand.is_empty() {
                link.consumer = Some(
                    arena.add_consumer(
                        ConsumerState::new(plan.coord, ConsumerClass::Processor, plan.demand.clone())
                            .prioritized(plan.prioritized)
                            .hub(hub),
                    ),
                );
            }
            if plan.def.absorbs_surplus && plan.export_efficiency > Fixed64::ZERO {
                arena.add_consumer(
                    ConsumerState::new(plan.coord, ConsumerClass::Absorber, ResourceMap::new()).hub(hub),
                );
            }
            links.insert(plan.coord, link);
        }
        if let Some(base) = &config.base_population {
            arena.add_producer(ProducerState::new(
                base.anchor,
                ProducerKind::BasePopulation,
                base.outputs.clone(),
            ));
        }

        let sources: BTreeSet<HexCoord> = arena.producers.values().map(|p| p.location).collect();
        let sources: Vec<HexCoord> = sources.into_iter().collect();
        routes.prime(&sources, RouteProfile::Transport);
        debug!(
            hubs = graph.hubs().hub_count(),
            ports = graph.water_ports().len(),
            producers = arena.producers.len(),
            consumers = arena.consumers.len(),
            idle = idle.iter().filter(|i| **i).count(),
            reserved = reserved.len(),
            "route"
        );

        // Phase 4: Converge
        let settled = converge_processors(&mut arena, &links, &mut routes, &reserved, config);
        debug!(transfers = settled.len(), "converge");

        // Phase 5: Settle
        let mut summary = FlowSummary::default();
        let mut pairs = PairLedger::default();
        pairs.record(&arena, &settled);

        for p in arena.producers.values() {
            summary.potential.merge(&p.potential);
            summary.realized.merge(&p.realized());
        }
        for (coord, link) in &links {
            let Some(flow) = cells.get_mut(coord) else {
                continue;
            };
            let producer = link.producer.map(|id| &arena.producers[id]);
            let consumer = link.consumer.map(|id| &arena.consumers[id]);
            flow.efficiency = match (producer, consumer) {
                (Some(p), _) => p.efficiency,
                (None, Some(c)) => c.efficiency,
                (None, None) => Fixed64::ONE,
            };
            if let Some(p) = producer {
                flow.realized = p.realized();
            }
            if let Some(c) = consumer {
                let consumed = c.consumed();
                let shortage = c.shortage();
                summary.potential_demand.merge(&c.demand);
                summary.consumed.merge(&consumed);
                summary.lost_to_distance.merge(&c.distance_loss);
                summary.lost_to_shortage.merge(&shortage);
                flow.demand = c.demand.clone();
                flow.received = c.received.clone();
                flow.consumed = consumed;
                flow.distance_loss = c.distance_loss.clone();
                flow.input_shortage = shortage;
                flow.satisfaction = c.satisfaction();
            }
        }
        debug!(realized = %summary.realized.total(), "settle");

        // Phase 6: Construct
        construction::release_reserve(&mut arena, &reserved, config.construction_reserve);
        let recycled = construction::recycle_surplus(&mut arena);
        let built = arena.allocate(
            &mut routes,
            Stage::Construction,
            PassParams::new(config, config.construction_decay),
        );
        pairs.record(&arena, &built);
        for (_, c) in arena.consumers_in(Stage::Construction) {
            summary.consumed.merge(&c.received);
            summary.lost_to_distance.merge(&c.distance_loss);
            if c.class == ConsumerClass::BuildingSite {
                let flow = cells.entry(c.location).or_default();
                flow.demand = c.demand.clone();
                flow.received = c.received.clone();
                flow.consumed = c.received.clone();
                flow.distance_loss = c.distance_loss.clone();
                flow.input_shortage = c.shortage();
                flow.satisfaction = c.satisfaction();
            }
        }
        let deliveries = SiteDeliveries::collect(&arena);
        debug!(
            recycled,
            transfers = built.len(),
            building_sites = deliveries.buildings.len(),
            infra_sites = deliveries.infra.len(),
            "construct"
        );

        // Phase 7: Export
        let export_params = PassParams::new(config, config.export_decay);
        let shipped = arena.allocate(&mut routes, Stage::Export, export_params);
        pairs.record(&arena, &shipped);
        let absorbed = absorb_surplus(&mut arena, &mut routes, catalog, export_params);
        pairs.record(&arena, &absorbed);

        let mut export_rate = ResourceMap::new();
        for (_, c) in arena.consumers_in(Stage::Export) {
            let efficiency = export_eff.get(&c.location).copied().unwrap_or(Fixed64::ZERO);
            let exported = c.received.scaled(efficiency);
            summary.export_consumed.merge(&c.received);
            summary.lost_to_distance.merge(&c.distance_loss);
            export_rate.merge(&exported);
            let Some(flow) = cells.get_mut(&c.location) else {
                continue;
            };
            flow.received.merge(&c.received);
            flow.consumed.merge(&c.received);
            flow.distance_loss.merge(&c.distance_loss);
            flow.exported.merge(&exported);
            if c.class == ConsumerClass::Export {
                flow.demand = c.demand.clone();
                flow.input_shortage = c.shortage();
                flow.satisfaction = c.satisfaction();
                flow.efficiency = flow.satisfaction;
            }
        }
        for plan in &plans {
            if plan.def.exports && plan.export_efficiency <= Fixed64::ZERO {
                if let Some(flow) = cells.get_mut(&plan.coord) {
                    flow.efficiency = Fixed64::ZERO;
                }
            }
        }
        debug!(
            shipped = shipped.len(),
            absorbed = absorbed.len(),
            exported = %export_rate.total(),
            "export"
        );

        for flow in cells.values_mut() {
            flow.active = flow.realized.total() > EPSILON || flow.received.total() > EPSILON;
        }

        TickFlows {
            cells,
            deliveries,
            summary,
            export_rate,
            pairs: pairs.finish(),
        }
    }
}
