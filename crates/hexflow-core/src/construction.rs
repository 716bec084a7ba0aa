//! Construction feeding.
//!
//! Building and infrastructure sites are served after processors. Supply is
//! whatever processors left behind, the construction reserve released back to
//! producers, and input that processors received but did not consume.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::allocation::{ConsumerClass, ConsumerState, FlowArena, ProducerKind, ProducerState};
use crate::catalog::Catalog;
use crate::fixed::{EPSILON, Fixed64};
use crate::grid::{ConstructionSite, Grid};
use crate::hex::HexCoord;
use crate::infra::{EdgeKey, InfraConstructionSite, InfraNetwork, InfraSites};
use crate::resource::{Resource, ResourceMap};

/// Every resource in `cost` has been delivered to within [`EPSILON`].
pub fn is_complete(cost: &ResourceMap, delivered: &ResourceMap) -> bool {
    cost.iter().all(|(r, c)| delivered.get(r) >= c - EPSILON)
}

fn building_site_valid(site: &ConstructionSite, catalog: &Catalog, at: HexCoord) -> bool {
    if catalog.building(site.target).is_some() {
        return true;
    }
    warn!(%at, target = site.target.0, "construction site targets unknown building; skipped");
    false
}

fn infra_site_valid(key: &EdgeKey, site: &InfraConstructionSite, grid: &Grid) -> bool {
    let (a, b) = key.endpoints();
    if site.edge != *key || !key.is_adjacent() {
        warn!(%a, %b, "infrastructure site has a malformed edge key; skipped");
        return false;
    }
    if !grid.contains(a) || !grid.contains(b) {
        warn!(%a, %b, "infrastructure site lies outside the grid; skipped");
        return false;
    }
    true
}

fn complete_building(grid: &mut Grid, at: HexCoord) -> bool {
    let Some(cell) = grid.get_mut(at) else {
        return false;
    };
    let Some(site) = cell.construction.take() else {
        return false;
    };
    info!(%at, target = site.target.0, upgrade = site.upgrade_from.is_some(), "building completed");
    cell.building = Some(site.target);
    true
}

fn complete_infra(infra: &mut InfraNetwork, site: &InfraConstructionSite) {
    let (a, b) = site.edge.endpoints();
    info!(%a, %b, kind = site.target.name(), "infrastructure completed");
    infra.entry(site.edge).or_default().install(site.target);
}

/// Convert every valid site that already meets its cost. Returns how many
/// were converted.
pub fn sweep_completed(
    grid: &mut Grid,
    infra: &mut InfraNetwork,
    sites: &mut InfraSites,
    catalog: &Catalog,
) -> usize {
    let ready: Vec<HexCoord> = grid
        .iter()
        .filter_map(|(coord, cell)| {
            let site = cell.construction.as_ref()?;
            (site.is_complete() && building_site_valid(site, catalog, coord)).then_some(coord)
        })
        .collect();
    let mut converted = 0;
    for coord in ready {
        if complete_building(grid, coord) {
            converted += 1;
        }
    }

    let done: Vec<EdgeKey> = sites
        .iter()
        .filter(|(key, site)| site.is_complete() && infra_site_valid(key, site, grid))
        .map(|(key, _)| *key)
        .collect();
    for key in done {
        if let Some(site) = sites.remove(&key) {
            complete_infra(infra, &site);
            converted += 1;
        }
    }
    converted
}

/// Add a consumer for every valid, unpaused site with outstanding cost.
pub fn register_sites(arena: &mut FlowArena, grid: &Grid, sites: &InfraSites, catalog: &Catalog) {
    for (coord, cell) in grid.iter() {
        let Some(site) = &cell.construction else {
            continue;
        };
        if cell.paused || !building_site_valid(site, catalog, coord) {
            continue;
        }
        let outstanding = site.outstanding();
        if !outstanding.is_empty() {
            arena.add_consumer(
                ConsumerState::new(coord, ConsumerClass::BuildingSite, outstanding)
                    .prioritized(cell.prioritized),
            );
        }
    }
    for (key, site) in sites {
        if !infra_site_valid(key, site, grid) {
            continue;
        }
        let outstanding = site.outstanding();
        if !outstanding.is_empty() {
            arena.add_consumer(
                ConsumerState::new(key.anchor(), ConsumerClass::InfraSite(*key), outstanding)
                    .prioritized(site.prioritized),
            );
        }
    }
}

/// Give producers back the share of output they withheld for construction.
pub fn release_reserve(arena: &mut FlowArena, reserved: &BTreeSet<Resource>, reserve: Fixed64) {
    for p in arena.producers.values_mut() {
        if p.kind == ProducerKind::Recycled {
            continue;
        }
        for &r in reserved {
            let held = p.potential.get(r) * p.efficiency * reserve;
            p.remaining.add(r, held);
        }
    }
}

/// Offer every processor's unused input as a producer at its location.
/// Returns how many recycled producers were added.
pub fn recycle_surplus(arena: &mut FlowArena) -> usize {
    let surplus: Vec<(HexCoord, ResourceMap)> = arena
        .consumers
        .values()
        .filter(|c| c.class == ConsumerClass::Processor)
        .map(|c| (c.location, c.surplus()))
        .filter(|(_, s)| !s.is_empty())
        .collect();
    let count = surplus.len();
    for (location, amounts) in surplus {
        arena.add_producer(ProducerState::new(location, ProducerKind::Recycled, amounts));
    }
    count
}

/// What the construction pass delivered, per building site and per edge.
#[derive(Debug, Clone, Default)]
pub struct SiteDeliveries {
    pub buildings: BTreeMap<HexCoord, ResourceMap>,
    pub infra: BTreeMap<EdgeKey, ResourceMap>,
}

impl SiteDeliveries {
    pub fn collect(arena: &FlowArena) -> Self {
        let mut out = Self::default();
        for c in arena.consumers.values() {
            if c.received.is_empty() {
                continue;
            }
            match c.class {
                ConsumerClass::BuildingSite => {
                    out.buildings.entry(c.location).or_default().merge(&c.received);
                }
                ConsumerClass::InfraSite(key) => {
                    out.infra.entry(key).or_default().merge(&c.received);
                }
                _ => {}
            }
        }
        out
    }
}

/// Credit deliveries to their sites and convert the sites they complete.
/// Returns how many sites completed.
pub fn apply_deliveries(
    grid: &mut Grid,
    infra: &mut InfraNetwork,
    sites: &mut InfraSites,
    deliveries: &SiteDeliveries,
) -> usize {
    let mut completed = 0;
    for (&coord, amounts) in &deliveries.buildings {
        let finished = match grid.get_mut(coord).and_then(|c| c.construction.as_mut()) {
            Some(site) => {
                site.delivered.merge(amounts);
                site.is_complete()
            }
            None => false,
        };
        if finished && complete_building(grid, coord) {
            completed += 1;
        }
    }
    for (key, amounts) in &deliveries.infra {
        let finished = match sites.get_mut(key) {
            Some(site) => {
                site.delivered.merge(amounts);
                site.is_complete()
            }
            None => false,
        };
        if finished {
            if let Some(site) = sites.remove(key) {
                complete_infra(infra, &site);
                completed += 1;
            }
        }
    }
    completed
}
