//! Export routing and depot surplus absorption.
//!
//! An export-capable building's route quality is the best weakest-link path
//! to the map edge over transport infrastructure and water. Depots and
//! stations with a route also soak up whatever exportable output nobody else
//! took, split between them by transfer efficiency.

use std::collections::{BTreeMap, BinaryHeap};

use crate::allocation::{
    ConsumerClass, FlowArena, PassParams, ProducerKind, Transfer, transfer_efficiency,
};
use crate::catalog::Catalog;
use crate::fixed::{Fixed64, checked_div_64, ratio};
use crate::graph::{DistanceCache, RouteProfile};
use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::id::{ConsumerId, ProducerId};
use crate::infra::{EdgeKey, InfraNetwork, TransportKind};
use crate::terrain::TerrainLookup;

/// Efficiency of one step along a transport edge.
pub fn step_efficiency(kind: TransportKind) -> Fixed64 {
    match kind {
        TransportKind::Road => ratio(1, 2),
        TransportKind::Rail => ratio(7, 10),
        TransportKind::Canal => Fixed64::ONE,
    }
}

/// Efficiency of a step touching water.
pub const WATER_STEP_EFFICIENCY: Fixed64 = Fixed64::ONE;

/// A cell with a neighbor off the grid or devoid of terrain.
pub fn is_map_edge(grid: &Grid, terrain: &dyn TerrainLookup, coord: HexCoord) -> bool {
    coord
        .neighbors()
        .iter()
        .any(|n| !grid.contains(*n) || terrain.terrain(*n).is_empty())
}

fn step(
    from: HexCoord,
    to: HexCoord,
    infra: &InfraNetwork,
    terrain: &dyn TerrainLookup,
) -> Option<Fixed64> {
    let by_edge = infra
        .get(&EdgeKey::new(from, to))
        .and_then(|e| e.transport)
        .map(step_efficiency);
    let by_water = (terrain.is_water(from) || terrain.is_water(to)).then_some(WATER_STEP_EFFICIENCY);
    by_edge.max(by_water)
}

/// Best weakest-link efficiency from `origin` to any map-edge cell, or zero
/// when no such route exists.
pub fn export_efficiency(
    origin: HexCoord,
    grid: &Grid,
    infra: &InfraNetwork,
    terrain: &dyn TerrainLookup,
) -> Fixed64 {
    if !grid.contains(origin) {
        return Fixed64::ZERO;
    }
    let mut best: BTreeMap<HexCoord, Fixed64> = BTreeMap::from([(origin, Fixed64::ONE)]);
    let mut heap = BinaryHeap::from([(Fixed64::ONE, origin)]);

    while let Some((value, cell)) = heap.pop() {
        if best.get(&cell).is_some_and(|b| value < *b) {
            continue;
        }
        if is_map_edge(grid, terrain, cell) {
            return value;
        }
        for next in cell.neighbors() {
            if !grid.contains(next) {
                continue;
            }
            let Some(link) = step(cell, next, infra, terrain) else {
                continue;
            };
            let candidate = value.min(link);
            if best.get(&next).is_none_or(|b| candidate > *b) {
                best.insert(next, candidate);
                heap.push((candidate, next));
            }
        }
    }
    Fixed64::ZERO
}

/// Export efficiency for every operating export-capable building.
pub fn export_efficiencies(
    grid: &Grid,
    catalog: &Catalog,
    infra: &InfraNetwork,
    terrain: &dyn TerrainLookup,
) -> BTreeMap<HexCoord, Fixed64> {
    grid.iter()
        .filter(|(_, cell)| {
            cell.operating()
                .and_then(|b| catalog.building(b))
                .is_some_and(|def| def.is_export_capable())
        })
        .map(|(coord, _)| (coord, export_efficiency(coord, grid, infra, terrain)))
        .collect()
}

/// Split every producer's leftover exportable output among reachable
/// absorbers, weighted by transfer efficiency. Producers end with nothing
/// exportable left.
pub fn absorb_surplus(
    arena: &mut FlowArena,
    routes: &mut DistanceCache<'_, '_>,
    catalog: &Catalog,
    params: PassParams,
) -> Vec<Transfer> {
    let absorbers: Vec<(ConsumerId, HexCoord, bool)> = arena
        .consumers
        .iter()
        .filter(|(_, c)| c.class == ConsumerClass::Absorber)
        .map(|(id, c)| (id, c.location, c.hub))
        .collect();
    let mut transfers = Vec::new();
    if absorbers.is_empty() {
        return transfers;
    }
    let producers: Vec<ProducerId> = arena
        .producers
        .iter()
        .filter(|(_, p)| p.kind != ProducerKind::Recycled)
        .map(|(id, _)| id)
        .collect();

    for pid in producers {
        let location = arena.producers[pid].location;
        let leftovers: Vec<_> = arena.producers[pid]
            .remaining
            .iter()
            .filter(|(r, _)| catalog.is_exportable(*r))
            .collect();

        for (resource, amount) in leftovers {
            let mut shares = Vec::new();
            let mut weight = Fixed64::ZERO;
            for &(cid, at, hub) in &absorbers {
                let profile = RouteProfile::for_delivery(resource, hub);
                let Some(cost) = routes.cost(profile, location, at) else {
                    continue;
                };
                if cost > params.max_cost {
                    continue;
                }
                let efficiency = transfer_efficiency(cost, params.decay);
                if efficiency > Fixed64::ZERO {
                    shares.push((cid, cost, efficiency));
                    weight += efficiency;
                }
            }
            if shares.is_empty() {
                continue;
            }

            for (cid, cost, efficiency) in shares {
                let fraction = checked_div_64(efficiency, weight).unwrap_or(Fixed64::ZERO);
                let sent = amount * fraction;
                let delivered = sent * efficiency;
                let absorber = &mut arena.consumers[cid];
                absorber.received.add(resource, delivered);
                absorber.distance_loss.add(resource, sent - delivered);
                transfers.push(Transfer {
                    producer: pid,
                    consumer: cid,
                    resource,
                    sent,
                    delivered,
                    path_cost: cost,
                });
            }
            arena.producers[pid].remaining.set(resource, Fixed64::ZERO);
        }
    }
    transfers
}
