//! Cluster analysis: contiguous groups of the same building type.
//!
//! Hubs pass connectivity through without joining a cluster. A building and
//! its immediate upgrade bridge one another, but the adjacency score only
//! counts members of the exact same type.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::catalog::Catalog;
use crate::fixed::{Fixed64, half_pow, ratio};
use crate::grid::{Grid, HexCell};
use crate::hex::HexCoord;
use crate::id::BuildingTypeId;

/// Per-cell cluster result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    /// Members in the connected cluster, this cell included.
    pub size: u32,
    /// Raw distance-decayed adjacency score.
    pub score: Fixed64,
    /// Quantized output bonus.
    pub bonus: Fixed64,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterAnalysis {
    pub cells: BTreeMap<HexCoord, ClusterInfo>,
}

impl ClusterAnalysis {
    pub fn get(&self, coord: HexCoord) -> ClusterInfo {
        self.cells.get(&coord).copied().unwrap_or_default()
    }

    pub fn bonus(&self, coord: HexCoord) -> Fixed64 {
        self.get(coord).bonus
    }
}

/// Step a raw score down to its bonus tier.
pub fn quantize(score: Fixed64) -> Fixed64 {
    if score >= Fixed64::from_num(5) {
        Fixed64::ONE
    } else if score >= Fixed64::from_num(3) {
        ratio(1, 2)
    } else if score >= Fixed64::from_num(2) {
        ratio(1, 4)
    } else if score >= Fixed64::ONE {
        ratio(1, 10)
    } else {
        Fixed64::ZERO
    }
}

fn member_type(cell: &HexCell, catalog: &Catalog) -> Option<BuildingTypeId> {
    let building = cell.built()?;
    let def = catalog.building(building)?;
    (!def.is_hub()).then_some(building)
}

fn is_passage(cell: &HexCell, catalog: &Catalog) -> bool {
    cell.built()
        .and_then(|b| catalog.building(b))
        .is_some_and(|def| def.is_hub())
}

/// Flood one cluster from `seed`. Returns its members and the hub cells it
/// passed through.
///
/// Each queued cell carries the type that reached it, and a hub carries on
/// whichever type entered it. A hub is crossed once per entering type, so
/// every member touching it can bridge to its own compatible types.
fn flood(
    grid: &Grid,
    catalog: &Catalog,
    seed: HexCoord,
    seed_type: BuildingTypeId,
) -> (BTreeMap<HexCoord, BuildingTypeId>, BTreeSet<HexCoord>) {
    let mut members = BTreeMap::from([(seed, seed_type)]);
    let mut crossed = BTreeSet::new();
    let mut queue = VecDeque::from([(seed, seed_type)]);

    while let Some((current, via)) = queue.pop_front() {
        for next in current.neighbors() {
            if members.contains_key(&next) {
                continue;
            }
            let Some(cell) = grid.get(next) else { continue };
            if let Some(ty) = member_type(cell, catalog) {
                if catalog.cluster_compatible(via, ty) {
                    members.insert(next, ty);
                    queue.push_back((next, ty));
                }
            } else if is_passage(cell, catalog) && crossed.insert((next, via)) {
                queue.push_back((next, via));
            }
        }
    }
    let passages = crossed.into_iter().map(|(hub, _)| hub).collect();
    (members, passages)
}

/// Sum of `0.5^(d - 1)` over same-type members at BFS depth `d`, walking only
/// cells of the cluster. Stops once the top tier is reached.
fn adjacency_score(
    start: HexCoord,
    ty: BuildingTypeId,
    members: &BTreeMap<HexCoord, BuildingTypeId>,
    walkable: &BTreeSet<HexCoord>,
) -> Fixed64 {
    let cap = Fixed64::from_num(5);
    let mut score = Fixed64::ZERO;
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([(start, 0u32)]);

    while let Some((current, depth)) = queue.pop_front() {
        for next in current.neighbors() {
            if !walkable.contains(&next) || !seen.insert(next) {
                continue;
            }
            let d = depth + 1;
            if members.get(&next) == Some(&ty) {
                score += half_pow(d - 1);
                if score >= cap {
                    return score;
                }
            }
            queue.push_back((next, d));
        }
    }
    score
}

/// Cluster size, score and bonus for every built, non-hub cell.
pub fn analyze_clusters(grid: &Grid, catalog: &Catalog) -> ClusterAnalysis {
    let mut analysis = ClusterAnalysis::default();
    let mut assigned = BTreeSet::new();

    for (coord, cell) in grid.iter() {
        if assigned.contains(&coord) {
            continue;
        }
        let Some(ty) = member_type(cell, catalog) else {
            continue;
        };
        let (members, passages) = flood(grid, catalog, coord, ty);
        let size = members.len() as u32;
        let walkable: BTreeSet<HexCoord> = members.keys().chain(passages.iter()).copied().collect();

        for (&member, &member_ty) in &members {
            assigned.insert(member);
            let score = if size > 1 {
                adjacency_score(member, member_ty, &members, &walkable)
            } else {
                Fixed64::ZERO
            };
            analysis.cells.insert(
                member,
                ClusterInfo {
                    size,
                    score,
                    bonus: quantize(score),
                },
            );
        }
    }
    analysis
}
