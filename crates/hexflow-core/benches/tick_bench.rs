//! Criterion benchmarks for the hexflow tick engine.
//!
//! Two benchmark groups:
//! - `small_map`: radius 8 (217 cells), a few repeated production chains
//! - `large_map`: radius 32 (3169 cells), chains plus a road grid and depots
//!
//! `large_map` approximates a late-game settlement: the tick must stay well
//! under the host's frame budget when run off the main thread.

use criterion::{Criterion, criterion_group, criterion_main};
use hexflow_core::engine::{Engine, TickInput};
use hexflow_core::grid::Grid;
use hexflow_core::hex::HexCoord;
use hexflow_core::infra::{EdgeKey, InfraNetwork, InfraSites, InfrastructureEdge, TransportKind};
use hexflow_core::terrain::TerrainMap;
use hexflow_core::test_utils::*;

// ===========================================================================
// Map builders
// ===========================================================================

/// Repeating 4-cell chain: woodcutter -> sawmill -> market, plus a farm.
const PATTERN: [&str; 4] = ["woodcutter", "sawmill", "market", "farm"];

fn build_map(radius: u32, depot_every: i32) -> (Grid, TerrainMap, InfraNetwork) {
    let engine = test_engine();
    let catalog = engine.catalog();
    let mut grid = Grid::hexagon(radius);
    let coords: Vec<HexCoord> = grid.coords().collect();

    for (i, &c) in coords.iter().enumerate() {
        // Leave every third column empty so chains stay short.
        if c.q.rem_euclid(3) == 2 {
            continue;
        }
        let name = if depot_every > 0 && c.q % depot_every == 0 && c.r % depot_every == 0 {
            "depot"
        } else {
            PATTERN[i % PATTERN.len()]
        };
        grid.place(c, id(catalog, name));
    }

    let mut infra = InfraNetwork::new();
    if depot_every > 0 {
        // Roads along the empty columns.
        for &c in &coords {
            if c.q.rem_euclid(3) != 2 {
                continue;
            }
            let next = HexCoord::new(c.q, c.r + 1);
            if grid.contains(next) {
                infra.insert(EdgeKey::new(c, next), InfrastructureEdge::transport(TransportKind::Road));
            }
        }
    }

    let terrain = flat_terrain(&grid);
    (grid, terrain, infra)
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_map(c: &mut Criterion, group_name: &str, name: &str, radius: u32, depot_every: i32) {
    let mut group = c.benchmark_group(group_name);
    group.sample_size(20);

    let engine: Engine = test_engine();
    let (grid, terrain, infra) = build_map(radius, depot_every);
    let sites = InfraSites::new();

    group.bench_function(name, |b| {
        b.iter(|| {
            let input = TickInput::new(&grid, &terrain, &infra, &sites);
            engine.simulate_tick(&input)
        });
    });

    group.finish();
}

fn bench_small_map(c: &mut Criterion) {
    bench_map(c, "small_map", "radius_8_chains", 8, 0);
}

fn bench_large_map(c: &mut Criterion) {
    bench_map(c, "large_map", "radius_32_roads_and_depots", 32, 6);
}

criterion_group!(benches, bench_small_map, bench_large_map);
criterion_main!(benches);
