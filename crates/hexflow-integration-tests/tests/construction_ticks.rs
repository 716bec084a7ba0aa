//! Construction sites fed over several ticks.

use hexflow_core::catalog::{BuildingDef, Catalog, CatalogBuilder, InfraType};
use hexflow_core::engine::{Engine, TickInput, TickOutput};
use hexflow_core::grid::{ConstructionSite, Grid};
use hexflow_core::hex::HexCoord;
use hexflow_core::infra::{
    EdgeKey, InfraConstructionSite, InfraNetwork, InfraSites, InfrastructureEdge, PowerKind,
    TransportKind,
};
use hexflow_core::resource::{Resource, ResourceMap};
use hexflow_core::test_utils::*;

fn builder_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    b.with_default_infrastructure();
    let defs = [
        BuildingDef::new("forester").with_output(Resource::Wood, fixed(1.0)),
        BuildingDef::new("pit").with_output(Resource::Stone, fixed(2.0)),
        BuildingDef::new("cabin").with_cost(Resource::Wood, fixed(3.0)),
    ];
    for def in defs {
        b.register_building(def).unwrap();
    }
    b.build().unwrap()
}

fn cabin_site(catalog: &Catalog) -> ConstructionSite {
    let cabin = id(catalog, "cabin");
    ConstructionSite::new(cabin, catalog.building(cabin).unwrap().construction_cost.clone())
}

fn tick(engine: &Engine, grid: &Grid, infra: &InfraNetwork, sites: &InfraSites) -> TickOutput {
    let terrain = flat_terrain(grid);
    engine.simulate_tick(&TickInput::new(grid, &terrain, infra, sites))
}

#[test]
fn site_completes_after_enough_ticks() {
    let engine = Engine::new(builder_catalog(), test_config());
    let catalog = engine.catalog();
    let cabin = id(catalog, "cabin");
    let at = HexCoord::new(1, 0);

    let mut grid = Grid::hexagon(3);
    grid.place(HexCoord::new(0, 0), id(catalog, "forester"));
    grid.start_site(at, cabin_site(catalog));

    let mut completed_on = None;
    for t in 1..=5 {
        let out = run_tick(&engine, &grid);
        if out.completed_sites > 0 {
            assert!(completed_on.is_none(), "site completed twice");
            completed_on = Some(t);
        }
        grid = out.grid;
    }
    assert_eq!(completed_on, Some(3));

    let cell = grid.get(at).unwrap();
    assert_eq!(cell.building, Some(cabin));
    assert!(cell.construction.is_none());
}

#[test]
fn partial_progress_is_carried_between_ticks() {
    let engine = Engine::new(builder_catalog(), test_config());
    let catalog = engine.catalog();
    let at = HexCoord::new(1, 0);

    let mut grid = Grid::hexagon(3);
    grid.place(HexCoord::new(0, 0), id(catalog, "forester"));
    grid.start_site(at, cabin_site(catalog));

    let out = run_tick(&engine, &grid);
    let site = out.grid.get(at).unwrap().construction.clone().unwrap();
    assert_eq!(site.delivered.get(Resource::Wood), fixed(1.0));
    assert_eq!(site.outstanding().get(Resource::Wood), fixed(2.0));

    // The forester is not idle while the site wants wood.
    let forester = out.grid.get(HexCoord::new(0, 0)).unwrap().flow.as_ref().unwrap();
    assert!(forester.active);
    assert_eq!(forester.realized.get(Resource::Wood), fixed(1.0));
}

#[test]
fn paused_site_receives_nothing() {
    let engine = Engine::new(builder_catalog(), test_config());
    let catalog = engine.catalog();
    let at = HexCoord::new(1, 0);

    let mut grid = Grid::hexagon(3);
    grid.place(HexCoord::new(0, 0), id(catalog, "forester"));
    grid.start_site(at, cabin_site(catalog));
    grid.get_mut(at).unwrap().paused = true;

    let out = run_tick(&engine, &grid);
    let site = out.grid.get(at).unwrap().construction.as_ref().unwrap();
    assert!(site.delivered.is_empty());
    assert_eq!(out.completed_sites, 0);
    // With nothing to feed, the forester idles.
    let forester = out.grid.get(HexCoord::new(0, 0)).unwrap().flow.as_ref().unwrap();
    assert!(forester.realized.is_empty());
}

#[test]
fn road_site_is_built_from_local_stone() {
    let engine = Engine::new(builder_catalog(), test_config());
    let catalog = engine.catalog();
    let mut grid = Grid::hexagon(3);
    grid.place(HexCoord::new(0, 0), id(catalog, "pit"));

    let edge = EdgeKey::new(HexCoord::new(1, 0), HexCoord::new(2, 0));
    let cost: ResourceMap = [(Resource::Stone, fixed(2.0))].into_iter().collect();
    let mut sites = InfraSites::new();
    sites.insert(edge, InfraConstructionSite::new(edge, InfraType::Road, cost));

    let out = tick(&engine, &grid, &InfraNetwork::new(), &sites);
    assert_eq!(out.completed_sites, 1);
    assert!(out.infra_construction_sites.is_empty());
    assert_eq!(
        out.infra_edges.get(&edge).and_then(|e| e.transport),
        Some(TransportKind::Road)
    );
}

#[test]
fn rail_upgrade_keeps_the_power_line() {
    let engine = Engine::new(builder_catalog(), test_config());
    let grid = Grid::hexagon(2);
    let edge = EdgeKey::new(HexCoord::new(0, 0), HexCoord::new(0, 1));

    let mut infra = InfraNetwork::new();
    infra.insert(
        edge,
        InfrastructureEdge {
            transport: Some(TransportKind::Road),
            power: Some(PowerKind::PowerLine),
        },
    );
    let mut sites = InfraSites::new();
    sites.insert(edge, InfraConstructionSite::new(edge, InfraType::Rail, ResourceMap::new()));

    let out = tick(&engine, &grid, &infra, &sites);
    assert_eq!(out.completed_sites, 1);
    let upgraded = out.infra_edges[&edge];
    assert_eq!(upgraded.transport, Some(TransportKind::Rail));
    assert_eq!(upgraded.power, Some(PowerKind::PowerLine));
}

#[test]
fn funded_upgrade_replaces_the_building() {
    let engine = test_engine();
    let catalog = engine.catalog();
    let from = id(catalog, "woodcutter");
    let to = id(catalog, "lumber_camp");
    let at = HexCoord::new(0, 0);

    let cost = catalog.building(to).unwrap().construction_cost.clone();
    let mut site = ConstructionSite::upgrade(from, to, cost.clone());
    site.delivered = cost;

    let mut grid = Grid::hexagon(2);
    grid.place(at, from);
    grid.get_mut(at).unwrap().construction = Some(site);

    let out = run_tick(&engine, &grid);
    assert_eq!(out.completed_sites, 1);
    let cell = out.grid.get(at).unwrap();
    assert_eq!(cell.building, Some(to));
    assert!(cell.construction.is_none());
}

#[test]
fn building_under_upgrade_does_not_produce() {
    let engine = test_engine();
    let catalog = engine.catalog();
    let from = id(catalog, "woodcutter");
    let to = id(catalog, "lumber_camp");
    let at = HexCoord::new(0, 0);

    let cost = catalog.building(to).unwrap().construction_cost.clone();
    let mut grid = Grid::hexagon(2);
    grid.place(at, from);
    grid.get_mut(at).unwrap().construction = Some(ConstructionSite::upgrade(from, to, cost));

    let out = run_tick(&engine, &grid);
    assert!(out.flow_summary.realized.is_empty());
    assert_eq!(out.completed_sites, 0);
}

#[test]
fn site_at_the_decay_boundary_gets_nothing() {
    let engine = Engine::new(builder_catalog(), test_config());
    let catalog = engine.catalog();
    let at = HexCoord::new(11, 0);

    let mut grid = Grid::hexagon(11);
    grid.place(HexCoord::new(0, 0), id(catalog, "forester"));
    grid.start_site(at, cabin_site(catalog));

    // Eleven plain steps is exactly 1 + 1/k for the construction decay.
    let out = run_tick(&engine, &grid);
    let site = out.grid.get(at).unwrap().construction.as_ref().unwrap();
    assert!(site.delivered.is_empty());
    assert!(out.flow_pairs.is_empty());
    assert!(out.flow_summary.lost_to_distance.is_empty());
}
