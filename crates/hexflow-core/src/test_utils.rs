//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::{BuildingDef, Catalog, CatalogBuilder, HubKind, ZoneCategory};
use crate::config::EngineConfig;
use crate::engine::{Engine, TickInput, TickOutput};
use crate::fixed::Fixed64;
use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::id::BuildingTypeId;
use crate::infra::{InfraNetwork, InfraSites};
use crate::resource::Resource;
use crate::terrain::{Terrain, TerrainMap};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Catalog
// ===========================================================================

/// A small economy covering every building role:
///
/// | name          | inputs                    | outputs          | role              |
/// |---------------|---------------------------|------------------|-------------------|
/// | `woodcutter`  |                           | wood 1           | agricultural      |
/// | `lumber_camp` |                           | wood 2           | woodcutter upgrade|
/// | `farm`        |                           | grain 1          | agricultural      |
/// | `bakery`      | grain 1                   | food 1           | industry          |
/// | `sawmill`     | wood 1                    | goods 0.5        | industry          |
/// | `quarry`      |                           | stone 1          | needs stone       |
/// | `mine`        |                           | ore 1            | needs iron        |
/// | `smelter`     | ore 1                     | iron 0.5         | industry          |
/// | `generator`   |                           | electricity 2    | industry          |
/// | `workshop`    | iron 0.5, electricity 1   | tools 0.5        | industry          |
/// | `house`       | food 0.5                  | labor 1          | residential       |
/// | `market`      | goods 1                   |                  | residential sink  |
/// | `depot`       |                           |                  | hub r2, absorbs   |
/// | `station`     |                           |                  | hub r3, absorbs   |
/// | `harbor`      |                           |                  | port r2, absorbs  |
/// | `export_port` | goods 1                   |                  | exports           |
/// | `university`  |                           |                  | zone amplifier    |
pub fn sample_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    b.with_default_infrastructure();

    let defs = [
        BuildingDef::new("woodcutter")
            .with_output(Resource::Wood, fixed(1.0))
            .with_cost(Resource::Stone, fixed(2.0))
            .in_zone(ZoneCategory::Agricultural),
        BuildingDef::new("lumber_camp")
            .with_output(Resource::Wood, fixed(2.0))
            .with_cost(Resource::Wood, fixed(4.0))
            .with_cost(Resource::Stone, fixed(2.0))
            .in_zone(ZoneCategory::Agricultural),
        BuildingDef::new("farm")
            .with_output(Resource::Grain, fixed(1.0))
            .in_zone(ZoneCategory::Agricultural),
        BuildingDef::new("bakery")
            .with_input(Resource::Grain, fixed(1.0))
            .with_output(Resource::Food, fixed(1.0))
            .in_zone(ZoneCategory::Industry),
        BuildingDef::new("sawmill")
            .with_input(Resource::Wood, fixed(1.0))
            .with_output(Resource::Goods, fixed(0.5))
            .with_cost(Resource::Stone, fixed(5.0))
            .in_zone(ZoneCategory::Industry),
        BuildingDef::new("quarry")
            .with_output(Resource::Stone, fixed(1.0))
            .requires(Terrain::StoneDeposit)
            .in_zone(ZoneCategory::Mining),
        BuildingDef::new("mine")
            .with_output(Resource::Ore, fixed(1.0))
            .requires(Terrain::IronDeposit)
            .in_zone(ZoneCategory::Mining),
        BuildingDef::new("smelter")
            .with_input(Resource::Ore, fixed(1.0))
            .with_output(Resource::Iron, fixed(0.5))
            .in_zone(ZoneCategory::Industry),
        BuildingDef::new("generator")
            .with_output(Resource::Electricity, fixed(2.0))
            .in_zone(ZoneCategory::Industry),
        BuildingDef::new("workshop")
            .with_input(Resource::Iron, fixed(0.5))
            .with_input(Resource::Electricity, fixed(1.0))
            .with_output(Resource::Tools, fixed(0.5))
            .in_zone(ZoneCategory::Industry),
        BuildingDef::new("house")
            .with_input(Resource::Food, fixed(0.5))
            .with_output(Resource::Labor, fixed(1.0))
            .in_zone(ZoneCategory::Residential),
        BuildingDef::new("market")
            .with_input(Resource::Goods, fixed(1.0))
            .in_zone(ZoneCategory::Residential),
        BuildingDef {
            absorbs_surplus: true,
            ..BuildingDef::new("depot").as_hub(HubKind::Depot, 2)
        },
        BuildingDef {
            absorbs_surplus: true,
            ..BuildingDef::new("station").as_hub(HubKind::Station, 3)
        },
        BuildingDef {
            absorbs_surplus: true,
            ..BuildingDef::new("harbor").as_hub(HubKind::Port, 2)
        },
        BuildingDef {
            exports: true,
            ..BuildingDef::new("export_port").with_input(Resource::Goods, fixed(1.0))
        },
        BuildingDef {
            university: true,
            ..BuildingDef::new("university")
        },
    ];
    for def in defs {
        b.register_building(def).expect("register sample building");
    }
    b.set_upgrade("woodcutter", "lumber_camp")
        .expect("woodcutter upgrade");

    for (resource, value) in [
        (Resource::Wood, 1.0),
        (Resource::Stone, 1.0),
        (Resource::Food, 2.0),
        (Resource::Iron, 3.0),
        (Resource::Goods, 4.0),
        (Resource::Tools, 6.0),
    ] {
        b.set_base_value(resource, fixed(value));
    }
    b.build().expect("sample catalog")
}

pub fn id(catalog: &Catalog, name: &str) -> BuildingTypeId {
    catalog
        .building_id(name)
        .unwrap_or_else(|| panic!("no building named {name}"))
}

pub fn woodcutter(catalog: &Catalog) -> BuildingTypeId {
    id(catalog, "woodcutter")
}

// ===========================================================================
// Maps
// ===========================================================================

/// Plains under every cell of `grid`.
pub fn flat_terrain(grid: &Grid) -> TerrainMap {
    let mut terrain = TerrainMap::new();
    for coord in grid.coords() {
        terrain.add(coord, Terrain::Plains);
    }
    terrain
}

/// A hexagon of `radius` with the named buildings placed.
pub fn build_grid(radius: u32, buildings: &[((i32, i32), &str)]) -> Grid {
    let catalog = sample_catalog();
    let mut grid = Grid::hexagon(radius);
    for &((q, r), name) in buildings {
        grid.place(HexCoord::new(q, r), id(&catalog, name));
    }
    grid
}

// ===========================================================================
// Engine
// ===========================================================================

/// Default tuning without the base population, so only placed buildings
/// produce.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        base_population: None,
        ..EngineConfig::default()
    }
}

pub fn test_engine() -> Engine {
    Engine::new(sample_catalog(), test_config())
}

/// One tick over flat terrain with no infrastructure.
pub fn run_tick(engine: &Engine, grid: &Grid) -> TickOutput {
    let terrain = flat_terrain(grid);
    let infra = InfraNetwork::new();
    let sites = InfraSites::new();
    engine.simulate_tick(&TickInput::new(grid, &terrain, &infra, &sites))
}
