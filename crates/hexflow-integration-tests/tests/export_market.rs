//! Export routing, depot absorption and the market fed by them.

use hexflow_core::engine::{TickInput, TickOutput};
use hexflow_core::fixed::{Fixed64, fixed64_to_f64};
use hexflow_core::grid::{FlowState, Grid};
use hexflow_core::hex::HexCoord;
use hexflow_core::infra::{EdgeKey, InfraNetwork, InfraSites, InfrastructureEdge, TransportKind};
use hexflow_core::resource::Resource;
use hexflow_core::test_utils::*;
use hexflow_market::{Market, MarketConfig};

fn approx(a: Fixed64, b: f64) -> bool {
    (fixed64_to_f64(a) - b).abs() < 1e-6
}

fn flow(out: &TickOutput, q: i32, r: i32) -> &FlowState {
    out.grid.get(HexCoord::new(q, r)).unwrap().flow.as_ref().unwrap()
}

/// Woodcutter -> sawmill -> export port on the east edge of a radius-4 map.
fn edge_chain() -> Grid {
    build_grid(4, &[((2, 0), "woodcutter"), ((3, 0), "sawmill"), ((4, 0), "export_port")])
}

#[test]
fn port_on_the_edge_exports_its_goods() {
    let engine = test_engine();
    let out = run_tick(&engine, &edge_chain());

    assert_eq!(out.export_rate.get(Resource::Goods), fixed(0.5));
    let port = flow(&out, 4, 0);
    assert_eq!(port.export_efficiency, Some(Fixed64::ONE));
    assert_eq!(port.received.get(Resource::Goods), fixed(0.5));
    assert_eq!(port.exported.get(Resource::Goods), fixed(0.5));
    assert_eq!(port.efficiency, fixed(0.5));
    assert_eq!(out.flow_summary.export_consumed.get(Resource::Goods), fixed(0.5));
    assert!(out.flow_summary.consumed.get(Resource::Goods) == Fixed64::ZERO);
}

#[test]
fn unreachable_port_idles_its_suppliers() {
    let engine = test_engine();
    let grid = build_grid(4, &[((0, 0), "export_port"), ((1, 0), "sawmill"), ((2, 0), "woodcutter")]);
    let out = run_tick(&engine, &grid);

    let port = flow(&out, 0, 0);
    assert_eq!(port.export_efficiency, Some(Fixed64::ZERO));
    assert_eq!(port.efficiency, Fixed64::ZERO);
    assert!(port.received.is_empty());
    assert!(out.export_rate.is_empty());
    assert!(flow(&out, 1, 0).realized.is_empty());
    assert!(flow(&out, 2, 0).realized.is_empty());
}

#[test]
fn road_to_the_edge_exports_at_road_efficiency() {
    let engine = test_engine();
    let grid = build_grid(4, &[((0, 0), "export_port"), ((-1, 0), "sawmill"), ((-2, 0), "woodcutter")]);
    let terrain = flat_terrain(&grid);
    let road: InfraNetwork = (0..4)
        .map(|q| {
            (
                EdgeKey::new(HexCoord::new(q, 0), HexCoord::new(q + 1, 0)),
                InfrastructureEdge::transport(TransportKind::Road),
            )
        })
        .collect();
    let sites = InfraSites::new();
    let out = engine.simulate_tick(&TickInput::new(&grid, &terrain, &road, &sites));

    let port = flow(&out, 0, 0);
    assert_eq!(port.export_efficiency, Some(fixed(0.5)));
    assert_eq!(port.received.get(Resource::Goods), fixed(0.5));
    assert!(approx(out.export_rate.get(Resource::Goods), 0.25));
}

#[test]
fn depot_absorbs_unclaimed_surplus() {
    let engine = test_engine();
    let grid = build_grid(4, &[((4, 0), "depot"), ((3, 0), "woodcutter")]);
    let out = run_tick(&engine, &grid);

    assert_eq!(flow(&out, 3, 0).realized.get(Resource::Wood), fixed(1.0));
    assert!(approx(out.export_rate.get(Resource::Wood), 1.0));
    let depot = flow(&out, 4, 0);
    assert!(approx(depot.received.get(Resource::Wood), 1.0));
    assert!(approx(depot.exported.get(Resource::Wood), 1.0));
}

#[test]
fn processors_are_served_before_the_depot() {
    let engine = test_engine();
    let grid = build_grid(
        4,
        &[((4, 0), "depot"), ((3, 0), "woodcutter"), ((2, 0), "sawmill"), ((1, 0), "market")],
    );
    let out = run_tick(&engine, &grid);

    // The sawmill takes all the wood; its goods feed the market.
    assert_eq!(flow(&out, 2, 0).received.get(Resource::Wood), fixed(1.0));
    assert!(out.export_rate.get(Resource::Wood) == Fixed64::ZERO);
    assert_eq!(flow(&out, 1, 0).received.get(Resource::Goods), fixed(0.5));
}

#[test]
fn market_prices_fall_as_exports_accumulate() {
    let engine = test_engine();
    let mut market = Market::from_catalog(
        engine.catalog(),
        MarketConfig {
            saturation: fixed(1.0),
            ..MarketConfig::default()
        },
    );
    assert_eq!(market.price(Resource::Goods), fixed(4.0));

    let mut grid = edge_chain();
    let mut incomes = Vec::new();
    for _ in 0..5 {
        let out = run_tick(&engine, &grid);
        incomes.push(market.record(&out.export_rate));
        grid = out.grid;
    }

    assert_eq!(incomes[0], fixed(2.0));
    assert!(incomes.windows(2).all(|w| w[1] < w[0]));
    assert!(approx(market.cumulative(Resource::Goods), 2.5));
    // 4 / (1 + 2.5)
    assert!(approx(market.price(Resource::Goods), 4.0 / 3.5));
    assert_eq!(market.history().len(), 5);
}
