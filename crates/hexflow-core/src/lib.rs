//! Hexflow Core -- the per-tick flow-allocation engine for hex-grid economies.
//!
//! This crate provides the hex-grid data model, the weighted routing graph,
//! the cluster and zone bonus analyzers, the multi-priority greedy resource
//! allocator, construction feeding, and export routing. All quantities use
//! deterministic fixed-point arithmetic.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::simulate_tick`] runs the following phases
//! against read-only snapshots and returns freshly built outputs:
//!
//! 1. **Sweep** -- Convert construction sites that already meet their cost.
//! 2. **Analyze** -- Cluster and zone bonuses for every built cell.
//! 3. **Route** -- Build the routing graph and precompute distance maps.
//! 4. **Converge** -- Three allocation rounds for ordinary processors.
//! 5. **Settle** -- The authoritative processor pass and per-cell diagnostics.
//! 6. **Construct** -- Feed construction sites from leftovers, the released
//!    reserve and recycled surplus.
//! 7. **Export** -- Feed export buildings and let depots absorb surplus.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Entry point holding the catalog and tuning.
//! - [`grid::Grid`] -- Hex cells with buildings, sites and diagnostics.
//! - [`infra::InfraNetwork`] -- Infrastructure edges keyed by [`infra::EdgeKey`].
//! - [`graph::RoutingGraph`] -- Dijkstra over the grid plus hub and port shortcuts.
//! - [`catalog::Catalog`] -- Immutable building and infrastructure definitions.
//! - [`resource::ResourceMap`] -- Sparse resource -> amount map.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod allocation;
pub mod catalog;
pub mod cluster;
pub mod config;
pub mod construction;
pub mod engine;
pub mod export;
pub mod fixed;
pub mod graph;
pub mod grid;
pub mod hex;
pub mod id;
pub mod infra;
pub mod resource;
pub mod sim;
pub mod terrain;
pub mod zone;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
