//! Data-file loading for hexflow: resources, buildings, infrastructure and
//! tuning in RON, TOML or JSON, resolved into a [`hexflow_core::catalog::Catalog`]
//! and engine configuration.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, GameData, load_game_data};
