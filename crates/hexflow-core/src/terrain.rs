//! Terrain tags and the read-only terrain lookup capability.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hex::HexCoord;

/// A terrain tag present on a cell. A cell may carry several (base terrain
/// plus deposits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Plains,
    Forest,
    Hills,
    Mountains,
    Desert,
    Water,
    IronDeposit,
    CoalDeposit,
    ClayDeposit,
    StoneDeposit,
    FishShoal,
}

/// Read-only terrain capability handed to the engine by the host.
///
/// An empty slice means the coordinate is devoid of terrain (off-map or void).
pub trait TerrainLookup {
    fn terrain(&self, coord: HexCoord) -> &[Terrain];

    fn has(&self, coord: HexCoord, tag: Terrain) -> bool {
        self.terrain(coord).contains(&tag)
    }

    fn is_water(&self, coord: HexCoord) -> bool {
        self.has(coord, Terrain::Water)
    }
}

/// Map-backed terrain lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerrainMap {
    tiles: BTreeMap<HexCoord, Vec<Terrain>>,
}

impl TerrainMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, coord: HexCoord, tags: Vec<Terrain>) {
        self.tiles.insert(coord, tags);
    }

    /// Add a single tag to a cell, keeping any existing tags.
    pub fn add(&mut self, coord: HexCoord, tag: Terrain) {
        let tags = self.tiles.entry(coord).or_default();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TerrainLookup for TerrainMap {
    fn terrain(&self, coord: HexCoord) -> &[Terrain] {
        self.tiles.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }
}
