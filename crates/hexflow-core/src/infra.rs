//! Infrastructure edges between adjacent cells and their construction sites.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{DistanceCategory, InfraType};
use crate::construction::is_complete;
use crate::hex::HexCoord;
use crate::resource::ResourceMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from constructing infrastructure keys.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("cells {0} and {1} are not adjacent")]
    NotAdjacent(HexCoord, HexCoord),
}

// ---------------------------------------------------------------------------
// Edge key
// ---------------------------------------------------------------------------

/// Order-independent key for the edge between two adjacent cells.
/// The smaller coordinate is always stored first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    a: HexCoord,
    b: HexCoord,
}

impl EdgeKey {
    /// Canonical key for `(x, y)` regardless of argument order.
    pub fn new(x: HexCoord, y: HexCoord) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// Like [`EdgeKey::new`], but rejects non-adjacent pairs.
    pub fn adjacent(x: HexCoord, y: HexCoord) -> Result<Self, GraphError> {
        if x.is_adjacent(y) {
            Ok(Self::new(x, y))
        } else {
            Err(GraphError::NotAdjacent(x, y))
        }
    }

    pub fn endpoints(&self) -> (HexCoord, HexCoord) {
        (self.a, self.b)
    }

    /// The canonical first endpoint, used as the edge's location.
    pub fn anchor(&self) -> HexCoord {
        self.a
    }

    pub fn is_adjacent(&self) -> bool {
        self.a.is_adjacent(self.b)
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Transport sub-type of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Road,
    Rail,
    Canal,
}

/// Power sub-type of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerKind {
    PowerLine,
    HvLine,
}

impl From<TransportKind> for InfraType {
    fn from(kind: TransportKind) -> Self {
        match kind {
            TransportKind::Road => InfraType::Road,
            TransportKind::Rail => InfraType::Rail,
            TransportKind::Canal => InfraType::Canal,
        }
    }
}

impl From<PowerKind> for InfraType {
    fn from(kind: PowerKind) -> Self {
        match kind {
            PowerKind::PowerLine => InfraType::PowerLine,
            PowerKind::HvLine => InfraType::HvLine,
        }
    }
}

/// One edge. Transport and power sub-types are independent; an edge may
/// carry both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfrastructureEdge {
    pub transport: Option<TransportKind>,
    pub power: Option<PowerKind>,
}

impl InfrastructureEdge {
    pub fn transport(kind: TransportKind) -> Self {
        Self {
            transport: Some(kind),
            power: None,
        }
    }

    pub fn power(kind: PowerKind) -> Self {
        Self {
            transport: None,
            power: Some(kind),
        }
    }

    /// The infrastructure type occupying the slot for `category`.
    pub fn in_category(&self, category: DistanceCategory) -> Option<InfraType> {
        match category {
            DistanceCategory::Transport => self.transport.map(InfraType::from),
            DistanceCategory::Power => self.power.map(InfraType::from),
        }
    }

    /// Install `kind` into its category slot, leaving the other slot alone.
    pub fn install(&mut self, kind: InfraType) {
        match kind {
            InfraType::Road => self.transport = Some(TransportKind::Road),
            InfraType::Rail => self.transport = Some(TransportKind::Rail),
            InfraType::Canal => self.transport = Some(TransportKind::Canal),
            InfraType::PowerLine => self.power = Some(PowerKind::PowerLine),
            InfraType::HvLine => self.power = Some(PowerKind::HvLine),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transport.is_none() && self.power.is_none()
    }
}

/// All infrastructure edges on the map.
pub type InfraNetwork = BTreeMap<EdgeKey, InfrastructureEdge>;

// ---------------------------------------------------------------------------
// Construction sites
// ---------------------------------------------------------------------------

/// An infrastructure edge mid-build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraConstructionSite {
    pub edge: EdgeKey,
    pub target: InfraType,
    pub cost: ResourceMap,
    pub delivered: ResourceMap,
    #[serde(default)]
    pub prioritized: bool,
}

impl InfraConstructionSite {
    pub fn new(edge: EdgeKey, target: InfraType, cost: ResourceMap) -> Self {
        Self {
            edge,
            target,
            cost,
            delivered: ResourceMap::new(),
            prioritized: false,
        }
    }

    /// Resources still owed: `cost - delivered`, clamped at zero.
    pub fn outstanding(&self) -> ResourceMap {
        self.cost.saturating_sub(&self.delivered)
    }

    pub fn is_complete(&self) -> bool {
        is_complete(&self.cost, &self.delivered)
    }
}

/// All in-progress infrastructure sites.
pub type InfraSites = BTreeMap<EdgeKey, InfraConstructionSite>;
