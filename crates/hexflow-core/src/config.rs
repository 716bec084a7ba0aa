//! Tunable balance parameters.
//!
//! Everything here is a balance knob with a documented default. The
//! convergence round count and the production floor are structural and live
//! in [`crate::allocation`] as constants instead.

use crate::allocation::efficiency_horizon;
use crate::fixed::{Fixed64, ratio};
use crate::hex::HexCoord;
use crate::resource::{Resource, ResourceMap};

// ---------------------------------------------------------------------------
// Zone tuning
// ---------------------------------------------------------------------------

/// Thresholds and strengths for zone (supercluster) bonuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConfig {
    /// Non-wildcard members needed before a zone counts at all.
    pub min_members: u32,
    /// Non-wildcard members at which the bonus reaches 1.0.
    pub full_members: u32,
    /// Distinct building types needed in a zone.
    pub min_distinct_types: u32,
    /// Universities counted per zone.
    pub university_cap: u32,
    /// Extra strength per counted university (0.25 = +25% each).
    pub university_amplification: Fixed64,
    /// Zone strength -> output bonus multiplier.
    pub output_scale: Fixed64,
    /// Zone strength -> input reduction multiplier.
    pub input_scale: Fixed64,
    /// Upper bound on input reduction.
    pub max_input_reduction: Fixed64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            min_members: 21,
            full_members: 42,
            min_distinct_types: 2,
            university_cap: 4,
            university_amplification: ratio(1, 4),
            output_scale: ratio(1, 2),
            input_scale: ratio(1, 4),
            max_input_reduction: ratio(1, 2),
        }
    }
}

// ---------------------------------------------------------------------------
// Base population
// ---------------------------------------------------------------------------

/// The constant pseudo-producer standing for the settled population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePopulation {
    /// Where the population's output enters the routing graph.
    pub anchor: HexCoord,
    pub outputs: ResourceMap,
}

impl Default for BasePopulation {
    fn default() -> Self {
        let mut outputs = ResourceMap::new();
        outputs.set(Resource::Labor, Fixed64::ONE);
        Self {
            anchor: HexCoord::new(0, 0),
            outputs,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine tuning
// ---------------------------------------------------------------------------

/// Balance parameters for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Transfer decay per unit of path cost beyond 1 for the processor pass.
    pub processor_decay: Fixed64,
    /// Transfer decay for construction feeding.
    pub construction_decay: Fixed64,
    /// Transfer decay for export buildings and depot absorption.
    pub export_decay: Fixed64,
    /// Fraction of output held back from processors while any site demands it.
    pub construction_reserve: Fixed64,
    /// Cost of moving between a hub and a cell it owns.
    pub hub_hop_cost: Fixed64,
    /// Hard cap on any route's path cost.
    pub max_route_cost: Fixed64,
    pub zone: ZoneConfig,
    /// `None` disables the pseudo-producer.
    pub base_population: Option<BasePopulation>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            processor_decay: ratio(15, 100),
            construction_decay: ratio(1, 10),
            export_decay: ratio(1, 10),
            construction_reserve: ratio(1, 10),
            hub_hop_cost: ratio(1, 20),
            max_route_cost: Fixed64::from_num(12),
            zone: ZoneConfig::default(),
            base_population: Some(BasePopulation::default()),
        }
    }
}

impl EngineConfig {
    /// Path cost at which a pass's transfer efficiency reaches zero,
    /// capped by `max_route_cost`. Every cost below it keeps a positive
    /// efficiency; the cost itself does not.
    pub fn reach(&self, decay: Fixed64) -> Fixed64 {
        efficiency_horizon(decay).map_or(self.max_route_cost, |horizon| horizon.min(self.max_route_cost))
    }
}
