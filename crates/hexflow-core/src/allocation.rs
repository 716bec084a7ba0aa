//! Producer/consumer allocation.
//!
//! Producers and consumers are per-tick records held in a [`FlowArena`] and
//! discarded afterwards. Every pass uses the same greedy sweep:
//!
//! 1. Pair each producer holding the resource with each consumer still
//!    wanting it, if the path cost keeps the transfer efficiency positive.
//! 2. Sort pairs: prioritized consumers first, then ascending path cost, then
//!    consumer and producer coordinates.
//! 3. Walk the pairs once. Each pair ships `min(remaining, need / efficiency)`
//!    and delivers that amount times the efficiency; the difference is lost
//!    to distance.
//!
//! Ordinary processors depend on each other's output, so their pass runs a
//! fixed number of rounds, feeding each round's input satisfaction back as
//! the next round's production efficiency.

use std::collections::{BTreeMap, BTreeSet};

use slotmap::SlotMap;
use tracing::trace;

use crate::config::EngineConfig;
use crate::fixed::{EPSILON, Fixed64, checked_div_64, ratio};
use crate::graph::{DistanceCache, RouteProfile};
use crate::hex::HexCoord;
use crate::id::{ConsumerId, ProducerId};
use crate::infra::EdgeKey;
use crate::resource::{Resource, ResourceMap};

/// Rounds of the processor pass before the authoritative one.
pub const CONVERGENCE_ITERATIONS: usize = 3;

/// Lowest efficiency a starved processor can fall to. Breaks mutual
/// dependency deadlocks.
pub const MIN_PRODUCTION_FLOOR: Fixed64 = ratio(1, 10);

/// Path cost from which `decay` leaves less than [`EPSILON`] of a shipment.
/// `None` when the decay never gets there.
pub fn efficiency_horizon(decay: Fixed64) -> Option<Fixed64> {
    if decay <= Fixed64::ZERO {
        return None;
    }
    (Fixed64::ONE - EPSILON)
        .checked_div(decay)
        .and_then(|span| span.checked_add(Fixed64::ONE))
}

/// Fraction of a shipment surviving a route of `path_cost` under `decay`.
/// Zero from [`efficiency_horizon`] on, so rounding in `decay` never leaves a
/// sliver of efficiency at the boundary.
pub fn transfer_efficiency(path_cost: Fixed64, decay: Fixed64) -> Fixed64 {
    if path_cost <= Fixed64::ONE {
        return Fixed64::ONE;
    }
    if efficiency_horizon(decay).is_some_and(|horizon| path_cost >= horizon) {
        return Fixed64::ZERO;
    }
    (Fixed64::ONE - (path_cost - Fixed64::ONE) * decay).max(Fixed64::ZERO)
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerKind {
    Building,
    BasePopulation,
    /// Input a consumer received beyond what it used, offered to later passes.
    Recycled,
}

#[derive(Debug, Clone)]
pub struct ProducerState {
    pub location: HexCoord,
    pub kind: ProducerKind,
    /// Output at full efficiency.
    pub potential: ResourceMap,
    /// Capacity not yet shipped this pass. Never negative.
    pub remaining: ResourceMap,
    pub efficiency: Fixed64,
    /// Nothing wants this producer's outputs; it stays at zero efficiency.
    pub idle: bool,
}

impl ProducerState {
    pub fn new(location: HexCoord, kind: ProducerKind, potential: ResourceMap) -> Self {
        Self {
            location,
            kind,
            remaining: potential.clone(),
            potential,
            efficiency: Fixed64::ONE,
            idle: false,
        }
    }

    pub fn idle(location: HexCoord, potential: ResourceMap) -> Self {
        Self {
            remaining: ResourceMap::new(),
            efficiency: Fixed64::ZERO,
            idle: true,
            ..Self::new(location, ProducerKind::Building, potential)
        }
    }

    /// `potential * efficiency`.
    pub fn realized(&self) -> ResourceMap {
        self.potential.scaled(self.efficiency)
    }

    /// Reset capacity to the realized output, holding back `reserve` of every
    /// resource in `reserved`.
    pub fn refill(&mut self, reserved: &BTreeSet<Resource>, reserve: Fixed64) {
        let keep = Fixed64::ONE - reserve;
        self.remaining = self
            .realized()
            .iter()
            .map(|(r, v)| if reserved.contains(&r) { (r, v * keep) } else { (r, v) })
            .collect();
    }
}

/// Which pass a consumer is served in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Processing,
    Construction,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerClass {
    Processor,
    BuildingSite,
    InfraSite(EdgeKey),
    /// An export building consuming its inputs for export.
    Export,
    /// A depot or station taking leftover surplus. Has no demand of its own.
    Absorber,
}

impl ConsumerClass {
    pub fn stage(self) -> Stage {
        match self {
            ConsumerClass::Processor => Stage::Processing,
            ConsumerClass::BuildingSite | ConsumerClass::InfraSite(_) => Stage::Construction,
            ConsumerClass::Export | ConsumerClass::Absorber => Stage::Export,
        }
    }

    /// The consumer is a finished building rather than a site.
    pub fn is_building(self) -> bool {
        matches!(
            self,
            ConsumerClass::Processor | ConsumerClass::Export | ConsumerClass::Absorber
        )
    }
}

#[derive(Debug, Clone)]
pub struct ConsumerState {
    pub location: HexCoord,
    pub class: ConsumerClass,
    pub demand: ResourceMap,
    /// Never exceeds `demand`.
    pub received: ResourceMap,
    pub distance_loss: ResourceMap,
    pub prioritized: bool,
    /// Hubs are fed over waterborne routes.
    pub hub: bool,
    /// Production efficiency of the owning building, for processors.
    pub efficiency: Fixed64,
}

impl ConsumerState {
    pub fn new(location: HexCoord, class: ConsumerClass, demand: ResourceMap) -> Self {
        Self {
            location,
            class,
            demand,
            received: ResourceMap::new(),
            distance_loss: ResourceMap::new(),
            prioritized: false,
            hub: false,
            efficiency: Fixed64::ONE,
        }
    }

    pub fn prioritized(mut self, prioritized: bool) -> Self {
        self.prioritized = prioritized;
        self
    }

    pub fn hub(mut self, hub: bool) -> Self {
        self.hub = hub;
        self
    }

    /// Demand not yet met.
    pub fn outstanding(&self, resource: Resource) -> Fixed64 {
        (self.demand.get(resource) - self.received.get(resource)).max(Fixed64::ZERO)
    }

    pub fn reset(&mut self) {
        self.received = ResourceMap::new();
        self.distance_loss = ResourceMap::new();
    }

    /// Worst `received / demand` over demanded resources, unfloored.
    /// Zero demand counts as fully satisfied.
    pub fn satisfaction(&self) -> Fixed64 {
        self.demand
            .iter()
            .map(|(r, d)| checked_div_64(self.received.get(r), d).unwrap_or(Fixed64::ONE))
            .min()
            .unwrap_or(Fixed64::ONE)
            .min(Fixed64::ONE)
    }

    /// Satisfaction bounded to `[MIN_PRODUCTION_FLOOR, 1]`.
    pub fn production_efficiency(&self) -> Fixed64 {
        self.satisfaction().clamp(MIN_PRODUCTION_FLOOR, Fixed64::ONE)
    }

    /// What the building actually used: `min(received, demand * efficiency)`.
    pub fn consumed(&self) -> ResourceMap {
        self.demand
            .iter()
            .map(|(r, d)| (r, self.received.get(r).min(d * self.efficiency)))
            .collect()
    }

    /// Received but not used.
    pub fn surplus(&self) -> ResourceMap {
        self.received.saturating_sub(&self.consumed())
    }

    pub fn shortage(&self) -> ResourceMap {
        self.demand.saturating_sub(&self.received)
    }
}

/// One realized shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub producer: ProducerId,
    pub consumer: ConsumerId,
    pub resource: Resource,
    pub sent: Fixed64,
    pub delivered: Fixed64,
    pub path_cost: Fixed64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    producer: ProducerId,
    consumer: ConsumerId,
    producer_at: HexCoord,
    consumer_at: HexCoord,
    prioritized: bool,
    cost: Fixed64,
    efficiency: Fixed64,
}

/// Decay and reach for one pass.
#[derive(Debug, Clone, Copy)]
pub struct PassParams {
    pub decay: Fixed64,
    pub max_cost: Fixed64,
}

impl PassParams {
    pub fn new(config: &EngineConfig, decay: Fixed64) -> Self {
        Self {
            decay,
            max_cost: config.reach(decay),
        }
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Per-tick producer and consumer records.
#[derive(Debug, Default)]
pub struct FlowArena {
    pub producers: SlotMap<ProducerId, ProducerState>,
    pub consumers: SlotMap<ConsumerId, ConsumerState>,
}

impl FlowArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_producer(&mut self, producer: ProducerState) -> ProducerId {
        self.producers.insert(producer)
    }

    pub fn add_consumer(&mut self, consumer: ConsumerState) -> ConsumerId {
        self.consumers.insert(consumer)
    }

    /// Resources with outstanding demand among consumers of `stage`.
    pub fn demanded(&self, stage: Stage) -> BTreeSet<Resource> {
        self.consumers
            .values()
            .filter(|c| c.class.stage() == stage)
            .flat_map(|c| c.demand.resources())
            .collect()
    }

    pub fn consumers_in(&self, stage: Stage) -> impl Iterator<Item = (ConsumerId, &ConsumerState)> {
        self.consumers.iter().filter(move |(_, c)| c.class.stage() == stage)
    }

    /// Run one greedy pass for every resource against consumers of `stage`.
    pub fn allocate(
        &mut self,
        routes: &mut DistanceCache<'_, '_>,
        stage: Stage,
        params: PassParams,
    ) -> Vec<Transfer> {
        let mut transfers = Vec::new();
        for resource in Resource::ALL {
            let candidates = self.candidates(routes, stage, resource, params);
            if !candidates.is_empty() {
                self.sweep(resource, &candidates, &mut transfers);
            }
        }
        transfers
    }

    fn candidates(
        &self,
        routes: &mut DistanceCache<'_, '_>,
        stage: Stage,
        resource: Resource,
        params: PassParams,
    ) -> Vec<Candidate> {
        let mut wanting: BTreeMap<(RouteProfile, HexCoord), Vec<ConsumerId>> = BTreeMap::new();
        for (id, c) in self.consumers_in(stage) {
            if c.outstanding(resource) > Fixed64::ZERO {
                let profile = RouteProfile::for_delivery(resource, c.hub);
                wanting.entry((profile, c.location)).or_default().push(id);
            }
        }
        if wanting.is_empty() {
            return Vec::new();
        }
        let profiles: BTreeSet<RouteProfile> = wanting.keys().map(|(p, _)| *p).collect();

        let mut out = Vec::new();
        for (pid, p) in &self.producers {
            if p.remaining.get(resource) <= Fixed64::ZERO {
                continue;
            }
            for &profile in &profiles {
                for (&cell, &cost) in routes.map(profile, p.location) {
                    if cost > params.max_cost {
                        continue;
                    }
                    let Some(ids) = wanting.get(&(profile, cell)) else {
                        continue;
                    };
                    let efficiency = transfer_efficiency(cost, params.decay);
                    if efficiency <= Fixed64::ZERO {
                        continue;
                    }
                    for &cid in ids {
                        let c = &self.consumers[cid];
                        let same_building = p.kind == ProducerKind::Building
                            && c.class.is_building()
                            && p.location == c.location;
                        if same_building {
                            continue;
                        }
                        out.push(Candidate {
                            producer: pid,
                            consumer: cid,
                            producer_at: p.location,
                            consumer_at: c.location,
                            prioritized: c.prioritized,
                            cost,
                            efficiency,
                        });
                    }
                }
            }
        }

        out.sort_by(|a, b| {
            b.prioritized
                .cmp(&a.prioritized)
                .then(a.cost.cmp(&b.cost))
                .then(a.consumer_at.cmp(&b.consumer_at))
                .then(a.producer_at.cmp(&b.producer_at))
                .then(a.consumer.cmp(&b.consumer))
                .then(a.producer.cmp(&b.producer))
        });
        out
    }

    fn sweep(&mut self, resource: Resource, candidates: &[Candidate], out: &mut Vec<Transfer>) {
        for cand in candidates {
            let need = self.consumers[cand.consumer].outstanding(resource);
            if need <= Fixed64::ZERO {
                continue;
            }
            let available = self.producers[cand.producer].remaining.get(resource);
            if available <= Fixed64::ZERO {
                continue;
            }
            let raw_needed = checked_div_64(need, cand.efficiency).unwrap_or(Fixed64::MAX);
            let sent = available.min(raw_needed);
            let delivered = (sent * cand.efficiency).min(need);

            self.producers[cand.producer].remaining.take(resource, sent);
            let consumer = &mut self.consumers[cand.consumer];
            consumer.received.add(resource, delivered);
            consumer.distance_loss.add(resource, sent - delivered);

            out.push(Transfer {
                producer: cand.producer,
                consumer: cand.consumer,
                resource,
                sent,
                delivered,
                path_cost: cand.cost,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Processor convergence
// ---------------------------------------------------------------------------

/// A building's records in the arena.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildingLink {
    pub producer: Option<ProducerId>,
    /// The processor consumer, if the building has inputs.
    pub consumer: Option<ConsumerId>,
}

fn refill(arena: &mut FlowArena, reserved: &BTreeSet<Resource>, reserve: Fixed64) {
    for p in arena.producers.values_mut() {
        if p.kind != ProducerKind::Recycled {
            p.refill(reserved, reserve);
        }
    }
    for c in arena.consumers.values_mut() {
        if c.class.stage() == Stage::Processing {
            c.reset();
        }
    }
}

fn update_efficiency(arena: &mut FlowArena, links: &BTreeMap<HexCoord, BuildingLink>) {
    for link in links.values() {
        let Some(cid) = link.consumer else { continue };
        let efficiency = arena.consumers[cid].production_efficiency();
        arena.consumers[cid].efficiency = efficiency;
        if let Some(pid) = link.producer {
            let producer = &mut arena.producers[pid];
            if !producer.idle {
                producer.efficiency = efficiency;
            }
        }
    }
}

/// Run the convergence rounds and the authoritative processor pass.
///
/// Returns the transfers of the authoritative pass. Afterwards every
/// producer's `remaining` holds its genuinely unused capacity, and every
/// processor consumer carries its final `received` and `efficiency`.
pub fn converge_processors(
    arena: &mut FlowArena,
    links: &BTreeMap<HexCoord, BuildingLink>,
    routes: &mut DistanceCache<'_, '_>,
    reserved: &BTreeSet<Resource>,
    config: &EngineConfig,
) -> Vec<Transfer> {
    let params = PassParams::new(config, config.processor_decay);
    for round in 0..CONVERGENCE_ITERATIONS {
        refill(arena, reserved, config.construction_reserve);
        let transfers = arena.allocate(routes, Stage::Processing, params);
        update_efficiency(arena, links);
        trace!(round, transfers = transfers.len(), "processor round");
    }
    refill(arena, reserved, config.construction_reserve);
    arena.allocate(routes, Stage::Processing, params)
}
