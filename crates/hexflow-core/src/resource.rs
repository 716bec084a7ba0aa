//! Typed resources and sparse per-resource amounts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;

/// Every resource the economy knows about. The declaration order is the
/// iteration order of [`ResourceMap`] and therefore the per-resource pass order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Wood,
    Stone,
    Clay,
    Grain,
    Food,
    Fish,
    Ore,
    Coal,
    Iron,
    Steel,
    Bricks,
    Tools,
    Goods,
    Textiles,
    Labor,
    Electricity,
}

impl Resource {
    pub const ALL: [Resource; 16] = [
        Resource::Wood,
        Resource::Stone,
        Resource::Clay,
        Resource::Grain,
        Resource::Food,
        Resource::Fish,
        Resource::Ore,
        Resource::Coal,
        Resource::Iron,
        Resource::Steel,
        Resource::Bricks,
        Resource::Tools,
        Resource::Goods,
        Resource::Textiles,
        Resource::Labor,
        Resource::Electricity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Wood => "wood",
            Resource::Stone => "stone",
            Resource::Clay => "clay",
            Resource::Grain => "grain",
            Resource::Food => "food",
            Resource::Fish => "fish",
            Resource::Ore => "ore",
            Resource::Coal => "coal",
            Resource::Iron => "iron",
            Resource::Steel => "steel",
            Resource::Bricks => "bricks",
            Resource::Tools => "tools",
            Resource::Goods => "goods",
            Resource::Textiles => "textiles",
            Resource::Labor => "labor",
            Resource::Electricity => "electricity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }

    /// Electricity travels over power lines, everything else over transport.
    pub fn is_electricity(self) -> bool {
        matches!(self, Resource::Electricity)
    }
}

/// Sparse map of resource -> nonnegative amount.
///
/// Entries that would drop to zero or below are removed, so `len()` counts
/// resources that are actually present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMap(BTreeMap<Resource, Fixed64>);

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount of `resource`, zero when absent.
    pub fn get(&self, resource: Resource) -> Fixed64 {
        self.0.get(&resource).copied().unwrap_or(Fixed64::ZERO)
    }

    /// Overwrite an amount. Nonpositive values remove the entry.
    pub fn set(&mut self, resource: Resource, amount: Fixed64) {
        if amount > Fixed64::ZERO {
            self.0.insert(resource, amount);
        } else {
            self.0.remove(&resource);
        }
    }

    /// Add to an amount (negative deltas clamp at zero).
    pub fn add(&mut self, resource: Resource, delta: Fixed64) {
        let next = self.get(resource) + delta;
        self.set(resource, next);
    }

    /// Subtract from an amount, clamping at zero.
    pub fn take(&mut self, resource: Resource, amount: Fixed64) {
        self.add(resource, -amount);
    }

    pub fn contains(&self, resource: Resource) -> bool {
        self.0.contains_key(&resource)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, Fixed64)> + '_ {
        self.0.iter().map(|(r, v)| (*r, *v))
    }

    pub fn resources(&self) -> impl Iterator<Item = Resource> + '_ {
        self.0.keys().copied()
    }

    /// Sum of all amounts.
    pub fn total(&self) -> Fixed64 {
        self.0.values().fold(Fixed64::ZERO, |acc, v| acc + *v)
    }

    /// Every amount multiplied by `factor`.
    pub fn scaled(&self, factor: Fixed64) -> ResourceMap {
        self.iter().map(|(r, v)| (r, v * factor)).collect()
    }

    /// Element-wise accumulate another map into this one.
    pub fn merge(&mut self, other: &ResourceMap) {
        for (r, v) in other.iter() {
            self.add(r, v);
        }
    }

    /// `self - other` per resource, clamped at zero.
    pub fn saturating_sub(&self, other: &ResourceMap) -> ResourceMap {
        self.iter().map(|(r, v)| (r, v - other.get(r))).collect()
    }
}

impl FromIterator<(Resource, Fixed64)> for ResourceMap {
    fn from_iter<I: IntoIterator<Item = (Resource, Fixed64)>>(iter: I) -> Self {
        let mut map = ResourceMap::new();
        for (r, v) in iter {
            map.add(r, v);
        }
        map
    }
}
