//! Export market for the hexflow engine.
//!
//! Turns the per-tick export rate reported by the core engine into prices
//! and trade value. Each resource's price falls as more of it is exported
//! over the life of the game:
//!
//! ```text
//! price(r) = base_value(r) / (1 + cumulative_exported(r) / saturation)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut market = Market::from_catalog(&catalog, MarketConfig::default());
//! // After each tick:
//! let income = market.record(&output.export_rate);
//! // Query prices:
//! let goods = market.price(Resource::Goods);
//! ```

use hexflow_core::catalog::Catalog;
use hexflow_core::fixed::{Fixed64, checked_div_64};
use hexflow_core::resource::{Resource, ResourceMap};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the market.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Cumulative export volume at which a resource sells at half price.
    pub saturation: Fixed64,
    /// Number of per-tick trade values retained for trend queries.
    pub history_capacity: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            saturation: Fixed64::from_num(100),
            history_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring of [`Fixed64`] values. When full, the oldest entry
/// is overwritten. Iterates oldest-to-newest.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<Fixed64>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![Fixed64::ZERO; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, value: Fixed64) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The most recently pushed value, if any.
    pub fn latest(&self) -> Option<Fixed64> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.capacity() - 1) % self.capacity();
        Some(self.data[idx])
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Fixed64> + '_ {
        let start = (self.head + self.capacity() - self.len) % self.capacity();
        (0..self.len).map(move |i| self.data[(start + i) % self.capacity()])
    }

    /// Mean of the stored values, zero when empty.
    pub fn mean(&self) -> Fixed64 {
        if self.len == 0 {
            return Fixed64::ZERO;
        }
        let sum: Fixed64 = self.iter().sum();
        sum / Fixed64::from_num(self.len as u32)
    }

    pub fn clear(&mut self) {
        self.data.fill(Fixed64::ZERO);
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Cumulative export ledger with a saturating price curve.
#[derive(Debug, Clone)]
pub struct Market {
    config: MarketConfig,
    base_values: ResourceMap,
    cumulative: ResourceMap,
    history: RingBuffer,
    ticks: u64,
}

impl Market {
    pub fn new(config: MarketConfig, base_values: ResourceMap) -> Self {
        let history = RingBuffer::new(config.history_capacity);
        Self {
            config,
            base_values,
            cumulative: ResourceMap::new(),
            history,
            ticks: 0,
        }
    }

    /// Market over the catalog's exportable resources.
    pub fn from_catalog(catalog: &Catalog, config: MarketConfig) -> Self {
        Self::new(config, catalog.base_values().clone())
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Ticks recorded so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn cumulative(&self, resource: Resource) -> Fixed64 {
        self.cumulative.get(resource)
    }

    /// Current unit price. Resources without a base value are worth nothing.
    pub fn price(&self, resource: Resource) -> Fixed64 {
        let base = self.base_values.get(resource);
        if base == Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        let pressure =
            checked_div_64(self.cumulative.get(resource), self.config.saturation).unwrap_or(Fixed64::ZERO);
        checked_div_64(base, Fixed64::ONE + pressure).unwrap_or(Fixed64::ZERO)
    }

    /// Current prices for every priced resource.
    pub fn prices(&self) -> ResourceMap {
        self.base_values.resources().map(|r| (r, self.price(r))).collect()
    }

    /// `sum(rate * price)` at current prices, without recording anything.
    pub fn trade_value(&self, rate: &ResourceMap) -> Fixed64 {
        rate.iter().map(|(r, amount)| amount * self.price(r)).sum()
    }

    /// Sell one tick's export rate: value it at the prices in force before
    /// the sale, then add it to the cumulative ledger. Returns the value.
    pub fn record(&mut self, rate: &ResourceMap) -> Fixed64 {
        let value = self.trade_value(rate);
        for (r, amount) in rate.iter() {
            if self.base_values.contains(r) {
                self.cumulative.add(r, amount);
            }
        }
        self.history.push(value);
        self.ticks += 1;
        value
    }

    /// Trade values of the most recent ticks, oldest first.
    pub fn history(&self) -> Vec<Fixed64> {
        self.history.iter().collect()
    }

    /// Average trade value per tick over the retained history.
    pub fn average_income(&self) -> Fixed64 {
        self.history.mean()
    }

    /// Forget all sales; prices return to base values.
    pub fn reset(&mut self) {
        self.cumulative = ResourceMap::new();
        self.history.clear();
        self.ticks = 0;
    }
}
