//! The resource pool: the single mutable ledger every phase settles against.
//!
//! RULE: `0 <= used <= total` holds for memory, cpu, bandwidth and computing
//! at all times. It is enforced by `try_allocate`/`release`, never by
//! clamping after the fact.
//!
//! RULE: `currency` never goes negative. A spend or loss that cannot be
//! covered is rejected and the balance is left untouched.
//!
//! Storage is the one asymmetric dimension: it accumulates content and is
//! allowed to overflow its capacity. Overflow is observable through
//! `usage_percent` and `is_storage_nearly_full` and must be cleaned up by
//! the player.

use crate::{
    config::PoolConfig,
    error::{EconomyError, EconomyResult},
    types::{Money, Morale},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceDimension {
    Memory,
    Cpu,
    Bandwidth,
    Computing,
    Storage,
}

impl ResourceDimension {
    /// The four leasable dimensions. Storage is a consumption sink.
    pub const LEASABLE: [ResourceDimension; 4] =
        [Self::Memory, Self::Cpu, Self::Bandwidth, Self::Computing];

    pub const ALL: [ResourceDimension; 5] =
        [Self::Memory, Self::Cpu, Self::Bandwidth, Self::Computing, Self::Storage];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory    => "memory",
            Self::Cpu       => "cpu",
            Self::Bandwidth => "bandwidth",
            Self::Computing => "computing",
            Self::Storage   => "storage",
        }
    }
}

impl fmt::Display for ResourceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Total and used capacity for one dimension.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Capacity {
    total: f64,
    used:  f64,
}

impl Capacity {
    pub fn new(total: f64) -> Self {
        Self { total: total.max(0.0), used: 0.0 }
    }

    pub fn total(&self) -> f64 { self.total }
    pub fn used(&self) -> f64 { self.used }

    pub fn idle(&self) -> f64 {
        self.total - self.used
    }

    /// Idle share of capacity in [0, 100]. Zero capacity reads as 0.
    pub fn idle_percent(&self) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        (self.idle() / self.total * 100.0).clamp(0.0, 100.0)
    }

    /// Used share of capacity. May exceed 100 for overflowing storage.
    pub fn usage_percent(&self) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        self.used / self.total * 100.0
    }
}

/// A four-dimensional lease request. Storage is never leased.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceDemand {
    pub memory:    f64,
    pub cpu:       f64,
    pub bandwidth: f64,
    pub computing: f64,
}

impl ResourceDemand {
    pub fn new(memory: f64, cpu: f64, bandwidth: f64, computing: f64) -> Self {
        Self { memory, cpu, bandwidth, computing }
    }

    pub fn bandwidth(amount: f64) -> Self {
        Self { bandwidth: amount, ..Self::default() }
    }

    fn amounts(&self) -> [f64; 4] {
        [self.memory, self.cpu, self.bandwidth, self.computing]
    }
}

/// Outcome of `absorb_loss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossOutcome {
    /// The full loss was deducted.
    Covered,
    /// The balance could not cover the loss; nothing was deducted.
    Unresolved { shortfall: Money },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourcePool {
    memory:        Capacity,
    cpu:           Capacity,
    bandwidth:     Capacity,
    computing:     Capacity,
    storage:       Capacity,
    currency:      Money,
    morale:        Morale,
    level:         i32,
    data_generation_rate:    f64,
    storage_warning_percent: f64,
}

impl ResourcePool {
    pub fn new(memory: f64, cpu: f64, bandwidth: f64, computing: f64, storage: f64) -> Self {
        Self {
            memory:    Capacity::new(memory),
            cpu:       Capacity::new(cpu),
            bandwidth: Capacity::new(bandwidth),
            computing: Capacity::new(computing),
            storage:   Capacity::new(storage),
            currency:  0,
            morale:    0,
            level:     1,
            data_generation_rate:    0.0,
            storage_warning_percent: 90.0,
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        let mut pool = Self::new(
            config.memory,
            config.cpu,
            config.bandwidth,
            config.computing,
            config.storage,
        );
        pool.currency = config.currency.max(0);
        pool.morale = config.morale;
        pool.level = config.level.max(1);
        pool.data_generation_rate = config.data_generation_rate.max(0.0);
        pool.storage_warning_percent = config.storage_warning_percent;
        pool
    }

    pub fn with_currency(mut self, currency: Money) -> Self {
        self.currency = currency.max(0);
        self
    }

    pub fn with_data_generation_rate(mut self, rate: f64) -> Self {
        self.set_data_generation_rate(rate);
        self
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn capacity(&self, dim: ResourceDimension) -> &Capacity {
        match dim {
            ResourceDimension::Memory    => &self.memory,
            ResourceDimension::Cpu       => &self.cpu,
            ResourceDimension::Bandwidth => &self.bandwidth,
            ResourceDimension::Computing => &self.computing,
            ResourceDimension::Storage   => &self.storage,
        }
    }

    fn capacity_mut(&mut self, dim: ResourceDimension) -> &mut Capacity {
        match dim {
            ResourceDimension::Memory    => &mut self.memory,
            ResourceDimension::Cpu       => &mut self.cpu,
            ResourceDimension::Bandwidth => &mut self.bandwidth,
            ResourceDimension::Computing => &mut self.computing,
            ResourceDimension::Storage   => &mut self.storage,
        }
    }

    pub fn used(&self, dim: ResourceDimension) -> f64 { self.capacity(dim).used }
    pub fn total(&self, dim: ResourceDimension) -> f64 { self.capacity(dim).total }

    pub fn currency(&self) -> Money { self.currency }
    pub fn morale(&self) -> Morale { self.morale }
    pub fn level(&self) -> i32 { self.level }
    pub fn data_generation_rate(&self) -> f64 { self.data_generation_rate }

    pub fn idle_percent(&self, dim: ResourceDimension) -> f64 {
        self.capacity(dim).idle_percent()
    }

    /// Mean idle percent across the four leasable dimensions.
    pub fn average_idle_percent(&self) -> f64 {
        let sum: f64 = ResourceDimension::LEASABLE
            .iter()
            .map(|d| self.idle_percent(*d))
            .sum();
        sum / ResourceDimension::LEASABLE.len() as f64
    }

    pub fn usage_percent(&self, dim: ResourceDimension) -> f64 {
        self.capacity(dim).usage_percent()
    }

    pub fn is_storage_nearly_full(&self) -> bool {
        self.storage.total > 0.0 && self.storage.usage_percent() >= self.storage_warning_percent
    }

    pub fn is_storage_overflowing(&self) -> bool {
        self.storage.used > self.storage.total
    }

    // ── Leasable capacity ──────────────────────────────────────

    /// All-or-nothing lease of the four leasable dimensions.
    pub fn try_allocate(&mut self, memory: f64, cpu: f64, bandwidth: f64, computing: f64) -> bool {
        self.try_allocate_demand(&ResourceDemand::new(memory, cpu, bandwidth, computing))
    }

    pub fn try_allocate_demand(&mut self, demand: &ResourceDemand) -> bool {
        let amounts = demand.amounts();
        let fits = ResourceDimension::LEASABLE
            .iter()
            .zip(amounts.iter())
            .all(|(dim, amount)| {
                amount.is_finite() && *amount >= 0.0 && *amount <= self.capacity(*dim).idle()
            });
        if !fits {
            return false;
        }
        for (dim, amount) in ResourceDimension::LEASABLE.iter().zip(amounts) {
            let cap = self.capacity_mut(*dim);
            cap.used = (cap.used + amount).min(cap.total);
        }
        true
    }

    /// Inverse of `try_allocate`. Over-release clamps at zero.
    pub fn release(&mut self, memory: f64, cpu: f64, bandwidth: f64, computing: f64) {
        self.release_demand(&ResourceDemand::new(memory, cpu, bandwidth, computing));
    }

    pub fn release_demand(&mut self, demand: &ResourceDemand) {
        for (dim, amount) in ResourceDimension::LEASABLE.iter().zip(demand.amounts()) {
            if !amount.is_finite() || amount <= 0.0 {
                continue;
            }
            let cap = self.capacity_mut(*dim);
            if amount > cap.used + f64::EPSILON {
                log::warn!("pool: over-release of {dim} ({amount} > used {})", cap.used);
            }
            cap.used = (cap.used - amount).max(0.0);
        }
    }

    /// Raise the total of a dimension, e.g. after a hardware purchase.
    pub fn upgrade_capacity(&mut self, dim: ResourceDimension, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            self.capacity_mut(dim).total += amount;
        }
    }

    // ── Storage ────────────────────────────────────────────────

    /// Add stored content. Returns false when the result exceeds capacity;
    /// the content is still added.
    pub fn add_storage_used(&mut self, amount: f64) -> bool {
        if amount.is_finite() && amount > 0.0 {
            self.storage.used += amount;
        }
        self.storage.used <= self.storage.total
    }

    pub fn clean_data(&mut self, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            self.storage.used = (self.storage.used - amount).max(0.0);
        }
    }

    /// Generate one cycle's worth of data. Returns false when storage is full.
    pub fn generate_data(&mut self, rate: f64) -> bool {
        self.add_storage_used(rate)
    }

    pub fn set_data_generation_rate(&mut self, rate: f64) {
        self.data_generation_rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
    }

    // ── Currency ───────────────────────────────────────────────

    /// Deduct `amount` if the balance covers it. No partial spend.
    pub fn spend(&mut self, amount: Money) -> bool {
        if amount < 0 || self.currency < amount {
            return false;
        }
        self.currency -= amount;
        true
    }

    pub fn earn(&mut self, amount: Money) {
        if amount < 0 {
            log::warn!("pool: ignored negative earn of {amount}");
            return;
        }
        self.currency = self.currency.saturating_add(amount);
    }

    /// Apply a loss. A loss the balance cannot cover is left unresolved and
    /// the balance is not touched.
    pub fn absorb_loss(&mut self, amount: Money) -> LossOutcome {
        let amount = amount.max(0);
        if self.currency >= amount {
            self.currency -= amount;
            LossOutcome::Covered
        } else {
            LossOutcome::Unresolved { shortfall: amount - self.currency }
        }
    }

    // ── Morale and level ───────────────────────────────────────

    pub fn change_morale(&mut self, delta: Morale) {
        self.morale = self.morale.saturating_add(delta);
    }

    pub fn set_level(&mut self, level: i32) {
        self.level = level.max(1);
    }

    pub fn level_up(&mut self) {
        self.level = self.level.saturating_add(1);
    }

    // ── Validation ─────────────────────────────────────────────

    /// Check a pool that did not come from this module's own operations,
    /// e.g. one read back from a snapshot.
    pub fn validate(&self) -> EconomyResult<()> {
        for dim in ResourceDimension::ALL {
            let cap = self.capacity(dim);
            if !(cap.total.is_finite() && cap.total >= 0.0) {
                return Err(invalid_pool(format!("{dim} total {} must be >= 0", cap.total)));
            }
            if !(cap.used.is_finite() && cap.used >= 0.0) {
                return Err(invalid_pool(format!("{dim} used {} must be >= 0", cap.used)));
            }
            if dim != ResourceDimension::Storage && cap.used > cap.total {
                return Err(invalid_pool(format!("{dim} used {} exceeds total {}", cap.used, cap.total)));
            }
        }
        if self.currency < 0 {
            return Err(invalid_pool(format!("currency {} is negative", self.currency)));
        }
        if self.level < 1 {
            return Err(invalid_pool(format!("level {} must be >= 1", self.level)));
        }
        if !(self.data_generation_rate.is_finite() && self.data_generation_rate >= 0.0) {
            return Err(invalid_pool(format!("data generation rate {} must be >= 0", self.data_generation_rate)));
        }
        Ok(())
    }
}

fn invalid_pool(reason: String) -> EconomyError {
    EconomyError::InvalidSnapshot { reason }
}
