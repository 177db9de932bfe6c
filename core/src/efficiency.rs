//! Efficiency model: maps pool state to an income multiplier.
//!
//! efficiency = base * (1 + (avg_idle% + morale/100 * mood_rate + level * level_rate) / 100)
//! income     = round(base_income * efficiency / 100)
//!
//! Pure: never mutates the pool, never draws randomness.

use crate::{
    config::EfficiencyConfig,
    resource::ResourcePool,
    types::{Money, Morale},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyModel {
    pub base_efficiency: f64,
    pub mood_rate:       f64,
    pub level_rate:      f64,
}

impl EfficiencyModel {
    pub fn new(config: &EfficiencyConfig) -> Self {
        Self {
            base_efficiency: config.base_efficiency,
            mood_rate:       config.mood_rate,
            level_rate:      config.level_rate,
        }
    }

    pub fn efficiency(&self, idle_percent: f64, morale: Morale, level: i32) -> f64 {
        let idle = if idle_percent.is_finite() { idle_percent } else { 0.0 };
        let bonus = idle
            + f64::from(morale) / 100.0 * self.mood_rate
            + f64::from(level) * self.level_rate;
        self.base_efficiency * (1.0 + bonus / 100.0)
    }

    pub fn pool_efficiency(&self, pool: &ResourcePool) -> f64 {
        self.efficiency(pool.average_idle_percent(), pool.morale(), pool.level())
    }

    /// Scale a base income figure by the pool's current efficiency.
    pub fn actual_income(&self, base_income: Money, pool: &ResourcePool) -> Money {
        Self::scale(base_income, self.pool_efficiency(pool))
    }

    pub fn scale(base_income: Money, efficiency: f64) -> Money {
        (base_income as f64 * efficiency / 100.0).round() as Money
    }
}

impl Default for EfficiencyModel {
    fn default() -> Self {
        Self::new(&EfficiencyConfig::default())
    }
}
