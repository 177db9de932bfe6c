use crate::{
    error::{EconomyError, EconomyResult},
    types::{Money, Morale},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_INTERVAL_SECONDS: f64 = 300.0;
pub const DEFAULT_DEBUG_INTERVAL_SECONDS: f64 = 30.0;
pub const MIN_TIME_SCALE: f64 = 1.0;
pub const MAX_TIME_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub interval_seconds:       f64,
    pub debug_interval_seconds: f64,
    /// Use the debug interval instead of the production one.
    pub debug:                  bool,
    pub time_scale:             f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            interval_seconds:       DEFAULT_INTERVAL_SECONDS,
            debug_interval_seconds: DEFAULT_DEBUG_INTERVAL_SECONDS,
            debug:                  false,
            time_scale:             1.0,
        }
    }
}

impl ClockConfig {
    pub fn effective_interval(&self) -> f64 {
        if self.debug { self.debug_interval_seconds } else { self.interval_seconds }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyConfig {
    pub base_efficiency: f64,
    pub mood_rate:       f64,
    pub level_rate:      f64,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            base_efficiency: 100.0,
            mood_rate:       10.0,
            level_rate:      1.0,
        }
    }
}

/// Initial pool state for a fresh session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub memory:    f64,
    pub cpu:       f64,
    pub bandwidth: f64,
    pub computing: f64,
    pub storage:   f64,
    pub currency:  Money,
    pub morale:    Morale,
    pub level:     i32,
    pub data_generation_rate:    f64,
    pub storage_warning_percent: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            memory:    16.0,
            cpu:       8.0,
            bandwidth: 100.0,
            computing: 50.0,
            storage:   500.0,
            currency:  1_000,
            morale:    0,
            level:     1,
            data_generation_rate:    5.0,
            storage_warning_percent: 90.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityFeeConfig {
    pub min_fee: Money,
    pub max_fee: Money,
}

impl Default for IdentityFeeConfig {
    fn default() -> Self {
        Self { min_fee: 10, max_fee: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrusionConfig {
    /// Chance per cycle that an intrusion attempt happens.
    pub base_probability: f64,
    /// Share of the balance lost to an undefended intrusion, in percent.
    pub loss_percent:     f64,
    pub morale_penalty:   Morale,
}

impl Default for IntrusionConfig {
    fn default() -> Self {
        Self {
            base_probability: 0.05,
            loss_percent:     10.0,
            morale_penalty:   5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub seed:         u64,
    pub clock:        ClockConfig,
    pub efficiency:   EfficiencyConfig,
    pub pool:         PoolConfig,
    pub identity_fee: IdentityFeeConfig,
    pub intrusion:    IntrusionConfig,
}

impl EconomyConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    /// In tests, use EconomyConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EconomyConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Small, fully deterministic config used by the test suite:
    /// no random intrusions and a fixed identity fee.
    pub fn default_test() -> Self {
        Self {
            seed: 42,
            clock: ClockConfig::default(),
            efficiency: EfficiencyConfig::default(),
            pool: PoolConfig {
                data_generation_rate: 0.0,
                ..PoolConfig::default()
            },
            identity_fee: IdentityFeeConfig { min_fee: 20, max_fee: 20 },
            intrusion: IntrusionConfig {
                base_probability: 0.0,
                ..IntrusionConfig::default()
            },
        }
    }

    pub fn validate(&self) -> EconomyResult<()> {
        let clock = &self.clock;
        if !(clock.interval_seconds.is_finite() && clock.interval_seconds > 0.0) {
            return Err(invalid("clock.interval_seconds", "must be > 0"));
        }
        if !(clock.debug_interval_seconds.is_finite() && clock.debug_interval_seconds > 0.0) {
            return Err(invalid("clock.debug_interval_seconds", "must be > 0"));
        }
        if !clock.time_scale.is_finite() {
            return Err(invalid("clock.time_scale", "must be finite"));
        }
        let pool = &self.pool;
        for (field, value) in [
            ("pool.memory", pool.memory),
            ("pool.cpu", pool.cpu),
            ("pool.bandwidth", pool.bandwidth),
            ("pool.computing", pool.computing),
            ("pool.storage", pool.storage),
            ("pool.data_generation_rate", pool.data_generation_rate),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, "must be >= 0"));
            }
        }
        if pool.currency < 0 {
            return Err(invalid("pool.currency", "must be >= 0"));
        }
        if pool.level < 1 {
            return Err(invalid("pool.level", "must be >= 1"));
        }
        let fee = &self.identity_fee;
        if fee.min_fee < 0 || fee.min_fee > fee.max_fee {
            return Err(invalid("identity_fee", "requires 0 <= min_fee <= max_fee"));
        }
        let p = self.intrusion.base_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(invalid("intrusion.base_probability", "must be in [0, 1]"));
        }
        if !(0.0..=100.0).contains(&self.intrusion.loss_percent) {
            return Err(invalid("intrusion.loss_percent", "must be in [0, 100]"));
        }
        if self.intrusion.morale_penalty < 0 {
            return Err(invalid("intrusion.morale_penalty", "must be >= 0"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> EconomyError {
    EconomyError::InvalidConfig { field, reason: reason.to_string() }
}
