//! Efficiency model tests.

use economy_core::{
    config::EfficiencyConfig,
    efficiency::EfficiencyModel,
    resource::ResourcePool,
};

fn model(level_rate: f64) -> EfficiencyModel {
    EfficiencyModel::new(&EfficiencyConfig {
        base_efficiency: 100.0,
        mood_rate: 10.0,
        level_rate,
    })
}

/// With nothing idle and neutral morale only the level term contributes.
#[test]
fn level_only_efficiency_is_exact() {
    let level_rate = 2.5;
    let m = model(level_rate);
    assert_eq!(m.efficiency(0.0, 0, 1), 100.0 * (1.0 + level_rate / 100.0));
    assert_eq!(m.efficiency(0.0, 0, 1), m.efficiency(0.0, 0, 1), "no randomness");
}

#[test]
fn morale_and_idle_raise_efficiency() {
    let m = model(1.0);
    let base = m.efficiency(0.0, 0, 1);
    assert!(m.efficiency(50.0, 0, 1) > base);
    assert!(m.efficiency(0.0, 100, 1) > base);
    assert!(m.efficiency(0.0, -100, 1) < base, "negative morale lowers efficiency");

    // morale 100 with mood_rate 10 adds 10 points.
    let diff = m.efficiency(0.0, 100, 1) - base;
    assert!((diff - 10.0).abs() < 1e-9, "expected +10, got {diff}");
}

/// A fresh pool is fully idle: 100 + 1 level point.
#[test]
fn pool_efficiency_uses_average_idle() {
    let m = model(1.0);
    let pool = ResourcePool::new(16.0, 8.0, 100.0, 50.0, 500.0);
    let eff = m.pool_efficiency(&pool);
    assert!((eff - 201.0).abs() < 1e-9, "expected 201, got {eff}");
    assert_eq!(m.actual_income(40, &pool), 80);
}

/// A zero-capacity pool still yields a finite multiplier.
#[test]
fn zero_capacity_pool_is_defined() {
    let m = model(1.0);
    let pool = ResourcePool::new(0.0, 0.0, 0.0, 0.0, 0.0);
    let eff = m.pool_efficiency(&pool);
    assert!(eff.is_finite());
    assert!((eff - 101.0).abs() < 1e-9);
}

#[test]
fn income_is_rounded() {
    assert_eq!(EfficiencyModel::scale(100, 150.0), 150);
    assert_eq!(EfficiencyModel::scale(3, 150.0), 5, "4.5 rounds away from zero");
    assert_eq!(EfficiencyModel::scale(0, 250.0), 0);
}
