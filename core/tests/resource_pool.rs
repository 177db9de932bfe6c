//! Resource pool tests: lease invariants, currency and storage overflow.

use economy_core::{
    error::EconomyError,
    resource::{LossOutcome, ResourceDemand, ResourceDimension, ResourcePool},
    rng::HandlerRng,
};

fn pool() -> ResourcePool {
    ResourcePool::new(16.0, 8.0, 100.0, 50.0, 500.0)
}

fn assert_leases_valid(pool: &ResourcePool) {
    for dim in ResourceDimension::LEASABLE {
        let cap = pool.capacity(dim);
        assert!(
            cap.used() >= 0.0 && cap.used() <= cap.total(),
            "{dim} out of bounds: used={} total={}",
            cap.used(),
            cap.total()
        );
    }
}

/// Allocating beyond idle memory is refused and leaves usage untouched.
#[test]
fn oversized_allocation_refused() {
    let mut pool = pool();
    assert!(pool.try_allocate(2.0, 0.0, 0.0, 0.0));

    assert!(!pool.try_allocate(20.0, 1.0, 1.0, 1.0));

    assert_eq!(pool.used(ResourceDimension::Memory), 2.0);
    assert_eq!(pool.used(ResourceDimension::Cpu), 0.0);
    assert_eq!(pool.used(ResourceDimension::Bandwidth), 0.0);
    assert_eq!(pool.used(ResourceDimension::Computing), 0.0);
}

/// One short dimension blocks the whole lease.
#[test]
fn allocation_is_all_or_nothing() {
    let mut pool = pool();
    assert!(pool.try_allocate(4.0, 4.0, 40.0, 20.0));
    let before = pool.clone();

    // cpu has 4 idle, ask for 5.
    assert!(!pool.try_allocate(1.0, 5.0, 1.0, 1.0));
    assert_eq!(pool, before, "a refused lease must not change any dimension");

    assert!(!pool.try_allocate(-1.0, 0.0, 0.0, 0.0), "negative demand is refused");
    assert!(!pool.try_allocate(f64::NAN, 0.0, 0.0, 0.0), "NaN demand is refused");
    assert_eq!(pool, before);
}

/// Exactly filling a dimension is allowed; one more unit is not.
#[test]
fn allocation_up_to_capacity() {
    let mut pool = pool();
    assert!(pool.try_allocate(16.0, 8.0, 100.0, 50.0));
    assert_eq!(pool.average_idle_percent(), 0.0);
    assert!(!pool.try_allocate(0.0, 0.0, 0.0, 0.5));
}

/// Random allocate/release sequences never break `0 <= used <= total`.
#[test]
fn lease_bounds_hold_for_random_sequences() {
    let mut rng = HandlerRng::from_seed(0xC0FFEE);
    let mut pool = pool();

    for _ in 0..2_000 {
        let demand = ResourceDemand::new(
            rng.next_f64() * 10.0,
            rng.next_f64() * 5.0,
            rng.next_f64() * 60.0,
            rng.next_f64() * 30.0,
        );
        if rng.chance(0.5) {
            pool.try_allocate_demand(&demand);
        } else {
            pool.release_demand(&demand);
        }
        assert_leases_valid(&pool);
        let avg = pool.average_idle_percent();
        assert!((0.0..=100.0).contains(&avg), "average idle {avg} outside [0, 100]");
    }
}

/// Releasing more than is used clamps at zero.
#[test]
fn over_release_clamps_at_zero() {
    let mut pool = pool();
    assert!(pool.try_allocate(3.0, 1.0, 10.0, 5.0));
    pool.release(10.0, 10.0, 10.0, 10.0);
    assert_leases_valid(&pool);
    assert_eq!(pool.used(ResourceDimension::Memory), 0.0);
    assert_eq!(pool.used(ResourceDimension::Bandwidth), 0.0);
}

#[test]
fn spend_rejects_overdraft() {
    let mut pool = pool().with_currency(100);

    assert!(!pool.spend(150));
    assert_eq!(pool.currency(), 100);

    assert!(pool.spend(60));
    assert_eq!(pool.currency(), 40);

    assert!(!pool.spend(-5), "negative spend must be refused");
    assert_eq!(pool.currency(), 40);
}

#[test]
fn spend_then_earn_restores_balance() {
    let mut pool = pool().with_currency(777);
    assert!(pool.spend(250));
    pool.earn(250);
    assert_eq!(pool.currency(), 777);

    pool.earn(-10);
    assert_eq!(pool.currency(), 777, "negative earn is ignored");
}

/// A loss larger than the balance is left unresolved, not clamped.
#[test]
fn absorb_loss_never_goes_negative() {
    let mut pool = pool().with_currency(50);

    assert_eq!(pool.absorb_loss(80), LossOutcome::Unresolved { shortfall: 30 });
    assert_eq!(pool.currency(), 50);

    assert_eq!(pool.absorb_loss(20), LossOutcome::Covered);
    assert_eq!(pool.currency(), 30);
}

/// Storage may overflow; the overflow is visible through the warnings.
#[test]
fn storage_overflow_is_applied_and_flagged() {
    let mut pool = ResourcePool::new(16.0, 8.0, 100.0, 50.0, 10.0);

    assert!(pool.generate_data(8.0));
    assert!(!pool.is_storage_nearly_full(), "80% is below the 90% warning line");

    assert!(!pool.generate_data(5.0), "13/10 must report storage full");
    assert_eq!(pool.used(ResourceDimension::Storage), 13.0, "overflowing data is still stored");
    assert!(pool.is_storage_nearly_full());
    assert!(pool.is_storage_overflowing());
    assert!((pool.usage_percent(ResourceDimension::Storage) - 130.0).abs() < 1e-9);
    assert_eq!(pool.idle_percent(ResourceDimension::Storage), 0.0);

    pool.clean_data(20.0);
    assert_eq!(pool.used(ResourceDimension::Storage), 0.0);
    assert!(pool.add_storage_used(10.0), "exactly full is not overflow");
}

/// Storage never counts toward the average idle percent.
#[test]
fn average_idle_excludes_storage() {
    let mut pool = pool();
    pool.add_storage_used(500.0);
    assert_eq!(pool.average_idle_percent(), 100.0);

    assert!(pool.try_allocate(8.0, 4.0, 50.0, 25.0));
    assert_eq!(pool.average_idle_percent(), 50.0);
}

/// A zero-capacity dimension reads as 0% idle, never NaN.
#[test]
fn zero_capacity_reads_as_zero() {
    let pool = ResourcePool::new(0.0, 0.0, 0.0, 0.0, 0.0);
    for dim in ResourceDimension::ALL {
        assert_eq!(pool.idle_percent(dim), 0.0);
        assert_eq!(pool.usage_percent(dim), 0.0);
    }
    assert_eq!(pool.average_idle_percent(), 0.0);
    assert!(!pool.is_storage_nearly_full());
}

#[test]
fn morale_and_level_updates() {
    let mut pool = pool();
    pool.change_morale(-250);
    pool.change_morale(40);
    assert_eq!(pool.morale(), -210, "morale is unbounded below");

    pool.set_level(0);
    assert_eq!(pool.level(), 1, "level never drops below 1");
    pool.level_up();
    assert_eq!(pool.level(), 2);
}

#[test]
fn capacity_upgrade_adds_headroom() {
    let mut pool = pool();
    assert!(!pool.try_allocate(20.0, 0.0, 0.0, 0.0));
    pool.upgrade_capacity(ResourceDimension::Memory, 8.0);
    assert!(pool.try_allocate(20.0, 0.0, 0.0, 0.0));
    assert_eq!(pool.total(ResourceDimension::Memory), 24.0);
}

/// Edit one field of a serialized pool, as a hand-edited save file would.
fn tampered(pool: &ResourcePool, edit: impl FnOnce(&mut serde_json::Value)) -> ResourcePool {
    let mut value = serde_json::to_value(pool).unwrap();
    edit(&mut value);
    serde_json::from_value(value).unwrap()
}

#[test]
fn pool_from_own_operations_validates() {
    let mut pool = pool();
    assert!(pool.try_allocate(16.0, 8.0, 100.0, 50.0));
    assert!(!pool.add_storage_used(600.0), "storage may overflow");
    pool.validate().unwrap();

    let cap = pool.capacity(ResourceDimension::Memory);
    assert_eq!((cap.used(), cap.total()), (16.0, 16.0));
    assert_eq!(pool.used(ResourceDimension::Storage), 600.0);
    assert_eq!(pool.total(ResourceDimension::Storage), 500.0);
}

#[test]
fn foreign_pool_breaking_invariants_rejected() {
    let pool = pool();
    let cases: [(&str, Box<dyn FnOnce(&mut serde_json::Value)>); 5] = [
        ("over-used memory", Box::new(|v| v["memory"]["used"] = 999.0.into())),
        ("negative cpu total", Box::new(|v| v["cpu"]["total"] = (-1.0).into())),
        ("negative storage used", Box::new(|v| v["storage"]["used"] = (-5.0).into())),
        ("negative currency", Box::new(|v| v["currency"] = (-10).into())),
        ("level zero", Box::new(|v| v["level"] = 0.into())),
    ];
    for (case, edit) in cases {
        let bad = tampered(&pool, edit);
        assert!(
            matches!(bad.validate(), Err(EconomyError::InvalidSnapshot { .. })),
            "{case} should be rejected"
        );
    }
}
