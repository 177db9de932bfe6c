//! Settlement coordinator tests: phase order, fault isolation,
//! morale aggregation and data generation.

use economy_core::{
    config::EconomyConfig,
    context::EconomyContext,
    error::EconomyError,
    event::EconomyEvent,
    phase::SettlementPhase,
    resource::ResourceDimension,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

fn context(config: EconomyConfig) -> EconomyContext {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ctx = EconomyContext::new("settlement-test".into(), config).expect("context");
    ctx.init().expect("init");
    ctx
}

fn plain() -> EconomyContext {
    context(EconomyConfig::default_test())
}

#[test]
fn phases_run_in_fixed_order() {
    let mut ctx = plain();
    let seen = Arc::new(Mutex::new(Vec::new()));

    // Subscribe in reverse to show registration order does not reorder phases.
    for phase in SettlementPhase::ALL.iter().rev() {
        let seen = Arc::clone(&seen);
        let phase = *phase;
        ctx.subscribe(phase, "recorder", move |c| {
            seen.lock().unwrap().push(c.phase);
            Ok(vec![])
        })
        .unwrap();
    }

    let report = ctx.force_cycle_now().unwrap();

    assert_eq!(*seen.lock().unwrap(), SettlementPhase::ALL.to_vec());
    assert_eq!(report.phases_completed, SettlementPhase::ALL.to_vec());
    assert!(report.is_clean());
}

#[test]
fn handlers_within_phase_run_in_registration_order() {
    let mut ctx = plain();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let seen = Arc::clone(&seen);
        ctx.subscribe(SettlementPhase::Rent, name, move |_| {
            seen.lock().unwrap().push(name);
            Ok(vec![])
        })
        .unwrap();
    }

    ctx.force_cycle_now().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
}

/// A failing identity-fee handler does not stop job-salary from running.
#[test]
fn faulting_handler_is_isolated() {
    let mut ctx = plain();
    let salary_runs = Arc::new(AtomicUsize::new(0));
    let later_identity_runs = Arc::new(AtomicUsize::new(0));

    ctx.subscribe(SettlementPhase::IdentityFee, "broken-identity", |_| {
        Err(EconomyError::Other(anyhow::anyhow!("identity service offline")))
    })
    .unwrap();
    ctx.subscribe(SettlementPhase::IdentityFee, "panicking-identity", |_| {
        panic!("identity table corrupted")
    })
    .unwrap();
    let counter = Arc::clone(&later_identity_runs);
    ctx.subscribe(SettlementPhase::IdentityFee, "healthy-identity", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    })
    .unwrap();
    let counter = Arc::clone(&salary_runs);
    ctx.subscribe(SettlementPhase::JobSalary, "salary-counter", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    })
    .unwrap();

    let report = ctx.force_cycle_now().unwrap();

    assert_eq!(salary_runs.load(Ordering::SeqCst), 1, "job-salary must still run");
    assert_eq!(later_identity_runs.load(Ordering::SeqCst), 1, "later handlers in the phase run");
    assert_eq!(report.phases_completed.len(), 9);
    assert_eq!(report.faults.len(), 2);
    assert!(report.faults.iter().all(|f| f.phase == SettlementPhase::IdentityFee));
    assert!(report.faults[1].message.contains("identity table corrupted"));
    assert!(matches!(report.ensure_clean(), Err(EconomyError::HandlerFault { .. })));

    let fault_events = report
        .events()
        .filter(|e| matches!(e, EconomyEvent::HandlerFaulted { .. }))
        .count();
    assert_eq!(fault_events, 2);

    // The next cycle runs normally too.
    let next = ctx.force_cycle_now().unwrap();
    assert_eq!(next.cycle, 2);
    assert_eq!(salary_runs.load(Ordering::SeqCst), 2);
}

/// Morale deltas are summed and applied once; a faulted handler's
/// contribution is discarded.
#[test]
fn morale_contributions_are_aggregated() {
    let mut ctx = plain();
    ctx.subscribe(SettlementPhase::MoraleChange, "pet", |c| {
        c.contribute_morale(3);
        Ok(vec![])
    })
    .unwrap();
    ctx.subscribe(SettlementPhase::MoraleChange, "overtime", |c| {
        c.contribute_morale(-1);
        Ok(vec![])
    })
    .unwrap();
    ctx.subscribe(SettlementPhase::MoraleChange, "broken", |c| {
        c.contribute_morale(100);
        Err(EconomyError::Other(anyhow::anyhow!("bad bonus table")))
    })
    .unwrap();

    let report = ctx.force_cycle_now().unwrap();

    assert_eq!(ctx.pool().morale(), 2);
    let changes: Vec<_> = report
        .events()
        .filter_map(|e| match e {
            EconomyEvent::MoraleChanged { delta, .. } => Some(*delta),
            _ => None,
        })
        .collect();
    assert_eq!(changes, vec![2], "one aggregated morale change per cycle");
}

/// Morale only moves in the morale-change phase. A delta contributed in
/// any other phase is logged and dropped, not carried forward.
#[test]
fn morale_outside_morale_phase_is_ignored() {
    let mut ctx = plain();
    ctx.subscribe(SettlementPhase::Rent, "landlord-gift", |c| {
        c.contribute_morale(5);
        Ok(vec![])
    })
    .unwrap();
    ctx.subscribe(SettlementPhase::MoraleChange, "pet", |c| {
        c.contribute_morale(1);
        Ok(vec![])
    })
    .unwrap();

    let report = ctx.force_cycle_now().unwrap();

    assert!(report.is_clean());
    assert_eq!(ctx.pool().morale(), 1);
    assert!(report
        .events()
        .all(|e| !matches!(e, EconomyEvent::MoraleChanged { delta, .. } if *delta != 1)));
}

#[test]
fn data_generation_flags_full_storage() {
    let mut config = EconomyConfig::default_test();
    config.pool.storage = 10.0;
    config.pool.data_generation_rate = 6.0;
    let mut ctx = context(config);

    let seen_full = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&seen_full);
    ctx.subscribe(SettlementPhase::RandomEventCheck, "storage-watcher", move |c| {
        seen.lock().unwrap().push(c.storage_full);
        Ok(vec![])
    })
    .unwrap();

    let first = ctx.force_cycle_now().unwrap();
    assert!(!first.storage_full);
    let second = ctx.force_cycle_now().unwrap();
    assert!(second.storage_full);

    assert_eq!(ctx.pool().used(ResourceDimension::Storage), 12.0, "overflow is kept");
    assert_eq!(*seen_full.lock().unwrap(), vec![false, true]);
    assert!(second.events().any(|e| matches!(
        e,
        EconomyEvent::DataGenerated { storage_full: true, .. }
    )));
}

#[test]
fn duplicate_phase_registration_rejected() {
    let mut ctx = plain();
    ctx.subscribe(SettlementPhase::Rent, "landlord", |_| Ok(vec![])).unwrap();

    let err = ctx
        .subscribe(SettlementPhase::Rent, "landlord", |_| Ok(vec![]))
        .unwrap_err();
    assert!(matches!(
        err,
        EconomyError::DuplicateHandler { phase: SettlementPhase::Rent, .. }
    ));

    ctx.subscribe(SettlementPhase::MoraleChange, "landlord", |_| Ok(vec![]))
        .expect("same subsystem may handle a different phase");
    assert_eq!(ctx.handler_count(SettlementPhase::Rent), 1);
}

/// Advancing across three intervals settles three full cycles in order.
#[test]
fn advance_settles_every_crossed_cycle() {
    let mut ctx = plain();

    let report = ctx.advance(1000.0).unwrap();

    let cycles: Vec<u64> = report.cycles.iter().map(|c| c.cycle).collect();
    assert_eq!(cycles, vec![1, 2, 3]);
    assert!(report.cycles.iter().all(|c| c.phases_completed.len() == 9));
    assert_eq!(ctx.clock().accumulated(), 100.0);
}

#[test]
fn lifecycle_guards() {
    let mut ctx = EconomyContext::new("lifecycle".into(), EconomyConfig::default_test()).unwrap();
    assert!(matches!(ctx.advance(1.0), Err(EconomyError::NotInitialized)));

    ctx.init().unwrap();
    ctx.advance(1.0).unwrap();

    let final_state = ctx.shutdown();
    assert_eq!(final_state.cycle, 0);
    assert!(matches!(ctx.advance(1.0), Err(EconomyError::ShutDown)));
    assert!(matches!(ctx.force_cycle_now(), Err(EconomyError::ShutDown)));
    assert!(matches!(ctx.init(), Err(EconomyError::ShutDown)));
}

#[test]
fn invalid_config_rejected() {
    let mut config = EconomyConfig::default_test();
    config.clock.interval_seconds = 0.0;
    assert!(matches!(
        EconomyContext::new("bad".into(), config),
        Err(EconomyError::InvalidConfig { field: "clock.interval_seconds", .. })
    ));

    let mut config = EconomyConfig::default_test();
    config.identity_fee.min_fee = 50;
    config.identity_fee.max_fee = 10;
    assert!(EconomyContext::new("bad".into(), config).is_err());
}
