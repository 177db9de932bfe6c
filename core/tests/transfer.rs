//! Transfer tests: bandwidth leases driven by elapsed time.

use economy_core::{
    command::EconomyCommand,
    config::EconomyConfig,
    context::EconomyContext,
    error::EconomyError,
    event::EconomyEvent,
    resource::{ResourceDimension, ResourcePool},
    transfer::{Transfer, TransferState},
};

fn context() -> EconomyContext {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ctx = EconomyContext::new("transfer-test".into(), EconomyConfig::default_test()).unwrap();
    ctx.init().unwrap();
    ctx
}

#[test]
fn transfer_completes_and_stores_content() {
    let mut ctx = context();
    let id = ctx.start_transfer(100.0, 40.0).unwrap();
    assert_eq!(ctx.pool().used(ResourceDimension::Bandwidth), 40.0);

    let report = ctx.advance(1.0).unwrap();
    assert!(report.transfer_events.is_empty());
    let progress = ctx.transfer(&id).unwrap().progress_fraction();
    assert!((progress - 0.4).abs() < 1e-9, "progress was {progress}");

    let report = ctx.advance(2.0).unwrap();
    assert_eq!(report.transfer_events.len(), 1);
    assert!(matches!(
        &report.transfer_events[0],
        EconomyEvent::TransferCompleted { transfer_id, storage_full: false, .. } if *transfer_id == id
    ));
    assert_eq!(ctx.pool().used(ResourceDimension::Bandwidth), 0.0, "lease released on completion");
    assert_eq!(ctx.pool().used(ResourceDimension::Storage), 100.0);
    assert!(ctx.transfer(&id).is_none(), "finished transfers are dropped");

    // Further frames do not release or store anything again.
    ctx.advance(5.0).unwrap();
    assert_eq!(ctx.pool().used(ResourceDimension::Bandwidth), 0.0);
    assert_eq!(ctx.pool().used(ResourceDimension::Storage), 100.0);
}

#[test]
fn transfer_refused_without_bandwidth() {
    let mut ctx = context();
    ctx.start_transfer(10.0, 80.0).unwrap();

    let err = ctx.start_transfer(10.0, 30.0).unwrap_err();

    assert!(matches!(err, EconomyError::InsufficientResources { bandwidth, .. } if bandwidth == 30.0));
    assert_eq!(ctx.pool().used(ResourceDimension::Bandwidth), 80.0);
}

#[test]
fn invalid_transfer_rejected() {
    let mut ctx = context();
    assert!(ctx.start_transfer(0.0, 10.0).is_err());
    assert!(ctx.start_transfer(10.0, f64::NAN).is_err());
    assert_eq!(ctx.pool().used(ResourceDimension::Bandwidth), 0.0);
}

#[test]
fn cancel_releases_bandwidth_without_storing() {
    let mut ctx = context();
    let id = ctx.start_transfer(100.0, 40.0).unwrap();
    ctx.advance(1.0).unwrap();

    assert!(ctx.cancel_transfer(&id));
    assert!(!ctx.cancel_transfer(&id), "second cancel finds nothing");

    assert_eq!(ctx.pool().used(ResourceDimension::Bandwidth), 0.0);
    assert_eq!(ctx.pool().used(ResourceDimension::Storage), 0.0);
}

#[test]
fn paused_clock_stalls_transfers() {
    let mut ctx = context();
    let id = ctx.start_transfer(100.0, 40.0).unwrap();
    ctx.apply_command(EconomyCommand::Pause).unwrap();

    ctx.advance(10.0).unwrap();
    assert_eq!(ctx.transfer(&id).unwrap().progress_fraction(), 0.0);

    ctx.apply_command(EconomyCommand::Resume).unwrap();
    let report = ctx.advance(3.0).unwrap();
    assert_eq!(report.transfer_events.len(), 1);
}

#[test]
fn time_scale_speeds_up_transfers() {
    let mut ctx = context();
    let id = ctx.start_transfer(100.0, 10.0).unwrap();
    ctx.apply_command(EconomyCommand::SetTimeScale { scale: 5.0 }).unwrap();

    ctx.advance(1.0).unwrap();

    let progress = ctx.transfer(&id).unwrap().progress_fraction();
    assert!((progress - 0.5).abs() < 1e-9, "progress was {progress}");
}

#[test]
fn shutdown_cancels_running_transfers() {
    let mut ctx = context();
    ctx.start_transfer(100.0, 40.0).unwrap();

    let snapshot = ctx.shutdown();

    assert_eq!(snapshot.pool.used(ResourceDimension::Bandwidth), 0.0);
    assert!(matches!(ctx.advance(1.0), Err(EconomyError::ShutDown)));
}

#[test]
fn overflowing_transfer_still_lands() {
    let mut pool = ResourcePool::new(16.0, 8.0, 100.0, 50.0, 50.0);
    let mut transfer = Transfer::start(&mut pool, 80.0, 80.0).unwrap();

    let event = transfer.advance(&mut pool, 1.0);

    assert!(matches!(event, Some(EconomyEvent::TransferCompleted { storage_full: true, .. })));
    assert_eq!(transfer.state(), TransferState::Completed);
    assert_eq!(pool.used(ResourceDimension::Storage), 80.0);
    assert!(pool.is_storage_overflowing());
    assert_eq!(transfer.remaining_seconds(), 0.0);
}
