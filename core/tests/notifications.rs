//! Notification channel tests: delivery order, per-second ticks, isolation.

use economy_core::{
    config::EconomyConfig,
    context::EconomyContext,
    notification::{Notification, NotificationChannel, NotificationFilter},
    phase::SettlementPhase,
};
use std::sync::{Arc, Mutex};

fn context() -> EconomyContext {
    let mut ctx = EconomyContext::new("notify-test".into(), EconomyConfig::default_test()).unwrap();
    ctx.init().unwrap();
    ctx
}

#[test]
fn cycle_notifications_arrive_in_order() {
    let mut ctx = context();
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    ctx.notifications_mut()
        .subscribe(NotificationFilter::All, move |n| sink.lock().unwrap().push(*n));

    ctx.force_cycle_now().unwrap();

    let mut expected = vec![Notification::CycleStart { cycle: 1 }];
    expected.extend(
        SettlementPhase::ALL
            .iter()
            .map(|phase| Notification::Phase { cycle: 1, phase: *phase }),
    );
    expected.push(Notification::CycleEnd { cycle: 1 });
    assert_eq!(*log.lock().unwrap(), expected);
}

#[test]
fn cycle_start_and_end_hooks() {
    let mut ctx = context();
    let starts = Arc::new(Mutex::new(Vec::new()));
    let ends = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&starts);
    ctx.on_cycle_start(move |cycle| s.lock().unwrap().push(cycle));
    let e = Arc::clone(&ends);
    ctx.on_cycle_end(move |cycle| e.lock().unwrap().push(cycle));

    ctx.advance(650.0).unwrap();

    assert_eq!(*starts.lock().unwrap(), vec![1, 2]);
    assert_eq!(*ends.lock().unwrap(), vec![1, 2]);
}

#[test]
fn per_second_tick_reports_remaining_time() {
    let mut ctx = context();
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let t = Arc::clone(&ticks);
    ctx.on_per_second(move |remaining| t.lock().unwrap().push(remaining));

    for _ in 0..4 {
        ctx.advance(0.5).unwrap();
    }

    assert_eq!(*ticks.lock().unwrap(), vec![299, 298]);
}

/// A panicking subscriber does not stop later subscribers.
#[test]
fn panicking_subscriber_is_skipped() {
    let mut channel = NotificationChannel::new();
    let received = Arc::new(Mutex::new(0));

    channel.on_cycle_end(|_| panic!("ui widget gone"));
    let r = Arc::clone(&received);
    channel.on_cycle_end(move |_| *r.lock().unwrap() += 1);

    let delivered = channel.publish(Notification::CycleEnd { cycle: 7 });

    assert_eq!(delivered, 1);
    assert_eq!(*received.lock().unwrap(), 1);
}

#[test]
fn filters_and_unsubscribe() {
    let mut channel = NotificationChannel::new();
    let rent_calls = Arc::new(Mutex::new(0));
    let r = Arc::clone(&rent_calls);
    let id = channel.on_phase(SettlementPhase::Rent, move |_| *r.lock().unwrap() += 1);

    channel.publish(Notification::Phase { cycle: 1, phase: SettlementPhase::JobSalary });
    channel.publish(Notification::Phase { cycle: 1, phase: SettlementPhase::Rent });
    assert_eq!(*rent_calls.lock().unwrap(), 1);

    assert!(channel.unsubscribe(id));
    assert!(!channel.unsubscribe(id));
    channel.publish(Notification::Phase { cycle: 2, phase: SettlementPhase::Rent });
    assert_eq!(*rent_calls.lock().unwrap(), 1);
    assert_eq!(channel.subscriber_count(), 0);
}
