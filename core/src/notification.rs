//! Notification channel: ordered delivery of cycle lifecycle signals.
//!
//! Subscribers are called in subscription order. A subscriber that panics
//! is logged and skipped; later subscribers still receive the signal.

use crate::{phase::SettlementPhase, types::Cycle};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    CycleStart { cycle: Cycle },
    Phase { cycle: Cycle, phase: SettlementPhase },
    CycleEnd { cycle: Cycle },
    PerSecondTick { remaining_seconds: u64 },
}

/// Which notifications a subscriber wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationFilter {
    All,
    CycleStart,
    Phase(SettlementPhase),
    CycleEnd,
    PerSecond,
}

impl NotificationFilter {
    fn matches(&self, notification: &Notification) -> bool {
        match (self, notification) {
            (Self::All, _) => true,
            (Self::CycleStart, Notification::CycleStart { .. }) => true,
            (Self::Phase(want), Notification::Phase { phase, .. }) => want == phase,
            (Self::CycleEnd, Notification::CycleEnd { .. }) => true,
            (Self::PerSecond, Notification::PerSecondTick { .. }) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&Notification) + Send>;

struct Subscriber {
    id:       SubscriptionId,
    filter:   NotificationFilter,
    callback: Callback,
}

#[derive(Default)]
pub struct NotificationChannel {
    subscribers: Vec<Subscriber>,
    next_id:     u64,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, filter: NotificationFilter, callback: F) -> SubscriptionId
    where
        F: FnMut(&Notification) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, filter, callback: Box::new(callback) });
        id
    }

    pub fn on_cycle_start<F>(&mut self, mut handler: F) -> SubscriptionId
    where
        F: FnMut(Cycle) + Send + 'static,
    {
        self.subscribe(NotificationFilter::CycleStart, move |n| {
            if let Notification::CycleStart { cycle } = n {
                handler(*cycle);
            }
        })
    }

    pub fn on_cycle_end<F>(&mut self, mut handler: F) -> SubscriptionId
    where
        F: FnMut(Cycle) + Send + 'static,
    {
        self.subscribe(NotificationFilter::CycleEnd, move |n| {
            if let Notification::CycleEnd { cycle } = n {
                handler(*cycle);
            }
        })
    }

    pub fn on_phase<F>(&mut self, phase: SettlementPhase, mut handler: F) -> SubscriptionId
    where
        F: FnMut(Cycle) + Send + 'static,
    {
        self.subscribe(NotificationFilter::Phase(phase), move |n| {
            if let Notification::Phase { cycle, .. } = n {
                handler(*cycle);
            }
        })
    }

    pub fn on_per_second<F>(&mut self, mut handler: F) -> SubscriptionId
    where
        F: FnMut(u64) + Send + 'static,
    {
        self.subscribe(NotificationFilter::PerSecond, move |n| {
            if let Notification::PerSecondTick { remaining_seconds } = n {
                handler(*remaining_seconds);
            }
        })
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver to every matching subscriber in order.
    /// Returns how many subscribers received it without panicking.
    pub fn publish(&mut self, notification: Notification) -> usize {
        let mut delivered = 0;
        for sub in self.subscribers.iter_mut() {
            if !sub.filter.matches(&notification) {
                continue;
            }
            let callback = &mut sub.callback;
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&notification))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    log::error!(
                        "notification: subscriber {:?} panicked on {notification:?}: {}",
                        sub.id,
                        panic_message(&*payload)
                    );
                }
            }
        }
        delivered
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
