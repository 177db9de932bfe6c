//! Settlement coordinator: runs the nine phases of one cycle.
//!
//! RULES:
//!   - Phases run in `SettlementPhase::ALL` order, every cycle.
//!   - Within a phase, handlers run in registration order.
//!   - A handler that returns `Err` or panics is a fault: it is logged,
//!     recorded in the report, and the next handler runs anyway.
//!   - data-generation and morale-change each touch the pool exactly once
//!     on behalf of the coordinator; every other mutation is a handler's.

use crate::{
    clock::ClockState,
    efficiency::EfficiencyModel,
    error::{EconomyError, EconomyResult},
    event::EconomyEvent,
    notification::{panic_message, Notification, NotificationChannel},
    phase::SettlementPhase,
    resource::{ResourceDimension, ResourcePool},
    rng::RngBank,
    subsystem::{EconomySubsystem, FnSubsystem, PhaseContext},
    types::Cycle,
};
use std::panic::{self, AssertUnwindSafe};

/// A fault caught at the dispatch boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerFault {
    pub phase:   SettlementPhase,
    pub handler: String,
    pub message: String,
}

impl From<HandlerFault> for EconomyError {
    fn from(f: HandlerFault) -> Self {
        EconomyError::HandlerFault { phase: f.phase, handler: f.handler, message: f.message }
    }
}

/// An event tagged with the subsystem that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedEvent {
    pub source: String,
    pub event:  EconomyEvent,
}

/// Everything that happened in one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle:            Cycle,
    pub events:           Vec<SourcedEvent>,
    pub phases_completed: Vec<SettlementPhase>,
    pub faults:           Vec<HandlerFault>,
    pub storage_full:     bool,
}

impl CycleReport {
    pub fn events(&self) -> impl Iterator<Item = &EconomyEvent> {
        self.events.iter().map(|e| &e.event)
    }

    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// The first fault as an error, for hosts that treat faults as fatal.
    pub fn ensure_clean(&self) -> EconomyResult<()> {
        match self.faults.first() {
            Some(fault) => Err(fault.clone().into()),
            None => Ok(()),
        }
    }
}

/// Borrowed state one cycle settles against.
pub struct SettlementInputs<'a> {
    pub pool:          &'a mut ResourcePool,
    pub efficiency:    &'a EfficiencyModel,
    pub rng_bank:      &'a RngBank,
    pub notifications: &'a mut NotificationChannel,
    pub clock:         ClockState,
}

#[derive(Default)]
pub struct SettlementCoordinator {
    subsystems: Vec<Box<dyn EconomySubsystem>>,
}

impl SettlementCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsystem. Call in the intended execution order.
    pub fn register(&mut self, subsystem: Box<dyn EconomySubsystem>) -> EconomyResult<()> {
        let phases = subsystem.phases();
        for (i, phase) in phases.iter().enumerate() {
            let repeated = phases[..i].contains(phase);
            let taken = self
                .subsystems
                .iter()
                .any(|s| s.name() == subsystem.name() && s.phases().contains(phase));
            if repeated || taken {
                return Err(EconomyError::DuplicateHandler {
                    subsystem: subsystem.name().to_string(),
                    phase: *phase,
                });
            }
        }
        log::debug!(
            "settlement: registered '{}' for {:?}",
            subsystem.name(),
            subsystem.phases()
        );
        self.subsystems.push(subsystem);
        Ok(())
    }

    /// Register a closure as the handler `name` for one phase.
    pub fn subscribe<F>(&mut self, phase: SettlementPhase, name: &str, handler: F) -> EconomyResult<()>
    where
        F: FnMut(&mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> + Send + 'static,
    {
        self.register(Box::new(FnSubsystem::new(name, phase, handler)))
    }

    pub fn handler_count(&self, phase: SettlementPhase) -> usize {
        self.subsystems.iter().filter(|s| s.phases().contains(&phase)).count()
    }

    /// Leases held across every registered subsystem.
    pub fn active_leases(&self) -> usize {
        self.subsystems.iter().map(|s| s.active_leases()).sum()
    }

    pub fn subsystem<T: 'static>(&self) -> Option<&T> {
        self.subsystems.iter().find_map(|s| s.as_any().downcast_ref::<T>())
    }

    pub fn subsystem_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.subsystems.iter_mut().find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Run one full cycle: cycle-start, nine phases, cycle-end.
    pub fn run_cycle(&mut self, cycle: Cycle, inputs: SettlementInputs<'_>) -> CycleReport {
        let SettlementInputs { pool, efficiency, rng_bank, notifications, clock } = inputs;
        let mut report = CycleReport { cycle, ..CycleReport::default() };

        log::info!("cycle={cycle} settlement: start (currency={})", pool.currency());
        notifications.publish(Notification::CycleStart { cycle });
        record(&mut report, "engine", EconomyEvent::CycleStarted { cycle });

        for phase in SettlementPhase::ALL {
            notifications.publish(Notification::Phase { cycle, phase });
            self.run_phase(cycle, phase, pool, efficiency, rng_bank, &clock, &mut report);
            report.phases_completed.push(phase);
        }

        record(
            &mut report,
            "engine",
            EconomyEvent::CycleCompleted { cycle, currency: pool.currency(), morale: pool.morale() },
        );
        notifications.publish(Notification::CycleEnd { cycle });
        log::info!(
            "cycle={cycle} settlement: end (currency={} morale={} faults={})",
            pool.currency(),
            pool.morale(),
            report.faults.len()
        );
        report
    }

    fn run_phase(
        &mut self,
        cycle: Cycle,
        phase: SettlementPhase,
        pool: &mut ResourcePool,
        efficiency: &EfficiencyModel,
        rng_bank: &RngBank,
        clock: &ClockState,
        report: &mut CycleReport,
    ) {
        match phase {
            SettlementPhase::DataGeneration => {
                let rate = pool.data_generation_rate();
                let fits = pool.generate_data(rate);
                report.storage_full = !fits;
                if rate > 0.0 || !fits {
                    if !fits {
                        log::warn!(
                            "cycle={cycle} data-generation: storage full ({:.1}/{:.1})",
                            pool.used(ResourceDimension::Storage),
                            pool.total(ResourceDimension::Storage)
                        );
                    }
                    record(report, "engine", EconomyEvent::DataGenerated {
                        cycle,
                        amount: rate,
                        storage_used: pool.used(ResourceDimension::Storage),
                        storage_full: !fits,
                    });
                }
            }
            SettlementPhase::PersistenceSync => {
                record(report, "engine", EconomyEvent::StateFinalized { cycle });
            }
            _ => {}
        }

        let mut handlers_run = 0;
        let mut faults = 0;
        let mut morale_total: i32 = 0;

        for (registration, subsystem) in self.subsystems.iter_mut().enumerate() {
            if !subsystem.phases().contains(&phase) {
                continue;
            }
            handlers_run += 1;
            let mut rng = rng_bank.for_handler(phase, cycle, registration);
            let mut ctx = PhaseContext::new(
                cycle,
                phase,
                pool,
                efficiency,
                &mut rng,
                clock.clone(),
                report.storage_full,
            );

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| subsystem.settle(&mut ctx)));
            let contribution = ctx.morale_contribution();
            let message = match outcome {
                Ok(Ok(events)) => {
                    if phase == SettlementPhase::MoraleChange {
                        morale_total = morale_total.saturating_add(contribution);
                    } else if contribution != 0 {
                        log::warn!(
                            "cycle={cycle} {phase}: '{}' contributed morale {contribution:+} \
                             outside morale-change, ignored",
                            subsystem.name()
                        );
                    }
                    for event in events {
                        record(report, subsystem.name(), event);
                    }
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(payload) => format!("panic: {}", panic_message(&*payload)),
            };

            faults += 1;
            log::error!("cycle={cycle} {phase}: handler '{}' faulted: {message}", subsystem.name());
            record(report, "engine", EconomyEvent::HandlerFaulted {
                cycle,
                phase,
                handler: subsystem.name().to_string(),
                message: message.clone(),
            });
            report.faults.push(HandlerFault {
                phase,
                handler: subsystem.name().to_string(),
                message,
            });
        }

        if phase == SettlementPhase::MoraleChange && morale_total != 0 {
            pool.change_morale(morale_total);
            log::info!("cycle={cycle} morale-change: {morale_total:+} -> {}", pool.morale());
            record(report, "engine", EconomyEvent::MoraleChanged {
                cycle,
                delta: morale_total,
                morale: pool.morale(),
            });
        }

        log::debug!("cycle={cycle} {phase}: {handlers_run} handler(s), {faults} fault(s)");
        record(report, "engine", EconomyEvent::PhaseCompleted { cycle, phase, handlers_run, faults });
    }
}

fn record(report: &mut CycleReport, source: &str, event: EconomyEvent) {
    report.events.push(SourcedEvent { source: source.to_string(), event });
}
