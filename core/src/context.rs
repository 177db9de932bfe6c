//! The economy context: the one object the host owns and drives.
//!
//! LIFECYCLE:
//!   new()/build() → init() → advance(dt) every frame … → shutdown()
//!
//! RULES:
//!   - Single-threaded. A multi-threaded host funnels every call through
//!     one writer; the context holds no locks.
//!   - A cycle started by `advance` always runs all nine phases before
//!     `advance` returns. Pausing never interrupts a cycle.
//!   - All randomness flows through the RngBank.

use crate::{
    clock::{ClockState, TickClock},
    command::EconomyCommand,
    config::EconomyConfig,
    efficiency::EfficiencyModel,
    error::{EconomyError, EconomyResult},
    event::EconomyEvent,
    identity_fee_subsystem::IdentityFeeSubsystem,
    job_subsystem::JobBoard,
    notification::{Notification, NotificationChannel, SubscriptionId},
    phase::SettlementPhase,
    resource::ResourcePool,
    rng::RngBank,
    settlement::{CycleReport, SettlementCoordinator, SettlementInputs},
    snapshot::EconomySnapshot,
    subsystem::{EconomySubsystem, PhaseContext},
    transfer::Transfer,
    types::{Cycle, EntityId, SessionId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    ShutDown,
}

/// What one `advance` call produced.
#[derive(Debug, Clone, Default)]
pub struct AdvanceReport {
    /// One report per cycle fired, oldest first.
    pub cycles:            Vec<CycleReport>,
    /// Set when a per-second notification went out.
    pub remaining_seconds: Option<u64>,
    /// Completion events of transfers that finished this frame.
    pub transfer_events:   Vec<EconomyEvent>,
}

pub struct EconomyContext {
    pub session_id: SessionId,
    pub efficiency: EfficiencyModel,
    pool:           ResourcePool,
    clock:          TickClock,
    config:         EconomyConfig,
    rng_bank:       RngBank,
    coordinator:    SettlementCoordinator,
    notifications:  NotificationChannel,
    transfers:      Vec<Transfer>,
    lifecycle:      Lifecycle,
}

impl EconomyContext {
    pub fn new(session_id: SessionId, config: EconomyConfig) -> EconomyResult<Self> {
        config.validate()?;
        Ok(Self {
            pool:          ResourcePool::from_config(&config.pool),
            clock:         TickClock::from_config(&config.clock)?,
            efficiency:    EfficiencyModel::new(&config.efficiency),
            rng_bank:      RngBank::new(config.seed),
            coordinator:   SettlementCoordinator::new(),
            notifications: NotificationChannel::new(),
            transfers:     Vec::new(),
            lifecycle:     Lifecycle::Created,
            config,
            session_id,
        })
    }

    /// Build a context with the subsystems that need no host collaborator:
    /// identity fee and the job board. Host collaborators (companies,
    /// housing, security, persistence) are registered on top.
    pub fn build(session_id: SessionId, config: EconomyConfig) -> EconomyResult<Self> {
        let mut ctx = Self::new(session_id, config)?;
        let identity = IdentityFeeSubsystem::new(ctx.config.identity_fee.clone());
        ctx.register(Box::new(identity))?;
        ctx.register(Box::new(JobBoard::new()))?;
        Ok(ctx)
    }

    /// Deterministic test context: `EconomyConfig::default_test()`.
    pub fn build_test(session_id: SessionId) -> EconomyResult<Self> {
        Self::build(session_id, EconomyConfig::default_test())
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// The pool, for host actions outside settlement. Changes still go
    /// through the pool's own operations.
    pub fn pool_mut(&mut self) -> &mut ResourcePool {
        &mut self.pool
    }

    /// Read-only clock. Control goes through `apply_command`.
    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    // ── Lifecycle ──────────────────────────────────────────────

    pub fn init(&mut self) -> EconomyResult<()> {
        match self.lifecycle {
            Lifecycle::ShutDown => Err(EconomyError::ShutDown),
            Lifecycle::Running => Ok(()),
            Lifecycle::Created => {
                self.lifecycle = Lifecycle::Running;
                log::info!(
                    "session={} economy: init (interval={}s, seed={})",
                    self.session_id,
                    self.clock.interval_seconds(),
                    self.rng_bank.master_seed()
                );
                Ok(())
            }
        }
    }

    /// Advance by one frame's real elapsed seconds.
    pub fn advance(&mut self, delta_seconds: f64) -> EconomyResult<AdvanceReport> {
        self.ensure_running()?;

        let Self { clock, coordinator, pool, efficiency, rng_bank, notifications, .. } = self;
        let mut report = AdvanceReport::default();
        let clock_advance = clock.advance(delta_seconds, |state| {
            let cycle = state.total_cycles_completed;
            let inputs = SettlementInputs {
                pool: &mut *pool,
                efficiency: &*efficiency,
                rng_bank: &*rng_bank,
                notifications: &mut *notifications,
                clock: state.clone(),
            };
            report.cycles.push(coordinator.run_cycle(cycle, inputs));
        });

        if let Some(remaining_seconds) = clock_advance.per_second {
            self.notifications.publish(Notification::PerSecondTick { remaining_seconds });
            report.remaining_seconds = Some(remaining_seconds);
        }

        if !self.clock.is_paused() && self.clock.is_enabled() && delta_seconds.is_finite() {
            let scaled = delta_seconds * self.clock.time_scale();
            report.transfer_events = self.advance_transfers(scaled);
        }
        Ok(report)
    }

    /// Run a cycle now without consuming accumulated time. Testing hook.
    pub fn force_cycle_now(&mut self) -> EconomyResult<CycleReport> {
        self.ensure_running()?;
        let cycle = self.clock.force_cycle();
        log::info!("cycle={cycle} economy: forced cycle");
        Ok(self.run_cycle(cycle, self.clock.state()))
    }

    /// Stop the session. Running transfers are cancelled and their
    /// bandwidth released. Returns the final state for persistence.
    pub fn shutdown(&mut self) -> EconomySnapshot {
        if self.lifecycle != Lifecycle::ShutDown {
            for transfer in self.transfers.iter_mut() {
                transfer.cancel(&mut self.pool);
            }
            self.transfers.clear();
            self.lifecycle = Lifecycle::ShutDown;
            log::info!(
                "session={} economy: shutdown after {} cycle(s)",
                self.session_id,
                self.clock.total_cycles_completed()
            );
        }
        self.snapshot()
    }

    fn ensure_running(&self) -> EconomyResult<()> {
        match self.lifecycle {
            Lifecycle::Running => Ok(()),
            Lifecycle::Created => Err(EconomyError::NotInitialized),
            Lifecycle::ShutDown => Err(EconomyError::ShutDown),
        }
    }

    fn run_cycle(&mut self, cycle: Cycle, clock: ClockState) -> CycleReport {
        let inputs = SettlementInputs {
            pool: &mut self.pool,
            efficiency: &self.efficiency,
            rng_bank: &self.rng_bank,
            notifications: &mut self.notifications,
            clock,
        };
        self.coordinator.run_cycle(cycle, inputs)
    }

    // ── Registration ───────────────────────────────────────────

    /// Register a subsystem. Call in the intended execution order.
    pub fn register(&mut self, subsystem: Box<dyn EconomySubsystem>) -> EconomyResult<()> {
        self.coordinator.register(subsystem)
    }

    /// Register a closure as handler `name` for one phase.
    pub fn subscribe<F>(&mut self, phase: SettlementPhase, name: &str, handler: F) -> EconomyResult<()>
    where
        F: FnMut(&mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> + Send + 'static,
    {
        self.coordinator.subscribe(phase, name, handler)
    }

    pub fn on_cycle_start<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(Cycle) + Send + 'static,
    {
        self.notifications.on_cycle_start(handler)
    }

    pub fn on_cycle_end<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(Cycle) + Send + 'static,
    {
        self.notifications.on_cycle_end(handler)
    }

    pub fn on_per_second<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(u64) + Send + 'static,
    {
        self.notifications.on_per_second(handler)
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationChannel {
        &mut self.notifications
    }

    pub fn subsystem<T: 'static>(&self) -> Option<&T> {
        self.coordinator.subsystem::<T>()
    }

    pub fn subsystem_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.coordinator.subsystem_mut::<T>()
    }

    /// A registered subsystem together with the pool, for host actions
    /// such as starting a job.
    pub fn subsystem_with_pool<T: 'static>(&mut self) -> Option<(&mut T, &mut ResourcePool)> {
        let sub = self.coordinator.subsystem_mut::<T>()?;
        Some((sub, &mut self.pool))
    }

    pub fn handler_count(&self, phase: SettlementPhase) -> usize {
        self.coordinator.handler_count(phase)
    }

    // ── Transfers ──────────────────────────────────────────────

    pub fn start_transfer(&mut self, size: f64, bandwidth: f64) -> EconomyResult<EntityId> {
        let transfer = Transfer::start(&mut self.pool, size, bandwidth)?;
        let id = transfer.transfer_id.clone();
        self.transfers.push(transfer);
        Ok(id)
    }

    /// A running transfer. Finished transfers are dropped once reported.
    pub fn transfer(&self, transfer_id: &str) -> Option<&Transfer> {
        self.transfers.iter().find(|t| t.transfer_id == transfer_id)
    }

    pub fn cancel_transfer(&mut self, transfer_id: &str) -> bool {
        let Some(idx) = self.transfers.iter().position(|t| t.transfer_id == transfer_id) else {
            return false;
        };
        let mut transfer = self.transfers.remove(idx);
        transfer.cancel(&mut self.pool);
        true
    }

    fn advance_transfers(&mut self, elapsed_seconds: f64) -> Vec<EconomyEvent> {
        let mut events = Vec::new();
        for transfer in self.transfers.iter_mut() {
            if let Some(event) = transfer.advance(&mut self.pool, elapsed_seconds) {
                events.push(event);
            }
        }
        self.transfers.retain(|t| !t.is_finished());
        events
    }

    // ── Commands ───────────────────────────────────────────────

    /// Apply a host command. `ForceCycle` yields the cycle's report.
    pub fn apply_command(&mut self, command: EconomyCommand) -> EconomyResult<Option<CycleReport>> {
        log::debug!("session={} economy: command {command:?}", self.session_id);
        match command {
            EconomyCommand::Pause => self.clock.pause(),
            EconomyCommand::Resume => self.clock.resume(),
            EconomyCommand::SetTimeScale { scale } => self.clock.set_time_scale(scale),
            EconomyCommand::SetEnabled { enabled } => self.clock.set_enabled(enabled),
            EconomyCommand::SetDebugInterval { debug } => {
                self.config.clock.debug = debug;
                let interval = self.config.clock.effective_interval();
                if !self.clock.set_interval(interval) {
                    return Err(EconomyError::InvalidConfig {
                        field: "clock.interval_seconds",
                        reason: format!("{interval} must be finite and > 0"),
                    });
                }
            }
            EconomyCommand::ForceCycle => return self.force_cycle_now().map(Some),
            EconomyCommand::Reset => self.clock.reset(),
            EconomyCommand::CleanData { amount } => self.pool.clean_data(amount),
            EconomyCommand::UpgradeCapacity { dimension, amount } => {
                self.pool.upgrade_capacity(dimension, amount)
            }
            EconomyCommand::SetDataGenerationRate { rate } => self.pool.set_data_generation_rate(rate),
        }
        Ok(None)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn snapshot(&self) -> EconomySnapshot {
        EconomySnapshot {
            session_id: self.session_id.clone(),
            cycle:      self.clock.total_cycles_completed(),
            pool:       self.pool.clone(),
            clock:      self.clock.state(),
        }
    }

    /// Replace pool and clock state with a persisted snapshot.
    ///
    /// Refused while transfers or jobs hold leases: their releases would
    /// land on a ledger that never granted them. The snapshot's pool is
    /// validated before it becomes live state.
    pub fn restore(&mut self, snapshot: &EconomySnapshot) -> EconomyResult<()> {
        let transfers = self.transfers.len();
        let jobs = self.coordinator.active_leases();
        if transfers > 0 || jobs > 0 {
            return Err(EconomyError::LeasesOutstanding { transfers, jobs });
        }
        snapshot.pool.validate()?;

        self.pool = snapshot.pool.clone();
        self.clock.restore(&snapshot.clock);
        log::info!(
            "session={} economy: restored cycle {} from session {}",
            self.session_id,
            snapshot.cycle,
            snapshot.session_id
        );
        Ok(())
    }
}
