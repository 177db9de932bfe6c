//! Subsystem trait and the per-invocation phase context.
//!
//! RULE: Every economic collaborator reaches the pool through an
//! EconomySubsystem registered on the coordinator. It handles at most
//! one invocation per phase per cycle, in registration order.

use crate::{
    clock::ClockState,
    efficiency::EfficiencyModel,
    error::EconomyResult,
    event::EconomyEvent,
    phase::SettlementPhase,
    resource::ResourcePool,
    rng::HandlerRng,
    types::{Cycle, Morale},
};
use std::any::Any;

/// Everything a handler may touch while settling one phase.
pub struct PhaseContext<'a> {
    pub cycle:        Cycle,
    pub phase:        SettlementPhase,
    pub pool:         &'a mut ResourcePool,
    pub efficiency:   &'a EfficiencyModel,
    pub rng:          &'a mut HandlerRng,
    /// Clock fields as of this cycle, for persistence.
    pub clock:        ClockState,
    /// Set once data-generation ran this cycle and storage overflowed.
    pub storage_full: bool,
    morale_delta:     Morale,
}

impl<'a> PhaseContext<'a> {
    pub fn new(
        cycle: Cycle,
        phase: SettlementPhase,
        pool: &'a mut ResourcePool,
        efficiency: &'a EfficiencyModel,
        rng: &'a mut HandlerRng,
        clock: ClockState,
        storage_full: bool,
    ) -> Self {
        Self {
            cycle,
            phase,
            pool,
            efficiency,
            rng,
            clock,
            storage_full,
            morale_delta: 0,
        }
    }

    /// Queue a morale delta. The coordinator sums every contribution of the
    /// morale-change phase and applies it once.
    pub fn contribute_morale(&mut self, delta: Morale) {
        self.morale_delta = self.morale_delta.saturating_add(delta);
    }

    pub fn morale_contribution(&self) -> Morale {
        self.morale_delta
    }
}

/// The contract every settlement collaborator must fulfill.
pub trait EconomySubsystem: Send {
    /// Unique stable name, used in logs and fault reports.
    fn name(&self) -> &str;

    /// The phases this subsystem handles. Each phase at most once.
    fn phases(&self) -> &[SettlementPhase];

    /// Called once per declared phase per cycle.
    ///
    /// Returns the events describing what was settled. An `Err` (or a
    /// panic) is a handler fault: it is logged and recorded, and the
    /// cycle carries on.
    fn settle(&mut self, ctx: &mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>>;

    /// Pool leases this subsystem currently holds. A context refuses to
    /// restore a snapshot while any are outstanding.
    fn active_leases(&self) -> usize { 0 }

    /// For typed access from the host and tests.
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

type PhaseFn = dyn FnMut(&mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> + Send;

/// A closure registered for a single phase through `subscribe`.
pub struct FnSubsystem {
    name:    String,
    phase:   [SettlementPhase; 1],
    handler: Box<PhaseFn>,
}

impl FnSubsystem {
    pub fn new<F>(name: impl Into<String>, phase: SettlementPhase, handler: F) -> Self
    where
        F: FnMut(&mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> + Send + 'static,
    {
        Self {
            name:    name.into(),
            phase:   [phase],
            handler: Box::new(handler),
        }
    }
}

impl EconomySubsystem for FnSubsystem {
    fn name(&self) -> &str { &self.name }

    fn phases(&self) -> &[SettlementPhase] { &self.phase }

    fn settle(&mut self, ctx: &mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> {
        (self.handler)(ctx)
    }

    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }
}
