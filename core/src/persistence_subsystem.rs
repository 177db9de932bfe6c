//! Persistence subsystem: hands finalized state to a snapshot sink.
//!
//! Execution: persistence-sync phase, last in every cycle.
//! A sink error is a handler fault like any other: logged and recorded,
//! and the next cycle simply tries again.

use crate::{
    error::EconomyResult,
    event::EconomyEvent,
    phase::SettlementPhase,
    snapshot::{EconomySnapshot, SnapshotSink},
    subsystem::{EconomySubsystem, PhaseContext},
    types::{Cycle, SessionId},
};

const PHASES: [SettlementPhase; 1] = [SettlementPhase::PersistenceSync];

pub struct PersistenceSubsystem<P: SnapshotSink> {
    session_id: SessionId,
    /// Save every `every` cycles.
    every:      Cycle,
    pub sink:   P,
    pub saved:  u64,
}

impl<P: SnapshotSink> PersistenceSubsystem<P> {
    pub fn new(session_id: SessionId, sink: P) -> Self {
        Self { session_id, every: 1, sink, saved: 0 }
    }

    pub fn every(mut self, cycles: Cycle) -> Self {
        self.every = cycles.max(1);
        self
    }
}

impl<P: SnapshotSink + 'static> EconomySubsystem for PersistenceSubsystem<P> {
    fn name(&self) -> &str { "persistence" }

    fn phases(&self) -> &[SettlementPhase] { &PHASES }

    fn settle(&mut self, ctx: &mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> {
        if ctx.cycle % self.every != 0 {
            return Ok(vec![]);
        }
        let snapshot = EconomySnapshot {
            session_id: self.session_id.clone(),
            cycle:      ctx.cycle,
            pool:       ctx.pool.clone(),
            clock:      ctx.clock.clone(),
        };
        self.sink.save_snapshot(&snapshot)?;
        self.saved += 1;
        log::debug!("cycle={} persistence: snapshot saved", ctx.cycle);
        Ok(vec![])
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}
