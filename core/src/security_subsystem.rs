//! Security subsystem: plan fee and intrusion checks.
//!
//! Execution:
//!   - security-fee:       the active plan's fee is spent. If it cannot be
//!                         paid the collaborator is told and downgrades itself.
//!   - random-event-check: an intrusion attempt fires with the configured
//!                         probability; an undefended one costs a share of
//!                         the balance and some morale.

use crate::{
    config::IntrusionConfig,
    error::EconomyResult,
    event::EconomyEvent,
    phase::SettlementPhase,
    resource::LossOutcome,
    rng::HandlerRng,
    subsystem::{EconomySubsystem, PhaseContext},
    types::{Cycle, Money},
};

const PHASES: [SettlementPhase; 2] =
    [SettlementPhase::SecurityFee, SettlementPhase::RandomEventCheck];

pub trait SecurityService: Send {
    fn plan_name(&self) -> String;
    fn current_fee(&self) -> Money;
    /// Roll the active plan's defence against one intrusion attempt.
    fn try_defend(&mut self, rng: &mut HandlerRng) -> bool;
    /// Called when the plan fee could not be paid this cycle.
    fn fee_unpaid(&mut self, cycle: Cycle);
}

pub struct SecuritySubsystem<S: SecurityService> {
    pub service: S,
    intrusion:   IntrusionConfig,
}

impl<S: SecurityService> SecuritySubsystem<S> {
    pub fn new(service: S, intrusion: IntrusionConfig) -> Self {
        Self { service, intrusion }
    }

    fn charge_fee(&mut self, ctx: &mut PhaseContext<'_>) -> Vec<EconomyEvent> {
        let cycle = ctx.cycle;
        let amount = self.service.current_fee();
        if amount <= 0 {
            return vec![];
        }
        let plan = self.service.plan_name();
        if ctx.pool.spend(amount) {
            log::info!("cycle={cycle} security: {plan} fee {amount} paid");
            vec![EconomyEvent::SecurityFeePaid { cycle, plan, amount }]
        } else {
            log::warn!("cycle={cycle} security: could not pay {plan} fee {amount}");
            self.service.fee_unpaid(cycle);
            vec![EconomyEvent::SecurityFeeUnpaid { cycle, plan, amount }]
        }
    }

    fn check_intrusion(&mut self, ctx: &mut PhaseContext<'_>) -> Vec<EconomyEvent> {
        let cycle = ctx.cycle;
        if !ctx.rng.chance(self.intrusion.base_probability) {
            return vec![];
        }
        if self.service.try_defend(ctx.rng) {
            log::info!("cycle={cycle} security: intrusion defended");
            return vec![EconomyEvent::IntrusionDefended { cycle }];
        }

        let loss = (ctx.pool.currency() as f64 * self.intrusion.loss_percent / 100.0).floor() as Money;
        let currency_lost = match ctx.pool.absorb_loss(loss) {
            LossOutcome::Covered => loss,
            LossOutcome::Unresolved { .. } => 0,
        };
        let morale_lost = self.intrusion.morale_penalty;
        ctx.pool.change_morale(morale_lost.saturating_neg());
        log::warn!("cycle={cycle} security: intrusion succeeded, lost {currency_lost} and {morale_lost} morale");
        vec![EconomyEvent::IntrusionSucceeded { cycle, currency_lost, morale_lost }]
    }
}

impl<S: SecurityService + 'static> EconomySubsystem for SecuritySubsystem<S> {
    fn name(&self) -> &str { "security" }

    fn phases(&self) -> &[SettlementPhase] { &PHASES }

    fn settle(&mut self, ctx: &mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> {
        match ctx.phase {
            SettlementPhase::SecurityFee => Ok(self.charge_fee(ctx)),
            SettlementPhase::RandomEventCheck => Ok(self.check_intrusion(ctx)),
            _ => Ok(vec![]),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}
