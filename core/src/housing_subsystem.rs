//! Housing subsystem: rent and the home's morale effect.
//!
//! Execution:
//!   - rent:          rent due is spent; an unpaid rent is signalled to the
//!                    housing collaborator, which owns eviction policy.
//!   - morale-change: the home's morale bonus (housing, pets) is contributed.

use crate::{
    error::EconomyResult,
    event::EconomyEvent,
    phase::SettlementPhase,
    subsystem::{EconomySubsystem, PhaseContext},
    types::{Cycle, Money, Morale},
};

const PHASES: [SettlementPhase; 2] = [SettlementPhase::Rent, SettlementPhase::MoraleChange];

pub trait Housing: Send {
    fn rent_due(&self) -> Money;
    fn morale_bonus(&self) -> Morale;
    /// Called when this cycle's rent could not be paid.
    fn rent_unpaid(&mut self, cycle: Cycle, amount: Money);
}

pub struct HousingSubsystem<H: Housing> {
    pub housing: H,
}

impl<H: Housing> HousingSubsystem<H> {
    pub fn new(housing: H) -> Self {
        Self { housing }
    }
}

impl<H: Housing + 'static> EconomySubsystem for HousingSubsystem<H> {
    fn name(&self) -> &str { "housing" }

    fn phases(&self) -> &[SettlementPhase] { &PHASES }

    fn settle(&mut self, ctx: &mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> {
        let cycle = ctx.cycle;
        match ctx.phase {
            SettlementPhase::Rent => {
                let amount = self.housing.rent_due();
                if amount <= 0 {
                    return Ok(vec![]);
                }
                if ctx.pool.spend(amount) {
                    log::info!("cycle={cycle} housing: rent {amount} paid");
                    Ok(vec![EconomyEvent::RentPaid { cycle, amount }])
                } else {
                    let balance = ctx.pool.currency();
                    log::warn!("cycle={cycle} housing: could not pay rent {amount} (balance {balance})");
                    self.housing.rent_unpaid(cycle, amount);
                    Ok(vec![EconomyEvent::RentUnpaid { cycle, amount, balance }])
                }
            }
            SettlementPhase::MoraleChange => {
                ctx.contribute_morale(self.housing.morale_bonus());
                Ok(vec![])
            }
            _ => Ok(vec![]),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}
