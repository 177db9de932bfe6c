//! Identity fee subsystem: per-cycle identity upkeep.
//!
//! Execution: identity-fee phase, first in every cycle.
//! The fee is drawn uniformly from the configured range using the
//! handler's deterministic RNG. An unpaid fee is reported, never escalated.

use crate::{
    config::IdentityFeeConfig,
    error::EconomyResult,
    event::EconomyEvent,
    phase::SettlementPhase,
    subsystem::{EconomySubsystem, PhaseContext},
};

const PHASES: [SettlementPhase; 1] = [SettlementPhase::IdentityFee];

pub struct IdentityFeeSubsystem {
    config: IdentityFeeConfig,
    /// Consecutive cycles the fee could not be paid.
    pub unpaid_streak: u32,
}

impl IdentityFeeSubsystem {
    pub fn new(config: IdentityFeeConfig) -> Self {
        Self { config, unpaid_streak: 0 }
    }
}

impl EconomySubsystem for IdentityFeeSubsystem {
    fn name(&self) -> &str { "identity_fee" }

    fn phases(&self) -> &[SettlementPhase] { &PHASES }

    fn settle(&mut self, ctx: &mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> {
        let cycle = ctx.cycle;
        let amount = ctx.rng.range_inclusive(self.config.min_fee, self.config.max_fee);
        if amount <= 0 {
            return Ok(vec![]);
        }

        if ctx.pool.spend(amount) {
            self.unpaid_streak = 0;
            log::info!("cycle={cycle} identity_fee: charged {amount}");
            Ok(vec![EconomyEvent::IdentityFeeCharged { cycle, amount }])
        } else {
            self.unpaid_streak += 1;
            log::warn!(
                "cycle={cycle} identity_fee: could not pay {amount} (balance {}, streak {})",
                ctx.pool.currency(),
                self.unpaid_streak
            );
            Ok(vec![EconomyEvent::IdentityFeeUnpaid {
                cycle,
                amount,
                balance: ctx.pool.currency(),
            }])
        }
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}
