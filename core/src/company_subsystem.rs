//! Company subsystem: applies each owned company's net result for the cycle.
//!
//! Execution: company-income phase.
//! Profit is earned. A loss is absorbed from the balance when it can be
//! covered; otherwise it is soft insolvency: logged, recorded as
//! unresolved, and the balance is left as it was.

use crate::{
    error::EconomyResult,
    event::EconomyEvent,
    phase::SettlementPhase,
    resource::LossOutcome,
    subsystem::{EconomySubsystem, PhaseContext},
    types::{Cycle, EntityId, Money},
};

const PHASES: [SettlementPhase; 1] = [SettlementPhase::CompanyIncome];

/// The host's view of the companies the player owns.
pub trait CompanyPortfolio: Send {
    /// Owned company ids, in settlement order.
    fn owned(&self) -> Vec<EntityId>;

    /// Signed net result of one company for this cycle.
    fn settle_income(&mut self, company_id: &str, cycle: Cycle) -> Money;

    /// Told when a loss could not be covered.
    fn loss_unresolved(&mut self, _company_id: &str, _shortfall: Money, _cycle: Cycle) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLoss {
    pub cycle:      Cycle,
    pub company_id: EntityId,
    pub amount:     Money,
    pub shortfall:  Money,
}

pub struct CompanySubsystem<C: CompanyPortfolio> {
    pub portfolio: C,
    unresolved:    Vec<UnresolvedLoss>,
}

impl<C: CompanyPortfolio> CompanySubsystem<C> {
    pub fn new(portfolio: C) -> Self {
        Self { portfolio, unresolved: Vec::new() }
    }

    /// Every loss that could not be covered so far.
    pub fn unresolved_losses(&self) -> &[UnresolvedLoss] {
        &self.unresolved
    }
}

impl<C: CompanyPortfolio + 'static> EconomySubsystem for CompanySubsystem<C> {
    fn name(&self) -> &str { "companies" }

    fn phases(&self) -> &[SettlementPhase] { &PHASES }

    fn settle(&mut self, ctx: &mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> {
        let cycle = ctx.cycle;
        let mut events = Vec::new();

        for company_id in self.portfolio.owned() {
            let net = self.portfolio.settle_income(&company_id, cycle);
            if net >= 0 {
                ctx.pool.earn(net);
                events.push(EconomyEvent::CompanyIncome { cycle, company_id, amount: net });
                continue;
            }

            let loss = net.saturating_neg();
            match ctx.pool.absorb_loss(loss) {
                LossOutcome::Covered => {
                    log::info!("cycle={cycle} companies: {company_id} lost {loss}");
                    events.push(EconomyEvent::CompanyLoss { cycle, company_id, amount: loss });
                }
                LossOutcome::Unresolved { shortfall } => {
                    log::warn!(
                        "cycle={cycle} companies: {company_id} loss {loss} unresolved \
                         (balance {}, shortfall {shortfall})",
                        ctx.pool.currency()
                    );
                    self.portfolio.loss_unresolved(&company_id, shortfall, cycle);
                    self.unresolved.push(UnresolvedLoss {
                        cycle,
                        company_id: company_id.clone(),
                        amount: loss,
                        shortfall,
                    });
                    events.push(EconomyEvent::CompanyLossUnresolved {
                        cycle,
                        company_id,
                        amount: loss,
                        shortfall,
                    });
                }
            }
        }
        Ok(events)
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}
