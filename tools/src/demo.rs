//! Demo collaborators for the headless runner.
//!
//! The real catalogs (companies, homes, security plans, jobs) live in the
//! game; these stand-ins exercise every settlement phase.

use economy_core::{
    company_subsystem::CompanyPortfolio,
    housing_subsystem::Housing,
    job_subsystem::JobSpec,
    resource::ResourceDemand,
    rng::HandlerRng,
    security_subsystem::SecurityService,
    types::{Cycle, EntityId, Money, Morale},
};

pub struct DemoPortfolio {
    companies: Vec<(EntityId, Money)>,
}

impl DemoPortfolio {
    pub fn new() -> Self {
        Self {
            companies: vec![
                ("botnet-hosting".into(), 120),
                ("crypto-miner".into(), -40),
            ],
        }
    }
}

impl CompanyPortfolio for DemoPortfolio {
    fn owned(&self) -> Vec<EntityId> {
        self.companies.iter().map(|(id, _)| id.clone()).collect()
    }

    fn settle_income(&mut self, company_id: &str, _cycle: Cycle) -> Money {
        self.companies
            .iter()
            .find(|(id, _)| id == company_id)
            .map(|(_, net)| *net)
            .unwrap_or(0)
    }

    fn loss_unresolved(&mut self, company_id: &str, shortfall: Money, cycle: Cycle) {
        log::warn!("cycle={cycle} demo: {company_id} owes {shortfall}, closing it");
        self.companies.retain(|(id, _)| id != company_id);
    }
}

pub struct DemoHousing {
    pub rent:          Money,
    pub bonus:         Morale,
    pub missed_rents:  u32,
}

impl Housing for DemoHousing {
    fn rent_due(&self) -> Money { self.rent }

    fn morale_bonus(&self) -> Morale {
        if self.missed_rents > 0 { 0 } else { self.bonus }
    }

    fn rent_unpaid(&mut self, cycle: Cycle, amount: Money) {
        self.missed_rents += 1;
        log::warn!("cycle={cycle} demo: missed rent {amount} ({} so far)", self.missed_rents);
    }
}

pub struct DemoSecurity {
    pub plan:         &'static str,
    pub fee:          Money,
    pub defence_rate: f64,
}

impl SecurityService for DemoSecurity {
    fn plan_name(&self) -> String { self.plan.to_string() }

    fn current_fee(&self) -> Money { self.fee }

    fn try_defend(&mut self, rng: &mut HandlerRng) -> bool {
        rng.chance(self.defence_rate)
    }

    fn fee_unpaid(&mut self, cycle: Cycle) {
        log::warn!("cycle={cycle} demo: downgrading {} to free plan", self.plan);
        self.plan = "free";
        self.fee = 0;
        self.defence_rate = 0.2;
    }
}

pub fn starter_job() -> JobSpec {
    JobSpec {
        job_id:         "data-labelling".into(),
        base_salary:    40,
        demand:         ResourceDemand::new(4.0, 2.0, 10.0, 10.0),
        morale_penalty: 1,
    }
}
