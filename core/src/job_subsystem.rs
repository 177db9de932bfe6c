//! Job board: active job instances, their resource leases and salaries.
//!
//! Execution:
//!   - job-salary:    every active instance is paid its efficiency-scaled salary.
//!   - morale-change: every active instance contributes its work penalty.
//!
//! Starting a job leases its memory/cpu/bandwidth/computing demand from the
//! pool; a job that does not fit is refused and nothing is leased.
//! The job catalog itself belongs to the host.

use crate::{
    efficiency::EfficiencyModel,
    error::{EconomyError, EconomyResult},
    event::EconomyEvent,
    phase::SettlementPhase,
    resource::{ResourceDemand, ResourcePool},
    subsystem::{EconomySubsystem, PhaseContext},
    types::{Cycle, EntityId, Money, Morale},
};
use serde::{Deserialize, Serialize};

const PHASES: [SettlementPhase; 2] = [SettlementPhase::JobSalary, SettlementPhase::MoraleChange];

/// One row of the host's job catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSpec {
    pub job_id:         EntityId,
    pub base_salary:    Money,
    pub demand:         ResourceDemand,
    /// Morale lost per cycle while the job runs.
    #[serde(default)]
    pub morale_penalty: Morale,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobInstance {
    pub instance_id:   EntityId,
    pub job:           JobSpec,
    pub started_cycle: Cycle,
    pub cycles_worked: u64,
    pub total_earned:  Money,
}

/// How a job instance's salary is computed.
pub trait SalaryPolicy: Send {
    fn compute_salary(
        &self,
        job: &JobSpec,
        instance: &JobInstance,
        pool: &ResourcePool,
        efficiency: &EfficiencyModel,
    ) -> Money;
}

/// Base salary scaled by the pool's efficiency multiplier.
#[derive(Debug, Clone, Copy, Default)]
pub struct EfficiencySalary;

impl SalaryPolicy for EfficiencySalary {
    fn compute_salary(
        &self,
        job: &JobSpec,
        _instance: &JobInstance,
        pool: &ResourcePool,
        efficiency: &EfficiencyModel,
    ) -> Money {
        efficiency.actual_income(job.base_salary, pool)
    }
}

pub struct JobBoard<P: SalaryPolicy = EfficiencySalary> {
    policy: P,
    active: Vec<JobInstance>,
}

impl JobBoard<EfficiencySalary> {
    pub fn new() -> Self {
        Self::with_policy(EfficiencySalary)
    }
}

impl Default for JobBoard<EfficiencySalary> {
    fn default() -> Self { Self::new() }
}

impl<P: SalaryPolicy> JobBoard<P> {
    pub fn with_policy(policy: P) -> Self {
        Self { policy, active: Vec::new() }
    }

    /// Lease the job's demand and start an instance.
    pub fn start_job(
        &mut self,
        pool: &mut ResourcePool,
        job: JobSpec,
        cycle: Cycle,
    ) -> EconomyResult<EntityId> {
        if !pool.try_allocate_demand(&job.demand) {
            log::info!("cycle={cycle} jobs: refused '{}', insufficient resources", job.job_id);
            return Err(EconomyError::InsufficientResources {
                memory:    job.demand.memory,
                cpu:       job.demand.cpu,
                bandwidth: job.demand.bandwidth,
                computing: job.demand.computing,
            });
        }
        let instance_id = uuid::Uuid::new_v4().to_string();
        log::info!("cycle={cycle} jobs: started '{}' as {instance_id}", job.job_id);
        self.active.push(JobInstance {
            instance_id: instance_id.clone(),
            job,
            started_cycle: cycle,
            cycles_worked: 0,
            total_earned: 0,
        });
        Ok(instance_id)
    }

    /// Stop an instance and release its lease.
    pub fn stop_job(&mut self, pool: &mut ResourcePool, instance_id: &str) -> Option<JobInstance> {
        let idx = self.active.iter().position(|j| j.instance_id == instance_id)?;
        let instance = self.active.remove(idx);
        pool.release_demand(&instance.job.demand);
        log::info!("jobs: stopped {instance_id} after {} cycle(s)", instance.cycles_worked);
        Some(instance)
    }

    pub fn stop_all(&mut self, pool: &mut ResourcePool) -> Vec<JobInstance> {
        let stopped: Vec<JobInstance> = self.active.drain(..).collect();
        for instance in &stopped {
            pool.release_demand(&instance.job.demand);
        }
        stopped
    }

    pub fn active(&self) -> &[JobInstance] {
        &self.active
    }

    fn pay_salaries(&mut self, ctx: &mut PhaseContext<'_>) -> Vec<EconomyEvent> {
        let cycle = ctx.cycle;
        let efficiency = ctx.efficiency.pool_efficiency(ctx.pool);
        let mut events = Vec::with_capacity(self.active.len());
        for instance in self.active.iter_mut() {
            let amount = self
                .policy
                .compute_salary(&instance.job, instance, ctx.pool, ctx.efficiency)
                .max(0);
            ctx.pool.earn(amount);
            instance.cycles_worked += 1;
            instance.total_earned = instance.total_earned.saturating_add(amount);
            log::debug!("cycle={cycle} jobs: paid {amount} for {}", instance.instance_id);
            events.push(EconomyEvent::SalaryPaid {
                cycle,
                job_id: instance.job.job_id.clone(),
                instance_id: instance.instance_id.clone(),
                amount,
                efficiency,
            });
        }
        events
    }
}

impl<P: SalaryPolicy + 'static> EconomySubsystem for JobBoard<P> {
    fn name(&self) -> &str { "jobs" }

    fn phases(&self) -> &[SettlementPhase] { &PHASES }

    fn settle(&mut self, ctx: &mut PhaseContext<'_>) -> EconomyResult<Vec<EconomyEvent>> {
        match ctx.phase {
            SettlementPhase::JobSalary => Ok(self.pay_salaries(ctx)),
            SettlementPhase::MoraleChange => {
                let penalty: Morale = self
                    .active
                    .iter()
                    .fold(0, |acc: Morale, j| acc.saturating_add(j.job.morale_penalty));
                ctx.contribute_morale(penalty.saturating_neg());
                Ok(vec![])
            }
            _ => Ok(vec![]),
        }
    }

    fn active_leases(&self) -> usize {
        self.active.len()
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
}
