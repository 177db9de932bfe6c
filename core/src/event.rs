//! The settlement event log: every outcome of every phase.
//!
//! RULE: Subsystems report what they did ONLY through events.
//! Failed payments are events too; they are never errors.

use crate::{
    phase::SettlementPhase,
    types::{Cycle, EntityId, Money, Morale, SessionId},
};
use serde::{Deserialize, Serialize};

/// Every event emitted during settlement.
/// Variants are appended over time; never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EconomyEvent {
    // ── Cycle events ──────────────────────────────
    CycleStarted {
        cycle: Cycle,
    },
    PhaseCompleted {
        cycle: Cycle,
        phase: SettlementPhase,
        handlers_run: usize,
        faults: usize,
    },
    CycleCompleted {
        cycle: Cycle,
        currency: Money,
        morale: Morale,
    },
    HandlerFaulted {
        cycle: Cycle,
        phase: SettlementPhase,
        handler: String,
        message: String,
    },

    // ── Identity fee ──────────────────────────────
    IdentityFeeCharged {
        cycle: Cycle,
        amount: Money,
    },
    IdentityFeeUnpaid {
        cycle: Cycle,
        amount: Money,
        balance: Money,
    },

    // ── Jobs ──────────────────────────────────────
    SalaryPaid {
        cycle: Cycle,
        job_id: EntityId,
        instance_id: EntityId,
        amount: Money,
        efficiency: f64,
    },

    // ── Companies ─────────────────────────────────
    CompanyIncome {
        cycle: Cycle,
        company_id: EntityId,
        amount: Money,
    },
    CompanyLoss {
        cycle: Cycle,
        company_id: EntityId,
        amount: Money,
    },
    CompanyLossUnresolved {
        cycle: Cycle,
        company_id: EntityId,
        amount: Money,
        shortfall: Money,
    },

    // ── Housing ───────────────────────────────────
    RentPaid {
        cycle: Cycle,
        amount: Money,
    },
    RentUnpaid {
        cycle: Cycle,
        amount: Money,
        balance: Money,
    },

    // ── Security ──────────────────────────────────
    SecurityFeePaid {
        cycle: Cycle,
        plan: String,
        amount: Money,
    },
    SecurityFeeUnpaid {
        cycle: Cycle,
        plan: String,
        amount: Money,
    },
    IntrusionDefended {
        cycle: Cycle,
    },
    IntrusionSucceeded {
        cycle: Cycle,
        currency_lost: Money,
        morale_lost: Morale,
    },

    // ── Data and morale ───────────────────────────
    DataGenerated {
        cycle: Cycle,
        amount: f64,
        storage_used: f64,
        storage_full: bool,
    },
    MoraleChanged {
        cycle: Cycle,
        delta: Morale,
        morale: Morale,
    },

    // ── Persistence ───────────────────────────────
    StateFinalized {
        cycle: Cycle,
    },

    // ── Transfers ─────────────────────────────────
    TransferCompleted {
        transfer_id: EntityId,
        size: f64,
        storage_full: bool,
    },
}

impl EconomyEvent {
    /// Stable string name, used for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CycleStarted { .. }          => "cycle_started",
            Self::PhaseCompleted { .. }        => "phase_completed",
            Self::CycleCompleted { .. }        => "cycle_completed",
            Self::HandlerFaulted { .. }        => "handler_faulted",
            Self::IdentityFeeCharged { .. }    => "identity_fee_charged",
            Self::IdentityFeeUnpaid { .. }     => "identity_fee_unpaid",
            Self::SalaryPaid { .. }            => "salary_paid",
            Self::CompanyIncome { .. }         => "company_income",
            Self::CompanyLoss { .. }           => "company_loss",
            Self::CompanyLossUnresolved { .. } => "company_loss_unresolved",
            Self::RentPaid { .. }              => "rent_paid",
            Self::RentUnpaid { .. }            => "rent_unpaid",
            Self::SecurityFeePaid { .. }       => "security_fee_paid",
            Self::SecurityFeeUnpaid { .. }     => "security_fee_unpaid",
            Self::IntrusionDefended { .. }     => "intrusion_defended",
            Self::IntrusionSucceeded { .. }    => "intrusion_succeeded",
            Self::DataGenerated { .. }         => "data_generated",
            Self::MoraleChanged { .. }         => "morale_changed",
            Self::StateFinalized { .. }        => "state_finalized",
            Self::TransferCompleted { .. }     => "transfer_completed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub session_id: SessionId,
    pub cycle: Cycle,
    pub source: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized EconomyEvent
}

impl EventLogEntry {
    pub fn from_event(
        session_id: &str,
        cycle: Cycle,
        source: &str,
        event: &EconomyEvent,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            session_id: session_id.to_string(),
            cycle,
            source: source.to_string(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
        })
    }
}
