//! The nine settlement phases.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. identity-fee
//!   2. job-salary
//!   3. company-income
//!   4. rent
//!   5. security-fee
//!   6. data-generation
//!   7. morale-change
//!   8. random-event-check   (runs after the cycle's resource state is settled)
//!   9. persistence-sync     (notification only, the core performs no I/O)

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPhase {
    IdentityFee,
    JobSalary,
    CompanyIncome,
    Rent,
    SecurityFee,
    DataGeneration,
    MoraleChange,
    RandomEventCheck,
    PersistenceSync,
}

impl SettlementPhase {
    /// Every phase in execution order.
    pub const ALL: [SettlementPhase; 9] = [
        Self::IdentityFee,
        Self::JobSalary,
        Self::CompanyIncome,
        Self::Rent,
        Self::SecurityFee,
        Self::DataGeneration,
        Self::MoraleChange,
        Self::RandomEventCheck,
        Self::PersistenceSync,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::IdentityFee      => "identity-fee",
            Self::JobSalary        => "job-salary",
            Self::CompanyIncome    => "company-income",
            Self::Rent             => "rent",
            Self::SecurityFee      => "security-fee",
            Self::DataGeneration   => "data-generation",
            Self::MoraleChange     => "morale-change",
            Self::RandomEventCheck => "random-event-check",
            Self::PersistenceSync  => "persistence-sync",
        }
    }

    /// Zero-based position in the execution order.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SettlementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
