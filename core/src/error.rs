use crate::phase::SettlementPhase;
use crate::types::Money;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EconomyError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid config: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Subsystem '{subsystem}' already handles phase {phase}")]
    DuplicateHandler { subsystem: String, phase: SettlementPhase },

    #[error("Insufficient resources: memory={memory} cpu={cpu} bandwidth={bandwidth} computing={computing}")]
    InsufficientResources {
        memory:    f64,
        cpu:       f64,
        bandwidth: f64,
        computing: f64,
    },

    #[error("Insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: Money, available: Money },

    #[error("Handler '{handler}' faulted in phase {phase}: {message}")]
    HandlerFault {
        phase:   SettlementPhase,
        handler: String,
        message: String,
    },

    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("Cannot restore while {transfers} transfer(s) and {jobs} job(s) hold leases")]
    LeasesOutstanding { transfers: usize, jobs: usize },

    #[error("Economy context not initialized")]
    NotInitialized,

    #[error("Economy context already shut down")]
    ShutDown,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EconomyResult<T> = Result<T, EconomyError>;
