//! Snapshot: the opaque persisted state of one session.
//!
//! A snapshot captures the pool and the clock fields needed to resume a
//! session: totals and used per dimension, currency, morale, level, the
//! clock accumulator and the completed cycle count. How it is stored is
//! the sink's concern.

use crate::{
    clock::ClockState,
    error::EconomyResult,
    resource::ResourcePool,
    types::{Cycle, SessionId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomySnapshot {
    pub session_id: SessionId,
    pub cycle:      Cycle,
    pub pool:       ResourcePool,
    pub clock:      ClockState,
}

impl EconomySnapshot {
    pub fn to_json(&self) -> EconomyResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> EconomyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Where finalized cycle state goes.
pub trait SnapshotSink: Send {
    fn save_snapshot(&mut self, snapshot: &EconomySnapshot) -> EconomyResult<()>;
}
