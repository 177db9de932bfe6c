//! Transfers: downloads driven by elapsed time instead of sleeping.
//!
//! A transfer leases bandwidth when it starts and is advanced by the host
//! with elapsed simulated seconds. On completion the lease is released
//! exactly once and the downloaded content lands in storage.

use crate::{
    error::{EconomyError, EconomyResult},
    event::EconomyEvent,
    resource::{ResourceDemand, ResourcePool},
    types::EntityId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub transfer_id: EntityId,
    size:            f64,
    bandwidth:       f64,
    transferred:     f64,
    state:           TransferState,
}

impl Transfer {
    /// Lease `bandwidth` and start moving `size` units.
    pub fn start(pool: &mut ResourcePool, size: f64, bandwidth: f64) -> EconomyResult<Self> {
        if !(size.is_finite() && size > 0.0 && bandwidth.is_finite() && bandwidth > 0.0) {
            return Err(EconomyError::InvalidConfig {
                field: "transfer",
                reason: format!("size {size} and bandwidth {bandwidth} must be > 0"),
            });
        }
        if !pool.try_allocate_demand(&ResourceDemand::bandwidth(bandwidth)) {
            return Err(EconomyError::InsufficientResources {
                memory: 0.0,
                cpu: 0.0,
                bandwidth,
                computing: 0.0,
            });
        }
        Ok(Self {
            transfer_id: uuid::Uuid::new_v4().to_string(),
            size,
            bandwidth,
            transferred: 0.0,
            state: TransferState::Running,
        })
    }

    pub fn state(&self) -> TransferState { self.state }
    pub fn size(&self) -> f64 { self.size }
    pub fn bandwidth(&self) -> f64 { self.bandwidth }

    pub fn progress_fraction(&self) -> f64 {
        (self.transferred / self.size).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.state == TransferState::Completed
    }

    pub fn is_finished(&self) -> bool {
        self.state != TransferState::Running
    }

    /// Seconds left at the leased bandwidth.
    pub fn remaining_seconds(&self) -> f64 {
        if self.is_finished() {
            return 0.0;
        }
        (self.size - self.transferred).max(0.0) / self.bandwidth
    }

    /// Advance by elapsed seconds. Returns the completion event the one
    /// time the transfer finishes.
    pub fn advance(&mut self, pool: &mut ResourcePool, elapsed_seconds: f64) -> Option<EconomyEvent> {
        if self.is_finished() || !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
            return None;
        }
        self.transferred += self.bandwidth * elapsed_seconds;
        if self.transferred < self.size {
            return None;
        }

        self.transferred = self.size;
        self.state = TransferState::Completed;
        pool.release_demand(&ResourceDemand::bandwidth(self.bandwidth));
        let fits = pool.add_storage_used(self.size);
        log::info!("transfer: {} completed ({} units)", self.transfer_id, self.size);
        Some(EconomyEvent::TransferCompleted {
            transfer_id: self.transfer_id.clone(),
            size: self.size,
            storage_full: !fits,
        })
    }

    /// Abort and release the lease. Nothing is stored.
    pub fn cancel(&mut self, pool: &mut ResourcePool) {
        if self.is_finished() {
            return;
        }
        self.state = TransferState::Cancelled;
        pool.release_demand(&ResourceDemand::bandwidth(self.bandwidth));
        log::info!("transfer: {} cancelled at {:.0}%", self.transfer_id, self.progress_fraction() * 100.0);
    }
}
