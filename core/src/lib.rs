//! economy-core: tick scheduler, resource ledger and ordered settlement
//! for a single-player virtual economy.

pub mod clock;
pub mod command;
pub mod company_subsystem;
pub mod config;
pub mod context;
pub mod efficiency;
pub mod error;
pub mod event;
pub mod housing_subsystem;
pub mod identity_fee_subsystem;
pub mod job_subsystem;
pub mod notification;
pub mod persistence_subsystem;
pub mod phase;
pub mod resource;
pub mod rng;
pub mod security_subsystem;
pub mod settlement;
pub mod snapshot;
pub mod store;
pub mod subsystem;
pub mod transfer;
pub mod types;
