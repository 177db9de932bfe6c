//! Shared primitive types used across the entire economy core.

/// A settlement cycle number. Cycle 1 is the first completed interval.
pub type Cycle = u64;

/// Virtual currency. Never negative on the pool.
pub type Money = i64;

/// Signed morale scalar, unbounded in both directions.
pub type Morale = i32;

/// A stable, unique identifier for any collaborator-owned entity.
pub type EntityId = String;

/// The canonical player session identifier.
pub type SessionId = String;
