use serde::{Deserialize, Serialize};
use crate::resource::ResourceDimension;

/// All host-issued control commands.
/// Variants are appended over time; never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum EconomyCommand {
    // ── Clock control ─────────────────────────────
    Pause,
    Resume,
    SetTimeScale { scale: f64 },
    SetEnabled { enabled: bool },
    /// Switch between the production and the debug interval.
    SetDebugInterval { debug: bool },
    /// Run one cycle immediately without consuming accumulated time.
    ForceCycle,
    /// Zero the accumulator and the cycle count.
    Reset,

    // ── Pool maintenance ──────────────────────────
    CleanData { amount: f64 },
    UpgradeCapacity { dimension: ResourceDimension, amount: f64 },
    SetDataGenerationRate { rate: f64 },
}
