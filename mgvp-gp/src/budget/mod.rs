//! Watch-budget enforcement
//!
//! The remote authority is the only source of truth for remaining time; the
//! monitor relays its answers and never does budget arithmetic itself.

pub mod authority;
pub mod monitor;

pub use authority::{BudgetAuthority, HttpBudgetAuthority};
pub use monitor::{BudgetReport, MonitorConfig, SessionBudgetMonitor};

use serde::Serialize;

/// Remaining allowance for the active session, as last reported
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WatchBudget {
    pub remaining_seconds: f64,
    pub limit_reached: bool,
}

impl WatchBudget {
    pub fn exhausted() -> Self {
        Self {
            remaining_seconds: 0.0,
            limit_reached: true,
        }
    }
}
