//! Payment Planner turns a construction contract's scope items into a weekly
//! spend curve and a monthly cash-flow schedule with deposit credit, holdback
//! and HST applied.

pub mod allocation;
pub mod cli;
pub mod config;
pub mod currency;
pub mod errors;
pub mod export;
pub mod planner;
pub mod state;
pub mod utils;

use std::sync::Once;

pub use allocation::{allocate, AllocationEngine, AllocationReport, Outcome};
pub use state::PlannerState;
pub use errors::{PlannerError, Result};
pub use planner::{MonthCalendar, PlanDocument, ScopeItem, Settings, Toggles};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Payment planner tracing initialized.");
    });
}
