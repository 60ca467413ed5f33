//! Cash-flow allocation: spreads scope costs over project weeks and rolls them
//! up into monthly billing rows with deposit credit, holdback and HST.

pub mod engine;
pub mod types;

pub use engine::{allocate, AllocationEngine};
pub use types::{
    AllocationReport, CashFlowTotals, Confirmation, DepositPosition, MonthCashRow, Outcome,
    RowKind, WeekMismatch, HOLDBACK_RELEASE_LABEL,
};
