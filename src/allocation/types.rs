use serde::{Deserialize, Serialize};

use crate::planner::Overrun;

pub const HOLDBACK_RELEASE_LABEL: &str = "Holdback Release";

/// Months between the last billed month and the holdback release payment.
pub const HOLDBACK_RELEASE_DELAY_MONTHS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    Month,
    HoldbackRelease,
}

/// One line of the monthly cash-flow table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCashRow {
    pub kind: RowKind,
    pub label: String,
    pub pretax: f64,
    pub deposit_credit_applied: f64,
    /// Amount withheld this month; on the release row, the amount paid out.
    pub holdback: f64,
    pub subtotal: f64,
    pub hst: f64,
    pub amount_due: f64,
    pub deposit_remaining: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowTotals {
    pub base_total: f64,
    pub markup_amount: f64,
    pub contract_total: f64,
    pub pre_tax: f64,
    pub deposit_credit: f64,
    pub holdback: f64,
    pub subtotal: f64,
    pub hst: f64,
    pub amount_due: f64,
}

/// Deposit pool bookkeeping across the rollup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositPosition {
    /// Total deposit collected up front.
    pub deposit_pre: f64,
    /// Credit is never drawn below this balance.
    pub deposit_floor: f64,
    pub remaining: f64,
    /// Set when any month's credit headroom above the floor, less the credit it
    /// asked for, falls under a tenth of that month's pre-tax amount. Evaluated
    /// whether or not deposit credit is switched on.
    pub nearing_floor: bool,
}

/// Calendar weeks that do not add up to the project length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekMismatch {
    pub calendar_weeks: u32,
    pub project_weeks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationReport {
    pub week_allocation: Vec<f64>,
    pub month_rows: Vec<MonthCashRow>,
    pub holdback_release_row: MonthCashRow,
    pub totals: CashFlowTotals,
    pub deposit: DepositPosition,
    /// Cents moved onto the last funded week to make the weeks sum to the contract.
    pub drift: f64,
    pub overruns: Vec<Overrun>,
    pub week_mismatch: Option<WeekMismatch>,
}

impl AllocationReport {
    /// Overruns always block; a week mismatch blocks unless already accepted.
    pub fn requires_confirmation(&self, accept_mismatch: bool) -> bool {
        !self.overruns.is_empty() || (self.week_mismatch.is_some() && !accept_mismatch)
    }

    pub fn allocated_total(&self) -> f64 {
        self.week_allocation.iter().sum()
    }

    /// Everything invoiced: monthly amounts due plus the holdback release.
    pub fn total_billed(&self) -> f64 {
        self.totals.amount_due + self.holdback_release_row.amount_due
    }

    /// Tax on monthly subtotals plus tax on the released holdback.
    pub fn total_tax(&self) -> f64 {
        self.totals.hst + self.holdback_release_row.hst
    }

    /// Month rows followed by the holdback release row.
    pub fn rows(&self) -> impl Iterator<Item = &MonthCashRow> {
        self.month_rows
            .iter()
            .chain(std::iter::once(&self.holdback_release_row))
    }
}

/// Result of evaluating a plan: either usable as-is or waiting on the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ready(AllocationReport),
    RequiresConfirmation(Confirmation),
}

/// Conditions the caller must accept before the plan is treated as final.
/// `preview` is the allocation computed from the unmodified inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub overruns: Vec<Overrun>,
    pub week_mismatch: Option<WeekMismatch>,
    pub preview: AllocationReport,
}

impl Outcome {
    pub fn report(&self) -> &AllocationReport {
        match self {
            Outcome::Ready(report) => report,
            Outcome::RequiresConfirmation(confirmation) => &confirmation.preview,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }
}
