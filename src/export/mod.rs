//! Renderers for the computed cash-flow table: terminal text, CSV and HTML.

pub mod csv;
pub mod html;
pub mod table;

use crate::{
    allocation::{AllocationReport, MonthCashRow},
    currency::MoneyFormat,
};

pub use csv::to_csv;
pub use html::to_html;
pub use table::{Alignment, Table, TableColumn};

pub const CASH_FLOW_HEADERS: [&str; 8] = [
    "Month",
    "Pre-tax",
    "Deposit Credit",
    "Holdback",
    "Subtotal",
    "HST",
    "Amount Due",
    "Deposit Remaining",
];

pub(crate) fn row_amounts(row: &MonthCashRow) -> [f64; 7] {
    [
        row.pretax,
        row.deposit_credit_applied,
        row.holdback,
        row.subtotal,
        row.hst,
        row.amount_due,
        row.deposit_remaining,
    ]
}

/// Totals line: monthly sums plus the holdback release where it adds to the bill.
pub(crate) fn total_amounts(report: &AllocationReport) -> [f64; 7] {
    let totals = &report.totals;
    [
        totals.pre_tax,
        totals.deposit_credit,
        totals.holdback,
        totals.subtotal + report.holdback_release_row.subtotal,
        report.total_tax(),
        report.total_billed(),
        report.deposit.remaining,
    ]
}

/// The monthly cash-flow table as a terminal-ready text table.
pub fn cash_flow_table(report: &AllocationReport, money: &MoneyFormat) -> Table {
    let mut columns = vec![TableColumn::left(CASH_FLOW_HEADERS[0]).max_width(32)];
    columns.extend(CASH_FLOW_HEADERS[1..].iter().map(|h| TableColumn::right(*h)));
    let mut table = Table::new(columns);
    for row in report.rows() {
        let mut cells = vec![row.label.clone()];
        cells.extend(row_amounts(row).iter().map(|amount| money.money(*amount)));
        table.push_row(cells);
    }
    let mut totals = vec!["Total".to_string()];
    totals.extend(total_amounts(report).iter().map(|amount| money.money(*amount)));
    table.push_row(totals);
    table
}

/// Weekly allocation as a two-column text table.
pub fn week_table(report: &AllocationReport, money: &MoneyFormat) -> Table {
    let mut table = Table::new(vec![TableColumn::right("Week"), TableColumn::right("Amount")]);
    for (idx, amount) in report.week_allocation.iter().enumerate() {
        table.push_row(vec![(idx + 1).to_string(), money.money(*amount)]);
    }
    table
}
