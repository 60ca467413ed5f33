use std::fmt::Write;

use crate::allocation::AllocationReport;

use super::{row_amounts, total_amounts, CASH_FLOW_HEADERS};

/// CSV of the cash-flow table with plain two-decimal numbers, one line per
/// month, then the holdback release and a totals line.
pub fn to_csv(report: &AllocationReport) -> String {
    let mut out = String::new();
    push_line(&mut out, CASH_FLOW_HEADERS.iter().map(|h| h.to_string()));
    for row in report.rows() {
        push_line(
            &mut out,
            std::iter::once(escape(&row.label)).chain(row_amounts(row).iter().map(number)),
        );
    }
    push_line(
        &mut out,
        std::iter::once("Total".to_string()).chain(total_amounts(report).iter().map(number)),
    );
    out
}

/// Week number and amount per line.
pub fn weeks_to_csv(report: &AllocationReport) -> String {
    let mut out = String::from("Week,Amount\n");
    for (idx, amount) in report.week_allocation.iter().enumerate() {
        let _ = writeln!(out, "{},{}", idx + 1, number(amount));
    }
    out
}

fn push_line(out: &mut String, cells: impl Iterator<Item = String>) {
    let line: Vec<String> = cells.collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn number(value: &f64) -> String {
    let rendered = format!("{:.2}", value);
    if rendered == "-0.00" {
        "0.00".to_string()
    } else {
        rendered
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_quotes_fields_with_commas() {
        assert_eq!(escape("Jan, 2025"), "\"Jan, 2025\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("Feb 2025"), "Feb 2025");
    }

    #[test]
    fn number_drops_negative_zero() {
        assert_eq!(number(&-0.001), "0.00");
        assert_eq!(number(&1234.5), "1234.50");
    }
}
