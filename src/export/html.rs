use crate::{allocation::AllocationReport, currency::MoneyFormat};

use super::{row_amounts, total_amounts, CASH_FLOW_HEADERS};

/// Standalone HTML table of the cash-flow rows, suitable for printing.
pub fn to_html(report: &AllocationReport, money: &MoneyFormat, title: &str) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(title)));
    out.push_str("</head>\n<body>\n");
    out.push_str(&format!("<h1>{}</h1>\n", escape(title)));
    out.push_str(&format!(
        "<p>Contract total: {}</p>\n",
        money.money(report.totals.contract_total)
    ));
    out.push_str("<table>\n<thead>\n<tr>");
    for header in CASH_FLOW_HEADERS {
        out.push_str(&format!("<th>{}</th>", header));
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in report.rows() {
        push_row(&mut out, &escape(&row.label), &row_amounts(row), money, "td");
    }
    out.push_str("</tbody>\n<tfoot>\n");
    push_row(&mut out, "Total", &total_amounts(report), money, "th");
    out.push_str("</tfoot>\n</table>\n</body>\n</html>\n");
    out
}

fn push_row(out: &mut String, label: &str, amounts: &[f64], money: &MoneyFormat, cell: &str) {
    out.push_str(&format!("<tr><{cell}>{label}</{cell}>"));
    for amount in amounts {
        out.push_str(&format!("<{cell}>{}</{cell}>", money.money(*amount)));
    }
    out.push_str("</tr>\n");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::escape;

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape("<b>R&D</b>"), "&lt;b&gt;R&amp;D&lt;/b&gt;");
    }
}
