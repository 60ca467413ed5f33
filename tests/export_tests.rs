use payment_planner::{
    allocation::AllocationEngine,
    currency::MoneyFormat,
    export::{self, csv::weeks_to_csv},
    planner::{MonthCalendar, ScopeItem, Settings, Toggles},
    AllocationReport,
};

fn four_week_report() -> AllocationReport {
    AllocationEngine::allocate(
        &Settings::flat(4),
        &MonthCalendar::from_weeks([("Jan 2026", 4)]),
        &[ScopeItem::new("01", "Framing", 1000.0).timed(1, 4)],
        &Toggles::none(),
    )
    .unwrap()
}

#[test]
fn csv_lists_months_release_and_totals() {
    let csv = export::to_csv(&four_week_report());
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Month,Pre-tax,Deposit Credit,Holdback,Subtotal,HST,Amount Due,Deposit Remaining",
            "Jan 2026,1000.00,0.00,0.00,1000.00,0.00,1000.00,0.00",
            "Holdback Release (Mar 2026),0.00,0.00,0.00,0.00,0.00,0.00,0.00",
            "Total,1000.00,0.00,0.00,1000.00,0.00,1000.00,0.00",
        ]
    );
}

#[test]
fn weeks_csv_has_one_line_per_week() {
    let csv = weeks_to_csv(&four_week_report());
    assert_eq!(
        csv,
        "Week,Amount\n1,250.00\n2,250.00\n3,250.00\n4,250.00\n"
    );
}

#[test]
fn html_escapes_labels_and_formats_money() {
    let report = AllocationEngine::allocate(
        &Settings::flat(2),
        &MonthCalendar::from_weeks([("<Phase> & Co", 2)]),
        &[ScopeItem::new("01", "Build", 12500.0).as_spread()],
        &Toggles::none(),
    )
    .unwrap();
    let html = export::to_html(&report, &MoneyFormat::default(), "Smith & Sons");
    assert!(html.contains("<title>Smith &amp; Sons</title>"));
    assert!(html.contains("<td>&lt;Phase&gt; &amp; Co</td>"));
    assert!(html.contains("$12,500.00"));
    assert!(!html.contains("<Phase>"));
}

#[test]
fn cash_flow_table_renders_every_row() {
    let rendered = export::cash_flow_table(&four_week_report(), &MoneyFormat::default()).render();
    let lines: Vec<&str> = rendered.lines().collect();
    // header, rule, month, release, total
    assert_eq!(lines.len(), 5);
    assert!(lines[0].contains("Amount Due"));
    assert!(lines[2].starts_with(" Jan 2026"));
    assert!(lines[4].contains("$1,000.00"));
}

#[test]
fn locale_changes_table_separators() {
    let money = MoneyFormat::new("EUR", "de-DE");
    let rendered = export::week_table(&four_week_report(), &money).render();
    assert!(rendered.contains("€250,00"));
}
