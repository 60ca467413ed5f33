use chrono::NaiveDate;
use payment_planner::{
    planner::{label_after, recalc_bounds, Month, MonthCalendar},
    PlannerError,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn bounds_follow_week_counts() {
    let mut months = vec![Month::new("A", 3), Month::new("B", 0), Month::new("C", 2)];
    recalc_bounds(&mut months);
    let bounds: Vec<(u32, u32, u32)> = months.iter().map(|m| (m.index, m.start, m.end)).collect();
    assert_eq!(bounds, vec![(1, 1, 3), (2, 4, 3), (3, 4, 5)]);
}

#[test]
fn auto_generate_spans_year_end() {
    // Twelve Mondays from Nov 3 2025: 4 in Nov, 5 in Dec, 3 in Jan.
    let calendar = MonthCalendar::auto_generate(Some(date(2025, 11, 3)), 12).unwrap();
    let summary: Vec<(&str, u32)> = calendar
        .months()
        .iter()
        .map(|m| (m.label.as_str(), m.weeks))
        .collect();
    assert_eq!(
        summary,
        vec![("Nov 2025", 4), ("Dec 2025", 5), ("Jan 2026", 3)]
    );
    assert_eq!(calendar.total_weeks(), 12);
    assert_eq!(calendar.months()[2].start, 10);
}

#[test]
fn auto_generate_without_start_date_fails() {
    assert!(matches!(
        MonthCalendar::auto_generate(None, 10),
        Err(PlannerError::MissingStartDate)
    ));
}

#[test]
fn month_for_week_skips_empty_months() {
    let calendar = MonthCalendar::from_weeks([("Jan", 2), ("Feb", 0), ("Mar", 2)]);
    assert_eq!(calendar.active().count(), 2);
    assert_eq!(calendar.month_for_week(3).map(|m| m.label.as_str()), Some("Mar"));
    assert!(calendar.month_for_week(5).is_none());
}

#[test]
fn editing_months_keeps_indices_sequential() {
    let mut calendar = MonthCalendar::from_weeks([("Jan", 4)]);
    calendar.push("Feb", 4);
    calendar.push("Mar", 5);
    calendar.remove(2).unwrap();
    calendar.rename(2, "March").unwrap();
    let months = calendar.months();
    assert_eq!(months[1].index, 2);
    assert_eq!(months[1].label, "March");
    assert_eq!((months[1].start, months[1].end), (5, 9));
    assert!(matches!(calendar.remove(7), Err(PlannerError::NotFound(_))));
}

#[test]
fn release_label_offsets_parsed_months() {
    assert_eq!(label_after("Nov 2025", 2).as_deref(), Some("Jan 2026"));
    assert_eq!(label_after(" Jun 2026 ", 2).as_deref(), Some("Aug 2026"));
    assert_eq!(label_after("Phase 2", 2), None);
}
