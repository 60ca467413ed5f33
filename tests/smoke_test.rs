use std::time::{Duration, Instant};

use payment_planner::{
    allocate, init,
    planner::{MonthCalendar, PlanDocument, ScopeItem, Settings, Toggles},
    PlannerState,
};

#[test]
fn init_and_allocate() {
    init();
    let report = allocate(
        &Settings::flat(4),
        &MonthCalendar::from_weeks([("Jan 2026", 4)]),
        &[ScopeItem::new("01", "Framing", 1000.0).timed(1, 4)],
        &Toggles::none(),
    )
    .unwrap();
    assert_eq!(report.week_allocation, vec![250.0; 4]);
}

#[test]
fn planner_state_commits_after_quiet_period() {
    let document = PlanDocument::new(
        Settings::flat(4),
        MonthCalendar::from_weeks([("Jan 2026", 4)]),
        Vec::new(),
    );
    let mut state = PlannerState::new(document, Duration::from_millis(120));
    state.add_item(ScopeItem::new("01", "Framing", 800.0).as_spread());
    assert!(state.is_dirty());

    let outcome = state
        .tick(Instant::now() + Duration::from_secs(1))
        .unwrap()
        .expect("commit after the delay");
    assert!(outcome.is_ready());
    assert_eq!(outcome.report().week_allocation, vec![200.0; 4]);
}
