use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{
    allocation::{AllocationEngine, Outcome},
    errors::{PlannerError, Result},
    planner::{cap_overruns, MonthCalendar, PlanDocument, ScopeItem, Settings, Toggles},
};

use super::debounce::CommitDebouncer;

pub type Subscriber = Box<dyn FnMut(&Outcome)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

/// Owns the plan document and the latest allocation outcome.
///
/// Every edit marks the state dirty; `tick` recomputes once the debounce delay
/// has passed and hands the outcome to subscribers.
pub struct PlannerState {
    document: PlanDocument,
    accept_mismatch: bool,
    debouncer: CommitDebouncer,
    last_outcome: Option<Outcome>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: usize,
}

impl PlannerState {
    pub fn new(mut document: PlanDocument, recompute_delay: Duration) -> Self {
        document.normalize();
        Self {
            document,
            accept_mismatch: false,
            debouncer: CommitDebouncer::new(recompute_delay),
            last_outcome: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn document(&self) -> &PlanDocument {
        &self.document
    }

    pub fn settings(&self) -> &Settings {
        &self.document.settings
    }

    pub fn months(&self) -> &MonthCalendar {
        &self.document.months
    }

    pub fn scope(&self) -> &[ScopeItem] {
        &self.document.scope
    }

    pub fn toggles(&self) -> &Toggles {
        &self.document.toggles
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn mismatch_accepted(&self) -> bool {
        self.accept_mismatch
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&Outcome) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        before != self.subscribers.len()
    }

    pub fn replace_document(&mut self, mut document: PlanDocument) {
        document.normalize();
        self.document = document;
        self.accept_mismatch = false;
        self.touch();
    }

    pub fn set_settings(&mut self, settings: Settings) {
        let settings = settings.normalized();
        if settings.project_weeks != self.document.settings.project_weeks {
            self.accept_mismatch = false;
        }
        self.document.settings = settings;
        self.touch();
    }

    /// Sets a single setting by key; see [`Settings::set_field`].
    pub fn set_setting(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut settings = self.document.settings.clone();
        if !settings.set_field(key, raw) {
            return Err(PlannerError::InvalidInput(format!("unknown setting `{key}`")));
        }
        self.set_settings(settings);
        Ok(())
    }

    pub fn set_toggle(&mut self, name: &str, enabled: bool) -> Result<()> {
        if !self.document.toggles.set(name, enabled) {
            return Err(PlannerError::InvalidInput(format!("unknown toggle `{name}`")));
        }
        self.touch();
        Ok(())
    }

    pub fn add_month(&mut self, label: impl Into<String>, weeks: u32) {
        self.document.months.push(label, weeks);
        self.months_changed();
    }

    pub fn set_month_weeks(&mut self, index: usize, weeks: u32) -> Result<()> {
        self.document.months.set_weeks(index, weeks)?;
        self.months_changed();
        Ok(())
    }

    pub fn rename_month(&mut self, index: usize, label: impl Into<String>) -> Result<()> {
        self.document.months.rename(index, label)?;
        self.touch();
        Ok(())
    }

    pub fn remove_month(&mut self, index: usize) -> Result<()> {
        self.document.months.remove(index)?;
        self.months_changed();
        Ok(())
    }

    /// Replaces the calendar with months generated from `start`. A missing start
    /// date leaves the current calendar untouched.
    pub fn auto_generate_months(&mut self, start: Option<NaiveDate>) -> Result<()> {
        let calendar =
            MonthCalendar::auto_generate(start, self.document.settings.project_weeks)?;
        info!(months = calendar.len(), "generated month calendar");
        self.document.months = calendar;
        self.months_changed();
        Ok(())
    }

    pub fn add_item(&mut self, mut item: ScopeItem) -> usize {
        item.sanitize();
        self.document.scope.push(item);
        self.touch();
        self.document.scope.len() - 1
    }

    /// Applies `edit` to the item at 0-based `index`.
    pub fn update_item(&mut self, index: usize, edit: impl FnOnce(&mut ScopeItem)) -> Result<()> {
        let item = self
            .document
            .scope
            .get_mut(index)
            .ok_or_else(|| PlannerError::NotFound(format!("scope item #{}", index + 1)))?;
        edit(item);
        item.sanitize();
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> Result<ScopeItem> {
        if index >= self.document.scope.len() {
            return Err(PlannerError::NotFound(format!("scope item #{}", index + 1)));
        }
        let removed = self.document.scope.remove(index);
        self.touch();
        Ok(removed)
    }

    /// Recomputes if the debounce delay has elapsed since the last edit.
    pub fn tick(&mut self, now: Instant) -> Result<Option<&Outcome>> {
        if !self.debouncer.is_due(now) {
            return Ok(None);
        }
        self.recompute().map(Some)
    }

    /// Recomputes immediately when edits are pending, skipping the delay.
    pub fn flush(&mut self) -> Result<Option<&Outcome>> {
        if !self.debouncer.is_pending() {
            return Ok(None);
        }
        self.recompute().map(Some)
    }

    pub fn recompute(&mut self) -> Result<&Outcome> {
        self.debouncer.clear();
        let outcome = AllocationEngine::evaluate(&self.document, self.accept_mismatch)?;
        debug!(
            ready = outcome.is_ready(),
            subscribers = self.subscribers.len(),
            "recomputed plan"
        );
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&outcome);
        }
        Ok(self.last_outcome.insert(outcome))
    }

    /// Caps every overrunning scope item to the project end and recomputes.
    /// Returns the number of items changed.
    pub fn confirm_overruns(&mut self) -> Result<usize> {
        let project_weeks = self.document.settings.project_weeks;
        let changed = cap_overruns(&mut self.document.scope, project_weeks);
        info!(changed, project_weeks, "capped overrunning scope items");
        self.recompute()?;
        Ok(changed)
    }

    /// Proceeds with months that do not add up to the project length.
    pub fn accept_week_mismatch(&mut self) -> Result<&Outcome> {
        self.accept_mismatch = true;
        self.recompute()
    }

    fn months_changed(&mut self) {
        self.accept_mismatch = false;
        self.touch();
    }

    fn touch(&mut self) {
        self.debouncer.mark(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    fn state() -> PlannerState {
        let document = PlanDocument::new(
            Settings::flat(4),
            MonthCalendar::from_weeks([("Jan", 4)]),
            vec![ScopeItem::new("01", "Demo", 1000.0).timed(1, 4)],
        );
        PlannerState::new(document, Duration::from_millis(120))
    }

    #[test]
    fn tick_waits_for_quiet_period() {
        let mut state = state();
        state.set_setting("markup", "0.1").unwrap();
        assert!(state.tick(Instant::now()).unwrap().is_none());
        let later = Instant::now() + Duration::from_millis(500);
        let outcome = state.tick(later).unwrap().expect("recompute after delay");
        assert!(outcome.is_ready());
        assert!(!state.is_dirty());
    }

    #[test]
    fn burst_of_edits_notifies_once() {
        let mut state = state();
        let calls = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&calls);
        state.subscribe(move |_| *seen.borrow_mut() += 1);
        for base in [100.0, 200.0, 300.0] {
            state.update_item(0, |item| item.base = base).unwrap();
        }
        state.tick(Instant::now() + Duration::from_secs(1)).unwrap();
        state.tick(Instant::now() + Duration::from_secs(2)).unwrap();
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut state = state();
        let calls = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&calls);
        let id = state.subscribe(move |_| *seen.borrow_mut() += 1);
        assert!(state.unsubscribe(id));
        state.recompute().unwrap();
        assert_eq!(*calls.borrow(), 0);
        assert!(!state.unsubscribe(id));
    }

    #[test]
    fn month_edit_resets_mismatch_acceptance() {
        let mut state = state();
        state.add_month("Feb", 2);
        assert!(!state.recompute().unwrap().is_ready());
        assert!(state.accept_week_mismatch().unwrap().is_ready());
        state.set_month_weeks(2, 1).unwrap();
        assert!(!state.mismatch_accepted());
    }

    #[test]
    fn auto_generate_without_start_keeps_calendar() {
        let mut state = state();
        let err = state.auto_generate_months(None).unwrap_err();
        assert!(matches!(err, PlannerError::MissingStartDate));
        assert_eq!(state.months().len(), 1);
    }

    #[test]
    fn zero_project_weeks_is_clamped() {
        let mut state = state();
        state.set_setting("weeks", "0").unwrap();
        assert_eq!(state.settings().project_weeks, 1);
    }
}
