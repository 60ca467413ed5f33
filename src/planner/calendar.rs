use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::coerce::lenient_u32;
use crate::errors::{PlannerError, Result};

const LABEL_FORMAT: &str = "%b %Y";

/// A labeled billing period covering a contiguous run of project weeks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Month {
    #[serde(deserialize_with = "lenient_u32")]
    pub index: u32,
    pub label: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub weeks: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub start: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub end: u32,
}

impl Default for Month {
    fn default() -> Self {
        Self {
            index: 1,
            label: String::new(),
            weeks: 0,
            start: 1,
            end: 0,
        }
    }
}

impl Month {
    pub fn new(label: impl Into<String>, weeks: u32) -> Self {
        Self {
            label: label.into(),
            weeks,
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.weeks > 0
    }

    pub fn contains(&self, week: u32) -> bool {
        self.is_active() && week >= self.start && week <= self.end
    }
}

/// Assigns sequential indices and contiguous `start`/`end` bounds.
///
/// A zero-week month keeps its slot but covers no weeks (`end == start - 1`).
pub fn recalc_bounds(months: &mut [Month]) {
    let mut cursor: u32 = 1;
    for (idx, month) in months.iter_mut().enumerate() {
        month.index = idx as u32 + 1;
        month.start = cursor;
        // Saturates so an absurd week count from a hand-edited file still loads.
        month.end = cursor.saturating_add(month.weeks) - 1;
        cursor = cursor.saturating_add(month.weeks);
    }
}

/// Ordered list of billing months. Serializes as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthCalendar {
    months: Vec<Month>,
}

impl MonthCalendar {
    pub fn new(months: Vec<Month>) -> Self {
        let mut calendar = Self { months };
        calendar.recalc();
        calendar
    }

    /// Builds a calendar from `(label, weeks)` pairs.
    pub fn from_weeks<'a>(entries: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        Self::new(
            entries
                .into_iter()
                .map(|(label, weeks)| Month::new(label, weeks))
                .collect(),
        )
    }

    /// Buckets `project_weeks` consecutive 7-day periods starting at `start` into
    /// calendar months, labeled `Mon YYYY`.
    pub fn auto_generate(start: Option<NaiveDate>, project_weeks: u32) -> Result<Self> {
        let start = start.ok_or(PlannerError::MissingStartDate)?;
        let mut months: Vec<Month> = Vec::new();
        for week in 0..project_weeks {
            let bucket = start + Duration::weeks(i64::from(week));
            let label = month_label(bucket);
            match months.last_mut() {
                Some(last) if last.label == label => last.weeks += 1,
                _ => months.push(Month::new(label, 1)),
            }
        }
        Ok(Self::new(months))
    }

    pub fn recalc(&mut self) {
        recalc_bounds(&mut self.months);
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Months that cover at least one week.
    pub fn active(&self) -> impl Iterator<Item = &Month> {
        self.months.iter().filter(|month| month.is_active())
    }

    pub fn total_weeks(&self) -> u32 {
        self.months
            .iter()
            .fold(0_u32, |total, month| total.saturating_add(month.weeks))
    }

    pub fn month_for_week(&self, week: u32) -> Option<&Month> {
        self.active().find(|month| month.contains(week))
    }

    pub fn push(&mut self, label: impl Into<String>, weeks: u32) -> &Month {
        self.months.push(Month::new(label, weeks));
        self.recalc();
        let last = self.months.len() - 1;
        &self.months[last]
    }

    /// Changes the week count of the month at 1-based `index`.
    pub fn set_weeks(&mut self, index: usize, weeks: u32) -> Result<()> {
        let month = index
            .checked_sub(1)
            .and_then(|idx| self.months.get_mut(idx))
            .ok_or_else(|| PlannerError::NotFound(format!("month #{index}")))?;
        month.weeks = weeks;
        self.recalc();
        Ok(())
    }

    pub fn rename(&mut self, index: usize, label: impl Into<String>) -> Result<()> {
        let month = index
            .checked_sub(1)
            .and_then(|idx| self.months.get_mut(idx))
            .ok_or_else(|| PlannerError::NotFound(format!("month #{index}")))?;
        month.label = label.into();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Month> {
        if index == 0 || index > self.months.len() {
            return Err(PlannerError::NotFound(format!("month #{index}")));
        }
        let removed = self.months.remove(index - 1);
        self.recalc();
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.months.clear();
    }
}

pub fn month_label(date: NaiveDate) -> String {
    date.format(LABEL_FORMAT).to_string()
}

/// Label of the month `offset` months after a `Mon YYYY` label, if it parses.
pub fn label_after(label: &str, offset: u32) -> Option<String> {
    let first = NaiveDate::parse_from_str(&format!("1 {}", label.trim()), "%d %b %Y").ok()?;
    first
        .checked_add_months(Months::new(offset))
        .map(month_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn recalc_bounds_is_contiguous() {
        let calendar = MonthCalendar::from_weeks([("Jan", 4), ("Feb", 0), ("Mar", 5)]);
        let months = calendar.months();
        assert_eq!((months[0].start, months[0].end), (1, 4));
        assert_eq!((months[1].start, months[1].end), (5, 4));
        assert_eq!((months[2].start, months[2].end), (5, 9));
        assert_eq!(months[2].index, 3);
    }

    #[test]
    fn huge_week_counts_saturate() {
        let calendar = MonthCalendar::from_weeks([("A", u32::MAX), ("B", 2)]);
        let months = calendar.months();
        assert_eq!(months[0].start, 1);
        assert_eq!(months[1].start, u32::MAX);
        assert_eq!(calendar.total_weeks(), u32::MAX);
    }

    #[test]
    fn leading_zero_week_month_occupies_nothing() {
        let calendar = MonthCalendar::from_weeks([("Dec", 0), ("Jan", 2)]);
        let months = calendar.months();
        assert_eq!((months[0].start, months[0].end), (1, 0));
        assert_eq!((months[1].start, months[1].end), (1, 2));
        assert!(calendar.month_for_week(1).is_some_and(|m| m.label == "Jan"));
    }

    #[test]
    fn auto_generate_groups_weeks_by_month() {
        let calendar = MonthCalendar::auto_generate(Some(date(2025, 1, 20)), 4).unwrap();
        let labels: Vec<_> = calendar
            .months()
            .iter()
            .map(|m| (m.label.as_str(), m.weeks))
            .collect();
        // Jan 20, Jan 27, Feb 3, Feb 10
        assert_eq!(labels, vec![("Jan 2025", 2), ("Feb 2025", 2)]);
        assert_eq!(calendar.total_weeks(), 4);
    }

    #[test]
    fn auto_generate_requires_start_date() {
        let err = MonthCalendar::auto_generate(None, 4).unwrap_err();
        assert!(matches!(err, PlannerError::MissingStartDate));
    }

    #[test]
    fn set_weeks_and_remove_recalculate() {
        let mut calendar = MonthCalendar::from_weeks([("A", 2), ("B", 2)]);
        calendar.set_weeks(1, 3).unwrap();
        assert_eq!(calendar.months()[1].start, 4);
        calendar.remove(1).unwrap();
        assert_eq!(calendar.months()[0].index, 1);
        assert_eq!(calendar.months()[0].start, 1);
        assert!(calendar.set_weeks(5, 1).is_err());
    }

    #[test]
    fn label_after_rolls_over_year() {
        assert_eq!(label_after("Dec 2025", 2).as_deref(), Some("Feb 2026"));
        assert_eq!(label_after("Month 3", 2), None);
    }
}
