use serde::{Deserialize, Serialize};

use super::coerce::{lenient_bool, lenient_f64, lenient_u32};

/// A single cost line in the scope ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeItem {
    pub code: String,
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub base: f64,
    #[serde(deserialize_with = "lenient_u32")]
    pub startwk: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub dur: u32,
    #[serde(deserialize_with = "lenient_bool")]
    pub spread: bool,
    #[serde(deserialize_with = "lenient_f64")]
    pub pdpct: f64,
    #[serde(deserialize_with = "lenient_u32")]
    pub pdweek: u32,
    pub notes: String,
}

impl Default for ScopeItem {
    fn default() -> Self {
        Self {
            code: String::new(),
            name: String::new(),
            base: 0.0,
            startwk: 1,
            dur: 1,
            spread: false,
            pdpct: 0.0,
            pdweek: 1,
            notes: String::new(),
        }
    }
}

/// Scope item whose timing runs past the last project week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrun {
    /// Position in the scope ledger (0-based).
    pub index: usize,
    pub code: String,
    pub name: String,
    pub from: i64,
    pub to: i64,
}

impl ScopeItem {
    pub fn new(code: impl Into<String>, name: impl Into<String>, base: f64) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            base,
            ..Self::default()
        }
    }

    pub fn timed(mut self, startwk: u32, dur: u32) -> Self {
        self.startwk = startwk;
        self.dur = dur;
        self
    }

    pub fn as_spread(mut self) -> Self {
        self.spread = true;
        self
    }

    pub fn with_deposit(mut self, pdpct: f64, pdweek: u32) -> Self {
        self.pdpct = pdpct;
        self.pdweek = pdweek;
        self
    }

    /// Repairs fields the engine relies on: start week at least 1, procurement
    /// deposit fraction within `0..=1`, and a deposit week of 1 when unset.
    pub fn sanitize(&mut self) {
        if !self.base.is_finite() || self.base < 0.0 {
            self.base = 0.0;
        }
        self.startwk = self.startwk.max(1);
        self.pdpct = self.deposit_fraction();
        if self.pdpct > 0.0 && self.pdweek == 0 {
            self.pdweek = 1;
        }
    }

    pub fn effective_start(&self) -> i64 {
        if self.spread {
            1
        } else {
            i64::from(self.startwk.max(1))
        }
    }

    /// Last week the item occupies before any capping; may exceed the project.
    pub fn effective_end(&self, project_weeks: u32) -> i64 {
        if self.spread {
            i64::from(project_weeks)
        } else {
            self.effective_start() + i64::from(self.dur) - 1
        }
    }

    /// Inclusive week range the item's remainder is spread over, clipped to the
    /// project. `None` when the range is empty.
    pub fn active_range(&self, project_weeks: u32) -> Option<(u32, u32)> {
        let start = self.effective_start();
        let end = self.effective_end(project_weeks).min(i64::from(project_weeks));
        if end < start {
            return None;
        }
        Some((start as u32, end as u32))
    }

    /// Procurement deposit fraction limited to `0..=1`.
    pub fn deposit_fraction(&self) -> f64 {
        if self.pdpct.is_finite() {
            self.pdpct.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Week the procurement deposit lands in, clamped to the project.
    pub fn deposit_week(&self, project_weeks: u32) -> u32 {
        self.pdweek.clamp(1, project_weeks.max(1))
    }

    pub fn marked_up(&self, markup_factor: f64) -> f64 {
        self.base * markup_factor
    }

    pub fn label(&self) -> String {
        match (self.code.is_empty(), self.name.is_empty()) {
            (false, false) => format!("{} {}", self.code, self.name),
            (false, true) => self.code.clone(),
            _ => self.name.clone(),
        }
    }
}

/// Lists every item whose effective end falls after `project_weeks`.
pub fn find_overruns(items: &[ScopeItem], project_weeks: u32) -> Vec<Overrun> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let to = item.effective_end(project_weeks);
            (to > i64::from(project_weeks)).then(|| Overrun {
                index,
                code: item.code.clone(),
                name: item.name.clone(),
                from: item.effective_start(),
                to,
            })
        })
        .collect()
}

/// Shortens overrunning items so they end on the last project week.
///
/// Spread items take the full project duration. Returns how many items changed.
pub fn cap_overruns(items: &mut [ScopeItem], project_weeks: u32) -> usize {
    let mut changed = 0;
    for item in items.iter_mut() {
        let capped = if item.spread {
            project_weeks
        } else if item.effective_end(project_weeks) > i64::from(project_weeks) {
            let remaining = i64::from(project_weeks) - item.effective_start() + 1;
            remaining.max(0) as u32
        } else {
            continue;
        };
        if item.dur != capped {
            item.dur = capped;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_item_ignores_stored_timing() {
        let item = ScopeItem::new("01", "Site", 100.0).timed(7, 2).as_spread();
        assert_eq!(item.active_range(12), Some((1, 12)));
        assert_eq!(item.effective_end(12), 12);
    }

    #[test]
    fn zero_duration_has_no_range() {
        let item = ScopeItem::new("02", "Permit", 50.0).timed(3, 0);
        assert_eq!(item.active_range(10), None);
    }

    #[test]
    fn range_is_clipped_to_project() {
        let item = ScopeItem::new("03", "Framing", 50.0).timed(8, 5);
        assert_eq!(item.active_range(10), Some((8, 10)));
    }

    #[test]
    fn start_past_project_has_no_range() {
        let item = ScopeItem::new("04", "Landscaping", 50.0).timed(14, 2);
        assert_eq!(item.active_range(10), None);
    }

    #[test]
    fn overruns_report_original_bounds() {
        let items = vec![
            ScopeItem::new("A", "Fits", 1.0).timed(1, 15),
            ScopeItem::new("B", "Runs long", 1.0).timed(10, 20),
        ];
        let overruns = find_overruns(&items, 15);
        assert_eq!(overruns.len(), 1);
        assert_eq!(overruns[0].index, 1);
        assert_eq!((overruns[0].from, overruns[0].to), (10, 29));
    }

    #[test]
    fn cap_overruns_trims_to_project_end() {
        let mut items = vec![
            ScopeItem::new("B", "Runs long", 1.0).timed(10, 20),
            ScopeItem::new("C", "Late start", 1.0).timed(18, 3),
            ScopeItem::new("D", "Spread", 1.0).timed(1, 3).as_spread(),
        ];
        let changed = cap_overruns(&mut items, 15);
        assert_eq!(changed, 3);
        assert_eq!(items[0].dur, 6);
        assert_eq!(items[1].dur, 0);
        assert_eq!(items[2].dur, 15);
        assert!(find_overruns(&items, 15).is_empty());
    }

    #[test]
    fn sanitize_defaults_deposit_week() {
        let mut item = ScopeItem::new("E", "Windows", 10.0).with_deposit(1.4, 0);
        item.startwk = 0;
        item.sanitize();
        assert_eq!(item.pdweek, 1);
        assert_eq!(item.pdpct, 1.0);
        assert_eq!(item.startwk, 1);
    }

    #[test]
    fn deserialize_tolerates_strings() {
        let json = r#"{"code":"F","name":"Doors","base":"2,000","startwk":"3","dur":"x","spread":"yes"}"#;
        let item: ScopeItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.base, 2000.0);
        assert_eq!(item.startwk, 3);
        assert_eq!(item.dur, 0);
        assert!(item.spread);
    }
}
