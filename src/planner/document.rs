use serde::{Deserialize, Serialize};

use super::{calendar::MonthCalendar, scope::ScopeItem, settings::Settings, settings::Toggles};

/// The persisted planner document: `{ settings, months, scope, toggles }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanDocument {
    pub settings: Settings,
    pub months: MonthCalendar,
    pub scope: Vec<ScopeItem>,
    pub toggles: Toggles,
}

impl PlanDocument {
    pub fn new(settings: Settings, months: MonthCalendar, scope: Vec<ScopeItem>) -> Self {
        let mut document = Self {
            settings,
            months,
            scope,
            toggles: Toggles::default(),
        };
        document.normalize();
        document
    }

    /// Restores derived fields and clamps values loaded from older or hand-edited files.
    pub fn normalize(&mut self) {
        self.settings = self.settings.normalized();
        self.months.recalc();
        for item in &mut self.scope {
            item.sanitize();
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut document: PlanDocument = serde_json::from_str(json)?;
        document.normalize();
        Ok(document)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_recomputes_bounds() {
        let json = r#"{
            "settings": {"projectWeeks": 0},
            "months": [{"label": "Jan", "weeks": 3}, {"label": "Feb", "weeks": "2"}],
            "scope": [{"code": "01", "base": 10, "pdpct": 0.5, "pdweek": 0}]
        }"#;
        let document = PlanDocument::from_json(json).unwrap();
        assert_eq!(document.settings.project_weeks, 1);
        let feb = &document.months.months()[1];
        assert_eq!((feb.index, feb.start, feb.end), (2, 4, 5));
        assert_eq!(document.scope[0].pdweek, 1);
        assert!(document.toggles.hst);
    }

    #[test]
    fn json_round_trip_keeps_top_level_shape() {
        let document = PlanDocument::new(
            Settings::flat(4),
            MonthCalendar::from_weeks([("Jan", 4)]),
            vec![ScopeItem::new("01", "Demo", 1000.0).timed(1, 4)],
        );
        let value: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        for key in ["settings", "months", "scope", "toggles"] {
            assert!(keys.iter().any(|k| k == key), "missing {key}");
        }
        assert!(value["months"].is_array());
        assert_eq!(value["scope"][0]["startwk"], 1);
        assert_eq!(PlanDocument::from_json(&document.to_json().unwrap()).unwrap(), document);
    }
}
