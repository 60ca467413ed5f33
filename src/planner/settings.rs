use serde::{Deserialize, Serialize};

use super::coerce::{lenient_bool, lenient_f64, lenient_u32};

/// Longest project the planner accepts, in weeks (one hundred years).
pub const MAX_PROJECT_WEEKS: u32 = 5200;

/// Project-wide numeric parameters. Percentages are fractions (0.20 = 20%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient_u32")]
    pub project_weeks: u32,
    #[serde(deserialize_with = "lenient_f64")]
    pub markup_pct: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub hst_pct: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub holdback_pct: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub deposit_pct: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub deposit_credit_pct: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_weeks: 26,
            markup_pct: 0.15,
            hst_pct: 0.13,
            holdback_pct: 0.10,
            deposit_pct: 0.10,
            deposit_credit_pct: 0.10,
        }
    }
}

impl Settings {
    /// Settings with every percentage zeroed; handy as a base for scenarios.
    pub fn flat(project_weeks: u32) -> Self {
        Self {
            project_weeks: project_weeks.clamp(1, MAX_PROJECT_WEEKS),
            markup_pct: 0.0,
            hst_pct: 0.0,
            holdback_pct: 0.0,
            deposit_pct: 0.0,
            deposit_credit_pct: 0.0,
        }
    }

    /// Returns a copy with `project_weeks` clamped to `1..=MAX_PROJECT_WEEKS`.
    pub fn normalized(&self) -> Self {
        Self {
            project_weeks: self.project_weeks.clamp(1, MAX_PROJECT_WEEKS),
            ..self.clone()
        }
    }

    /// Multiplier applied to every base amount.
    pub fn markup_factor(&self) -> f64 {
        1.0 + self.markup_pct
    }

    /// Updates a field by its document key or a short alias. Unknown keys are rejected,
    /// unreadable values coerce to zero.
    pub fn set_field(&mut self, key: &str, raw: &str) -> bool {
        use super::coerce::{parse_number, parse_weeks};

        match key.to_ascii_lowercase().as_str() {
            "projectweeks" | "weeks" => {
                self.project_weeks = parse_weeks(raw).clamp(1, MAX_PROJECT_WEEKS)
            }
            "markuppct" | "markup" => self.markup_pct = parse_number(raw),
            "hstpct" | "hst" => self.hst_pct = parse_number(raw),
            "holdbackpct" | "holdback" => self.holdback_pct = parse_number(raw),
            "depositpct" | "deposit" => self.deposit_pct = parse_number(raw),
            "depositcreditpct" | "credit" => self.deposit_credit_pct = parse_number(raw),
            _ => return false,
        }
        true
    }
}

/// Switches for the optional deductions and tax in the monthly rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Toggles {
    #[serde(deserialize_with = "lenient_bool")]
    pub deposit_credit: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub holdback: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub hst: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            deposit_credit: true,
            holdback: true,
            hst: true,
        }
    }
}

impl Toggles {
    pub fn none() -> Self {
        Self {
            deposit_credit: false,
            holdback: false,
            hst: false,
        }
    }

    /// Flips a named switch; returns `false` for unknown names.
    pub fn set(&mut self, name: &str, enabled: bool) -> bool {
        match name.to_ascii_lowercase().as_str() {
            "deposit" | "depositcredit" | "credit" => self.deposit_credit = enabled,
            "holdback" => self.holdback = enabled,
            "hst" | "tax" => self.hst = enabled,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_deserialize_coerces_bad_numbers() {
        let json = r#"{"projectWeeks":"12","markupPct":"abc","hstPct":0.13}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.project_weeks, 12);
        assert_eq!(settings.markup_pct, 0.0);
        assert_eq!(settings.hst_pct, 0.13);
        assert_eq!(settings.holdback_pct, Settings::default().holdback_pct);
    }

    #[test]
    fn settings_serialize_with_document_keys() {
        let json = serde_json::to_value(Settings::flat(4)).unwrap();
        for key in [
            "projectWeeks",
            "markupPct",
            "hstPct",
            "holdbackPct",
            "depositPct",
            "depositCreditPct",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn normalized_clamps_zero_weeks() {
        let mut settings = Settings::flat(1);
        settings.project_weeks = 0;
        assert_eq!(settings.normalized().project_weeks, 1);
    }

    #[test]
    fn set_field_accepts_aliases() {
        let mut settings = Settings::flat(4);
        assert!(settings.set_field("markup", "20%"));
        assert!((settings.markup_pct - 0.2).abs() < 1e-12);
        assert!(settings.set_field("weeks", "0"));
        assert_eq!(settings.project_weeks, 1);
        assert!(!settings.set_field("colour", "blue"));
    }

    #[test]
    fn project_weeks_capped_at_maximum() {
        let mut settings = Settings::flat(4);
        assert!(settings.set_field("weeks", "1e12"));
        assert_eq!(settings.project_weeks, MAX_PROJECT_WEEKS);

        settings.project_weeks = u32::MAX;
        assert_eq!(settings.normalized().project_weeks, MAX_PROJECT_WEEKS);
    }

    #[test]
    fn toggles_default_on_and_set_by_name() {
        let mut toggles = Toggles::default();
        assert!(toggles.deposit_credit && toggles.holdback && toggles.hst);
        assert!(toggles.set("HST", false));
        assert!(!toggles.hst);
        assert!(!toggles.set("rebate", true));
    }
}
