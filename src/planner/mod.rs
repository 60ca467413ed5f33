//! Planner domain models: settings, the month calendar, and the scope ledger.

pub mod calendar;
pub mod coerce;
pub mod document;
pub mod scope;
pub mod settings;

pub use calendar::{label_after, month_label, recalc_bounds, Month, MonthCalendar};
pub use coerce::{parse_number, parse_weeks, round2};
pub use document::PlanDocument;
pub use scope::{cap_overruns, find_overruns, Overrun, ScopeItem};
pub use settings::{Settings, Toggles, MAX_PROJECT_WEEKS};
