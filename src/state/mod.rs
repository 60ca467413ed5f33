pub mod debounce;
pub mod planner_state;

pub use debounce::CommitDebouncer;
pub use planner_state::{PlannerState, SubscriptionId};
