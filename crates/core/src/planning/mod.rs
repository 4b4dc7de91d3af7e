pub mod analysis;
pub mod plan;
pub mod window;

pub use analysis::{
    analyze_team, GapFinding, OverlapFinding, OverlapRisk, PlannerEntry, TeamAnalysis, TeamPlan,
};
pub use plan::{transition, validate_date_change, PlanEvent};
pub use window::{default_window_dates, next_stage, planning_year_for};
