use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::planning::{PlanDate, PlanPriority};
use crate::domain::user::UserId;

/// Consecutive team-planned dates further apart than this flag a coverage
/// gap worth surfacing to the manager.
pub const EXTENDED_GAP_DAYS: i64 = 7;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPlan {
    pub user_id: UserId,
    pub dates: Vec<PlanDate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverlapRisk {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerEntry {
    pub user_id: UserId,
    pub priority: PlanPriority,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapFinding {
    pub date: NaiveDate,
    pub planners: Vec<PlannerEntry>,
    pub risk: OverlapRisk,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapFinding {
    pub after: NaiveDate,
    pub before: NaiveDate,
    pub gap_days: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAnalysis {
    pub overlaps: Vec<OverlapFinding>,
    pub gaps: Vec<GapFinding>,
}

/// Builds the calendar-date view of a team's plans and flags overlaps and
/// extended gaps. Scoping (direct reports vs. a director's department) is
/// the caller's concern; this function sees the final team roster.
///
/// The gap heuristic is deliberately coarse: it looks at the sorted union
/// of all planned dates across the team, not at per-person coverage.
pub fn analyze_team(plans: &[TeamPlan]) -> TeamAnalysis {
    let mut by_date: BTreeMap<NaiveDate, Vec<PlannerEntry>> = BTreeMap::new();
    for plan in plans {
        for date in &plan.dates {
            by_date.entry(date.date).or_default().push(PlannerEntry {
                user_id: plan.user_id.clone(),
                priority: date.priority,
            });
        }
    }

    let overlaps = by_date
        .iter()
        .filter(|(_, planners)| planners.len() > 1)
        .map(|(date, planners)| OverlapFinding {
            date: *date,
            planners: planners.clone(),
            risk: risk_for(planners),
        })
        .collect();

    let dates: Vec<NaiveDate> = by_date.keys().copied().collect();
    let gaps = dates
        .windows(2)
        .filter_map(|pair| {
            let gap_days = (pair[1] - pair[0]).num_days();
            (gap_days > EXTENDED_GAP_DAYS).then_some(GapFinding {
                after: pair[0],
                before: pair[1],
                gap_days,
            })
        })
        .collect();

    TeamAnalysis { overlaps, gaps }
}

fn risk_for(planners: &[PlannerEntry]) -> OverlapRisk {
    let essential =
        planners.iter().filter(|entry| entry.priority == PlanPriority::Essential).count();
    let preferred =
        planners.iter().filter(|entry| entry.priority == PlanPriority::Preferred).count();

    if essential >= 2 {
        OverlapRisk::High
    } else if (essential == 1 && preferred >= 1) || planners.len() >= 3 {
        OverlapRisk::Medium
    } else {
        OverlapRisk::Low
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{analyze_team, OverlapRisk, TeamPlan, EXTENDED_GAP_DAYS};
    use crate::domain::planning::{PlanDate, PlanPriority};
    use crate::domain::user::UserId;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, m, d).expect("valid date")
    }

    fn plan(user: &str, entries: &[(NaiveDate, PlanPriority)]) -> TeamPlan {
        TeamPlan {
            user_id: UserId(user.to_string()),
            dates: entries
                .iter()
                .map(|(d, priority)| PlanDate { date: *d, priority: *priority, reason: None })
                .collect(),
        }
    }

    #[test]
    fn single_planner_dates_raise_no_overlap() {
        let analysis = analyze_team(&[
            plan("u-a", &[(date(7, 1), PlanPriority::Essential)]),
            plan("u-b", &[(date(7, 2), PlanPriority::Essential)]),
        ]);
        assert!(analysis.overlaps.is_empty());
    }

    #[test]
    fn two_essential_planners_on_one_date_is_high_risk() {
        let analysis = analyze_team(&[
            plan("u-a", &[(date(7, 1), PlanPriority::Essential)]),
            plan("u-b", &[(date(7, 1), PlanPriority::Essential)]),
        ]);
        assert_eq!(analysis.overlaps.len(), 1);
        assert_eq!(analysis.overlaps[0].risk, OverlapRisk::High);
        assert_eq!(analysis.overlaps[0].planners.len(), 2);
    }

    #[test]
    fn essential_plus_preferred_is_medium_risk() {
        let analysis = analyze_team(&[
            plan("u-a", &[(date(7, 1), PlanPriority::Essential)]),
            plan("u-b", &[(date(7, 1), PlanPriority::Preferred)]),
        ]);
        assert_eq!(analysis.overlaps[0].risk, OverlapRisk::Medium);
    }

    #[test]
    fn three_planners_are_medium_risk_even_without_essential() {
        let analysis = analyze_team(&[
            plan("u-a", &[(date(7, 1), PlanPriority::NiceToHave)]),
            plan("u-b", &[(date(7, 1), PlanPriority::NiceToHave)]),
            plan("u-c", &[(date(7, 1), PlanPriority::Preferred)]),
        ]);
        assert_eq!(analysis.overlaps[0].risk, OverlapRisk::Medium);
    }

    #[test]
    fn two_casual_planners_are_low_risk() {
        let analysis = analyze_team(&[
            plan("u-a", &[(date(7, 1), PlanPriority::Preferred)]),
            plan("u-b", &[(date(7, 1), PlanPriority::NiceToHave)]),
        ]);
        assert_eq!(analysis.overlaps[0].risk, OverlapRisk::Low);
    }

    #[test]
    fn gaps_longer_than_a_week_are_flagged_team_wide() {
        let analysis = analyze_team(&[
            plan("u-a", &[(date(7, 1), PlanPriority::Preferred)]),
            plan("u-b", &[(date(7, 12), PlanPriority::Preferred)]),
        ]);
        assert_eq!(analysis.gaps.len(), 1);
        assert_eq!(analysis.gaps[0].after, date(7, 1));
        assert_eq!(analysis.gaps[0].before, date(7, 12));
        assert_eq!(analysis.gaps[0].gap_days, 11);
    }

    #[test]
    fn a_seven_day_spacing_is_not_a_gap() {
        let analysis = analyze_team(&[
            plan("u-a", &[(date(7, 1), PlanPriority::Preferred)]),
            plan("u-b", &[(date(7, 1 + EXTENDED_GAP_DAYS as u32), PlanPriority::Preferred)]),
        ]);
        assert!(analysis.gaps.is_empty());
    }

    #[test]
    fn empty_team_yields_an_empty_analysis() {
        let analysis = analyze_team(&[]);
        assert!(analysis.overlaps.is_empty());
        assert!(analysis.gaps.is_empty());
    }
}
