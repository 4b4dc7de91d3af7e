use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};

use crate::domain::planning::WindowStage;

/// Computes the stage a window for `year` should be in at `now`. The
/// machine is wall-clock driven rather than event driven: the window for
/// year Y opens during October-December of Y-1, closes outside that span,
/// and locks for good once Y has fully passed.
///
/// The function is pure; callers inject the clock, which keeps stage
/// refresh testable and idempotent per (now, year) pair.
pub fn next_stage(now: DateTime<FixedOffset>, year: i32) -> WindowStage {
    if now.year() > year {
        WindowStage::Locked
    } else if now.year() == year - 1 && now.month() >= 10 {
        WindowStage::Open
    } else {
        WindowStage::Closed
    }
}

/// The year whose window is plannable at `now`: during October-December
/// that is next year, otherwise the current year's window (already closed
/// or locked) is the latest one.
pub fn planning_year_for(now: DateTime<FixedOffset>) -> i32 {
    if now.month() >= 10 {
        now.year() + 1
    } else {
        now.year()
    }
}

/// Default open/close dates for the window of `year`.
pub fn default_window_dates(year: i32) -> (NaiveDate, NaiveDate) {
    let opens = NaiveDate::from_ymd_opt(year - 1, 10, 1).expect("october 1st exists");
    let closes = NaiveDate::from_ymd_opt(year - 1, 12, 31).expect("december 31st exists");
    (opens, closes)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset};

    use super::{default_window_dates, next_stage, planning_year_for};
    use crate::domain::planning::WindowStage;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).expect("valid rfc3339")
    }

    #[test]
    fn window_opens_in_the_last_quarter_of_the_preceding_year() {
        assert_eq!(next_stage(at("2026-10-01T00:00:00+00:00"), 2027), WindowStage::Open);
        assert_eq!(next_stage(at("2026-12-31T23:59:59+00:00"), 2027), WindowStage::Open);
    }

    #[test]
    fn window_is_closed_outside_the_planning_quarter() {
        assert_eq!(next_stage(at("2026-09-30T23:59:59+00:00"), 2027), WindowStage::Closed);
        assert_eq!(next_stage(at("2027-01-01T00:00:00+00:00"), 2027), WindowStage::Closed);
        assert_eq!(next_stage(at("2027-06-15T12:00:00+00:00"), 2027), WindowStage::Closed);
    }

    #[test]
    fn window_locks_once_its_year_has_fully_passed() {
        assert_eq!(next_stage(at("2028-01-01T00:00:00+00:00"), 2027), WindowStage::Locked);
        assert_eq!(next_stage(at("2030-07-01T00:00:00+00:00"), 2027), WindowStage::Locked);
    }

    #[test]
    fn stage_refresh_is_idempotent_for_a_fixed_instant() {
        let now = at("2026-11-15T08:00:00+06:00");
        assert_eq!(next_stage(now, 2027), next_stage(now, 2027));
    }

    #[test]
    fn planning_year_rolls_over_in_october() {
        assert_eq!(planning_year_for(at("2026-09-30T00:00:00+00:00")), 2026);
        assert_eq!(planning_year_for(at("2026-10-01T00:00:00+00:00")), 2027);
    }

    #[test]
    fn default_dates_span_the_preceding_last_quarter() {
        let (opens, closes) = default_window_dates(2027);
        assert_eq!(opens.to_string(), "2026-10-01");
        assert_eq!(closes.to_string(), "2026-12-31");
    }
}
