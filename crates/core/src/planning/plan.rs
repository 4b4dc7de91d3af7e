use crate::domain::planning::{PlanStatus, PlanningWindow, MAX_PLAN_DATES};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanEvent {
    Submit,
    Review,
    Finalize,
    Lock,
}

/// Applies a lifecycle event to a plan status. Submission from SUBMITTED is
/// allowed (re-submission refreshes the timestamp); LOCKED is an external
/// freeze reachable from any state and terminal.
pub fn transition(current: PlanStatus, event: PlanEvent) -> Result<PlanStatus, DomainError> {
    use PlanEvent::{Finalize, Lock, Review, Submit};
    use PlanStatus::{Draft, Finalized, Locked, Reviewed, Submitted};

    let next = match (current, event) {
        (Draft, Submit) | (Submitted, Submit) | (Reviewed, Submit) => Submitted,
        (Submitted, Review) => Reviewed,
        (Reviewed, Finalize) => Finalized,
        (_, Lock) => Locked,
        (from, _) => {
            let to = match event {
                Submit => Submitted,
                Review => Reviewed,
                Finalize => Finalized,
                Lock => Locked,
            };
            return Err(DomainError::InvalidPlanTransition { from, to });
        }
    };
    Ok(next)
}

/// Guards a date-set replacement: the window must accept changes, the plan
/// must be in a writable status, and the new set must fit the cap.
pub fn validate_date_change(
    window: &PlanningWindow,
    status: PlanStatus,
    new_date_count: usize,
) -> Result<(), DomainError> {
    if !window.accepts_date_changes() {
        return Err(DomainError::WindowNotWritable { stage: window.stage });
    }
    if !status.accepts_date_changes() {
        return Err(DomainError::PlanNotWritable { status });
    }
    if new_date_count > MAX_PLAN_DATES {
        return Err(DomainError::PlanDateLimitExceeded {
            count: new_date_count,
            max: MAX_PLAN_DATES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{transition, validate_date_change, PlanEvent};
    use crate::domain::planning::{PlanStatus, PlanningWindow, WindowId, WindowStage};
    use crate::errors::DomainError;

    fn window(stage: WindowStage) -> PlanningWindow {
        PlanningWindow {
            id: WindowId("w-2027".to_string()),
            year: 2027,
            opens_on: NaiveDate::from_ymd_opt(2026, 10, 1).expect("valid"),
            closes_on: NaiveDate::from_ymd_opt(2026, 12, 31).expect("valid"),
            stage,
            is_active: true,
        }
    }

    #[test]
    fn happy_path_walks_draft_to_finalized() {
        let submitted = transition(PlanStatus::Draft, PlanEvent::Submit).expect("submit");
        let reviewed = transition(submitted, PlanEvent::Review).expect("review");
        let finalized = transition(reviewed, PlanEvent::Finalize).expect("finalize");
        assert_eq!(finalized, PlanStatus::Finalized);
    }

    #[test]
    fn resubmission_is_allowed() {
        assert_eq!(
            transition(PlanStatus::Submitted, PlanEvent::Submit).expect("resubmit"),
            PlanStatus::Submitted
        );
        assert_eq!(
            transition(PlanStatus::Reviewed, PlanEvent::Submit).expect("resubmit after review"),
            PlanStatus::Submitted
        );
    }

    #[test]
    fn finalize_requires_review_first() {
        let error = transition(PlanStatus::Submitted, PlanEvent::Finalize).expect_err("no review");
        assert_eq!(
            error,
            DomainError::InvalidPlanTransition {
                from: PlanStatus::Submitted,
                to: PlanStatus::Finalized
            }
        );
    }

    #[test]
    fn lock_freezes_from_any_state() {
        for status in [
            PlanStatus::Draft,
            PlanStatus::Submitted,
            PlanStatus::Reviewed,
            PlanStatus::Finalized,
            PlanStatus::Locked,
        ] {
            assert_eq!(transition(status, PlanEvent::Lock).expect("lock"), PlanStatus::Locked);
        }
    }

    #[test]
    fn date_changes_rejected_in_locked_window() {
        let error = validate_date_change(&window(WindowStage::Locked), PlanStatus::Draft, 5)
            .expect_err("locked window");
        assert_eq!(error, DomainError::WindowNotWritable { stage: WindowStage::Locked });
    }

    #[test]
    fn date_changes_rejected_for_finalized_or_locked_plans() {
        for status in [PlanStatus::Finalized, PlanStatus::Locked] {
            let error = validate_date_change(&window(WindowStage::Open), status, 5)
                .expect_err("frozen plan");
            assert_eq!(error, DomainError::PlanNotWritable { status });
        }
    }

    #[test]
    fn date_changes_allowed_in_closed_window_while_plan_is_writable() {
        validate_date_change(&window(WindowStage::Closed), PlanStatus::Reviewed, 30)
            .expect("closed window still accepts date edits");
    }

    #[test]
    fn thirty_first_date_is_rejected() {
        let error = validate_date_change(&window(WindowStage::Open), PlanStatus::Draft, 31)
            .expect_err("over cap");
        assert_eq!(error, DomainError::PlanDateLimitExceeded { count: 31, max: 30 });
    }
}
