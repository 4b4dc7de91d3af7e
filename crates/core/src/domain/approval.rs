use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::leave::LeaveRequestId;
use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "PENDING"),
            ApprovalStatus::Approved => write!(f, "APPROVED"),
            ApprovalStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ApprovalStatus::Pending),
            "APPROVED" => Ok(ApprovalStatus::Approved),
            "REJECTED" => Ok(ApprovalStatus::Rejected),
            _ => Err(format!("invalid approval status: {s}")),
        }
    }
}

/// One link in the approval chain of a leave request. Escalation never
/// mutates the status of an existing link: it stamps `escalated_to_id` /
/// `escalated_at` on the old row and creates a fresh PENDING row at
/// `level + 1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub leave_request_id: LeaveRequestId,
    pub approver_id: UserId,
    pub level: u32,
    pub status: ApprovalStatus,
    pub escalated_to_id: Option<UserId>,
    pub escalated_at: Option<DateTime<Utc>>,
    pub escalation_reason: Option<String>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Approval {
    pub fn is_open(&self) -> bool {
        self.status == ApprovalStatus::Pending && self.escalated_to_id.is_none()
    }
}

/// A temporal grant: `delegate_id` acts for `delegator_id` over
/// [starts_on, ends_on] while active. Deactivated, never hard-deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateGrant {
    pub id: String,
    pub delegator_id: UserId,
    pub delegate_id: UserId,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub is_active: bool,
    pub reason: Option<String>,
}

impl DelegateGrant {
    pub fn in_effect(&self, today: NaiveDate) -> bool {
        self.is_active && self.starts_on <= today && today <= self.ends_on
    }

    pub fn overlaps(&self, starts_on: NaiveDate, ends_on: NaiveDate) -> bool {
        self.starts_on <= ends_on && starts_on <= self.ends_on
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::DelegateGrant;
    use crate::domain::user::UserId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn grant(starts: NaiveDate, ends: NaiveDate, active: bool) -> DelegateGrant {
        DelegateGrant {
            id: "dg-1".to_string(),
            delegator_id: UserId("u-mgr".to_string()),
            delegate_id: UserId("u-peer".to_string()),
            starts_on: starts,
            ends_on: ends,
            is_active: active,
            reason: None,
        }
    }

    #[test]
    fn grant_is_in_effect_only_inside_active_window() {
        let g = grant(date(2026, 5, 1), date(2026, 5, 10), true);
        assert!(g.in_effect(date(2026, 5, 1)));
        assert!(g.in_effect(date(2026, 5, 10)));
        assert!(!g.in_effect(date(2026, 4, 30)));
        assert!(!g.in_effect(date(2026, 5, 11)));

        let inactive = grant(date(2026, 5, 1), date(2026, 5, 10), false);
        assert!(!inactive.in_effect(date(2026, 5, 5)));
    }

    #[test]
    fn overlap_check_catches_shared_days_and_ignores_disjoint_windows() {
        let g = grant(date(2026, 5, 1), date(2026, 5, 10), true);
        assert!(g.overlaps(date(2026, 5, 10), date(2026, 5, 20)));
        assert!(g.overlaps(date(2026, 4, 20), date(2026, 5, 1)));
        assert!(!g.overlaps(date(2026, 5, 11), date(2026, 5, 20)));
        assert!(!g.overlaps(date(2026, 4, 1), date(2026, 4, 30)));
    }
}
