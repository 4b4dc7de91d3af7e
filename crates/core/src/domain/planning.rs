use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub String);

/// Stage of the yearly planning window. Transitions are driven by the
/// wall clock, not by explicit events: see `planning::next_stage`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowStage {
    Closed,
    Open,
    Locked,
}

impl std::fmt::Display for WindowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowStage::Closed => write!(f, "CLOSED"),
            WindowStage::Open => write!(f, "OPEN"),
            WindowStage::Locked => write!(f, "LOCKED"),
        }
    }
}

impl std::str::FromStr for WindowStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLOSED" => Ok(WindowStage::Closed),
            "OPEN" | "DRAFT" => Ok(WindowStage::Open),
            "LOCKED" => Ok(WindowStage::Locked),
            _ => Err(format!("invalid window stage: {s}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningWindow {
    pub id: WindowId,
    pub year: i32,
    pub opens_on: NaiveDate,
    pub closes_on: NaiveDate,
    pub stage: WindowStage,
    pub is_active: bool,
}

impl PlanningWindow {
    /// Plan dates may only be mutated while the window is not locked.
    pub fn accepts_date_changes(&self) -> bool {
        matches!(self.stage, WindowStage::Open | WindowStage::Closed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Draft,
    Submitted,
    Reviewed,
    Finalized,
    Locked,
}

impl PlanStatus {
    pub fn accepts_date_changes(self) -> bool {
        matches!(self, PlanStatus::Draft | PlanStatus::Submitted | PlanStatus::Reviewed)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Draft => write!(f, "DRAFT"),
            PlanStatus::Submitted => write!(f, "SUBMITTED"),
            PlanStatus::Reviewed => write!(f, "REVIEWED"),
            PlanStatus::Finalized => write!(f, "FINALIZED"),
            PlanStatus::Locked => write!(f, "LOCKED"),
        }
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(PlanStatus::Draft),
            "SUBMITTED" => Ok(PlanStatus::Submitted),
            "REVIEWED" => Ok(PlanStatus::Reviewed),
            "FINALIZED" => Ok(PlanStatus::Finalized),
            "LOCKED" => Ok(PlanStatus::Locked),
            _ => Err(format!("invalid plan status: {s}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanPriority {
    Essential,
    Preferred,
    NiceToHave,
}

impl std::fmt::Display for PlanPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanPriority::Essential => write!(f, "ESSENTIAL"),
            PlanPriority::Preferred => write!(f, "PREFERRED"),
            PlanPriority::NiceToHave => write!(f, "NICE_TO_HAVE"),
        }
    }
}

impl std::str::FromStr for PlanPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ESSENTIAL" => Ok(PlanPriority::Essential),
            "PREFERRED" => Ok(PlanPriority::Preferred),
            "NICE_TO_HAVE" => Ok(PlanPriority::NiceToHave),
            _ => Err(format!("invalid plan priority: {s}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDate {
    pub date: NaiveDate,
    pub priority: PlanPriority,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayPlan {
    pub id: PlanId,
    pub user_id: UserId,
    pub window_id: WindowId,
    pub year: i32,
    pub status: PlanStatus,
    pub version: u32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub dates: Vec<PlanDate>,
}

/// Upper bound on planned days per user per year.
pub const MAX_PLAN_DATES: usize = 30;
