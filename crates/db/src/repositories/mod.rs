use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use furlough_core::audit::AuditEvent;
use furlough_core::domain::approval::{Approval, ApprovalId, ApprovalStatus, DelegateGrant};
use furlough_core::domain::balance::LeaveBalance;
use furlough_core::domain::leave::{
    LeaveRequest, LeaveRequestId, LeaveStatus, LeaveType, LeaveTypeId,
};
use furlough_core::domain::planning::{
    HolidayPlan, PlanDate, PlanId, PlanStatus, PlanningWindow, WindowId, WindowStage,
};
use furlough_core::domain::user::{UserId, UserRecord};
use furlough_core::effects::NotificationRequest;
use furlough_core::ledger::BalanceEvent;
use furlough_core::rollover::RolloverInput;

pub mod approval;
pub mod audit;
pub mod balance;
pub mod delegate;
pub mod directory;
pub mod holiday;
pub mod leave;
pub mod notification;
pub mod planning;
pub mod settings;

pub use approval::SqlApprovalRepository;
pub use audit::SqlAuditRepository;
pub use balance::SqlBalanceRepository;
pub use delegate::SqlDelegateRepository;
pub use directory::SqlDirectoryRepository;
pub use holiday::SqlHolidayRepository;
pub use leave::SqlLeaveRepository;
pub use notification::{NotificationRecord, SqlNotificationRepository};
pub use planning::SqlPlanningRepository;
pub use settings::SqlSettingsRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

pub(crate) fn parse_utc(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{raw}`: {e}")))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, RepositoryError> {
    raw.parse::<NaiveDate>()
        .map_err(|e| RepositoryError::Decode(format!("bad date `{raw}`: {e}")))
}

pub(crate) fn parse_enum<T>(raw: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse::<T>().map_err(RepositoryError::Decode)
}

/// Read-only view of the org directory. The core never writes user rows;
/// the insert is there for fixtures and the surrounding platform.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError>;
    /// Active HR/EXECUTIVE users in stable id order, for the end-of-chain
    /// fallback position.
    async fn active_fallback_candidates(&self) -> Result<Vec<UserRecord>, RepositoryError>;
    async fn direct_reports(&self, manager_id: &UserId)
        -> Result<Vec<UserRecord>, RepositoryError>;
    async fn department_members(
        &self,
        director_id: &UserId,
    ) -> Result<Vec<UserRecord>, RepositoryError>;
    async fn insert_user(&self, user: &UserRecord) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn create_request(&self, request: &LeaveRequest) -> Result<(), RepositoryError>;
    async fn find_request(
        &self,
        id: &LeaveRequestId,
    ) -> Result<Option<LeaveRequest>, RepositoryError>;
    async fn set_request_status(
        &self,
        id: &LeaveRequestId,
        status: LeaveStatus,
    ) -> Result<bool, RepositoryError>;
    /// Whether `user_id` has an APPROVED leave request covering `date`.
    async fn has_approved_leave_covering(
        &self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<bool, RepositoryError>;
    async fn find_type(&self, id: &LeaveTypeId) -> Result<Option<LeaveType>, RepositoryError>;
    async fn insert_type(&self, leave_type: &LeaveType) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait BalanceRepository: Send + Sync {
    async fn find(
        &self,
        user_id: &UserId,
        leave_type_id: &LeaveTypeId,
        year: i32,
    ) -> Result<Option<LeaveBalance>, RepositoryError>;
    async fn upsert(&self, balance: &LeaveBalance) -> Result<(), RepositoryError>;
    /// Applies a balance event as a single conditional UPDATE so concurrent
    /// writers cannot lose increments. Returns false when no balance row
    /// exists for the key (the caller treats that as a silent no-op).
    async fn apply_event(
        &self,
        user_id: &UserId,
        leave_type_id: &LeaveTypeId,
        year: i32,
        event: BalanceEvent,
    ) -> Result<bool, RepositoryError>;
    /// Balance rows of active users whose leave type carries forward,
    /// joined with the type's carry-forward parameters.
    async fn rollover_inputs(&self, from_year: i32)
        -> Result<Vec<RolloverInput>, RepositoryError>;
    async fn any_carried_forward(&self, year: i32) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<Approval>, RepositoryError>;
    /// Inserts a PENDING approval unless one is already open for the same
    /// (request, approver) pair. Returns whether a row was created.
    async fn insert_pending(&self, approval: &Approval) -> Result<bool, RepositoryError>;
    /// The PENDING, unescalated approval currently gating a request, if any.
    async fn open_for_request(
        &self,
        request_id: &LeaveRequestId,
    ) -> Result<Option<Approval>, RepositoryError>;
    async fn list_for_request(
        &self,
        request_id: &LeaveRequestId,
    ) -> Result<Vec<Approval>, RepositoryError>;
    /// PENDING, unescalated approvals created at or before `threshold`.
    async fn list_stale_pending(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Approval>, RepositoryError>;
    async fn pending_assigned_since(
        &self,
        approver_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError>;
    /// One transaction: stamp the old approval as escalated and insert the
    /// replacement at the next level unless an identical open approval
    /// already exists. Returns whether the replacement was created.
    async fn escalate(
        &self,
        old_id: &ApprovalId,
        reason: &str,
        escalated_at: DateTime<Utc>,
        replacement: &Approval,
    ) -> Result<bool, RepositoryError>;
    /// Records a terminal decision on a still-PENDING approval.
    async fn decide(
        &self,
        id: &ApprovalId,
        status: ApprovalStatus,
        comments: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
    /// One transaction: approve both the approval and its leave request,
    /// used when the escalation ceiling auto-approves.
    async fn auto_approve(
        &self,
        id: &ApprovalId,
        request_id: &LeaveRequestId,
        comment: &str,
        decided_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DelegateRepository: Send + Sync {
    async fn insert(&self, grant: &DelegateGrant) -> Result<(), RepositoryError>;
    async fn active_for(
        &self,
        delegator_id: &UserId,
        today: NaiveDate,
    ) -> Result<Option<DelegateGrant>, RepositoryError>;
    async fn has_overlapping_active(
        &self,
        delegator_id: &UserId,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> Result<bool, RepositoryError>;
    async fn deactivate(&self, id: &str) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait HolidayRepository: Send + Sync {
    async fn active_dates(&self) -> Result<Vec<NaiveDate>, RepositoryError>;
    async fn upsert(
        &self,
        date: NaiveDate,
        name: &str,
        is_active: bool,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn all(&self) -> Result<BTreeMap<String, String>, RepositoryError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PlanningRepository: Send + Sync {
    async fn find_window_by_year(
        &self,
        year: i32,
    ) -> Result<Option<PlanningWindow>, RepositoryError>;
    async fn insert_window(&self, window: &PlanningWindow) -> Result<(), RepositoryError>;
    async fn set_window_stage(
        &self,
        id: &WindowId,
        stage: WindowStage,
    ) -> Result<bool, RepositoryError>;
    async fn find_plan(
        &self,
        user_id: &UserId,
        year: i32,
    ) -> Result<Option<HolidayPlan>, RepositoryError>;
    async fn insert_plan(&self, plan: &HolidayPlan) -> Result<(), RepositoryError>;
    /// One transaction: delete the old date set, insert the new one, bump
    /// the version. Returns the new version.
    async fn replace_dates(
        &self,
        plan_id: &PlanId,
        dates: &[PlanDate],
    ) -> Result<u32, RepositoryError>;
    async fn set_plan_status(
        &self,
        plan_id: &PlanId,
        status: PlanStatus,
        submitted_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepositoryError>;
    async fn plans_for_users(
        &self,
        user_ids: &[UserId],
        year: i32,
    ) -> Result<Vec<HolidayPlan>, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: &NotificationRequest) -> Result<(), RepositoryError>;
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<NotificationRecord>, RepositoryError>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError>;
    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>, RepositoryError>;
}
