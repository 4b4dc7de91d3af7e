pub mod approvals;
pub mod audit;
pub mod config;
pub mod domain;
pub mod effects;
pub mod errors;
pub mod ledger;
pub mod planning;
pub mod rollover;
pub mod settings;
pub mod workdays;

pub use approvals::{
    Availability, ChainCandidate, ChainPosition, ChainSnapshot, DelegateCandidate, Resolution,
    ResolvedApprover, SkippedApprover,
};
pub use audit::AuditEvent;
pub use domain::approval::{Approval, ApprovalId, ApprovalStatus, DelegateGrant};
pub use domain::balance::LeaveBalance;
pub use domain::leave::{
    LeaveRequest, LeaveRequestId, LeaveStatus, LeaveType, LeaveTypeId, NORMAL_LEAVE_CODE,
};
pub use domain::planning::{
    HolidayPlan, PlanDate, PlanId, PlanPriority, PlanStatus, PlanningWindow, WindowId, WindowStage,
    MAX_PLAN_DATES,
};
pub use domain::user::{Role, UserId, UserRecord};
pub use effects::{Effect, EmailRequest, NotificationRequest};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ledger::BalanceEvent;
pub use rollover::{RolloverInput, RolloverOutcome};
pub use settings::EscalationConfig;
