use serde::{Deserialize, Serialize};

use crate::domain::leave::LeaveTypeId;
use crate::domain::user::UserId;

/// Per (user, leave type, year) balance record. Rows are created lazily on
/// the first balance-changing event or by year-end rollover and are never
/// physically deleted, only superseded by the next year's row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub user_id: UserId,
    pub leave_type_id: LeaveTypeId,
    pub year: i32,
    pub entitled: i64,
    pub used: i64,
    pub pending: i64,
    pub carried_forward: i64,
    pub available: i64,
}

impl LeaveBalance {
    pub fn opening(user_id: UserId, leave_type_id: LeaveTypeId, year: i32, entitled: i64) -> Self {
        Self {
            user_id,
            leave_type_id,
            year,
            entitled,
            used: 0,
            pending: 0,
            carried_forward: 0,
            available: entitled,
        }
    }

    /// The ledger invariant. Must hold after every mutation.
    pub fn is_consistent(&self) -> bool {
        self.available == self.entitled + self.carried_forward - self.used - self.pending
    }
}
