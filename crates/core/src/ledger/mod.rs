use serde::{Deserialize, Serialize};

use crate::domain::balance::LeaveBalance;
use crate::domain::leave::NORMAL_LEAVE_CODE;

/// A balance-affecting event in the life of a leave request.
///
/// `DaysApproved` deliberately does not release the pending counter: the
/// upstream system behaves this way and downstream reports depend on it.
/// See DESIGN.md before "fixing" it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceEvent {
    DaysPending(i64),
    DaysApproved(i64),
    DaysRejected(i64),
    DaysRestored(i64),
}

/// Applies `event` to `balance` and recomputes the available counter.
/// Returns false (leaving the row byte-for-byte untouched) for any leave
/// type other than the normal-leave code.
pub fn apply(balance: &mut LeaveBalance, leave_type_code: &str, event: BalanceEvent) -> bool {
    if leave_type_code != NORMAL_LEAVE_CODE {
        return false;
    }

    match event {
        BalanceEvent::DaysPending(days) => balance.pending += days,
        BalanceEvent::DaysApproved(days) => balance.used += days,
        BalanceEvent::DaysRejected(days) => {
            balance.pending = (balance.pending - days).max(0);
        }
        BalanceEvent::DaysRestored(days) => {
            balance.used = (balance.used - days).max(0);
        }
    }

    balance.available =
        balance.entitled + balance.carried_forward - balance.used - balance.pending;
    true
}
