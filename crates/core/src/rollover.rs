use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::leave::LeaveTypeId;
use crate::domain::user::UserId;

/// One user's balance position feeding the year-end computation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverInput {
    pub user_id: UserId,
    pub leave_type_id: LeaveTypeId,
    pub entitled: i64,
    pub used: i64,
    pub carried_forward: i64,
    pub carry_forward_pct: u32,
    pub max_carry_forward: i64,
    pub days_allowed: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverOutcome {
    pub user_id: UserId,
    pub leave_type_id: LeaveTypeId,
    pub from_year: i32,
    pub to_year: i32,
    pub unused: i64,
    pub carried_forward: i64,
    pub lost: i64,
    pub next_entitled: i64,
    pub next_available: i64,
}

/// Pure carry-forward computation for one balance row: percentage of unused
/// days (floored to whole days) capped at the type's maximum. No writes;
/// calling it twice on the same input returns the same outcome.
pub fn compute(from_year: i32, to_year: i32, input: &RolloverInput) -> RolloverOutcome {
    let unused = (input.entitled + input.carried_forward - input.used).max(0);
    let eligible = (Decimal::from(unused) * Decimal::from(input.carry_forward_pct)
        / Decimal::from(100))
    .floor()
    .to_i64()
    .unwrap_or(0);
    let carried = eligible.min(input.max_carry_forward);

    RolloverOutcome {
        user_id: input.user_id.clone(),
        leave_type_id: input.leave_type_id.clone(),
        from_year,
        to_year,
        unused,
        carried_forward: carried,
        lost: unused - carried,
        next_entitled: input.days_allowed,
        next_available: input.days_allowed + carried,
    }
}
