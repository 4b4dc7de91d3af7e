use std::sync::Arc;

use furlough_core::domain::leave::LeaveTypeId;
use furlough_core::domain::user::UserId;
use furlough_core::ledger::BalanceEvent;
use furlough_db::repositories::{BalanceRepository, LeaveRepository};

use crate::ServiceError;

/// The balance ledger operations the web layer calls on terminal request
/// decisions. Only the normal-leave type code touches the ledger; every
/// other code is a silent no-op, as is a missing balance row.
#[derive(Clone)]
pub struct BalanceService {
    leave: Arc<dyn LeaveRepository>,
    balances: Arc<dyn BalanceRepository>,
}

impl BalanceService {
    pub fn new(leave: Arc<dyn LeaveRepository>, balances: Arc<dyn BalanceRepository>) -> Self {
        Self { leave, balances }
    }

    pub async fn on_pending(
        &self,
        user_id: &UserId,
        leave_type_id: &LeaveTypeId,
        days: i64,
        year: i32,
    ) -> Result<bool, ServiceError> {
        self.apply(user_id, leave_type_id, year, BalanceEvent::DaysPending(days)).await
    }

    pub async fn on_approval(
        &self,
        user_id: &UserId,
        leave_type_id: &LeaveTypeId,
        days: i64,
        year: i32,
    ) -> Result<bool, ServiceError> {
        self.apply(user_id, leave_type_id, year, BalanceEvent::DaysApproved(days)).await
    }

    pub async fn on_rejection(
        &self,
        user_id: &UserId,
        leave_type_id: &LeaveTypeId,
        days: i64,
        year: i32,
    ) -> Result<bool, ServiceError> {
        self.apply(user_id, leave_type_id, year, BalanceEvent::DaysRejected(days)).await
    }

    pub async fn on_cancellation(
        &self,
        user_id: &UserId,
        leave_type_id: &LeaveTypeId,
        days: i64,
        year: i32,
    ) -> Result<bool, ServiceError> {
        self.apply(user_id, leave_type_id, year, BalanceEvent::DaysRestored(days)).await
    }

    async fn apply(
        &self,
        user_id: &UserId,
        leave_type_id: &LeaveTypeId,
        year: i32,
        event: BalanceEvent,
    ) -> Result<bool, ServiceError> {
        let Some(leave_type) = self.leave.find_type(leave_type_id).await? else {
            tracing::debug!(
                event_name = "balance.unknown_leave_type",
                leave_type_id = leave_type_id.0.as_str(),
                "leave type not found, skipping balance update"
            );
            return Ok(false);
        };
        if !leave_type.deducts_balance() {
            return Ok(false);
        }

        let applied = self.balances.apply_event(user_id, leave_type_id, year, event).await?;
        if !applied {
            tracing::debug!(
                event_name = "balance.no_row",
                user_id = user_id.0.as_str(),
                year,
                "no balance row for key, skipping balance update"
            );
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use furlough_core::domain::balance::LeaveBalance;
    use furlough_core::domain::leave::LeaveTypeId;
    use furlough_core::domain::user::UserId;
    use furlough_db::repositories::{
        BalanceRepository, SqlBalanceRepository, SqlLeaveRepository,
    };
    use furlough_db::{connect_with_settings, migrations, SeedOrg};

    use super::BalanceService;

    async fn setup() -> (sqlx::SqlitePool, BalanceService) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SeedOrg::load(&pool).await.expect("seed");

        let service = BalanceService::new(
            Arc::new(SqlLeaveRepository::new(pool.clone())),
            Arc::new(SqlBalanceRepository::new(pool.clone())),
        );
        (pool, service)
    }

    fn ada() -> UserId {
        UserId("u-emp-ada".to_string())
    }

    fn normal() -> LeaveTypeId {
        LeaveTypeId("lt-normal".to_string())
    }

    async fn balance(pool: &sqlx::SqlitePool) -> LeaveBalance {
        SqlBalanceRepository::new(pool.clone())
            .find(&ada(), &normal(), 2026)
            .await
            .expect("find")
            .expect("row exists")
    }

    #[tokio::test]
    async fn pending_then_approval_follows_the_documented_arithmetic() {
        let (pool, service) = setup().await;

        // Seeded: entitled 21, used 5, pending 0, available 16.
        assert!(service.on_pending(&ada(), &normal(), 3, 2026).await.expect("pending"));
        let row = balance(&pool).await;
        assert_eq!(row.pending, 3);
        assert_eq!(row.available, 13);

        // Approval adds to used without releasing pending.
        assert!(service.on_approval(&ada(), &normal(), 3, 2026).await.expect("approval"));
        let row = balance(&pool).await;
        assert_eq!(row.used, 8);
        assert_eq!(row.pending, 3);
        assert_eq!(row.available, 10);
    }

    #[tokio::test]
    async fn rejection_and_cancellation_release_their_counters() {
        let (pool, service) = setup().await;

        service.on_pending(&ada(), &normal(), 3, 2026).await.expect("pending");
        service.on_rejection(&ada(), &normal(), 3, 2026).await.expect("rejection");
        let row = balance(&pool).await;
        assert_eq!(row.pending, 0);
        assert_eq!(row.available, 16);

        service.on_cancellation(&ada(), &normal(), 5, 2026).await.expect("cancel");
        let row = balance(&pool).await;
        assert_eq!(row.used, 0);
        assert_eq!(row.available, 21);
    }

    #[tokio::test]
    async fn non_normal_types_are_silent_no_ops() {
        let (pool, service) = setup().await;
        let before = balance(&pool).await;

        let wfh = LeaveTypeId("lt-wfh".to_string());
        assert!(!service.on_pending(&ada(), &wfh, 3, 2026).await.expect("pending"));
        assert!(!service.on_approval(&ada(), &wfh, 3, 2026).await.expect("approval"));
        assert!(!service.on_rejection(&ada(), &wfh, 3, 2026).await.expect("rejection"));

        assert_eq!(balance(&pool).await, before);
    }

    #[tokio::test]
    async fn missing_balance_row_is_a_silent_no_op() {
        let (_pool, service) = setup().await;

        // No 2030 row was ever created for this user.
        assert!(!service.on_pending(&ada(), &normal(), 3, 2030).await.expect("pending"));
    }
}
