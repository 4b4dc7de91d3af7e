use std::sync::Arc;

use furlough_core::audit::AuditEvent;
use furlough_core::domain::balance::LeaveBalance;
use furlough_core::domain::user::UserId;
use furlough_core::errors::DomainError;
use furlough_core::rollover::{compute, RolloverOutcome};
use furlough_db::repositories::{AuditRepository, BalanceRepository};

use crate::ServiceError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkRolloverSummary {
    pub processed: usize,
    pub total_carried: i64,
    pub total_lost: i64,
}

/// Year-end carry-forward: a pure preview over the closing year's balances
/// and an upserting executor for the opening year.
pub struct RolloverService {
    balances: Arc<dyn BalanceRepository>,
    audit: Arc<dyn AuditRepository>,
}

impl RolloverService {
    pub fn new(balances: Arc<dyn BalanceRepository>, audit: Arc<dyn AuditRepository>) -> Self {
        Self { balances, audit }
    }

    /// Previews the carry-forward for every eligible balance row. Makes no
    /// writes; identical inputs produce identical previews.
    pub async fn calculate_year_end_rollover(
        &self,
        from_year: i32,
        to_year: Option<i32>,
    ) -> Result<Vec<RolloverOutcome>, ServiceError> {
        let to_year = to_year.unwrap_or(from_year + 1);
        let inputs = self.balances.rollover_inputs(from_year).await?;
        Ok(inputs.iter().map(|input| compute(from_year, to_year, input)).collect())
    }

    /// Approximate idempotency probe: any target-year row that already
    /// carries days forward means the rollover ran.
    pub async fn is_rollover_executed(&self, from_year: i32) -> Result<bool, ServiceError> {
        Ok(self.balances.any_carried_forward(from_year + 1).await?)
    }

    /// Writes one user's next-year opening balance and audits it.
    pub async fn execute_rollover(
        &self,
        outcome: &RolloverOutcome,
        actor: &UserId,
    ) -> Result<(), ServiceError> {
        let next = LeaveBalance {
            user_id: outcome.user_id.clone(),
            leave_type_id: outcome.leave_type_id.clone(),
            year: outcome.to_year,
            entitled: outcome.next_entitled,
            used: 0,
            pending: 0,
            carried_forward: outcome.carried_forward,
            available: outcome.next_available,
        };
        self.balances.upsert(&next).await?;

        self.record_audit(
            AuditEvent::new(
                "ROLLOVER_EXECUTE",
                "leave_balance",
                format!(
                    "{}:{}:{}",
                    outcome.user_id.0, outcome.leave_type_id.0, outcome.to_year
                ),
            )
            .by(actor.clone())
            .with_new(serde_json::json!({
                "carried_forward": outcome.carried_forward,
                "lost": outcome.lost,
                "available": outcome.next_available,
            })),
        )
        .await;
        Ok(())
    }

    /// Runs the preview and executes it for every eligible user, refusing
    /// to run twice for the same year pair.
    pub async fn execute_bulk_rollover(
        &self,
        from_year: i32,
        actor: &UserId,
    ) -> Result<BulkRolloverSummary, ServiceError> {
        if self.is_rollover_executed(from_year).await? {
            return Err(ServiceError::Domain(DomainError::InvariantViolation(format!(
                "rollover from {from_year} already executed"
            ))));
        }

        let outcomes = self.calculate_year_end_rollover(from_year, None).await?;
        let mut summary = BulkRolloverSummary::default();

        for outcome in &outcomes {
            self.execute_rollover(outcome, actor).await?;
            summary.processed += 1;
            summary.total_carried += outcome.carried_forward;
            summary.total_lost += outcome.lost;
        }

        self.record_audit(
            AuditEvent::new("ROLLOVER_BULK", "leave_balance", format!("year:{from_year}"))
                .by(actor.clone())
                .with_new(serde_json::json!({
                    "processed": summary.processed,
                    "total_carried": summary.total_carried,
                    "total_lost": summary.total_lost,
                })),
        )
        .await;

        tracing::info!(
            event_name = "rollover.bulk_complete",
            from_year,
            processed = summary.processed,
            total_carried = summary.total_carried,
            total_lost = summary.total_lost,
            "bulk rollover finished"
        );
        Ok(summary)
    }

    async fn record_audit(&self, event: AuditEvent) {
        if let Err(error) = self.audit.append(&event).await {
            tracing::warn!(
                event_name = "rollover.audit_failed",
                action = event.action.as_str(),
                entity_id = event.entity_id.as_str(),
                error = %error,
                "audit write failed, continuing"
            );
        }
    }
}
