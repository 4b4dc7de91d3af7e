use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use furlough_core::audit::AuditEvent;
use furlough_core::domain::approval::DelegateGrant;
use furlough_core::domain::user::UserId;
use furlough_core::errors::DomainError;
use furlough_db::repositories::{AuditRepository, DelegateRepository};

use crate::ServiceError;

/// Grants and revokes approval-authority delegation. A delegator may hold
/// at most one active grant over any given day.
pub struct DelegationService {
    delegates: Arc<dyn DelegateRepository>,
    audit: Arc<dyn AuditRepository>,
}

impl DelegationService {
    pub fn new(delegates: Arc<dyn DelegateRepository>, audit: Arc<dyn AuditRepository>) -> Self {
        Self { delegates, audit }
    }

    pub async fn grant(
        &self,
        delegator_id: UserId,
        delegate_id: UserId,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
        reason: Option<String>,
    ) -> Result<DelegateGrant, ServiceError> {
        if starts_on > ends_on {
            return Err(ServiceError::Domain(DomainError::InvalidDelegationWindow {
                starts_on,
                ends_on,
            }));
        }
        if self.delegates.has_overlapping_active(&delegator_id, starts_on, ends_on).await? {
            return Err(ServiceError::Domain(DomainError::OverlappingDelegation {
                delegator_id: delegator_id.0,
            }));
        }

        let grant = DelegateGrant {
            id: Uuid::new_v4().to_string(),
            delegator_id,
            delegate_id,
            starts_on,
            ends_on,
            is_active: true,
            reason,
        };
        self.delegates.insert(&grant).await?;

        self.record_audit(
            AuditEvent::new("DELEGATION_GRANT", "approval_delegate", grant.id.clone())
                .by(grant.delegator_id.clone())
                .with_new(serde_json::json!({
                    "delegate_id": grant.delegate_id.0,
                    "starts_on": grant.starts_on.to_string(),
                    "ends_on": grant.ends_on.to_string(),
                })),
        )
        .await;
        Ok(grant)
    }

    /// Deactivates a grant; grants are never hard-deleted.
    pub async fn revoke(&self, grant_id: &str, actor: &UserId) -> Result<bool, ServiceError> {
        let revoked = self.delegates.deactivate(grant_id).await?;
        if revoked {
            self.record_audit(
                AuditEvent::new("DELEGATION_REVOKE", "approval_delegate", grant_id)
                    .by(actor.clone()),
            )
            .await;
        }
        Ok(revoked)
    }

    async fn record_audit(&self, event: AuditEvent) {
        if let Err(error) = self.audit.append(&event).await {
            tracing::warn!(
                event_name = "delegation.audit_failed",
                action = event.action.as_str(),
                entity_id = event.entity_id.as_str(),
                error = %error,
                "audit write failed, continuing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use furlough_core::domain::user::UserId;
    use furlough_core::errors::DomainError;
    use furlough_db::repositories::{
        DelegateRepository, SqlAuditRepository, SqlDelegateRepository,
    };
    use furlough_db::{connect_with_settings, migrations, SeedOrg};

    use super::DelegationService;
    use crate::ServiceError;

    async fn harness() -> (sqlx::SqlitePool, DelegationService) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SeedOrg::load(&pool).await.expect("seed");

        let service = DelegationService::new(
            Arc::new(SqlDelegateRepository::new(pool.clone())),
            Arc::new(SqlAuditRepository::new(pool.clone())),
        );
        (pool, service)
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).expect("valid date")
    }

    fn mgr() -> UserId {
        UserId("u-mgr-app".to_string())
    }

    fn dir() -> UserId {
        UserId("u-dir-eng".to_string())
    }

    #[tokio::test]
    async fn grant_revoke_and_regrant_share_a_window() {
        let (pool, service) = harness().await;

        let grant = service
            .grant(mgr(), dir(), date(5, 1), date(5, 10), Some("conference".to_string()))
            .await
            .expect("grant");

        let repo = SqlDelegateRepository::new(pool.clone());
        let active = repo.active_for(&mgr(), date(5, 5)).await.expect("lookup").expect("active");
        assert_eq!(active.delegate_id, dir());

        assert!(service.revoke(&grant.id, &mgr()).await.expect("revoke"));
        assert!(repo.active_for(&mgr(), date(5, 5)).await.expect("lookup").is_none());

        // The window is free again after revocation.
        service
            .grant(mgr(), dir(), date(5, 3), date(5, 8), None)
            .await
            .expect("regrant after revoke");
    }

    #[tokio::test]
    async fn overlapping_active_grants_are_rejected() {
        let (_pool, service) = harness().await;

        service.grant(mgr(), dir(), date(5, 1), date(5, 10), None).await.expect("grant");

        let error = service
            .grant(mgr(), dir(), date(5, 10), date(5, 20), None)
            .await
            .expect_err("overlap");
        assert!(matches!(
            error,
            ServiceError::Domain(DomainError::OverlappingDelegation { .. })
        ));

        // A disjoint window is fine.
        service.grant(mgr(), dir(), date(5, 11), date(5, 20), None).await.expect("disjoint");
    }

    #[tokio::test]
    async fn inverted_windows_are_rejected() {
        let (_pool, service) = harness().await;

        let error =
            service.grant(mgr(), dir(), date(5, 10), date(5, 1), None).await.expect_err("inverted");
        assert!(matches!(
            error,
            ServiceError::Domain(DomainError::InvalidDelegationWindow { .. })
        ));
    }
}
