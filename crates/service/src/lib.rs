pub mod balance;
pub mod bootstrap;
pub mod clock;
pub mod delegation;
pub mod dispatch;
pub mod escalation;
pub mod mailer;
pub mod planning;
pub mod rollover;
pub mod telemetry;
pub mod templates;

use thiserror::Error;

use furlough_core::errors::{ApplicationError, DomainError};
use furlough_db::repositories::RepositoryError;

pub use balance::BalanceService;
pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use delegation::DelegationService;
pub use dispatch::EffectDispatcher;
pub use escalation::{EscalationService, SweepSummary};
pub use mailer::{EmailSender, NoopMailer, RecordingMailer, RelayMailer};
pub use planning::PlanningService;
pub use rollover::{BulkRolloverSummary, RolloverService};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ServiceError> for ApplicationError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Domain(domain) => ApplicationError::Domain(domain),
            ServiceError::Repository(repository) => {
                ApplicationError::Persistence(repository.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use furlough_core::errors::{ApplicationError, DomainError, InterfaceError};
    use furlough_db::repositories::RepositoryError;

    use super::ServiceError;

    #[test]
    fn domain_failures_stay_domain_failures_at_the_boundary() {
        let error = ServiceError::Domain(DomainError::PlanDateLimitExceeded { count: 31, max: 30 });
        let app: ApplicationError = error.into();
        assert!(matches!(
            InterfaceError::from(app),
            InterfaceError::BadRequest { .. }
        ));
    }

    #[test]
    fn repository_failures_map_to_persistence() {
        let error = ServiceError::Repository(RepositoryError::Decode("bad date".to_string()));
        let app: ApplicationError = error.into();
        assert!(matches!(app, ApplicationError::Persistence(_)));
    }
}
