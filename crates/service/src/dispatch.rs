use std::sync::Arc;

use furlough_core::effects::Effect;
use furlough_db::repositories::NotificationRepository;

use crate::mailer::EmailSender;

/// Executes the effect list a transactional mutation returned. Runs after
/// the transaction committed; every failure is logged and swallowed so
/// delivery can never undo or block a decision.
#[derive(Clone)]
pub struct EffectDispatcher {
    notifications: Arc<dyn NotificationRepository>,
    mailer: Arc<dyn EmailSender>,
}

impl EffectDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        Self { notifications, mailer }
    }

    pub async fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Notify(notification) => {
                    if let Err(error) = self.notifications.insert(&notification).await {
                        tracing::warn!(
                            event_name = "effects.notification_failed",
                            user_id = notification.user_id.0.as_str(),
                            kind = notification.kind.as_str(),
                            error = %error,
                            "notification insert failed, continuing"
                        );
                    }
                }
                Effect::Email(email) => {
                    if !self.mailer.send(&email).await {
                        tracing::warn!(
                            event_name = "effects.email_failed",
                            to = email.to.as_str(),
                            subject = email.subject.as_str(),
                            "email delivery failed, continuing"
                        );
                    }
                }
            }
        }
    }
}
