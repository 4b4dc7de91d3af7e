use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

/// A user-facing side effect produced by a transactional mutation. The
/// mutation commits first; a dispatcher then executes the effects and
/// swallows their failures, so delivery can never roll back the decision
/// that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Notify(NotificationRequest),
    Email(EmailRequest),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub user_id: UserId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}
