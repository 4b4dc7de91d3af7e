use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Employee,
    Manager,
    DepartmentDirector,
    Hr,
    Executive,
}

impl Role {
    /// Roles eligible for the end-of-chain fallback position.
    pub fn is_fallback_approver(self) -> bool {
        matches!(self, Role::Hr | Role::Executive)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Employee => write!(f, "EMPLOYEE"),
            Role::Manager => write!(f, "MANAGER"),
            Role::DepartmentDirector => write!(f, "DEPARTMENT_DIRECTOR"),
            Role::Hr => write!(f, "HR"),
            Role::Executive => write!(f, "EXECUTIVE"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMPLOYEE" => Ok(Role::Employee),
            "MANAGER" => Ok(Role::Manager),
            "DEPARTMENT_DIRECTOR" => Ok(Role::DepartmentDirector),
            "HR" => Ok(Role::Hr),
            "EXECUTIVE" => Ok(Role::Executive),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// A directory record as supplied by the org directory. Read-only to the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<UserId>,
    pub department_director_id: Option<UserId>,
    pub department: Option<String>,
    pub is_active: bool,
}
