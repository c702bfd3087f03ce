use serde::{Deserialize, Serialize};

/// `GET auth/v1/user` response body (fields this client reads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// One row of the role table projection `select=role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub role: String,
}
