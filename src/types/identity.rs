use serde::{Deserialize, Serialize};

/// Role of the locally authenticated user, as issued by the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Buyer,
    Staff,
    Admin,
}

impl UserRole {
    /// Staff and admins share the support console
    pub fn is_support(&self) -> bool {
        matches!(self, UserRole::Staff | UserRole::Admin)
    }
}

/// Identity of the locally authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: UserRole,
}

impl UserIdentity {
    /// Default logical room for this user: buyers each get a private room,
    /// support staff share one.
    pub fn default_room(&self) -> String {
        if self.role.is_support() {
            "support_room".to_string()
        } else {
            format!("user_{}", self.id)
        }
    }
}
