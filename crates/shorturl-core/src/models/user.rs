use serde::{Deserialize, Serialize};

/// Account role as reported by the server.
///
/// Unknown role strings are preserved so a newer server does not make the
/// stored profile unreadable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    #[default]
    User,
    Other(String),
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Role::Admin,
            "user" => Role::User,
            _ => Role::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Other(s) => s,
        }
    }
}

/// Profile of the signed-in user, stored together with the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Full name when the server provided one, otherwise the username
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfoResponse {
    pub user: UserProfile,
}

/// User row as returned by the admin listing
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub users: Vec<UserAccount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeRoleRequest {
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleActiveRequest {
    pub user_id: i64,
}
