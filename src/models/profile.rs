use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Student,
    Teacher,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Profile used when the auth user has no stored profile document.
    pub fn fallback_for(user: &AuthUser) -> Self {
        let name = user
            .email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string();

        Self {
            uid: user.uid.clone(),
            name,
            email: user.email.clone(),
            role: Role::Student,
            avatar: None,
            created_at: Utc::now(),
        }
    }
}

/// Identity reported by the auth provider's status callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub uid: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
}
