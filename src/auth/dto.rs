use serde::{Deserialize, Serialize};

use crate::auth::repo_types::User;

/// Request body for sign-up. Aliases match the legacy browser client.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(alias = "nameValue")]
    pub name: String,
    #[serde(alias = "emailValue")]
    pub email: String,
    #[serde(alias = "passwordValue")]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "emailValue")]
    pub email: String,
    #[serde(alias = "passwordValue")]
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_premium_user: bool,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            is_premium_user: u.is_premium_user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumStatus {
    pub is_premium_user: bool,
}
