use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub repeated_password: String,
    pub terms: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RecoverPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    pub repeated_password: String,
}
