use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use rand::Rng;
use serde_json::json;
use std::{sync::Arc, time::Duration};

use crate::{
    auth::TokenKind,
    dto::auth::{
        LoginRequest, RecoverPasswordRequest, RegisterRequest, ResetPasswordRequest, TokenRequest,
        TokenPairResponse,
    },
    errors::AppError,
    models::user::UserDoc,
    password::{hash_password, verify_password},
    services::validation,
    state::AppState,
};

const RECOVER_RESPONSE: &str = "If the account exists, you will receive an email shortly. If \
    you don't see it in your inbox, please check your spam or junk folder. If the email is \
    there, kindly mark it as \"Not Spam\" to ensure you receive future messages from us.";

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    let username_taken = !username.is_empty()
        && state
            .users
            .find_one(doc! { "username": &username })
            .await?
            .is_some();
    let email_taken = !email.is_empty()
        && state
            .users
            .find_one(doc! { "email": &email })
            .await?
            .is_some();

    let mut errors = serde_json::Map::new();
    let checks = [
        ("username", validation::username_error(&username, username_taken)),
        ("email", validation::email_error(&email, email_taken)),
        ("password", validation::password_error(&req.password)),
        (
            "repeated_password",
            validation::repeated_password_error(&req.password, &req.repeated_password),
        ),
        (
            "terms",
            (req.terms != Some(true)).then(|| {
                "You must accept terms and conditions in order to register.".to_string()
            }),
        ),
    ];
    for (field, error) in checks {
        if let Some(message) = error {
            errors.insert(field.to_string(), json!(message));
        }
    }
    if !errors.is_empty() {
        return Err(AppError::FieldErrors(errors.into()));
    }

    let user = UserDoc {
        id: ObjectId::new(),
        username,
        email,
        password_hash: hash_password(&req.password)?,
        created_at: BsonDateTime::now(),
    };
    state.users.insert_one(&user).await?;

    // a failed welcome mail must not orphan the freshly created account
    if let Err(err) = state.mailer.send_welcome(&user.email, &user.username).await {
        tracing::warn!(error = %err, "welcome email failed");
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully" })),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("Missing login credentials.".into()));
    }

    let email = req.email.trim().to_lowercase();
    let user = state
        .users
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::Unauthorized("User does not exist.".into()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid password.".into()));
    }

    let issued = state.authority.issue_access_pair(&user)?;
    state
        .refresh_tokens
        .create(&issued.refresh_token, issued.refresh_token_expiry)
        .await?;

    Ok(Json(TokenPairResponse {
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
        username: user.username,
    }))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    if req.token.is_empty() {
        return Err(AppError::Validation("Missing token.".into()));
    }

    let identity = state
        .authority
        .validate(&req.token, Some(TokenKind::Refresh))?;

    // a signed, unexpired token is not enough: it must still be whitelisted
    if state.refresh_tokens.get_by_token(&req.token).await?.is_none() {
        return Err(AppError::Validation(
            "Invalid token (not on whitelist).".into(),
        ));
    }

    let user = find_user(&state, &identity.user_id).await?;

    let issued = state.authority.issue_access_pair(&user)?;

    // rotate: insert the replacement before revoking the old record, so a
    // failure in between never leaves the user without a valid token
    state
        .refresh_tokens
        .create(&issued.refresh_token, issued.refresh_token_expiry)
        .await?;
    if issued.refresh_token != req.token {
        state.refresh_tokens.delete(&req.token).await?;
    }

    Ok(Json(TokenPairResponse {
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
        username: user.username,
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<StatusCode, AppError> {
    if req.token.is_empty() {
        return Err(AppError::Validation("Missing token.".into()));
    }

    state
        .authority
        .validate(&req.token, Some(TokenKind::Refresh))?;
    state.refresh_tokens.delete(&req.token).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn recover_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecoverPasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.email.is_empty() {
        return Err(AppError::Validation("Email is required".into()));
    }

    let email = req.email.trim().to_lowercase();
    if let Some(message) = validation::email_error(&email, false) {
        return Err(AppError::FieldErrors(json!({ "email_error": message })));
    }

    match state.users.find_one(doc! { "email": &email }).await? {
        Some(user) => {
            let reset_token = state.authority.issue_reset_token(&user)?;
            let reset_link = format!(
                "{}/reset-password?token={}",
                state.cfg.client_url, reset_token
            );
            // uniform response either way; a delivery error must not reveal
            // that the account exists
            if let Err(err) = state.mailer.send_reset(&user.email, &reset_link).await {
                tracing::warn!(error = %err, "reset email failed");
            }
        }
        None => {
            // mimic the latency of the mail path so timing does not leak
            // account existence
            let jitter: u64 = rand::thread_rng().gen_range(80_000..=725_000);
            tokio::time::sleep(Duration::from_micros(jitter)).await;
        }
    }

    Ok(Json(json!({ "message": RECOVER_RESPONSE })))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    if req.token.is_empty() {
        return Err(AppError::Validation(
            "Reset password token is required.".into(),
        ));
    }

    let mut errors = serde_json::Map::new();
    if let Some(message) = validation::password_error(&req.password) {
        errors.insert("password".into(), json!(message));
    }
    if let Some(message) =
        validation::repeated_password_error(&req.password, &req.repeated_password)
    {
        errors.insert("repeated_password".into(), json!(message));
    }
    if !errors.is_empty() {
        return Err(AppError::FieldErrors(errors.into()));
    }

    let identity = state
        .authority
        .validate(&req.token, Some(TokenKind::Reset))?;

    let user_id = parse_user_id(&identity.user_id)?;
    let result = state
        .users
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "password_hash": hash_password(&req.password)? } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::Unauthorized("Invalid authentication.".into()));
    }

    if let Some(email) = identity.email {
        if let Err(err) = state.mailer.send_password_changed(&email).await {
            tracing::warn!(error = %err, "password changed email failed");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn find_user(state: &AppState, user_id: &str) -> Result<UserDoc, AppError> {
    let id = parse_user_id(user_id)?;
    state
        .users
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid authentication.".into()))
}

fn parse_user_id(user_id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(user_id)
        .map_err(|_| AppError::Unauthorized("Invalid authentication.".into()))
}
