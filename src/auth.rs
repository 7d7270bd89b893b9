use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::config::{token_expiration_hours, TOKENS_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, new_id, now, verify_password};
use crate::core::store::{read_collection, write_collection, RecordStore};
use crate::models::models::{TokenData, User};
use crate::users::{
    build_user_json, clear_current_user, find_by_email, find_by_id, get_current_user,
    set_current_user,
};
use crate::validation::is_valid_email;

fn is_expired(data: &TokenData) -> bool {
    (now() - data.created_at).num_hours() > token_expiration_hours()
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.header("Authorization")?
        .as_str()?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
}

/// Stores a fresh token for `user_id`, dropping expired ones on the way.
pub fn issue_token(store: &dyn RecordStore, user_id: &str) -> anyhow::Result<String> {
    let mut tokens: Vec<TokenData> = read_collection(store, TOKENS_KEY)?;
    tokens.retain(|t| !is_expired(t));

    let token = new_id();
    tokens.push(TokenData {
        token: token.clone(),
        user_id: user_id.to_string(),
        created_at: now(),
    });
    write_collection(store, TOKENS_KEY, &tokens)?;
    Ok(token)
}

pub fn revoke_token(store: &dyn RecordStore, token: &str) -> anyhow::Result<()> {
    let mut tokens: Vec<TokenData> = read_collection(store, TOKENS_KEY)?;
    tokens.retain(|t| t.token != token);
    write_collection(store, TOKENS_KEY, &tokens)
}

/// Returns the id of the user behind the request's bearer token, if the
/// token is known, unexpired, and its user still exists. Store failures
/// are errors, not a missing session.
pub fn validate_token(store: &dyn RecordStore, req: &Request) -> anyhow::Result<Option<String>> {
    let Some(token) = bearer_token(req) else {
        return Ok(None);
    };
    let tokens: Vec<TokenData> = read_collection(store, TOKENS_KEY)?;
    let Some(data) = tokens.into_iter().find(|t| t.token == token) else {
        return Ok(None);
    };
    if is_expired(&data) || find_by_id(store, &data.user_id)?.is_none() {
        return Ok(None);
    }
    Ok(Some(data.user_id))
}

/// Resolves the acting user for handlers that need one.
pub fn authenticate(store: &dyn RecordStore, req: &Request) -> Result<User, ApiError> {
    let user_id = validate_token(store, req)?.ok_or(ApiError::Unauthorized)?;
    find_by_id(store, &user_id)?.ok_or(ApiError::Unauthorized)
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub fn login_user(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    let creds: LoginRequest = match serde_json::from_slice(req.body()) {
        Ok(c) => c,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let email = creds.email.trim();

    if email.is_empty() || creds.password.is_empty() {
        return Ok(ApiError::BadRequest("Please fill in both email and password.".to_string()).into());
    }
    if !is_valid_email(email) {
        return Ok(ApiError::BadRequest("Please enter a valid email address.".to_string()).into());
    }

    let user = match find_by_email(store, email)? {
        Some(u) if verify_password(&creds.password, &u.password) => u,
        _ => {
            tracing::warn!("failed login attempt");
            return Ok(ApiError::Unauthorized.into());
        }
    };

    let token = issue_token(store, &user.id)?;
    set_current_user(store, &user.id)?;
    tracing::debug!(user_id = %user.id, "user logged in");

    json_response(
        200,
        &serde_json::json!({
            "token": token,
            "user": build_user_json(&user),
        }),
    )
}

pub fn logout_user(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(store, &req)? {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };
    if let Some(token) = bearer_token(&req) {
        revoke_token(store, token)?;
    }
    if get_current_user(store)?.is_some_and(|u| u.id == user_id) {
        clear_current_user(store)?;
    }

    json_response(200, &serde_json::json!({ "message": "Logged out successfully" }))
}
