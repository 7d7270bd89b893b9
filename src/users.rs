use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::auth::authenticate;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, json_response, new_id, now, validate_uuid};
use crate::core::store::{read_collection, read_scalar, write_collection, write_scalar, RecordStore};
use crate::models::models::{NewUser, User};
use crate::validation::{is_strong_password, is_valid_email, is_valid_username};

// === Directory ===

pub fn list_users(store: &dyn RecordStore) -> anyhow::Result<Vec<User>> {
    read_collection(store, USERS_KEY)
}

/// Appends a new user. Email and username uniqueness are the caller's job.
pub fn register(store: &dyn RecordStore, new_user: NewUser) -> anyhow::Result<User> {
    let mut users = list_users(store)?;
    let user = User {
        id: new_id(),
        username: new_user.username,
        email: new_user.email,
        password: new_user.password,
        created_at: now(),
    };
    users.push(user.clone());
    write_collection(store, USERS_KEY, &users)?;
    tracing::debug!(user_id = %user.id, "registered user");
    Ok(user)
}

pub fn find_by_email(store: &dyn RecordStore, email: &str) -> anyhow::Result<Option<User>> {
    Ok(list_users(store)?.into_iter().find(|u| u.email == email))
}

pub fn find_by_id(store: &dyn RecordStore, id: &str) -> anyhow::Result<Option<User>> {
    Ok(list_users(store)?.into_iter().find(|u| u.id == id))
}

pub fn set_current_user(store: &dyn RecordStore, user_id: &str) -> anyhow::Result<()> {
    write_scalar(store, CURRENT_USER_KEY, user_id)
}

/// Resolves the current-user pointer. A pointer to a user that no longer
/// exists reads as no current user.
pub fn get_current_user(store: &dyn RecordStore) -> anyhow::Result<Option<User>> {
    match read_scalar(store, CURRENT_USER_KEY)? {
        Some(id) => find_by_id(store, &id),
        None => Ok(None),
    }
}

pub fn clear_current_user(store: &dyn RecordStore) -> anyhow::Result<()> {
    store.delete(CURRENT_USER_KEY)
}

// === HTTP Handlers ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    confirm_password: Option<String>,
}

pub fn build_user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "createdAt": user.created_at,
    })
}

pub fn create_user(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    let body: SignupRequest = match serde_json::from_slice(req.body()) {
        Ok(b) => b,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let username = body.username.trim();
    let email = body.email.trim();

    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return Ok(ApiError::BadRequest("Please fill in all fields.".to_string()).into());
    }
    if !is_valid_email(email) {
        return Ok(ApiError::BadRequest("Please enter a valid email address.".to_string()).into());
    }
    if !is_valid_username(username) {
        return Ok(ApiError::BadRequest(
            "Username must be 3-20 characters (letters, numbers, underscore).".to_string(),
        )
        .into());
    }
    if !is_strong_password(&body.password) {
        return Ok(ApiError::BadRequest(
            "Password must be 8+ chars with uppercase, lowercase, number, and special character"
                .to_string(),
        )
        .into());
    }
    if let Some(confirm) = &body.confirm_password {
        if confirm != &body.password {
            return Ok(ApiError::BadRequest("Passwords do not match.".to_string()).into());
        }
    }

    if find_by_email(store, email)?.is_some() {
        return Ok(ApiError::Conflict("An account with this email already exists.".to_string()).into());
    }
    let taken = list_users(store)?
        .iter()
        .any(|u| u.username.to_lowercase() == username.to_lowercase());
    if taken {
        return Ok(ApiError::Conflict(
            "This username is already taken. Please choose another.".to_string(),
        )
        .into());
    }

    let user = register(
        store,
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: hash_password(&body.password)?,
        },
    )?;
    set_current_user(store, &user.id)?;

    json_response(201, &build_user_json(&user))
}

pub fn get_profile(store: &dyn RecordStore, req: Request) -> anyhow::Result<Response> {
    match authenticate(store, &req) {
        Ok(user) => json_response(200, &build_user_json(&user)),
        Err(e) => Ok(e.into()),
    }
}

pub fn get_user_details(store: &dyn RecordStore, path: &str) -> anyhow::Result<Response> {
    let user_id = path.trim_start_matches("/users/");

    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    match find_by_id(store, user_id)? {
        Some(user) => json_response(200, &build_user_json(&user)),
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

pub fn get_session(store: &dyn RecordStore) -> anyhow::Result<Response> {
    match get_current_user(store)? {
        Some(user) => json_response(200, &build_user_json(&user)),
        None => Ok(ApiError::NotFound("No user is signed in".to_string()).into()),
    }
}
