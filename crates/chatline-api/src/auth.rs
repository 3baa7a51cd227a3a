use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::Json;
use tracing::{debug, error, info, warn};

use chatline_db::models::ProfileUpdate;
use chatline_types::api::{
    Ack, Envelope, LoginRequest, LoginResponse, UpdateProfileRequest, UpdateStatusRequest,
};
use chatline_types::chat::{DIRECT_SEPARATOR, valid_handle};

use crate::error::ApiError;
use crate::state::{AppState, spawn_db};

pub const ONLINE: &str = "Online";
pub const OFFLINE: &str = "Offline";

fn invalid_handle() -> ApiError {
    ApiError::BadRequest(format!("Handle cannot contain '{}'", DIRECT_SEPARATOR))
}

/// `login`: signs the user up on first sight of a handle, otherwise checks
/// the password. Either way the user ends up online.
pub async fn login(
    state: &AppState,
    req: LoginRequest,
) -> Result<Json<Envelope<LoginResponse>>, ApiError> {
    let handle = req.handle.clone();
    let existing = spawn_db(state, move |db| db.get_user(&handle)).await?;

    let user = match existing {
        Some(user) => user,
        None => {
            if !valid_handle(&req.handle) {
                debug!("Refusing signup for {:?}", req.handle);
                return Err(invalid_handle());
            }
            let hash = hash_password(req.password.clone()).await?;
            let handle = req.handle.clone();
            if spawn_db(state, move |db| db.create_user(&handle, &hash)).await? {
                info!("Created user {}", req.handle);
                return Ok(Json(Envelope::ok(LoginResponse { created: true })));
            }

            // A concurrent first login for the same handle won the insert.
            let handle = req.handle.clone();
            spawn_db(state, move |db| db.get_user(&handle))
                .await?
                .ok_or_else(|| anyhow!("user {} missing after insert conflict", req.handle))?
        }
    };

    if !verify_password(user.password, req.password).await? {
        warn!("Wrong password for {}", req.handle);
        return Err(ApiError::Unauthorized("Invalid password".into()));
    }

    let handle = req.handle.clone();
    spawn_db(state, move |db| db.set_presence(&handle, true, ONLINE)).await?;
    debug!("{} logged in", req.handle);

    Ok(Json(Envelope::ok(LoginResponse { created: false })))
}

/// `updateStatus`: unconditionally overwrite presence. `lastSeen` defaults to
/// "Online"/"Offline" following `online`, which defaults to false.
pub async fn update_status(
    state: &AppState,
    req: UpdateStatusRequest,
) -> Result<Json<Envelope<Ack>>, ApiError> {
    let online = req.online.unwrap_or(false);
    let last_seen = req
        .last_seen
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| (if online { ONLINE } else { OFFLINE }).to_string());

    let handle = req.handle.clone();
    let found = spawn_db(state, move |db| db.set_presence(&handle, online, &last_seen)).await?;
    if !found {
        debug!("Status update for unknown handle {}", req.handle);
    }

    Ok(Json(Envelope::ok(Ack {})))
}

/// `updateProfile`: rename and/or change password.
pub async fn update_profile(
    state: &AppState,
    req: UpdateProfileRequest,
) -> Result<Json<Envelope<Ack>>, ApiError> {
    if req.new_handle().is_some_and(|h| !valid_handle(h)) {
        return Err(invalid_handle());
    }

    let new_hash = match req.new_password() {
        Some(password) => Some(hash_password(password.to_string()).await?),
        None => None,
    };

    let old_handle = req.old_handle.clone();
    let new_handle = req.new_handle().map(str::to_string);
    let outcome = spawn_db(state, move |db| {
        db.update_profile(&old_handle, new_handle.as_deref(), new_hash.as_deref())
    })
    .await?;

    match outcome {
        ProfileUpdate::Updated => {
            info!("Updated profile of {}", req.old_handle);
            Ok(Json(Envelope::ok(Ack {})))
        }
        ProfileUpdate::UserNotFound => Err(ApiError::NotFound("User not found".into())),
        ProfileUpdate::HandleTaken => {
            info!("Rename of {} rejected, handle in use", req.old_handle);
            Err(ApiError::BadRequest("Handle already taken".into()))
        }
    }
}

/// Hash with Argon2id and a fresh salt, off the async runtime.
async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow!("password hashing failed: {}", e))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow!("blocking task failed: {}", e))
    })?
    .map_err(ApiError::from)
}

/// `Ok(false)` on mismatch; a stored hash that does not parse is an internal error.
async fn verify_password(stored_hash: String, password: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| anyhow!("stored password hash is malformed: {}", e))?;
        Ok::<_, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow!("blocking task failed: {}", e))
    })?
    .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::test_support::{login, post, test_state};

    #[tokio::test]
    async fn first_login_creates_then_logs_in() {
        let state = test_state();

        let (status, body) = login(&state, "alice", "pw").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "created": true }));

        let (status, body) = login(&state, "alice", "pw").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "created": false }));

        let stored = state.db.get_user("alice").unwrap().unwrap();
        assert_ne!(stored.password, "pw");
        assert!(stored.password.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn wrong_password_is_401_and_leaves_presence_alone() {
        let state = test_state();
        login(&state, "alice", "pw").await;
        state.db.set_presence("alice", false, "Gone fishing").unwrap();

        let (status, body) = login(&state, "alice", "nope").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let user = state.db.get_user("alice").unwrap().unwrap();
        assert!(!user.online);
        assert_eq!(user.last_seen, "Gone fishing");
    }

    #[tokio::test]
    async fn login_sets_presence_online() {
        let state = test_state();
        login(&state, "alice", "pw").await;
        state.db.set_presence("alice", false, OFFLINE).unwrap();

        login(&state, "alice", "pw").await;
        let user = state.db.get_user("alice").unwrap().unwrap();
        assert!(user.online);
        assert_eq!(user.last_seen, ONLINE);
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let state = test_state();
        let (status, body) = post(&state, json!({ "action": "login", "handle": "alice" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");

        let (status, _) = login(&state, "alice", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.db.get_user("alice").unwrap().is_none());
    }

    #[tokio::test]
    async fn dashed_handles_cannot_sign_up_or_be_renamed_to() {
        let state = test_state();
        let (status, body) = login(&state, "bob-smith", "pw").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Handle cannot contain '-'");
        assert!(state.db.get_user("bob-smith").unwrap().is_none());

        login(&state, "bob", "pw").await;
        let (status, _) = post(
            &state,
            json!({ "action": "updateProfile", "oldHandle": "bob", "newHandle": "bob-smith" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.db.get_user("bob").unwrap().is_some());
    }

    #[tokio::test]
    async fn existing_dashed_handle_can_still_log_in() {
        let state = test_state();
        login(&state, "seed", "pw").await;
        let hash = state.db.get_user("seed").unwrap().unwrap().password;
        state.db.create_user("bob-smith", &hash).unwrap();

        let (status, body) = login(&state, "bob-smith", "pw").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["created"], false);
    }

    #[tokio::test]
    async fn update_status_defaults() {
        let state = test_state();
        login(&state, "alice", "pw").await;

        let (status, body) =
            post(&state, json!({ "action": "updateStatus", "handle": "alice" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));
        let user = state.db.get_user("alice").unwrap().unwrap();
        assert!(!user.online);
        assert_eq!(user.last_seen, OFFLINE);

        post(
            &state,
            json!({ "action": "updateStatus", "handle": "alice", "online": true, "lastSeen": "Busy" }),
        )
        .await;
        let user = state.db.get_user("alice").unwrap().unwrap();
        assert!(user.online);
        assert_eq!(user.last_seen, "Busy");
    }

    #[tokio::test]
    async fn update_status_for_unknown_handle_still_succeeds() {
        let state = test_state();
        let (status, _) = post(&state, json!({ "action": "updateStatus", "handle": "ghost" })).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn update_profile_rename_and_password() {
        let state = test_state();
        login(&state, "alice", "pw").await;
        login(&state, "bob", "pw").await;

        let (status, body) = post(
            &state,
            json!({ "action": "updateProfile", "oldHandle": "alice", "newHandle": "bob" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Handle already taken");

        let (status, _) = post(
            &state,
            json!({ "action": "updateProfile", "oldHandle": "alice", "newHandle": "alicia", "newPassword": "pw2" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = login(&state, "alicia", "pw").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (_, body) = login(&state, "alicia", "pw2").await;
        assert_eq!(body["created"], false);
    }

    #[tokio::test]
    async fn update_profile_unknown_user_and_nothing_to_change() {
        let state = test_state();
        let (status, _) = post(
            &state,
            json!({ "action": "updateProfile", "oldHandle": "ghost", "newHandle": "spirit" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            post(&state, json!({ "action": "updateProfile", "oldHandle": "ghost" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
