use std::collections::HashMap;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use chatline_types::api::{Envelope, RealtimeKeyResponse, Required};

use crate::action::Action;
use crate::error::ApiError;
use crate::state::AppState;
use crate::{auth, chats, groups, messages, search, transfer};

/// Query flag that asks for the real-time service key.
pub const REALTIME_KEY_FLAG: &str = "realtimeKey";

/// POST /: decode the body, resolve `action`, and run its handler.
pub async fn handle_post(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|rejection| {
        debug!("Rejecting body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest("Invalid request body".into())
        }
    })?;

    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        debug!("Rejecting unparseable body: {}", e);
        ApiError::BadRequest("Invalid JSON body".into())
    })?;

    let name = body
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("Missing action".into()))?;

    let action = state.actions.resolve(name).ok_or_else(|| {
        debug!("Unknown action {:?}", name);
        ApiError::BadRequest(format!("Unknown action: {}", name))
    })?;

    debug!(action = action.name(), "Dispatching");
    dispatch(&state, action, body).await
}

async fn dispatch(state: &AppState, action: Action, body: Value) -> Result<Response, ApiError> {
    let response = match action {
        Action::Login => auth::login(state, parse(body)?).await?.into_response(),
        Action::Search => search::search(state, parse(body)?).await?.into_response(),
        Action::SendMessage => messages::send_message(state, parse(body)?).await?.into_response(),
        Action::MarkAsRead => messages::mark_as_read(state, parse(body)?).await?.into_response(),
        Action::EditMessage => messages::edit_message(state, parse(body)?).await?.into_response(),
        Action::DeleteMessage => {
            messages::delete_message(state, parse(body)?).await?.into_response()
        }
        Action::AddReaction => messages::add_reaction(state, parse(body)?).await?.into_response(),
        Action::CreateGroup => groups::create_group(state, parse(body)?).await?.into_response(),
        Action::GetChats => chats::get_chats(state, parse(body)?).await?.into_response(),
        Action::ExportData => transfer::export_data(state, parse(body)?).await?.into_response(),
        Action::ImportData => transfer::import_data(state, parse(body)?).await?.into_response(),
        Action::UpdateStatus => auth::update_status(state, parse(body)?).await?.into_response(),
        Action::UpdateProfile => auth::update_profile(state, parse(body)?).await?.into_response(),
        Action::ClearChat => messages::clear_chat(state, parse(body)?).await?.into_response(),
    };
    Ok(response)
}

/// Deserialize the action's request shape and run its presence check.
fn parse<T: DeserializeOwned + Required>(body: Value) -> Result<T, ApiError> {
    let req: T = serde_json::from_value(body).map_err(|e| {
        debug!("Request does not fit its action: {}", e);
        ApiError::missing_fields()
    })?;

    if !req.has_required() {
        return Err(ApiError::missing_fields());
    }
    Ok(req)
}

/// GET /: hands out the real-time service key when the query flag is present.
///
/// There is no authorization beyond the flag itself.
pub async fn realtime_key(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Envelope<RealtimeKeyResponse>>, ApiError> {
    if !query.contains_key(REALTIME_KEY_FLAG) {
        return Err(ApiError::MethodNotAllowed);
    }

    let key = state.realtime_api_key.clone().ok_or_else(|| {
        warn!("Real-time API key requested but not configured");
        ApiError::Misconfigured("Real-time API key not configured")
    })?;

    Ok(Json(Envelope::ok(RealtimeKeyResponse { key })))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".into())
}
