use axum::Json;
use tracing::debug;

use chatline_db::models::UserRow;
use chatline_types::api::{Envelope, SearchRequest, SearchResponse};
use chatline_types::models::Group;

use crate::error::ApiError;
use crate::state::{AppState, spawn_db};

enum Found {
    User(UserRow),
    Group(Group),
    Nothing,
}

/// `search`: exact lookup of a handle, falling back to a group name.
pub async fn search(
    state: &AppState,
    req: SearchRequest,
) -> Result<Json<Envelope<SearchResponse>>, ApiError> {
    let query = req.query.clone();
    let found = spawn_db(state, move |db| {
        if let Some(user) = db.get_user(&query)? {
            return Ok(Found::User(user));
        }
        Ok(match db.get_group(&query)? {
            Some(group) => Found::Group(group),
            None => Found::Nothing,
        })
    })
    .await?;

    let response = match found {
        Found::User(user) => SearchResponse {
            is_group: false,
            last_seen: Some(user.last_seen),
            online: Some(user.online),
            members: None,
        },
        Found::Group(group) => SearchResponse {
            is_group: true,
            last_seen: None,
            online: None,
            members: Some(group.members),
        },
        Found::Nothing => {
            debug!("Search for {:?} found nothing", req.query);
            return Err(ApiError::NotFound("User or group not found".into()));
        }
    };

    Ok(Json(Envelope::ok(response)))
}
