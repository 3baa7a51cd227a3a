use std::ops::RangeInclusive;

use axum::Json;
use tracing::{debug, info};

use chatline_types::api::{CreateGroupRequest, CreateGroupResponse, Envelope};

use crate::error::ApiError;
use crate::state::{AppState, spawn_db};

/// Allowed member count of a group, creator included.
pub const GROUP_SIZE: RangeInclusive<usize> = 2..=5;

enum Outcome {
    Created,
    NameTaken,
    UnknownMembers(Vec<String>),
}

/// `createGroup`: every member must be an existing user and the name unused.
pub async fn create_group(
    state: &AppState,
    req: CreateGroupRequest,
) -> Result<Json<Envelope<CreateGroupResponse>>, ApiError> {
    if !GROUP_SIZE.contains(&req.members.len()) {
        debug!("Rejecting group {} with {} members", req.group_name, req.members.len());
        return Err(ApiError::BadRequest(format!(
            "Group must have between {} and {} members",
            GROUP_SIZE.start(),
            GROUP_SIZE.end()
        )));
    }

    let name = req.group_name.clone();
    let members = req.members.clone();
    let outcome = spawn_db(state, move |db| {
        if db.get_group(&name)?.is_some() {
            return Ok(Outcome::NameTaken);
        }
        let missing = db.missing_users(&members)?;
        if !missing.is_empty() {
            return Ok(Outcome::UnknownMembers(missing));
        }
        // The insert itself still loses to a concurrent create of the same name.
        Ok(if db.create_group(&name, &members)? {
            Outcome::Created
        } else {
            Outcome::NameTaken
        })
    })
    .await?;

    match outcome {
        Outcome::Created => {
            info!("Created group {} ({} members)", req.group_name, req.members.len());
            Ok(Json(Envelope::ok(CreateGroupResponse {
                members: req.members,
            })))
        }
        Outcome::NameTaken => Err(ApiError::BadRequest("Group name already exists".into())),
        Outcome::UnknownMembers(missing) => Err(ApiError::NotFound(format!(
            "Users not found: {}",
            missing.join(", ")
        ))),
    }
}
