pub mod action;
pub mod auth;
pub mod chats;
pub mod dispatch;
pub mod error;
pub mod groups;
pub mod messages;
pub mod routes;
pub mod search;
pub mod state;
pub mod transfer;

#[cfg(test)]
mod test_support;

pub use routes::{DEFAULT_MAX_BODY_BYTES, router};
pub use state::{AppState, new_state};
