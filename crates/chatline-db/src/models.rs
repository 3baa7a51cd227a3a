//! Database row types. Groups and messages map straight onto the shared
//! `chatline-types` models; users have their own row since it carries the
//! password hash.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub handle: String,
    pub password: String,
    pub online: bool,
    pub last_seen: String,
    pub created_at: String,
}

/// Outcome of a handle/password change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileUpdate {
    Updated,
    UserNotFound,
    HandleTaken,
}

/// Outcome of replacing a user's data with an import bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { messages: usize, groups: usize },
    /// Bundle groups whose names belong to groups the user is not in.
    GroupNamesTaken(Vec<String>),
    /// Bundle chats the user would not take part in once imported.
    ForeignChats(Vec<String>),
}
