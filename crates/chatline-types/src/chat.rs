//! Conversation keys.
//!
//! A chat id is a plain string. Direct chats are keyed `"<a>-<b>"`; a group
//! chat is keyed by the group's name. Nothing in the store links a chat id to
//! a user, so every lookup that asks "is this user part of this chat" goes
//! through [`ChatScope`].

/// Separator between the two handles of a direct chat id.
pub const DIRECT_SEPARATOR: char = '-';

/// Build the id of the direct chat between `a` and `b`, in that order.
pub fn direct_chat_id(a: &str, b: &str) -> String {
    format!("{a}{DIRECT_SEPARATOR}{b}")
}

/// The other side of a direct chat that has `handle` on one side.
///
/// Handles may contain the separator themselves, so the id is matched
/// against `"<handle>-"` as a prefix and `"-<handle>"` as a suffix instead of
/// being split at a fixed position. When both match the left reading wins.
pub fn direct_peer<'c>(chat_id: &'c str, handle: &str) -> Option<&'c str> {
    if handle.is_empty() {
        return None;
    }

    let as_left = chat_id
        .strip_prefix(handle)
        .and_then(|rest| rest.strip_prefix(DIRECT_SEPARATOR))
        .filter(|peer| !peer.is_empty());

    as_left.or_else(|| {
        chat_id
            .strip_suffix(handle)
            .and_then(|rest| rest.strip_suffix(DIRECT_SEPARATOR))
            .filter(|peer| !peer.is_empty())
    })
}

/// Whether `handle` may be taken by a new account. A separator inside a
/// handle would make direct chat ids ambiguous.
pub fn valid_handle(handle: &str) -> bool {
    !handle.contains(DIRECT_SEPARATOR)
}

/// The chats one user takes part in, given the groups currently in the store.
#[derive(Debug, Clone, Copy)]
pub struct ChatScope<'a> {
    handle: &'a str,
    own_groups: &'a [String],
    all_groups: &'a [String],
}

impl<'a> ChatScope<'a> {
    /// `own_groups` lists the groups that have `handle` as a member,
    /// `all_groups` every group name in the store.
    pub fn new(handle: &'a str, own_groups: &'a [String], all_groups: &'a [String]) -> Self {
        Self {
            handle,
            own_groups,
            all_groups,
        }
    }

    /// True when `chat_id` names one of the user's groups, or is a direct
    /// chat with the user on either side. An id that names any group is a
    /// group chat for everyone, even when it contains the separator.
    pub fn involves(&self, chat_id: &str) -> bool {
        if self.own_groups.iter().any(|g| g == chat_id) {
            return true;
        }
        if self.all_groups.iter().any(|g| g == chat_id) {
            return false;
        }
        direct_peer(chat_id, self.handle).is_some()
    }
}
