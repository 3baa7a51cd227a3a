use std::collections::HashMap;

use anyhow::{Result, bail};

/// Every operation a client can request through the `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Login,
    Search,
    SendMessage,
    MarkAsRead,
    EditMessage,
    DeleteMessage,
    AddReaction,
    CreateGroup,
    GetChats,
    ExportData,
    ImportData,
    UpdateStatus,
    UpdateProfile,
    ClearChat,
}

impl Action {
    /// All variants, in declaration order.
    pub const ALL: [Action; 14] = [
        Action::Login,
        Action::Search,
        Action::SendMessage,
        Action::MarkAsRead,
        Action::EditMessage,
        Action::DeleteMessage,
        Action::AddReaction,
        Action::CreateGroup,
        Action::GetChats,
        Action::ExportData,
        Action::ImportData,
        Action::UpdateStatus,
        Action::UpdateProfile,
        Action::ClearChat,
    ];

    /// Wire name of the action.
    pub const fn name(self) -> &'static str {
        match self {
            Action::Login => "login",
            Action::Search => "search",
            Action::SendMessage => "sendMessage",
            Action::MarkAsRead => "markAsRead",
            Action::EditMessage => "editMessage",
            Action::DeleteMessage => "deleteMessage",
            Action::AddReaction => "addReaction",
            Action::CreateGroup => "createGroup",
            Action::GetChats => "getChats",
            Action::ExportData => "exportData",
            Action::ImportData => "importData",
            Action::UpdateStatus => "updateStatus",
            Action::UpdateProfile => "updateProfile",
            Action::ClearChat => "clearChat",
        }
    }
}

/// Wire name -> action lookup, built and checked once at startup.
#[derive(Debug)]
pub struct ActionTable {
    by_name: HashMap<&'static str, Action>,
}

impl ActionTable {
    /// Build the table, failing if any action is listed twice, out of
    /// declaration order, or shares its wire name with another.
    pub fn build() -> Result<Self> {
        let mut by_name = HashMap::with_capacity(Action::ALL.len());

        for (position, action) in Action::ALL.into_iter().enumerate() {
            if action as usize != position {
                bail!("{:?} is listed at position {} of the action list", action, position);
            }
            if action.name().is_empty() {
                bail!("{:?} has an empty wire name", action);
            }
            if let Some(previous) = by_name.insert(action.name(), action) {
                bail!(
                    "wire name {:?} is claimed by both {:?} and {:?}",
                    action.name(),
                    previous,
                    action
                );
            }
        }

        Ok(Self { by_name })
    }

    pub fn resolve(&self, name: &str) -> Option<Action> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
