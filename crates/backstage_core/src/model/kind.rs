//! Entity kind catalog.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Every entity kind with a repository in this backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Action,
    Avatar,
    Banner,
    Media,
    Permission,
    Role,
    Message,
    MessageReceive,
    User,
    Menu,
}

impl EntityKind {
    /// All kinds in registration order.
    pub const ALL: [EntityKind; 10] = [
        Self::Action,
        Self::Avatar,
        Self::Banner,
        Self::Media,
        Self::Permission,
        Self::Role,
        Self::Message,
        Self::MessageReceive,
        Self::User,
        Self::Menu,
    ];

    /// Stable kebab-case id, also used as the default query alias.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Avatar => "avatar",
            Self::Banner => "banner",
            Self::Media => "media",
            Self::Permission => "permission",
            Self::Role => "role",
            Self::Message => "message",
            Self::MessageReceive => "message-receive",
            Self::User => "user",
            Self::Menu => "menu",
        }
    }

    /// Parses a kind from its stable id.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::EntityKind;

    #[test]
    fn parse_accepts_stable_ids() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(
            EntityKind::parse(" message-receive "),
            Some(EntityKind::MessageReceive)
        );
    }

    #[test]
    fn parse_rejects_unknown_or_differently_cased_ids() {
        assert_eq!(EntityKind::parse("Users"), None);
        assert_eq!(EntityKind::parse("message_receive"), None);
    }

    #[test]
    fn serde_uses_kebab_case_ids() {
        let encoded = serde_json::to_string(&EntityKind::MessageReceive).unwrap();
        assert_eq!(encoded, "\"message-receive\"");
    }
}
