//! Typed read models decoded from repository records.
//!
//! # Invariants
//! - Relation fields default to empty when the relation was not joined.
//! - `Menu::permission` is derived after load and has no storage column.

use crate::model::EntityId;
use serde::{Deserialize, Serialize};

/// Timestamps shared by every entity, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: i64,
    pub updated_at: i64,
    /// Soft delete tombstone. `Some` means the row is in the trash.
    pub deleted_at: Option<i64>,
}

impl Timestamps {
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: EntityId,
    pub url: String,
    pub user_id: Option<EntityId>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: EntityId,
    pub name: String,
    pub url: String,
    pub mime: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub id: EntityId,
    pub title: String,
    pub link: Option<String>,
    pub image_id: Option<EntityId>,
    #[serde(default)]
    pub image: Option<Media>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: EntityId,
    pub name: String,
    pub label: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: EntityId,
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub avatar_id: Option<EntityId>,
    #[serde(default)]
    pub avatar: Option<Avatar>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: EntityId,
    pub title: Option<String>,
    pub body: String,
    pub sender_id: Option<EntityId>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceive {
    pub id: EntityId,
    pub message_id: EntityId,
    pub receiver_id: EntityId,
    pub read_at: Option<i64>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl MessageReceive {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Menu tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: EntityId,
    pub name: String,
    pub path: Option<String>,
    pub sort: i64,
    pub parent_id: Option<EntityId>,
    pub permission_id: Option<EntityId>,
    /// Permission reference backing the `permission` display field.
    #[serde(default)]
    pub p: Option<Permission>,
    #[serde(default)]
    pub parent: Option<Box<Menu>>,
    #[serde(default)]
    pub children: Vec<Menu>,
    /// Copy of `p.name`, filled by the post-load subscriber.
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Menu {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
