//! Admin domain records.
//!
//! # Responsibility
//! - Name every persisted entity kind and its stable string id.
//! - Provide typed read models decoded from repository records.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID `id`.
//! - Deletion is a `deleted_at` tombstone unless a caller purges explicitly.

pub mod entity;
pub mod kind;

/// Stable identifier shared by every entity.
pub type EntityId = uuid::Uuid;

/// Loaded entity shape: column values plus eagerly joined relations.
///
/// To-one relations are nested objects (or `null`), to-many relations are
/// arrays. Typed models are decoded from this shape with `serde`.
pub type Record = serde_json::Map<String, serde_json::Value>;
