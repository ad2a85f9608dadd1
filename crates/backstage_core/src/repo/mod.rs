//! Repository layer: descriptor-driven scopes over SQLite.
//!
//! # Responsibility
//! - Encode each entity's default query scope (joins, ordering) as data.
//! - Provide one generic repository plus a tree specialization.
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - All list/find/detail reads start from the entity's base query.
//! - Repository APIs return semantic errors (`NotFound`, `NotTree`) in
//!   addition to DB transport errors.

pub mod base_repo;
pub mod descriptor;
pub mod entities;
pub mod error;
pub mod page;
pub mod query;
pub mod subscriber;
pub mod tree_repo;

pub use base_repo::{decode, decode_all, BaseRepository, DeleteSummary};
pub use descriptor::{EntityDescriptor, OrderBy, OrderDirection, Relation, RelationKind, TreeSpec};
pub use error::{RepoError, RepoResult};
pub use page::{PaginateMeta, Paginated};
pub use query::{QueryError, QueryResult, SelectQuery, TrashFilter};
pub use subscriber::{EntitySubscriber, MenuPermissionSubscriber, SubscriberSet};
pub use tree_repo::TreeRepository;
