//! Core of the backstage admin backend.
//!
//! Descriptor-driven repositories over SQLite, request DTO validation,
//! guest-aware authentication and process bootstrap (config, logging).

pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;
pub mod util;

pub use config::{AppConfig, ConfigError, ConfigResult};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{
    default_log_level, init_from_config, init_logging, logging_status, LoggingError,
};
pub use model::kind::EntityKind;
pub use model::{EntityId, Record};
pub use registry::{RegistryError, RepositoryRegistry};
pub use repo::{BaseRepository, RepoError, RepoResult, SelectQuery, TrashFilter, TreeRepository};
pub use util::{to_boolean, to_flat_trees};
