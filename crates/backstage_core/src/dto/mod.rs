//! Inbound request shapes and their validation pipeline.
//!
//! # Responsibility
//! - Declare accepted fields and per-field rules for each request.
//! - Aggregate every failure into one `ValidationRejection` before any
//!   repository is invoked.

pub mod auth;
pub mod pipe;
pub mod query;
pub mod validation;

pub use auth::CredentialDto;
pub use pipe::ValidationPipe;
pub use query::{
    DeleteDto, DetailQueryDto, ListQueryDto, QueryPermissionDto, RestoreDto, TrashMode,
};
pub use validation::{
    DataExists, FieldError, Locale, Rule, Validate, ValidationContext, ValidationErrors,
    ValidationRejection,
};
