//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls from validated request DTOs.
//! - Keep transport layers decoupled from storage details.

pub mod crud_service;
pub mod menu_service;
pub mod permission_service;

pub use crud_service::CrudService;
pub use menu_service::MenuService;
pub use permission_service::PermissionService;
