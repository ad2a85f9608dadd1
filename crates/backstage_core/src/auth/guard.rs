//! Default-deny authentication guard.

use crate::auth::guest::{Route, RouteMetadata};
use crate::model::EntityId;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: EntityId,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    Unauthorized,
}

impl AuthError {
    pub fn status(self) -> u16 {
        match self {
            Self::Unauthorized => 401,
        }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "authentication required"),
        }
    }
}

impl Error for AuthError {}

/// Requires a principal on every route not tagged guest-allowed.
#[derive(Debug, Clone, Default)]
pub struct AuthGuard {
    metadata: RouteMetadata,
}

impl AuthGuard {
    pub fn new(metadata: RouteMetadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &RouteMetadata {
        &self.metadata
    }

    pub fn can_activate(
        &self,
        route: Route<'_>,
        principal: Option<&Principal>,
    ) -> Result<(), AuthError> {
        if self.metadata.is_guest_allowed(route) {
            return Ok(());
        }
        match principal {
            Some(_) => Ok(()),
            None => {
                debug!(
                    "event=auth_guard module=auth status=error route={route} reason=unauthorized"
                );
                Err(AuthError::Unauthorized)
            }
        }
    }
}
