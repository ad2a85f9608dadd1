//! Guest-access route metadata.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// One handler of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route<'a> {
    pub controller: &'a str,
    pub handler: &'a str,
}

impl<'a> Route<'a> {
    pub fn new(controller: &'a str, handler: &'a str) -> Self {
        Self {
            controller,
            handler,
        }
    }
}

impl Display for Route<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.controller, self.handler)
    }
}

/// Routes and controllers exempt from authentication.
#[derive(Debug, Clone, Default)]
pub struct RouteMetadata {
    guest_routes: HashSet<(String, String)>,
    guest_controllers: HashSet<String>,
}

impl RouteMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one handler as guest-allowed.
    pub fn allow_guest(&mut self, route: Route<'_>) -> &mut Self {
        let key = (route.controller.to_string(), route.handler.to_string());
        self.guest_routes.insert(key);
        self
    }

    /// Marks every handler of `controller` as guest-allowed.
    pub fn allow_guest_controller(&mut self, controller: &str) -> &mut Self {
        self.guest_controllers.insert(controller.to_string());
        self
    }

    /// Handler-level tag first, then controller-level tag.
    pub fn is_guest_allowed(&self, route: Route<'_>) -> bool {
        let key = (route.controller.to_string(), route.handler.to_string());
        self.guest_routes.contains(&key) || self.guest_controllers.contains(route.controller)
    }
}
