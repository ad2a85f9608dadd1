//! Authentication: guest-route metadata, the default guard and the GitHub
//! OAuth strategy configuration.

pub mod guard;
pub mod guest;
pub mod oauth;

pub use guard::{AuthError, AuthGuard, Principal};
pub use guest::{Route, RouteMetadata};
pub use oauth::{GithubStrategy, OAuthStrategyConfig};
