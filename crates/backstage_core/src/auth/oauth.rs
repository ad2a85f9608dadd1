//! GitHub OAuth strategy configuration.
//!
//! Only the redirect leg is built here; code exchange and profile lookup
//! belong to the external OAuth client.

use crate::config::{load_dotenv, required, ConfigError, ConfigResult};
use url::Url;

pub const CLIENT_ID_VAR: &str = "GITHUB_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "GITHUB_CLIENT_SECRET";
pub const CALLBACK_URL_VAR: &str = "GITHUB_CALLBACK_URL";

pub const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
/// Scopes requested from GitHub.
pub const GITHUB_SCOPE: &[&str] = &["user:email"];

/// Client credentials and callback for the GitHub strategy.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthStrategyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: Url,
}

impl std::fmt::Debug for OAuthStrategyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthStrategyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url.as_str())
            .finish()
    }
}

impl OAuthStrategyConfig {
    /// Loads `.env` (if any) and reads the three GitHub variables.
    pub fn from_env() -> ConfigResult<Self> {
        load_dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let client_id = required(&lookup, CLIENT_ID_VAR)?;
        let client_secret = required(&lookup, CLIENT_SECRET_VAR)?;
        let raw_callback = required(&lookup, CALLBACK_URL_VAR)?;
        let callback_url = Url::parse(&raw_callback).map_err(|err| ConfigError::Invalid {
            name: CALLBACK_URL_VAR,
            value: raw_callback.clone(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            client_id,
            client_secret,
            callback_url,
        })
    }

    pub fn scope(&self) -> &'static [&'static str] {
        GITHUB_SCOPE
    }
}

/// Redirect builder for the GitHub login flow.
#[derive(Debug, Clone)]
pub struct GithubStrategy {
    config: OAuthStrategyConfig,
}

impl GithubStrategy {
    pub fn new(config: OAuthStrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OAuthStrategyConfig {
        &self.config
    }

    /// Provider URL the user agent is redirected to, carrying `state`.
    pub fn authorization_url(&self, state: &str) -> ConfigResult<Url> {
        let mut url = Url::parse(GITHUB_AUTHORIZE_URL).map_err(|err| ConfigError::Invalid {
            name: "GITHUB_AUTHORIZE_URL",
            value: GITHUB_AUTHORIZE_URL.to_string(),
            reason: err.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.callback_url.as_str())
            .append_pair("scope", &self.config.scope().join(" "))
            .append_pair("state", state);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::{GithubStrategy, OAuthStrategyConfig, GITHUB_SCOPE};
    use crate::config::ConfigError;
    use std::collections::HashMap;

    fn config() -> OAuthStrategyConfig {
        let vars = HashMap::from([
            ("GITHUB_CLIENT_ID", "client-123"),
            ("GITHUB_CLIENT_SECRET", "s3cret"),
            ("GITHUB_CALLBACK_URL", "https://app.example.com/auth/github/callback"),
        ]);
        OAuthStrategyConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap()
    }

    #[test]
    fn missing_variable_is_named() {
        let err = OAuthStrategyConfig::from_lookup(|name| {
            (name != "GITHUB_CLIENT_SECRET").then(|| "value".to_string())
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("GITHUB_CLIENT_SECRET"));
    }

    #[test]
    fn blank_variable_is_rejected() {
        let err = OAuthStrategyConfig::from_lookup(|_| Some("  ".to_string())).unwrap_err();
        assert_eq!(err, ConfigError::Empty("GITHUB_CLIENT_ID"));
    }

    #[test]
    fn scope_is_fixed_to_user_email() {
        assert_eq!(config().scope(), GITHUB_SCOPE);
        assert_eq!(GITHUB_SCOPE, &["user:email"]);
    }

    #[test]
    fn authorization_url_carries_client_callback_scope_and_state() {
        let url = GithubStrategy::new(config())
            .authorization_url("xyz")
            .unwrap();
        assert_eq!(url.host_str(), Some("github.com"));
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "client-123");
        assert_eq!(
            pairs["redirect_uri"],
            "https://app.example.com/auth/github/callback"
        );
        assert_eq!(pairs["scope"], "user:email");
        assert_eq!(pairs["state"], "xyz");
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("s3cret"));
    }
}
