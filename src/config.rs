//! Coordinator configuration parsed from environment variables.

use std::fmt;

pub const DEFAULT_ADMIN_DOMAIN: &str = "synjoint.com";
pub const DEFAULT_HOME_ROUTE: &str = "/";
pub const DEFAULT_ARTICLES_ROUTE: &str = "/blog";
pub const DEFAULT_POSTINGS_ROUTE: &str = "/careers";
pub const DEFAULT_FEDERATED_REDIRECT: &str = "/";

/// Errors produced while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A route variable did not start with `/`.
    #[error("{var} must be an absolute route starting with '/': {value:?}")]
    InvalidRoute { var: &'static str, value: String },

    /// The admin domain contained `@` or whitespace.
    #[error("SYNJOINT_ADMIN_DOMAIN must be a bare domain: {0:?}")]
    InvalidDomain(String),
}

/// Routes the coordinator navigates to after successful operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    pub home: String,
    pub articles: String,
    pub postings: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Email domain whose users are privileged when their profile names no role.
    pub admin_domain: String,
    pub routes: Routes,
    /// Where the federated provider should send the browser back to.
    pub federated_redirect: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            admin_domain: DEFAULT_ADMIN_DOMAIN.to_owned(),
            routes: Routes {
                home: DEFAULT_HOME_ROUTE.to_owned(),
                articles: DEFAULT_ARTICLES_ROUTE.to_owned(),
                postings: DEFAULT_POSTINGS_ROUTE.to_owned(),
            },
            federated_redirect: DEFAULT_FEDERATED_REDIRECT.to_owned(),
        }
    }
}

impl SessionConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `SYNJOINT_ADMIN_DOMAIN`: default `synjoint.com`
    /// - `SYNJOINT_HOME_ROUTE`: default `/`
    /// - `SYNJOINT_ARTICLES_ROUTE`: default `/blog`
    /// - `SYNJOINT_POSTINGS_ROUTE`: default `/careers`
    /// - `SYNJOINT_FEDERATED_REDIRECT`: default `/`
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a value is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SessionConfig::from_env`] but reads through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a value is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin_domain = parse_domain(lookup("SYNJOINT_ADMIN_DOMAIN"))?;
        let routes = Routes {
            home: parse_route("SYNJOINT_HOME_ROUTE", lookup("SYNJOINT_HOME_ROUTE"), DEFAULT_HOME_ROUTE)?,
            articles: parse_route("SYNJOINT_ARTICLES_ROUTE", lookup("SYNJOINT_ARTICLES_ROUTE"), DEFAULT_ARTICLES_ROUTE)?,
            postings: parse_route("SYNJOINT_POSTINGS_ROUTE", lookup("SYNJOINT_POSTINGS_ROUTE"), DEFAULT_POSTINGS_ROUTE)?,
        };
        let federated_redirect = lookup("SYNJOINT_FEDERATED_REDIRECT")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FEDERATED_REDIRECT.to_owned());

        Ok(Self { admin_domain, routes, federated_redirect })
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "admin_domain={} home={} articles={} postings={}",
            self.admin_domain, self.routes.home, self.routes.articles, self.routes.postings
        )
    }
}

fn parse_domain(raw: Option<String>) -> Result<String, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_ADMIN_DOMAIN.to_owned());
    };
    let domain = raw.trim().trim_start_matches('@').to_ascii_lowercase();
    if domain.is_empty() || domain.contains('@') || domain.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidDomain(raw));
    }
    Ok(domain)
}

fn parse_route(var: &'static str, raw: Option<String>, default: &str) -> Result<String, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default.to_owned()),
        Some(route) if route.starts_with('/') => Ok(route.to_owned()),
        Some(route) => Err(ConfigError::InvalidRoute { var, value: route.to_owned() }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
