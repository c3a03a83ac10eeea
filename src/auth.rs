//! Credential lookup.
//!
//! The session never fetches credentials itself; it asks a [`TokenProvider`].  An empty or
//! missing token means the session must not start.

use std::env;

use crate::error::{Error, Result};

/// Environment variables consulted by [`EnvTokenProvider::default`], in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["MODELCHAT_TOKEN", "GITHUB_TOKEN"];

/// Supplies an opaque bearer credential.
pub trait TokenProvider {
    /// Returns the credential, or `None` if there is none.
    fn token(&self) -> Option<String>;
}

/// Reads the credential from the first non-empty environment variable of a list.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    vars: Vec<String>,
}

impl EnvTokenProvider {
    /// Looks the credential up in `vars`, in order.
    pub fn new<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    /// The variables consulted, in order.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VARS)
    }
}

impl TokenProvider for EnvTokenProvider {
    fn token(&self) -> Option<String> {
        self.vars
            .iter()
            .filter_map(|var| env::var(var).ok())
            .map(|token| token.trim().to_string())
            .find(|token| !token.is_empty())
    }
}

/// A fixed credential.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Fetches the credential, failing with an authentication error if it is missing or empty.
pub fn require_token(provider: &dyn TokenProvider) -> Result<String> {
    match provider.token() {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(Error::authentication(format!(
            "No token found. Set {} to authenticate.",
            TOKEN_ENV_VARS.join(" or ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_token_is_returned() {
        let token = require_token(&StaticToken("secret".to_string())).unwrap();
        assert_eq!(token, "secret");
    }

    #[test]
    fn empty_token_is_an_authentication_error() {
        let err = require_token(&StaticToken("  ".to_string())).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn unset_variables_yield_no_token() {
        let provider = EnvTokenProvider::new(["MODELCHAT_TEST_SURELY_UNSET_VARIABLE"]);
        assert_eq!(provider.token(), None);
        assert!(require_token(&provider).is_err());
    }

    #[test]
    fn default_provider_vars() {
        let provider = EnvTokenProvider::default();
        assert_eq!(provider.vars(), &["MODELCHAT_TOKEN", "GITHUB_TOKEN"]);
    }
}
