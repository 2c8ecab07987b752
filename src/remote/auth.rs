//! Bearer credentials for the remote store
//!
//! Credential management belongs to the app's auth layer; the remote client
//! only asks for the current token before each request.

use crate::error::{Result, SyncError};
use tracing::debug;

/// Source of the bearer token sent with every remote request
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Result<String>;
}

/// A fixed token
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Result<String> {
        if self.0.is_empty() {
            return Err(SyncError::Auth("empty token".to_string()));
        }
        Ok(self.0.clone())
    }
}

/// Token read from an environment variable on every request, so a refreshed
/// token is picked up without restarting
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvToken {
    fn bearer_token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => {
                debug!("No token in ${}", self.var);
                Err(SyncError::Auth(format!("${} is not set", self.var)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token() {
        assert_eq!(StaticToken::new("abc").bearer_token().unwrap(), "abc");
        assert!(matches!(StaticToken::new("").bearer_token(), Err(SyncError::Auth(_))));
    }

    #[test]
    fn test_env_token_missing() {
        let provider = EnvToken::new("FRETSYNC_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert!(matches!(provider.bearer_token(), Err(SyncError::Auth(_))));
    }
}
