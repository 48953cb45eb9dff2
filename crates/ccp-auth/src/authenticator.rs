// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::principal::{Capability, Principal};
use async_trait::async_trait;
use ccp_core::CoreError;

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `bearer` is the raw token from the `Authorization: Bearer <token>`
    /// header, with the `Bearer ` prefix already stripped. Returns
    /// `CoreError::Unauthenticated` for an unknown or malformed token.
    async fn authenticate(&self, bearer: &str) -> Result<Principal, CoreError>;
}

/// Single shared token granting every capability. Meant for local
/// development and the test suite; it is not a production authenticator and
/// has no notion of per-user tokens, expiry, or revocation.
pub struct StaticTokenAuthenticator {
    token: String,
}

impl StaticTokenAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, bearer: &str) -> Result<Principal, CoreError> {
        if bearer.is_empty() || bearer != self.token {
            return Err(CoreError::Unauthenticated);
        }
        Ok(Principal::new(
            "static-token",
            vec![
                Capability::ViewAgents,
                Capability::ControlProcesses,
                Capability::ManageAgents,
                Capability::StartDiscovery,
                Capability::Subscribe,
                Capability::ReloadConfig,
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn correct_token_grants_every_capability() {
        let auth = StaticTokenAuthenticator::new("secret");
        let principal = auth.authenticate("secret").await.unwrap();
        assert!(principal.can(Capability::ManageAgents));
    }

    #[tokio::test]
    async fn wrong_token_is_unauthenticated() {
        let auth = StaticTokenAuthenticator::new("secret");
        let err = auth.authenticate("nope").await.unwrap_err();
        assert!(matches!(err, CoreError::Unauthenticated));
    }

    #[tokio::test]
    async fn empty_token_is_unauthenticated() {
        let auth = StaticTokenAuthenticator::new("secret");
        let err = auth.authenticate("").await.unwrap_err();
        assert!(matches!(err, CoreError::Unauthenticated));
    }
}
