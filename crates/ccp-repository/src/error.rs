// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    #[error("user not found: {0}")]
    UserNotFound(String),
}

impl From<&RepositoryError> for ccp_core::CoreError {
    fn from(err: &RepositoryError) -> Self {
        match err {
            RepositoryError::UserAlreadyExists(u) => {
                ccp_core::CoreError::Conflict(format!("user already exists: {u}"))
            }
            RepositoryError::UserNotFound(u) => ccp_core::CoreError::NotFound(u.clone()),
        }
    }
}
