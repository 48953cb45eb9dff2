// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: String, source: toml::de::Error },

    #[error("failed to read {path}: {source}")]
    Env { path: String, source: dotenvy::Error },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<&ConfigError> for ccp_core::CoreError {
    fn from(err: &ConfigError) -> Self {
        ccp_core::CoreError::InvalidInput(err.to_string())
    }
}
