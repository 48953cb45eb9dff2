// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Authentication boundary (§6, C8). Interface only: who a caller is and
//! what they're allowed to do. Password hashing and token issuance are out
//! of scope (§1); `StaticTokenAuthenticator` exists only for local/dev use.

pub mod authenticator;
pub mod principal;

pub use authenticator::{Authenticator, StaticTokenAuthenticator};
pub use principal::{Capability, Principal};
