// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Pairs the registry's lifecycle with the TLS engine's.
//!
//! Calls to [`initialize_ssl`] and [`uninitialize_ssl`] nest: the engine is
//! initialized by the first and released by the matching last one. The
//! registry is always shut down before the engine is released, so no context
//! outlives it through the registry.

use crate::registry::ContextRegistry;
use std::sync::{Mutex, MutexGuard, PoisonError};

static ENGINE_USERS: Mutex<usize> = Mutex::new(0);

fn engine_users() -> MutexGuard<'static, usize> {
    ENGINE_USERS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn initialize_engine() {
    let mut users = engine_users();
    if *users == 0 {
        openssl::init();
        tracing::debug!(version = openssl::version::version(), "TLS engine initialized");
    }
    *users += 1;
}

fn uninitialize_engine() {
    let mut users = engine_users();
    match *users {
        0 => tracing::warn!("TLS engine released more often than it was initialized"),
        1 => {
            *users = 0;
            // OpenSSL 1.1+ frees its global state at process exit on its own
            tracing::debug!("TLS engine released");
        }
        _ => *users -= 1,
    }
}

/// Initializes the TLS engine.
pub fn initialize_ssl() {
    initialize_engine();
}

/// Shuts down the process-wide [`ContextRegistry`], then releases the TLS
/// engine.
pub fn uninitialize_ssl() {
    ContextRegistry::instance().shutdown();
    uninitialize_engine();
}

/// Whether at least one [`initialize_ssl`] is still outstanding.
pub fn is_initialized() -> bool {
    *engine_users() > 0
}
