// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The process-wide registry of default contexts and handshake event channels.

use crate::{callbacks::VerificationErrorDetails, context::Context, signal::Signal};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static INSTANCE: Mutex<Option<Arc<ContextRegistry>>> = Mutex::new(None);

#[derive(Debug, Default)]
struct Defaults {
    server: Option<Arc<Context>>,
    client: Option<Arc<Context>>,
}

/// Holds the default server and client [`Context`] and the channels the
/// handshake callbacks publish on.
///
/// There is one registry per process, reached through
/// [`ContextRegistry::instance`]. Handles are reference counted: a handle taken
/// before [`ContextRegistry::destroy`] keeps pointing at the old, shut down
/// registry, while `instance()` starts handing out a fresh one.
#[derive(Debug)]
pub struct ContextRegistry {
    // one lock for both roles
    defaults: Mutex<Defaults>,
    server_verification_error: Signal<VerificationErrorDetails>,
    client_verification_error: Signal<VerificationErrorDetails>,
    private_key_passphrase_required: Signal<String>,
}

impl ContextRegistry {
    pub(crate) fn new() -> Self {
        Self {
            defaults: Mutex::new(Defaults::default()),
            server_verification_error: Signal::new(),
            client_verification_error: Signal::new(),
            private_key_passphrase_required: Signal::new(),
        }
    }

    /// Returns the process-wide registry, creating it on first use.
    pub fn instance() -> Arc<ContextRegistry> {
        let mut slot = INSTANCE.lock().unwrap_or_else(PoisonError::into_inner);
        let registry = slot.get_or_insert_with(|| {
            tracing::debug!("creating context registry");
            Arc::new(ContextRegistry::new())
        });
        Arc::clone(registry)
    }

    /// Shuts down and releases the process-wide registry.
    ///
    /// The next [`ContextRegistry::instance`] call creates a new one with no
    /// defaults and no subscribers.
    pub fn destroy() {
        let previous = INSTANCE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(registry) = previous {
            tracing::debug!("destroying context registry");
            registry.shutdown();
        }
    }

    /// Makes `context` the default server context, releasing the previous one.
    pub fn initialize_server(&self, context: Arc<Context>) {
        let previous = self.defaults().server.replace(context);
        tracing::debug!(replaced = previous.is_some(), "default server context set");
    }

    /// Makes `context` the default client context, releasing the previous one.
    pub fn initialize_client(&self, context: Arc<Context>) {
        let previous = self.defaults().client.replace(context);
        tracing::debug!(replaced = previous.is_some(), "default client context set");
    }

    /// The current default server context, if one has been set.
    pub fn default_server_context(&self) -> Option<Arc<Context>> {
        self.defaults().server.clone()
    }

    /// The current default client context, if one has been set.
    pub fn default_client_context(&self) -> Option<Arc<Context>> {
        self.defaults().client.clone()
    }

    /// Releases both default contexts and detaches every subscriber.
    ///
    /// The registry stays usable afterwards.
    pub fn shutdown(&self) {
        let released = std::mem::take(&mut *self.defaults());
        self.private_key_passphrase_required.clear();
        self.client_verification_error.clear();
        self.server_verification_error.clear();
        tracing::debug!(
            server = released.server.is_some(),
            client = released.client.is_some(),
            "context registry shut down"
        );
    }

    /// Published when a server context fails to verify a client certificate.
    pub fn server_verification_error(&self) -> &Signal<VerificationErrorDetails> {
        &self.server_verification_error
    }

    /// Published when a client context fails to verify a server certificate.
    pub fn client_verification_error(&self) -> &Signal<VerificationErrorDetails> {
        &self.client_verification_error
    }

    /// Published when the engine needs the passphrase of an encrypted private key.
    pub fn private_key_passphrase_required(&self) -> &Signal<String> {
        &self.private_key_passphrase_required
    }

    // The guarded value is a pair of `Option<Arc<_>>` that is only ever
    // replaced wholesale, so a poisoned lock still holds consistent data.
    fn defaults(&self) -> MutexGuard<'_, Defaults> {
        self.defaults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ContextRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
