// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{enums::Mode, registry::ContextRegistry};
use openssl::x509::{X509Ref, X509StoreContextRef, X509VerifyResult, X509};

/// The parts of the engine's verification state the dispatcher reads.
///
/// Implemented for [`X509StoreContextRef`], which is what the engine hands to
/// a verify callback.
pub trait VerifyState {
    /// The certificate that failed, if the engine reports one.
    fn current_certificate(&self) -> Option<X509>;

    /// Position of [`VerifyState::current_certificate`] in the chain, 0 being
    /// the leaf.
    fn error_depth(&self) -> u32;

    fn error(&self) -> X509VerifyResult;
}

impl VerifyState for X509StoreContextRef {
    fn current_certificate(&self) -> Option<X509> {
        self.current_cert().map(ToOwned::to_owned)
    }

    fn error_depth(&self) -> u32 {
        X509StoreContextRef::error_depth(self)
    }

    fn error(&self) -> X509VerifyResult {
        X509StoreContextRef::error(self)
    }
}

/// Describes one failed chain element.
///
/// Published to the verification error channels of the [`ContextRegistry`].
/// A subscriber that wants the handshake to continue anyway calls
/// [`VerificationErrorDetails::set_ignore_error`].
#[derive(Debug)]
pub struct VerificationErrorDetails {
    certificate: Option<X509>,
    error_depth: u32,
    error_code: i32,
    error_message: String,
    ignore_error: bool,
}

impl VerificationErrorDetails {
    pub fn new(
        certificate: Option<X509>,
        error_depth: u32,
        error_code: i32,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            certificate,
            error_depth,
            error_code,
            error_message: error_message.into(),
            ignore_error: false,
        }
    }

    fn from_state<S: VerifyState + ?Sized>(state: &S) -> Self {
        let error = state.error();
        Self::new(
            state.current_certificate(),
            state.error_depth(),
            error.as_raw(),
            error.error_string(),
        )
    }

    pub fn certificate(&self) -> Option<&X509Ref> {
        self.certificate.as_deref()
    }

    pub fn error_depth(&self) -> u32 {
        self.error_depth
    }

    /// The engine's `X509_V_ERR_*` code.
    pub fn error_code(&self) -> i32 {
        self.error_code
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn ignore_error(&self) -> bool {
        self.ignore_error
    }

    pub fn set_ignore_error(&mut self, ignore: bool) {
        self.ignore_error = ignore;
    }
}

impl ContextRegistry {
    /// Dispatch one verification outcome through this registry's channels.
    ///
    /// See [`verify_callback`].
    pub fn verify<S: VerifyState + ?Sized>(&self, mode: Mode, ok: bool, state: &S) -> bool {
        if ok {
            return true;
        }

        let mut details = VerificationErrorDetails::from_state(state);
        tracing::debug!(
            ?mode,
            depth = details.error_depth(),
            code = details.error_code(),
            reason = details.error_message(),
            "certificate verification failed"
        );

        let channel = match mode {
            Mode::Server => self.server_verification_error(),
            Mode::Client => self.client_verification_error(),
        };
        let subscribers = channel.publish(&mut details);

        if details.ignore_error() {
            tracing::warn!(
                ?mode,
                depth = details.error_depth(),
                code = details.error_code(),
                reason = details.error_message(),
                "verification error ignored by subscriber"
            );
        } else {
            tracing::trace!(?mode, subscribers, "verification error upheld");
        }
        details.ignore_error()
    }
}

/// Decide whether the engine may continue past a chain element.
///
/// `ok` is the engine's own verdict. When it is `true` the element is accepted
/// and nothing is published. Otherwise a [`VerificationErrorDetails`] is
/// published on the server or client verification error channel of
/// [`ContextRegistry::instance`], according to `mode`, and the element is
/// accepted only if a subscriber asked to ignore the error. Without
/// subscribers the failure stands.
pub fn verify_callback<S: VerifyState + ?Sized>(mode: Mode, ok: bool, state: &S) -> bool {
    if ok {
        return true;
    }
    ContextRegistry::instance().verify(mode, ok, state)
}
