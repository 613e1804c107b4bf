// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use openssl::ssl::{SslMethod, SslVerifyMode};
use strum::EnumIter;

/// The role a context plays in the handshake.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, EnumIter)]
pub enum Mode {
    Server,
    Client,
}

impl Mode {
    pub(crate) fn method(self) -> SslMethod {
        match self {
            Mode::Server => SslMethod::tls_server(),
            Mode::Client => SslMethod::tls_client(),
        }
    }
}

/// How strictly a context verifies its peer's certificate chain.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone, EnumIter)]
pub enum VerificationMode {
    /// Servers do not request a client certificate. Clients still receive the
    /// server chain but the handshake continues regardless of the outcome.
    None,
    /// The peer's certificate is verified if one is presented.
    #[default]
    Relaxed,
    /// Like `Relaxed`, and a server also fails the handshake when the client
    /// presents no certificate.
    Strict,
    /// Like `Relaxed`, but a server only requests the client certificate on
    /// the initial handshake, not on renegotiation.
    Once,
}

impl From<VerificationMode> for SslVerifyMode {
    fn from(input: VerificationMode) -> SslVerifyMode {
        match input {
            VerificationMode::None => SslVerifyMode::NONE,
            VerificationMode::Relaxed => SslVerifyMode::PEER,
            VerificationMode::Strict => SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT,
            VerificationMode::Once => SslVerifyMode::PEER | SslVerifyMode::CLIENT_ONCE,
        }
    }
}
