// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Entry points the TLS engine calls back into during a handshake.
//!
//! The engine invokes these synchronously on the thread driving the handshake.
//! Each entry point looks up the process-wide [`ContextRegistry`], publishes a
//! freshly built value on one of its channels, and turns whatever the
//! subscribers left in that value into the return code the engine expects:
//! * [`verify_callback`] is installed with
//!   [`SslContextBuilder::set_verify_callback`](openssl::ssl::SslContextBuilder::set_verify_callback)
//!   and decides whether a failed chain element is fatal.
//! * [`passphrase_callback`] (and its `extern "C"` twin
//!   [`passphrase_callback_raw`]) supplies the passphrase for an encrypted
//!   private key.
//!
//! Nothing is remembered between invocations. Contexts built through
//! [`Builder`](crate::context::Builder) are wired to both automatically.
//!
//! [`ContextRegistry`]: crate::registry::ContextRegistry

mod passphrase;
pub use passphrase::*;

mod verification;
pub use verification::*;
