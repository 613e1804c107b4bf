// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide default TLS contexts and the handshake callbacks that route
//! OpenSSL's certificate verification failures and private key passphrase
//! requests to application subscribers.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tls_manager::{
//!     callbacks::VerificationErrorDetails, context::Context, enums::Mode, init,
//!     registry::ContextRegistry,
//! };
//!
//! # fn main() -> Result<(), tls_manager::error::Error> {
//! init::initialize_ssl();
//! let registry = ContextRegistry::instance();
//!
//! registry
//!     .private_key_passphrase_required()
//!     .subscribe(|passphrase: &mut String| passphrase.push_str("secret"));
//! registry
//!     .client_verification_error()
//!     .subscribe(|details: &mut VerificationErrorDetails| {
//!         eprintln!("depth {}: {}", details.error_depth(), details.error_message());
//!     });
//!
//! let mut server = Context::builder(Mode::Server)?;
//! server
//!     .set_certificate_chain_file("server-chain.pem")?
//!     .set_private_key_file("server-key.pem")?;
//! registry.initialize_server(Arc::new(server.build()));
//!
//! let mut client = Context::builder(Mode::Client)?;
//! client.set_ca_file("ca-cert.pem")?;
//! registry.initialize_client(Arc::new(client.build()));
//!
//! // ... handshakes ...
//!
//! init::uninitialize_ssl();
//! # Ok(())
//! # }
//! ```

pub mod callbacks;
pub mod context;
pub mod enums;
pub mod error;
pub mod init;
pub mod openssl_extension;
pub mod registry;
pub mod signal;

#[cfg(any(feature = "testing", test))]
pub mod testing;
