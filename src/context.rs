// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    callbacks::{passphrase_callback, passphrase_callback_raw, verify_callback},
    enums::{Mode, VerificationMode},
    error::Error,
    openssl_extension::SslContextExtension,
};
use openssl::{
    pkey::{PKey, PKeyRef, Private},
    ssl::{Ssl, SslContext, SslContextBuilder, SslFiletype, SslVerifyMode},
    x509::{X509Ref, X509},
};
use std::{fmt, path::Path};

/// An engine context for one role.
///
/// Share it through an `Arc`, e.g. to register it with
/// [`ContextRegistry::initialize_server`](crate::registry::ContextRegistry::initialize_server).
pub struct Context {
    mode: Mode,
    verification_mode: VerificationMode,
    ssl_context: SslContext,
}

impl Context {
    /// Returns a [`Builder`] whose engine callbacks are routed through the
    /// process-wide registry.
    pub fn builder(mode: Mode) -> Result<Builder, Error> {
        Builder::new(mode)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn verification_mode(&self) -> VerificationMode {
        self.verification_mode
    }

    pub fn ssl_context(&self) -> &SslContext {
        &self.ssl_context
    }

    /// Creates a connection object from this context.
    pub fn new_ssl(&self) -> Result<Ssl, Error> {
        Ok(Ssl::new(&self.ssl_context)?)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("mode", &self.mode)
            .field("verification_mode", &self.verification_mode)
            .finish_non_exhaustive()
    }
}

/// Configures a [`Context`] before it is frozen by [`Builder::build`].
pub struct Builder {
    mode: Mode,
    verification_mode: VerificationMode,
    builder: SslContextBuilder,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("mode", &self.mode)
            .field("verification_mode", &self.verification_mode)
            .finish_non_exhaustive()
    }
}

impl Builder {
    pub fn new(mode: Mode) -> Result<Self, Error> {
        let mut builder = SslContextBuilder::new(mode.method())?;
        // the engine asks for passphrases when loading encrypted keys from files
        builder.set_default_passwd_cb(passphrase_callback_raw);

        let mut builder = Self {
            mode,
            verification_mode: VerificationMode::default(),
            builder,
        };
        builder.set_verification_mode(VerificationMode::default());
        Ok(builder)
    }

    /// Sets how the peer's certificate chain is verified.
    ///
    /// For every mode other than [`VerificationMode::None`] chain failures are
    /// routed to the registry's verification error channel for this builder's
    /// role.
    pub fn set_verification_mode(&mut self, verification_mode: VerificationMode) -> &mut Self {
        match verification_mode {
            VerificationMode::None => self.builder.set_verify(SslVerifyMode::NONE),
            _ => {
                let mode = self.mode;
                self.builder
                    .set_verify_callback(verification_mode.into(), move |ok, store| {
                        verify_callback(mode, ok, &*store)
                    });
            }
        }
        self.verification_mode = verification_mode;
        self
    }

    /// Limits how many intermediate certificates may follow the leaf.
    pub fn set_verify_depth(&mut self, depth: u32) -> &mut Self {
        self.builder.set_verify_depth(depth);
        self
    }

    /// Restricts the cipher suites used up to TLS 1.2, in OpenSSL cipher list
    /// syntax.
    pub fn set_cipher_list(&mut self, cipher_list: &str) -> Result<&mut Self, Error> {
        self.builder.set_cipher_list(cipher_list)?;
        Ok(self)
    }

    pub fn set_certificate(&mut self, certificate: &X509Ref) -> Result<&mut Self, Error> {
        self.builder.set_certificate(certificate)?;
        Ok(self)
    }

    /// Loads a PEM file holding the leaf certificate followed by its chain.
    pub fn set_certificate_chain_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, Error> {
        self.builder.set_certificate_chain_file(path)?;
        Ok(self)
    }

    pub fn set_private_key(&mut self, key: &PKeyRef<Private>) -> Result<&mut Self, Error> {
        self.builder.set_private_key(key)?;
        Ok(self)
    }

    /// Loads a PEM private key file.
    ///
    /// If the key is encrypted, the engine calls back into
    /// [`passphrase_callback_raw`] for the passphrase.
    pub fn set_private_key_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, Error> {
        self.builder.set_private_key_file(path, SslFiletype::PEM)?;
        Ok(self)
    }

    /// Parses a PEM private key, asking [`passphrase_callback`] for the
    /// passphrase if the key is encrypted.
    pub fn set_private_key_pem(&mut self, pem: &[u8]) -> Result<&mut Self, Error> {
        let key = PKey::private_key_from_pem_callback(pem, |buf| Ok(passphrase_callback(buf)))?;
        self.builder.set_private_key(&key)?;
        Ok(self)
    }

    /// Checks that the configured private key matches the certificate.
    pub fn check_private_key(&self) -> Result<(), Error> {
        self.builder.check_private_key()?;
        Ok(())
    }

    pub fn add_trusted_certificate(&mut self, certificate: &X509Ref) -> Result<&mut Self, Error> {
        self.builder
            .cert_store_mut()
            .add_cert(certificate.to_owned())?;
        Ok(self)
    }

    /// Trusts every certificate in a PEM bundle.
    pub fn add_trusted_pem_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, Error> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|err| Error::io(path, err))?;
        for certificate in X509::stack_from_pem(&pem)? {
            self.builder.cert_store_mut().add_cert(certificate)?;
        }
        Ok(self)
    }

    /// Trusts the CA certificates in a PEM file, letting the engine read it.
    pub fn set_ca_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, Error> {
        self.builder.set_ca_file(path)?;
        Ok(self)
    }

    pub fn build(self) -> Context {
        tracing::debug!(
            mode = ?self.mode,
            verification = ?self.verification_mode,
            "context built"
        );
        Context {
            mode: self.mode,
            verification_mode: self.verification_mode,
            ssl_context: self.builder.build(),
        }
    }
}
