// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Helpers for exercising contexts end to end without sockets: runtime
//! generated certificates and an in-memory client/server handshake driver.

use crate::{
    context::Context,
    enums::{Mode, VerificationMode},
    error::Error,
};
use openssl::{
    asn1::Asn1Time,
    bn::BigNum,
    ec::{EcGroup, EcKey},
    error::ErrorStack,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    ssl::{ErrorCode, SslStream},
    x509::{X509NameBuilder, X509},
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

mod io;
pub use io::{LinkEnd, MemoryLink, Wire};

type TestError = Box<dyn std::error::Error>;

#[derive(Clone)]
pub struct Counter(Arc<AtomicUsize>);
impl Counter {
    fn new() -> Self {
        Counter(Arc::new(AtomicUsize::new(0)))
    }
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}
impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// A certificate together with the key it certifies.
pub struct CertifiedKey {
    pub cert: X509,
    pub key: PKey<Private>,
}

fn certified_key(
    common_name: &str,
    not_before: &Asn1Time,
    not_after: &Asn1Time,
) -> Result<CertifiedKey, ErrorStack> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
    let key = PKey::from_ec_key(EcKey::generate(&group)?)?;

    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_nid(Nid::COMMONNAME, common_name)?;
    let name = name.build();

    let serial = BigNum::from_u32(1)?.to_asn1_integer()?;
    let mut cert = X509::builder()?;
    cert.set_version(2)?;
    cert.set_serial_number(&serial)?;
    cert.set_subject_name(&name)?;
    cert.set_issuer_name(&name)?;
    cert.set_pubkey(&key)?;
    cert.set_not_before(not_before)?;
    cert.set_not_after(not_after)?;
    cert.sign(&key, MessageDigest::sha256())?;

    Ok(CertifiedKey {
        cert: cert.build(),
        key,
    })
}

/// A self-signed P-256 certificate valid for the next 30 days.
pub fn self_signed(common_name: &str) -> Result<CertifiedKey, ErrorStack> {
    certified_key(
        common_name,
        &Asn1Time::days_from_now(0)?,
        &Asn1Time::days_from_now(30)?,
    )
}

/// A self-signed P-256 certificate that expired in 1970.
pub fn expired(common_name: &str) -> Result<CertifiedKey, ErrorStack> {
    certified_key(
        common_name,
        &Asn1Time::from_unix(0)?,
        &Asn1Time::from_unix(86_400)?,
    )
}

/// A context with nothing configured beyond its role.
pub fn test_context(mode: Mode) -> Context {
    let mut builder = Context::builder(mode).unwrap();
    builder.set_verification_mode(VerificationMode::None);
    builder.build()
}

/// A server context presenting `identity`.
pub fn server_context(
    identity: &CertifiedKey,
    verification: VerificationMode,
) -> Result<Context, Error> {
    let mut builder = Context::builder(Mode::Server)?;
    builder
        .set_verification_mode(verification)
        .set_certificate(&identity.cert)?
        .set_private_key(&identity.key)?;
    Ok(builder.build())
}

/// A client context that verifies the server and trusts `trusted`, optionally
/// presenting `identity`.
pub fn client_context(
    trusted: Option<&CertifiedKey>,
    identity: Option<&CertifiedKey>,
) -> Result<Context, Error> {
    let mut builder = Context::builder(Mode::Client)?;
    builder.set_verification_mode(VerificationMode::Relaxed);
    if let Some(trusted) = trusted {
        builder.add_trusted_certificate(&trusted.cert)?;
    }
    if let Some(identity) = identity {
        builder
            .set_certificate(&identity.cert)?
            .set_private_key(&identity.key)?;
    }
    Ok(builder.build())
}

/// A client and a server connection wired to each other through memory.
pub struct TlsPair {
    pub client: SslStream<LinkEnd>,
    pub server: SslStream<LinkEnd>,
    pub link: MemoryLink,
}

impl TlsPair {
    const MAX_ROUNDS: usize = 10;

    pub fn new(client: &Context, server: &Context) -> Result<Self, Error> {
        let link = MemoryLink::default();
        let client = SslStream::new(client.new_ssl()?, link.client_end())?;
        let server = SslStream::new(server.new_ssl()?, link.server_end())?;
        Ok(Self {
            client,
            server,
            link,
        })
    }

    /// Drives both sides until the handshake completes or one side fails.
    pub fn handshake(&mut self) -> Result<(), TestError> {
        for _ in 0..Self::MAX_ROUNDS {
            if self.handshake_completed() {
                return Ok(());
            }
            Self::step(&mut self.client)?;
            Self::step(&mut self.server)?;
        }

        if self.handshake_completed() {
            Ok(())
        } else {
            Err("handshake did not complete".into())
        }
    }

    pub fn handshake_completed(&self) -> bool {
        self.client.ssl().is_init_finished() && self.server.ssl().is_init_finished()
    }

    // treat blocking (`ErrorCode::WANT_READ`) as `Ok`, expected during handshake
    fn step(stream: &mut SslStream<LinkEnd>) -> Result<(), openssl::ssl::Error> {
        let result = if stream.ssl().is_server() {
            stream.accept()
        } else {
            stream.connect()
        };
        match result {
            Err(err) if err.code() != ErrorCode::WANT_READ => Err(err),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ContextRegistry;
    use serial_test::serial;

    #[test]
    fn generated_certificates() -> Result<(), TestError> {
        let fresh = self_signed("fresh")?;
        let stale = expired("stale")?;
        let now = Asn1Time::days_from_now(0)?;
        assert!(fresh.cert.not_after() > now);
        assert!(stale.cert.not_after() < now);
        assert!(fresh.cert.verify(&fresh.key)?);
        Ok(())
    }

    // Without peer verification on either side no callback is involved.
    #[test]
    #[serial]
    fn unverified_handshake() -> Result<(), TestError> {
        ContextRegistry::destroy();
        let identity = self_signed("localhost")?;
        let server = server_context(&identity, VerificationMode::None)?;
        let mut client = Context::builder(Mode::Client)?;
        client.set_verification_mode(VerificationMode::None);
        let client = client.build();

        let mut pair = TlsPair::new(&client, &server)?;
        pair.handshake()?;
        assert!(pair.handshake_completed());
        Ok(())
    }
}
