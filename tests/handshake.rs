// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Full in-memory handshakes where the engine drives the registry's callbacks.

use openssl_sys::{X509_V_ERR_CERT_HAS_EXPIRED, X509_V_ERR_DEPTH_ZERO_SELF_SIGNED_CERT};
use serial_test::serial;
use std::{
    io::Write,
    sync::{Arc, Mutex},
};
use tls_manager::{
    callbacks::VerificationErrorDetails,
    context::Context,
    enums::{Mode, VerificationMode},
    registry::ContextRegistry,
    testing::{client_context, expired, self_signed, server_context, Counter, TlsPair},
};

type Error = Box<dyn std::error::Error>;

#[derive(Debug, Clone, PartialEq)]
struct Event {
    depth: u32,
    code: i32,
    cert_der: Option<Vec<u8>>,
}

/// Records every event on `mode`'s verification channel, optionally asking
/// for the error to be ignored.
fn record(mode: Mode, ignore: bool) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let handle = Arc::clone(&events);
    let registry = ContextRegistry::instance();
    let channel = match mode {
        Mode::Server => registry.server_verification_error(),
        Mode::Client => registry.client_verification_error(),
    };
    channel.subscribe(move |details: &mut VerificationErrorDetails| {
        handle.lock().unwrap().push(Event {
            depth: details.error_depth(),
            code: details.error_code(),
            cert_der: details.certificate().map(|cert| cert.to_der().unwrap()),
        });
        details.set_ignore_error(ignore);
    });
    events
}

#[test_log::test]
#[serial]
fn untrusted_server_is_rejected_by_default() -> Result<(), Error> {
    ContextRegistry::destroy();
    let identity = self_signed("localhost")?;
    let server = server_context(&identity, VerificationMode::None)?;
    let client = client_context(None, None)?;

    let mut pair = TlsPair::new(&client, &server)?;
    assert!(pair.handshake().is_err());
    assert!(!pair.client.ssl().is_init_finished());
    Ok(())
}

#[test_log::test]
#[serial]
fn declining_subscriber_upholds_failure() -> Result<(), Error> {
    ContextRegistry::destroy();
    let events = record(Mode::Client, false);
    let identity = self_signed("localhost")?;
    let server = server_context(&identity, VerificationMode::None)?;
    let client = client_context(None, None)?;

    let mut pair = TlsPair::new(&client, &server)?;
    assert!(pair.handshake().is_err());
    assert_eq!(events.lock().unwrap().len(), 1);
    Ok(())
}

#[test_log::test]
#[serial]
fn client_subscriber_overrides_untrusted_server() -> Result<(), Error> {
    ContextRegistry::destroy();
    let client_events = record(Mode::Client, true);
    let server_events = record(Mode::Server, true);

    let identity = self_signed("localhost")?;
    let server = server_context(&identity, VerificationMode::None)?;
    let client = client_context(None, None)?;

    let mut pair = TlsPair::new(&client, &server)?;
    pair.handshake()?;

    let client_events = client_events.lock().unwrap();
    let first = client_events.first().expect("client verification error");
    assert_eq!(first.depth, 0);
    assert_eq!(first.code, X509_V_ERR_DEPTH_ZERO_SELF_SIGNED_CERT);
    assert_eq!(first.cert_der, Some(identity.cert.to_der()?));
    assert!(server_events.lock().unwrap().is_empty());
    Ok(())
}

#[test_log::test]
#[serial]
fn expired_server_certificate() -> Result<(), Error> {
    ContextRegistry::destroy();
    let identity = expired("localhost")?;
    let server = server_context(&identity, VerificationMode::None)?;
    let client = client_context(Some(&identity), None)?;

    let mut pair = TlsPair::new(&client, &server)?;
    assert!(pair.handshake().is_err());

    let events = record(Mode::Client, true);
    let mut pair = TlsPair::new(&client, &server)?;
    pair.handshake()?;
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .any(|event| event.depth == 0 && event.code == X509_V_ERR_CERT_HAS_EXPIRED));
    Ok(())
}

#[test_log::test]
#[serial]
fn trusted_server_publishes_nothing() -> Result<(), Error> {
    ContextRegistry::destroy();
    let events = record(Mode::Client, false);
    let identity = self_signed("localhost")?;
    let server = server_context(&identity, VerificationMode::None)?;
    let client = client_context(Some(&identity), None)?;

    let mut pair = TlsPair::new(&client, &server)?;
    pair.handshake()?;
    assert!(events.lock().unwrap().is_empty());
    Ok(())
}

#[test_log::test]
#[serial]
fn server_verifies_client_certificate() -> Result<(), Error> {
    ContextRegistry::destroy();
    let server_identity = self_signed("server")?;
    let client_identity = self_signed("client")?;
    let server = server_context(&server_identity, VerificationMode::Strict)?;
    let client = client_context(Some(&server_identity), Some(&client_identity))?;

    // nobody vouches for the client
    let mut pair = TlsPair::new(&client, &server)?;
    assert!(pair.handshake().is_err());

    let server_events = record(Mode::Server, true);
    let client_events = record(Mode::Client, false);
    let mut pair = TlsPair::new(&client, &server)?;
    pair.handshake()?;

    let server_events = server_events.lock().unwrap();
    assert!(!server_events.is_empty());
    assert_eq!(server_events[0].cert_der, Some(client_identity.cert.to_der()?));
    assert!(client_events.lock().unwrap().is_empty());
    Ok(())
}

#[test_log::test]
#[serial]
fn strict_server_requires_client_certificate() -> Result<(), Error> {
    ContextRegistry::destroy();
    let counter = Counter::default();
    {
        let counter = counter.clone();
        ContextRegistry::instance()
            .server_verification_error()
            .subscribe(move |details: &mut VerificationErrorDetails| {
                counter.increment();
                details.set_ignore_error(true);
            });
    }

    let identity = self_signed("server")?;
    let server = server_context(&identity, VerificationMode::Strict)?;
    let client = client_context(Some(&identity), None)?;

    // a missing certificate is not a chain error, so there is nothing to override
    let mut pair = TlsPair::new(&client, &server)?;
    assert!(pair.handshake().is_err());
    assert_eq!(counter.count(), 0);
    Ok(())
}

#[test_log::test]
#[serial]
fn registry_defaults_drive_handshake() -> Result<(), Error> {
    ContextRegistry::destroy();
    let registry = ContextRegistry::instance();
    let identity = self_signed("localhost")?;
    registry.initialize_server(Arc::new(server_context(&identity, VerificationMode::None)?));
    registry.initialize_client(Arc::new(client_context(Some(&identity), None)?));

    let server = registry.default_server_context().expect("server default");
    let client = registry.default_client_context().expect("client default");
    assert_eq!(server.mode(), Mode::Server);
    assert_eq!(client.mode(), Mode::Client);

    let mut pair = TlsPair::new(&client, &server)?;
    pair.handshake()?;

    registry.shutdown();
    assert!(registry.default_server_context().is_none());
    // our handles keep the contexts alive after the registry lets go
    let mut pair = TlsPair::new(&client, &server)?;
    pair.handshake()?;
    Ok(())
}

#[test_log::test]
#[serial]
fn encrypted_server_key_file() -> Result<(), Error> {
    ContextRegistry::destroy();
    let identity = self_signed("localhost")?;
    let pem = identity.key.private_key_to_pem_pkcs8_passphrase(
        openssl::symm::Cipher::aes_128_cbc(),
        b"correct horse",
    )?;
    let mut key_file = tempfile::NamedTempFile::new()?;
    key_file.write_all(&pem)?;
    let mut chain_file = tempfile::NamedTempFile::new()?;
    chain_file.write_all(&identity.cert.to_pem()?)?;

    let requests = Counter::default();
    {
        let requests = requests.clone();
        ContextRegistry::instance()
            .private_key_passphrase_required()
            .subscribe(move |passphrase: &mut String| {
                requests.increment();
                passphrase.push_str("correct horse");
            });
    }

    let mut server = Context::builder(Mode::Server)?;
    server
        .set_verification_mode(VerificationMode::None)
        .set_certificate_chain_file(chain_file.path())?
        .set_private_key_file(key_file.path())?;
    server.check_private_key()?;
    let server = server.build();
    // the engine may retry decoders, but only after asking us
    assert!(requests.count() >= 1);

    let client = client_context(Some(&identity), None)?;
    let mut pair = TlsPair::new(&client, &server)?;
    pair.handshake()?;
    Ok(())
}
