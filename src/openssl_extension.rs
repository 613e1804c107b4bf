// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! This module defines an "extension" trait to add our own bindings to the openssl
//! crate, for engine hooks the crate doesn't expose on `SslContextBuilder`.

use libc::{c_char, c_int, c_void};
use openssl::ssl::SslContextBuilder;
use openssl_sys::SSL_CTX;

/// The engine's `pem_password_cb`.
pub type PasswordCallback =
    unsafe extern "C" fn(buf: *mut c_char, size: c_int, rwflag: c_int, userdata: *mut c_void) -> c_int;

extern "C" {
    /// ```c
    /// void SSL_CTX_set_default_passwd_cb(SSL_CTX *ctx, pem_password_cb *cb);
    /// ```
    pub fn SSL_CTX_set_default_passwd_cb(ctx: *mut SSL_CTX, cb: Option<PasswordCallback>);
}

pub trait SslContextExtension {
    /// Sets the callback the engine uses when a key file loaded into this
    /// context is encrypted.
    fn set_default_passwd_cb(&mut self, callback: PasswordCallback);
}

impl SslContextExtension for SslContextBuilder {
    fn set_default_passwd_cb(&mut self, callback: PasswordCallback) {
        unsafe {
            // > SSL_CTX_set_default_passwd_cb() [...] do not provide diagnostic information.
            // > https://docs.openssl.org/master/man3/SSL_CTX_set_default_passwd_cb
            SSL_CTX_set_default_passwd_cb(self.as_ptr(), Some(callback));
        }
    }
}
