// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::registry::ContextRegistry;
use libc::{c_char, c_int, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Copy as much of `passphrase` as fits into `buf` while leaving room for a
/// trailing NUL, write the NUL, and return the number of passphrase bytes
/// copied. An empty `buf` is left untouched.
fn copy_terminated(passphrase: &[u8], buf: &mut [u8]) -> usize {
    let Some(room) = buf.len().checked_sub(1) else {
        return 0;
    };
    let len = passphrase.len().min(room);
    buf[..len].copy_from_slice(&passphrase[..len]);
    buf[len] = 0;
    len
}

impl ContextRegistry {
    /// Ask this registry's passphrase subscribers for a passphrase.
    ///
    /// See [`passphrase_callback`].
    pub fn passphrase(&self, buf: &mut [u8]) -> usize {
        let mut passphrase = String::new();
        let subscribers = self.private_key_passphrase_required().publish(&mut passphrase);

        let copied = copy_terminated(passphrase.as_bytes(), buf);
        if copied < passphrase.len() {
            tracing::warn!(
                capacity = buf.len(),
                length = passphrase.len(),
                "passphrase truncated to fit the engine's buffer"
            );
        }
        tracing::debug!(subscribers, supplied = copied > 0, "private key passphrase requested");
        copied
    }
}

/// Fill `buf` with the passphrase for an encrypted private key.
///
/// An empty string is published on the passphrase channel of
/// [`ContextRegistry::instance`]; subscribers write the passphrase into it.
/// At most `buf.len() - 1` bytes are copied, followed by a NUL, and the number
/// of copied bytes is returned. When nobody supplies a passphrase the result
/// is 0, which the engine reports as a failed key decryption.
///
/// Suitable for [`PKey::private_key_from_pem_callback`](openssl::pkey::PKey::private_key_from_pem_callback):
///
/// ```no_run
/// # let pem: &[u8] = &[];
/// let key = openssl::pkey::PKey::private_key_from_pem_callback(pem, |buf| {
///     Ok(tls_manager::callbacks::passphrase_callback(buf))
/// });
/// ```
pub fn passphrase_callback(buf: &mut [u8]) -> usize {
    ContextRegistry::instance().passphrase(buf)
}

/// [`passphrase_callback`] with the engine's `pem_password_cb` signature.
///
/// Installed as the default password callback of every context created through
/// [`Builder`](crate::context::Builder). A null `buf` or a non-positive `size`
/// yields 0. A panicking subscriber is contained here and also yields 0.
///
/// # Safety
///
/// `buf` must either be null or point to `size` writable bytes.
pub unsafe extern "C" fn passphrase_callback_raw(
    buf: *mut c_char,
    size: c_int,
    _rwflag: c_int,
    _userdata: *mut c_void,
) -> c_int {
    let size = match usize::try_from(size) {
        Ok(size) if size > 0 && !buf.is_null() => size,
        _ => return 0,
    };
    let buf = core::slice::from_raw_parts_mut(buf as *mut u8, size);

    match catch_unwind(AssertUnwindSafe(|| passphrase_callback(buf))) {
        // `copied < size`, which came from a c_int
        Ok(copied) => copied as c_int,
        Err(_) => {
            tracing::error!("passphrase subscriber panicked");
            0
        }
    }
}
