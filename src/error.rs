// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use openssl::error::ErrorStack;
use std::path::PathBuf;

/// Errors surfaced while configuring an engine context.
///
/// The registry and the handshake callbacks never fail: their outcomes are
/// values (an accept flag, a byte count, an empty default). Only the
/// [`Builder`](crate::context::Builder) talks to the engine in a way that can
/// be rejected.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine rejected an operation and left its error queue populated.
    #[error("TLS engine error: {0}")]
    Engine(#[from] ErrorStack),
    /// A file handed to the builder could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Error::Engine(_) => "EngineError",
            Error::Io { .. } => "IOError",
        }
    }

    /// The reason string of the first engine error, or the I/O error kind.
    pub fn message(&self) -> String {
        match self {
            Error::Engine(stack) => stack
                .errors()
                .first()
                .and_then(|err| err.reason())
                .unwrap_or("unknown engine error")
                .to_string(),
            Error::Io { source, .. } => source.kind().to_string(),
        }
    }
}
