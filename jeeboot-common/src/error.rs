// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error type shared by the loader and the request engine.

use std::io;
use std::path::PathBuf;

/// Errors raised while loading assets or decoding request frames.
///
/// `Decode`, `Config` and `Asset` only happen during the load phase and are
/// fatal to the server. `Format`, `UnknownLength` and `EmptyFrame` are per
/// request: the frame is dropped and the engine keeps serving. Use
/// [`Error::is_format`] to tell the two groups apart.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed Intel-HEX text or an invalid configuration value.
    #[error("decode error: {0}")]
    Decode(String),

    /// The configuration document is not valid JSON of the expected shape.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A firmware or configuration file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Asset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A request body does not have the layout size it was decoded as.
    #[error("bad frame: expected {expected} body bytes, got {actual}")]
    Format { expected: usize, actual: usize },

    /// A request body length that matches no known request type.
    #[error("no request type has a {0}-byte body")]
    UnknownLength(usize),

    /// A frame is too short to even carry the header byte.
    #[error("empty frame")]
    EmptyFrame,
}

impl Error {
    /// True for errors about a single malformed frame.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Self::Format { .. } | Self::UnknownLength(_) | Self::EmptyFrame
        )
    }
}

pub type Result<T> = core::result::Result<T, Error>;
