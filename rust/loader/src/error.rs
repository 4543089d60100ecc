// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for loading sessions.

use std::time::Duration;

use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can end or prevent a loading session
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("stream error: {0}")]
    Stream(#[from] ifc_stream_core::Error),

    /// No frame arrived within the configured session timeout.
    #[error("no frame received for {0:?}, giving up on the session")]
    SessionTimeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("session has not been started")]
    NotStarted,

    /// A previous fatal error already ended the session.
    #[error("session already failed")]
    SessionFailed,
}
