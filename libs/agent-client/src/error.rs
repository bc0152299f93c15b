// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Error types for agent RPC.

use agent_protocol::{AgentMethod, ProtocolError};
use regex::Regex;
use thiserror::Error;

/// Failures publishing a request on the messaging bus.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to publish to {recipient}: {reason}")]
    Publish { recipient: String, reason: String },
}

/// Failures talking to the resource store that holds agent blobs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Resource store error: {0}")]
    Backend(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown agent method in retry policy: {0}")]
    UnknownMethod(String),

    #[error("Invalid retry entry '{0}', expected <method>=<budget>")]
    InvalidRetryEntry(String),
}

/// Errors returned by agent client operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No reply arrived within the call's timeout.
    #[error("{0}")]
    LocalTimeout(String),

    /// The agent reported a failure. The payload is the formatted remote
    /// exception: message, backtrace and any recovered blob content.
    #[error("{0}")]
    RemoteFault(String),

    /// The caller's context asked for the operation to stop.
    #[error("Task was cancelled")]
    Cancelled,

    /// The agent does not implement a method that has no fallback.
    #[error("Unsupported action: {0}")]
    UnsupportedAction(AgentMethod),

    /// The agent could not open its blob store path during `upload_blob`.
    #[error("'Upload blob' action: failed to open blob")]
    UploadFailure,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Reply channel for '{0}' closed before a reply arrived")]
    ReplyDropped(AgentMethod),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

// Patterns are compile-time constants; a failure to compile is a programming
// error.
#[allow(clippy::expect_used)]
mod patterns {
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        pub static ref UNKNOWN_MESSAGE: Regex =
            Regex::new("unknown message").expect("valid regex");

        pub static ref RESTARTING_AGENT: Regex =
            Regex::new("(?m)^restarting agent").expect("valid regex");

        pub static ref BLOBSTORE_PATH_MISSING: Regex = Regex::new(
            r"Opening blob store file: open \\var\\vcap\\data\\blobs.*: The system cannot find the path specified"
        )
        .expect("valid regex");

        pub static ref SERVICE_WAIT_TIMEOUT: Regex =
            Regex::new("Timed out waiting for service").expect("valid regex");
    }
}

impl AgentError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::LocalTimeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled)
    }

    /// The agent does not know the method it was sent.
    pub fn is_unknown_message(&self) -> bool {
        self.remote_matches(&patterns::UNKNOWN_MESSAGE)
    }

    /// The agent is restarting and may answer shortly.
    pub fn is_restarting_agent(&self) -> bool {
        self.remote_matches(&patterns::RESTARTING_AGENT)
    }

    /// The agent could not find its blob store directory.
    pub fn is_blobstore_path_missing(&self) -> bool {
        self.remote_matches(&patterns::BLOBSTORE_PATH_MISSING)
    }

    /// A job on the agent did not stop in time. Checked against any error
    /// kind, not only remote faults.
    pub fn is_service_wait_timeout(&self) -> bool {
        patterns::SERVICE_WAIT_TIMEOUT.is_match(&self.to_string())
    }

    fn remote_matches(&self, pattern: &Regex) -> bool {
        match self {
            AgentError::RemoteFault(msg) => pattern.is_match(msg),
            _ => false,
        }
    }
}
