// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Wire types for director-to-agent RPC.
//!
//! This crate contains the message shapes exchanged with VM agents over the
//! messaging bus: the request envelope, the reply envelope, structured remote
//! errors, and task status. It also carries the finite table of agent methods
//! and the adapter that turns legacy reply shapes into normalized ones.

pub mod method;
pub mod normalize;

pub use method::{
    AgentMethod, CallKind, GET_STATE_MAX_RETRIES, GET_TASK_MAX_RETRIES, UPLOAD_BLOB_MAX_RETRIES,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Protocol version stamped on every request envelope.
pub const PROTOCOL_VERSION: u32 = 3;

/// Service name that agents subscribe under.
pub const AGENT_SERVICE_NAME: &str = "agent";

/// Correlation id handed back by the transport for a pending request.
pub type RequestId = String;

/// Agent-side task identifier.
pub type AgentTaskId = String;

/// Errors decoding agent replies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Malformed task status: {0}")]
    MalformedTaskStatus(String),
}

// ============================================================================
// Requests
// ============================================================================

/// A request envelope as published to `<service>.<client_id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub protocol: u32,
    pub method: AgentMethod,
    pub arguments: Vec<Value>,
}

impl AgentRequest {
    pub fn new(method: AgentMethod, arguments: Vec<Value>) -> Self {
        Self {
            protocol: PROTOCOL_VERSION,
            method,
            arguments,
        }
    }
}

/// Per-request transport options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// When false the transport keeps the request out of its audit log.
    pub logging: bool,
}

impl RequestOptions {
    pub fn logged() -> Self {
        Self { logging: true }
    }

    pub fn quiet() -> Self {
        Self { logging: false }
    }
}

/// Build the subject a request for `client_id` is published to.
pub fn recipient(service_name: &str, client_id: &str) -> String {
    format!("{}.{}", service_name, client_id)
}

// ============================================================================
// Remote errors
// ============================================================================

/// Backtrace reported by an agent, either as separate lines or one blob of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Backtrace {
    Lines(Vec<String>),
    Text(String),
}

impl Backtrace {
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Backtrace::Lines(lines) => lines.iter().map(String::as_str).collect(),
            Backtrace::Text(text) => vec![text.as_str()],
        }
    }
}

/// A failure reported by the agent in the `exception` field of a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<Backtrace>,
    /// Blob holding extended diagnostics, to be fetched and then deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blobstore_id: Option<String>,
}

impl StructuredError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// The `exception` payload of a reply.
///
/// Agents normally send a map; anything else is kept as rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    Structured(StructuredError),
    Text(String),
}

impl RemoteError {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => RemoteError::Structured(structured_from_map(map)),
            Value::String(s) => RemoteError::Text(s),
            other => RemoteError::Text(other.to_string()),
        }
    }
}

fn structured_from_map(mut map: Map<String, Value>) -> StructuredError {
    let message = match map.remove("message") {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let backtrace = match map.remove("backtrace") {
        Some(Value::Array(items)) => Some(Backtrace::Lines(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        )),
        Some(Value::String(s)) => Some(Backtrace::Text(s)),
        Some(Value::Null) | None => None,
        Some(other) => Some(Backtrace::Text(other.to_string())),
    };

    let blobstore_id = match map.remove("blobstore_id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    };

    StructuredError {
        message,
        backtrace,
        blobstore_id,
    }
}

// ============================================================================
// Replies
// ============================================================================

/// A raw reply as delivered by the transport: `{"value": ...}` or
/// `{"exception": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyEnvelope {
    pub value: Value,
    pub exception: Option<RemoteError>,
}

impl ReplyEnvelope {
    pub fn parse(raw: Value) -> Result<Self, ProtocolError> {
        let mut map = match raw {
            Value::Object(map) => map,
            other => {
                return Err(ProtocolError::MalformedReply(format!(
                    "expected a map, got {}",
                    other
                )));
            }
        };

        let exception = match map.remove("exception") {
            Some(Value::Null) | None => None,
            Some(exception) => Some(RemoteError::from_value(exception)),
        };

        Ok(Self {
            value: map.remove("value").unwrap_or(Value::Null),
            exception,
        })
    }
}

/// The outcome of starting an agent method.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    /// The agent answered immediately.
    Value(Value),
    /// The agent started a long-running task that must be polled.
    TaskHandle(AgentTaskId),
    /// The agent reported a failure.
    RemoteException(RemoteError),
}

impl AgentReply {
    pub fn from_envelope(envelope: ReplyEnvelope) -> Self {
        match envelope.exception {
            Some(exception) => AgentReply::RemoteException(exception),
            None => normalize::start_reply(envelope.value),
        }
    }
}

// ============================================================================
// Task status
// ============================================================================

/// State of an agent task. Anything other than `Running` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Done,
    Other(String),
}

impl TaskState {
    pub fn parse(state: &str) -> Self {
        match state {
            "running" => TaskState::Running,
            "done" => TaskState::Done,
            other => TaskState::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TaskState::Running)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Running => write!(f, "running"),
            TaskState::Done => write!(f, "done"),
            TaskState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Normalized status of an agent task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub agent_task_id: Option<AgentTaskId>,
    pub state: TaskState,
    pub value: Option<Value>,
}

impl TaskStatus {
    pub fn value_or_null(self) -> Value {
        self.value.unwrap_or(Value::Null)
    }
}

// ============================================================================
// Tests
// ============================================================================
