// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! The finite table of agent methods.
//!
//! Every message the director may send to an agent is listed here together
//! with the call shape the client uses for it, its default retry budget, and
//! the value an agent that does not know the method is taken to reply. The
//! wire name of a method is its snake_case variant name.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// `get_task` retries at least once because some long running tasks restart
/// the agent, and the first status request is usually lost while it is down.
pub const GET_TASK_MAX_RETRIES: u32 = 2;
pub const GET_STATE_MAX_RETRIES: u32 = 2;
pub const UPLOAD_BLOB_MAX_RETRIES: u32 = 3;

/// How the client drives a given method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CallKind {
    /// Retrying request/reply with no task handling (`get_task`, `ping`).
    Raw,
    /// Send, then poll the returned task (if any) until it finishes.
    Synchronous,
    /// Synchronous, but "unknown message" is logged and treated as a no-op.
    BestEffort,
    /// Send quietly and cancel the pending reply straight away.
    FireAndForget,
    /// Poll with a cancellation signal; cancel the remote task if signalled.
    Cancellable,
    /// Poll against a fixed absolute deadline.
    DeadlineBounded,
    /// Synchronous, but "unknown message" yields a default value.
    FetchWithFallback,
    /// Sent on the quiet channel; the caller owns the pending request.
    Quiet,
    /// Start the task and hand back the handle without polling.
    StartOnly,
}

/// A named agent operation.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentMethod {
    GetState,
    Apply,
    Start,
    Prepare,
    CompilePackage,
    CompilePackageWithSignedUrl,
    Drain,
    FetchLogs,
    FetchLogsWithSignedUrl,
    MigrateDisk,
    MountDisk,
    UnmountDisk,
    ListDisk,
    AddPersistentDisk,
    RemovePersistentDisk,
    Shutdown,
    Info,
    DeleteArpEntries,
    SyncDns,
    SyncDnsWithSignedUrl,
    UploadBlob,
    UpdateSettings,
    RunScript,
    Stop,
    RunErrand,
    GetTask,
    CancelTask,
    Ping,
}

impl AgentMethod {
    /// The call shape the client applies to this method.
    pub fn call_kind(self) -> CallKind {
        use AgentMethod::*;

        match self {
            GetTask | Ping => CallKind::Raw,
            AddPersistentDisk | RemovePersistentDisk | UpdateSettings => CallKind::BestEffort,
            Shutdown | DeleteArpEntries => CallKind::FireAndForget,
            Drain => CallKind::Cancellable,
            Stop => CallKind::DeadlineBounded,
            Info => CallKind::FetchWithFallback,
            SyncDns | SyncDnsWithSignedUrl => CallKind::Quiet,
            RunErrand => CallKind::StartOnly,
            GetState
            | Apply
            | Start
            | Prepare
            | CompilePackage
            | CompilePackageWithSignedUrl
            | FetchLogs
            | FetchLogsWithSignedUrl
            | MigrateDisk
            | MountDisk
            | UnmountDisk
            | ListDisk
            | UploadBlob
            | RunScript
            | CancelTask => CallKind::Synchronous,
        }
    }

    /// Local timeouts tolerated before the call fails.
    pub fn default_retries(self) -> u32 {
        match self {
            AgentMethod::GetTask => GET_TASK_MAX_RETRIES,
            AgentMethod::GetState => GET_STATE_MAX_RETRIES,
            AgentMethod::UploadBlob => UPLOAD_BLOB_MAX_RETRIES,
            _ => 0,
        }
    }

    /// Reply assumed from agents that answer "unknown message", for
    /// [`CallKind::FetchWithFallback`] methods.
    pub fn unknown_message_fallback(self) -> Option<Value> {
        match self {
            AgentMethod::Info => Some(json!({"api_version": 0})),
            _ => None,
        }
    }

    /// The wire name of this method.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
