// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Normalization of legacy reply shapes.
//!
//! Older agents answer a task-starting method either with a bare value or
//! with a map carrying `agent_task_id`, and answer `get_task` with either a
//! status map or the finished task's bare value. These helpers fold all of
//! those into [`AgentReply`] and [`TaskStatus`].

use serde_json::Value;

use crate::{AgentReply, ProtocolError, TaskState, TaskStatus};

fn task_id(value: &Value) -> Option<String> {
    match value.get("agent_task_id") {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Classify the value returned when a method is started.
pub fn start_reply(value: Value) -> AgentReply {
    match task_id(&value) {
        Some(id) => AgentReply::TaskHandle(id),
        None => AgentReply::Value(value),
    }
}

/// Normalize a `get_task` reply value.
pub fn task_status(value: Value) -> Result<TaskStatus, ProtocolError> {
    let agent_task_id = task_id(&value);

    let mut map = match value {
        Value::Object(map) => map,
        other => return Ok(finished(other)),
    };

    let state = match map.remove("state") {
        Some(Value::String(state)) => TaskState::parse(&state),
        Some(Value::Null) | None if agent_task_id.is_some() => TaskState::Running,
        Some(other) if agent_task_id.is_some() => {
            return Err(ProtocolError::MalformedTaskStatus(format!(
                "state must be a string, got {}",
                other
            )));
        }
        Some(state) => {
            // A map that happens to carry a non-string `state` is a task
            // result, not a status.
            map.insert("state".to_string(), state);
            return Ok(finished(Value::Object(map)));
        }
        None => return Ok(finished(Value::Object(map))),
    };

    Ok(TaskStatus {
        agent_task_id,
        state,
        value: map.remove("value"),
    })
}

fn finished(value: Value) -> TaskStatus {
    TaskStatus {
        agent_task_id: None,
        state: TaskState::Done,
        value: Some(value),
    }
}
