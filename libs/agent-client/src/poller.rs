// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Agent task polling.

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use agent_protocol::{AgentMethod, TaskStatus, normalize};

use crate::cancel::{self, CancelSignal};
use crate::client::AgentClient;
use crate::error::AgentError;

impl AgentClient {
    /// Poll `agent_task_id` until it leaves the running state, returning its
    /// final value.
    ///
    /// With a `deadline` the loop also stops once the deadline has passed;
    /// that is logged and the last known value is returned. `cancel` is
    /// checked before every sleep and interrupts it.
    pub async fn wait_for_task(
        &self,
        agent_task_id: &str,
        deadline: Option<Instant>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Value, AgentError> {
        let mut status = self.get_task_status(agent_task_id).await?;

        while status.state.is_running() {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!(
                    agent_id = %self.client_id,
                    agent_task_id = %agent_task_id,
                    "Task timed out"
                );
                break;
            }

            tokio::select! {
                biased;

                _ = cancel::cancelled(cancel) => return Err(AgentError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            status = self.get_task_status(agent_task_id).await?;
            debug!(
                agent_id = %self.client_id,
                agent_task_id = %agent_task_id,
                state = %status.state,
                "Polled agent task"
            );
        }

        Ok(status.value_or_null())
    }

    async fn get_task_status(&self, agent_task_id: &str) -> Result<TaskStatus, AgentError> {
        let value = self
            .call_inner(
                AgentMethod::GetTask,
                &[Value::String(agent_task_id.to_string())],
                self.timeout,
                None,
            )
            .await?;

        Ok(normalize::task_status(value)?)
    }
}
