// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use agent_protocol::AgentMethod;

use crate::cancel::{self, CancelSignal};
use crate::client::{self, AgentClient};
use crate::error::AgentError;

impl AgentClient {
    /// Ping the agent until it answers.
    ///
    /// Each ping waits `ping_timeout`. Ping timeouts and "restarting agent"
    /// faults are retried until `deadline` (default `agent_wait_timeout`)
    /// has passed; a restarting agent is given `poll_interval` before the
    /// next ping. Cancellation is returned immediately.
    pub async fn wait_until_ready(
        &self,
        deadline: Option<Duration>,
        cancel: Option<&CancelSignal>,
    ) -> Result<(), AgentError> {
        let wait = deadline.unwrap_or(self.agent_wait_timeout);
        let deadline_at = client::deadline_after(wait);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let result = if cancel::is_cancelled(cancel) {
                Err(AgentError::Cancelled)
            } else {
                self.call_inner(AgentMethod::Ping, &[], self.ping_timeout, cancel)
                    .await
            };

            let retry = match result {
                Ok(_) => {
                    debug!(agent_id = %self.client_id, attempts, "Agent is ready");
                    return Ok(());
                }
                Err(AgentError::Cancelled) => {
                    debug!(
                        agent_id = %self.client_id,
                        "Task was cancelled. Stop waiting response from vm"
                    );
                    return Err(AgentError::Cancelled);
                }
                Err(e) if e.is_timeout() => {
                    if Instant::now() >= deadline_at {
                        return Err(AgentError::LocalTimeout(format!(
                            "Timed out pinging to {} after {} seconds",
                            self.client_id,
                            wait.as_secs()
                        )));
                    }
                    e
                }
                Err(e) if e.is_restarting_agent() && Instant::now() < deadline_at => {
                    debug!(agent_id = %self.client_id, attempts, error = %e, "Agent is restarting");
                    tokio::select! {
                        biased;

                        _ = cancel::cancelled(cancel) => return Err(AgentError::Cancelled),
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            debug!(agent_id = %self.client_id, attempts, error = %retry, "Agent not ready");
        }
    }
}
