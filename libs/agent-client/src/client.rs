// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! The request/reply protocol shared by every agent operation.
//!
//! A request is published through the [`Transport`], then the caller waits
//! on three things at once: the caller's cancellation signal, the reply
//! channel, and the call's deadline. Cancellation wins ties. When the wait
//! ends without a reply the pending request is cancelled at the transport
//! before the error is returned.
//!
//! Only local timeouts consume a method's retry budget. Every retry publishes
//! a fresh request.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use agent_protocol::{
    AGENT_SERVICE_NAME, AgentMethod, AgentReply, AgentRequest, AgentTaskId, CallKind,
    ReplyEnvelope, RequestId, RequestOptions,
};

use crate::cancel::{self, CancelSignal};
use crate::config::{AgentClientConfig, RetryPolicy};
use crate::error::{AgentError, ConfigError, TransportError};
use crate::reply;
use crate::store::ResourceStore;
use crate::transport::{ReplySender, Transport};

/// Deadlines further out than this are clamped to it.
const MAX_DEADLINE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// `timeout` from now, clamped so that very large timeouts cannot overflow
/// the clock.
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout.min(MAX_DEADLINE)).unwrap_or(now)
}

/// The outcome of starting an agent method, before any polling.
#[derive(Debug, Clone, PartialEq)]
pub enum StartedTask {
    /// The agent answered with a final value.
    Value(Value),
    /// The agent started a task that has to be polled.
    Task(AgentTaskId),
}

/// Client for a single agent.
pub struct AgentClient {
    pub(crate) service_name: String,
    pub(crate) client_id: String,
    pub(crate) instance_name: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) store: Arc<dyn ResourceStore>,
    pub(crate) timeout: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) stop_timeout: Duration,
    pub(crate) agent_wait_timeout: Duration,
    pub(crate) ping_timeout: Duration,
    pub(crate) retry_policy: RetryPolicy,
}

impl AgentClient {
    pub fn new(
        service_name: &str,
        client_id: &str,
        instance_name: Option<&str>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ResourceStore>,
        config: &AgentClientConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            service_name: service_name.to_string(),
            client_id: client_id.to_string(),
            instance_name: instance_name.unwrap_or("unknown").to_string(),
            transport,
            store,
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
            stop_timeout: config.stop_timeout(),
            agent_wait_timeout: config.agent_wait_timeout(),
            ping_timeout: config.ping_timeout(),
            retry_policy: config.retry_policy()?,
        })
    }

    /// Client for the agent with id `agent_id`, addressed under the `agent`
    /// service.
    pub fn with_agent_id(
        agent_id: &str,
        instance_name: Option<&str>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ResourceStore>,
        config: &AgentClientConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(
            AGENT_SERVICE_NAME,
            agent_id,
            instance_name,
            transport,
            store,
            config,
        )
    }

    /// Replace the retry budgets taken from the configuration.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Send `method` with the call shape the method table lists for it and
    /// return the reply value.
    ///
    /// Remote exceptions become [`AgentError::RemoteFault`]. Shapes that have
    /// no value of their own map onto one:
    ///
    /// * best-effort methods the agent does not know return `null`
    /// * fire-and-forget methods return `null` once sent
    /// * quiet methods wait for their reply like a raw call
    /// * start-only methods return `{"agent_task_id": ..}` for a started task
    /// * cancellable methods run without a signal
    pub async fn call(&self, method: AgentMethod, args: Vec<Value>) -> Result<Value, AgentError> {
        match method.call_kind() {
            CallKind::Raw => self.call_inner(method, &args, self.timeout, None).await,
            CallKind::Synchronous | CallKind::Cancellable => {
                self.send_message(method, &args, None).await
            }
            CallKind::BestEffort => Ok(self
                .safe_send_message(method, &args)
                .await?
                .unwrap_or(Value::Null)),
            CallKind::FireAndForget => {
                self.fire_and_forget(method, args).await;
                Ok(Value::Null)
            }
            CallKind::DeadlineBounded => self.send_message_until_deadline(method, &args).await,
            CallKind::FetchWithFallback => self.fetch_with_fallback(method, &args).await,
            CallKind::Quiet => self.call_quietly(method, args).await,
            CallKind::StartOnly => match self.start_task(method, &args, None).await? {
                StartedTask::Value(value) => Ok(value),
                StartedTask::Task(task_id) => Ok(json!({ "agent_task_id": task_id })),
            },
        }
    }

    pub(crate) async fn send_request(
        &self,
        method: AgentMethod,
        args: Vec<Value>,
        options: RequestOptions,
        reply_tx: ReplySender,
    ) -> Result<RequestId, TransportError> {
        let request = AgentRequest::new(method, args);
        let recipient = agent_protocol::recipient(&self.service_name, &self.client_id);

        let request_id = self
            .transport
            .send_request(&recipient, &self.client_id, &request, options, reply_tx)
            .await?;

        debug!(
            agent_id = %self.client_id,
            method = %method,
            request_id = %request_id,
            logging = options.logging,
            "Sent agent request"
        );

        Ok(request_id)
    }

    /// One attempt: send, then wait for the reply, the deadline, or
    /// cancellation.
    async fn request(
        &self,
        method: AgentMethod,
        args: &[Value],
        timeout: Duration,
        cancel: Option<&CancelSignal>,
    ) -> Result<ReplyEnvelope, AgentError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request_id = self
            .send_request(method, args.to_vec(), RequestOptions::logged(), reply_tx)
            .await?;
        let deadline = deadline_after(timeout);

        let raw = tokio::select! {
            biased;

            _ = cancel::cancelled(cancel) => {
                debug!(
                    agent_id = %self.client_id,
                    method = %method,
                    request_id = %request_id,
                    "Cancelled while waiting for agent reply"
                );
                self.transport.cancel_request(&request_id);
                return Err(AgentError::Cancelled);
            }
            reply = reply_rx => {
                reply.map_err(|_| AgentError::ReplyDropped(method))?
            }
            _ = tokio::time::sleep_until(deadline) => {
                self.transport.cancel_request(&request_id);
                return Err(self.local_timeout(method, timeout));
            }
        };

        let mut envelope = ReplyEnvelope::parse(raw)?;
        if envelope.exception.is_none() {
            envelope.value = reply::inject_compile_log(self.store.as_ref(), envelope.value).await;
        }

        Ok(envelope)
    }

    fn local_timeout(&self, method: AgentMethod, timeout: Duration) -> AgentError {
        AgentError::LocalTimeout(format!(
            "Timed out sending '{}' to instance: '{}', agent-id: '{}' after {} seconds",
            method,
            self.instance_name,
            self.client_id,
            timeout.as_secs_f64()
        ))
    }

    /// [`Self::request`], retried on local timeout up to the method's budget.
    pub(crate) async fn request_with_retry(
        &self,
        method: AgentMethod,
        args: &[Value],
        timeout: Duration,
        cancel: Option<&CancelSignal>,
    ) -> Result<ReplyEnvelope, AgentError> {
        let mut retries = self.retry_policy.budget(method);

        loop {
            match self.request(method, args, timeout, cancel).await {
                Err(AgentError::LocalTimeout(msg)) if retries > 0 => {
                    retries -= 1;
                    warn!(
                        agent_id = %self.client_id,
                        method = %method,
                        retries_left = retries,
                        error = %msg,
                        "Retrying agent request after timeout"
                    );
                }
                result => return result,
            }
        }
    }

    /// Retrying request whose remote exception is turned into an error.
    pub(crate) async fn call_inner(
        &self,
        method: AgentMethod,
        args: &[Value],
        timeout: Duration,
        cancel: Option<&CancelSignal>,
    ) -> Result<Value, AgentError> {
        let envelope = self.request_with_retry(method, args, timeout, cancel).await?;

        match envelope.exception {
            Some(exception) => Err(self.remote_fault(exception).await),
            None => Ok(envelope.value),
        }
    }

    pub(crate) async fn start_task(
        &self,
        method: AgentMethod,
        args: &[Value],
        cancel: Option<&CancelSignal>,
    ) -> Result<StartedTask, AgentError> {
        let envelope = self
            .request_with_retry(method, args, self.timeout, cancel)
            .await?;

        match AgentReply::from_envelope(envelope) {
            AgentReply::Value(value) => Ok(StartedTask::Value(value)),
            AgentReply::TaskHandle(task_id) => {
                debug!(
                    agent_id = %self.client_id,
                    method = %method,
                    agent_task_id = %task_id,
                    "Agent started task"
                );
                Ok(StartedTask::Task(task_id))
            }
            AgentReply::RemoteException(exception) => Err(self.remote_fault(exception).await),
        }
    }

    async fn remote_fault(&self, exception: agent_protocol::RemoteError) -> AgentError {
        AgentError::RemoteFault(reply::format_exception(self.store.as_ref(), exception).await)
    }

    /// Start `method` and, if the agent hands back a task, poll it to the
    /// end. `cancel` is observed both while waiting for replies and between
    /// polls. A task abandoned through `cancel` is cancelled on the agent.
    pub(crate) async fn send_message(
        &self,
        method: AgentMethod,
        args: &[Value],
        cancel: Option<&CancelSignal>,
    ) -> Result<Value, AgentError> {
        match self.start_task(method, args, cancel).await? {
            StartedTask::Value(value) => Ok(value),
            StartedTask::Task(task_id) => {
                let result = self.wait_for_task(&task_id, None, cancel).await;
                self.cancel_abandoned_task(method, &task_id, result).await
            }
        }
    }

    /// Cancel `task_id` on the agent if `result` says the caller gave up on
    /// it. A failed cancel is logged; `result` is returned either way.
    async fn cancel_abandoned_task(
        &self,
        method: AgentMethod,
        task_id: &str,
        result: Result<Value, AgentError>,
    ) -> Result<Value, AgentError> {
        if matches!(result, Err(AgentError::Cancelled)) {
            debug!(
                agent_id = %self.client_id,
                method = %method,
                agent_task_id = %task_id,
                "Cancelling agent task"
            );
            let cancelled = self
                .start_task(
                    AgentMethod::CancelTask,
                    &[Value::String(task_id.to_string())],
                    None,
                )
                .await;
            if let Err(e) = cancelled {
                warn!(
                    agent_id = %self.client_id,
                    agent_task_id = %task_id,
                    error = %e,
                    "Failed to cancel agent task"
                );
            }
        }
        result
    }

    /// [`Self::send_message`], with "unknown message" logged and treated as
    /// a no-op.
    pub(crate) async fn safe_send_message(
        &self,
        method: AgentMethod,
        args: &[Value],
    ) -> Result<Option<Value>, AgentError> {
        match self.send_message(method, args, None).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_unknown_message() => {
                warn!(
                    agent_id = %self.client_id,
                    method = %method,
                    error = %e,
                    "Ignoring 'unknown message' error from the agent"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// [`Self::send_message_with_deadline`] with the `stop_timeout`
    /// deadline. A "Timed out waiting for service" failure is logged and
    /// read as `null`.
    pub(crate) async fn send_message_until_deadline(
        &self,
        method: AgentMethod,
        args: &[Value],
    ) -> Result<Value, AgentError> {
        let deadline = deadline_after(self.stop_timeout);

        match self.send_message_with_deadline(method, args, deadline).await {
            Err(e) if e.is_service_wait_timeout() => {
                warn!(
                    agent_id = %self.client_id,
                    method = %method,
                    error = %e,
                    "Ignoring stop timeout error from the agent"
                );
                Ok(Value::Null)
            }
            result => result,
        }
    }

    /// [`Self::send_message`], with "unknown message" answered by the
    /// method's fallback reply when the method table has one.
    pub(crate) async fn fetch_with_fallback(
        &self,
        method: AgentMethod,
        args: &[Value],
    ) -> Result<Value, AgentError> {
        match self.send_message(method, args, None).await {
            Err(e) if e.is_unknown_message() => match method.unknown_message_fallback() {
                Some(fallback) => {
                    warn!(
                        agent_id = %self.client_id,
                        method = %method,
                        error = %e,
                        "Ignoring 'unknown message' error from the agent"
                    );
                    Ok(fallback)
                }
                None => Err(e),
            },
            result => result,
        }
    }

    /// Start `method` and poll its task until it finishes or `deadline`
    /// passes. Reaching the deadline is not an error here.
    pub(crate) async fn send_message_with_deadline(
        &self,
        method: AgentMethod,
        args: &[Value],
        deadline: Instant,
    ) -> Result<Value, AgentError> {
        match self.start_task(method, args, None).await? {
            StartedTask::Value(value) => Ok(value),
            StartedTask::Task(task_id) => {
                self.wait_for_task(&task_id, Some(deadline), None).await
            }
        }
    }

    /// Start `method` and poll its task while watching `cancel`. If the
    /// caller cancels, the remote task is cancelled too.
    pub(crate) async fn send_cancellable_message(
        &self,
        method: AgentMethod,
        args: &[Value],
        cancel: &CancelSignal,
    ) -> Result<Value, AgentError> {
        let task_id = match self.start_task(method, args, None).await? {
            StartedTask::Value(value) => return Ok(value),
            StartedTask::Task(task_id) => task_id,
        };

        let result = self.wait_for_task(&task_id, None, Some(cancel)).await;
        self.cancel_abandoned_task(method, &task_id, result).await
    }

    /// Send on the quiet channel and wait for the reply like
    /// [`Self::call_inner`], without retries.
    async fn call_quietly(&self, method: AgentMethod, args: Vec<Value>) -> Result<Value, AgentError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request_id = self
            .send_request(method, args, RequestOptions::quiet(), reply_tx)
            .await?;

        let raw = tokio::select! {
            reply = reply_rx => reply.map_err(|_| AgentError::ReplyDropped(method))?,
            _ = tokio::time::sleep_until(deadline_after(self.timeout)) => {
                self.transport.cancel_request(&request_id);
                return Err(self.local_timeout(method, self.timeout));
            }
        };

        let envelope = ReplyEnvelope::parse(raw)?;
        match envelope.exception {
            Some(exception) => Err(self.remote_fault(exception).await),
            None => Ok(envelope.value),
        }
    }

    /// Send quietly and stop waiting for the reply straight away. Errors are
    /// logged, never returned.
    pub(crate) async fn fire_and_forget(&self, method: AgentMethod, args: Vec<Value>) {
        let (reply_tx, _reply_rx) = oneshot::channel();

        match self
            .send_request(method, args, RequestOptions::quiet(), reply_tx)
            .await
        {
            Ok(request_id) => self.transport.cancel_request(&request_id),
            Err(e) => {
                warn!(
                    agent_id = %self.client_id,
                    method = %method,
                    error = %e,
                    "Ignoring error from the agent"
                );
            }
        }
    }
}
