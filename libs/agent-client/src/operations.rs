// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Named agent operations.
//!
//! Each operation is a thin wrapper that picks the call shape listed for its
//! method in [`AgentMethod::call_kind`]. Arguments are passed through to the
//! agent as given unless the operation has a fixed payload.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tracing::warn;

use agent_protocol::{AgentMethod, RequestId, RequestOptions};

use crate::cancel::CancelSignal;
use crate::client::{AgentClient, StartedTask};
use crate::error::AgentError;
use crate::transport::PendingRequest;

impl AgentClient {
    // ========================================================================
    // Synchronous
    // ========================================================================

    pub async fn get_state(
        &self,
        args: Vec<Value>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::GetState, &args, cancel).await
    }

    pub async fn apply(&self, args: Vec<Value>) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::Apply, &args, None).await
    }

    pub async fn start(&self, args: Vec<Value>) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::Start, &args, None).await
    }

    pub async fn prepare(&self, args: Vec<Value>) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::Prepare, &args, None).await
    }

    pub async fn compile_package(
        &self,
        args: Vec<Value>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::CompilePackage, &args, cancel)
            .await
    }

    pub async fn compile_package_with_signed_url(
        &self,
        args: Vec<Value>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::CompilePackageWithSignedUrl, &args, cancel)
            .await
    }

    pub async fn fetch_logs(&self, args: Vec<Value>) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::FetchLogs, &args, None).await
    }

    pub async fn fetch_logs_with_signed_url(&self, args: Vec<Value>) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::FetchLogsWithSignedUrl, &args, None)
            .await
    }

    pub async fn migrate_disk(&self, args: Vec<Value>) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::MigrateDisk, &args, None).await
    }

    pub async fn mount_disk(&self, args: Vec<Value>) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::MountDisk, &args, None).await
    }

    pub async fn unmount_disk(&self, args: Vec<Value>) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::UnmountDisk, &args, None).await
    }

    pub async fn list_disk(&self) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::ListDisk, &[], None).await
    }

    pub async fn cancel_task(&self, agent_task_id: &str) -> Result<Value, AgentError> {
        self.send_message(AgentMethod::CancelTask, &[json!(agent_task_id)], None)
            .await
    }

    // ========================================================================
    // Best effort
    // ========================================================================

    /// Returns `None` if the agent does not support the method.
    pub async fn add_persistent_disk(&self, args: Vec<Value>) -> Result<Option<Value>, AgentError> {
        self.safe_send_message(AgentMethod::AddPersistentDisk, &args)
            .await
    }

    /// Returns `None` if the agent does not support the method.
    pub async fn remove_persistent_disk(
        &self,
        args: Vec<Value>,
    ) -> Result<Option<Value>, AgentError> {
        self.safe_send_message(AgentMethod::RemovePersistentDisk, &args)
            .await
    }

    /// Push trusted certificates and disk associations to the agent.
    pub async fn update_settings(
        &self,
        certs: &str,
        disk_associations: Value,
    ) -> Result<Option<Value>, AgentError> {
        let settings = json!({
            "trusted_certs": certs,
            "disk_associations": disk_associations,
        });
        self.safe_send_message(AgentMethod::UpdateSettings, &[settings])
            .await
    }

    // ========================================================================
    // Fire and forget
    // ========================================================================

    pub async fn shutdown(&self) {
        self.fire_and_forget(AgentMethod::Shutdown, Vec::new()).await
    }

    pub async fn delete_arp_entries(&self, args: Vec<Value>) {
        self.fire_and_forget(AgentMethod::DeleteArpEntries, args)
            .await
    }

    // ========================================================================
    // Special shapes
    // ========================================================================

    /// Run the drain scripts. If `cancel` fires while the drain task is
    /// running, the task is cancelled on the agent and
    /// [`AgentError::Cancelled`] is returned.
    pub async fn drain(&self, args: Vec<Value>, cancel: &CancelSignal) -> Result<Value, AgentError> {
        self.send_cancellable_message(AgentMethod::Drain, &args, cancel)
            .await
    }

    /// Stop the jobs on the instance, waiting at most `stop_timeout` for the
    /// agent's task. A "Timed out waiting for service" failure is logged and
    /// ignored.
    pub async fn stop(&self, args: Vec<Value>) -> Result<(), AgentError> {
        self.send_message_until_deadline(AgentMethod::Stop, &args)
            .await
            .map(|_| ())
    }

    /// Agent capabilities. Agents that predate `info` report
    /// `{"api_version": 0}`.
    pub async fn info(&self) -> Result<Value, AgentError> {
        self.fetch_with_fallback(AgentMethod::Info, &[]).await
    }

    /// Hand the agent a blob to store locally.
    pub async fn upload_blob(
        &self,
        blob_id: &str,
        checksum: &str,
        payload: &[u8],
    ) -> Result<Value, AgentError> {
        let args = json!({
            "blob_id": blob_id,
            "checksum": checksum,
            "payload": STANDARD.encode(payload),
        });

        match self.send_message(AgentMethod::UploadBlob, &[args], None).await {
            Err(e) if e.is_unknown_message() => {
                warn!(
                    agent_id = %self.client_id,
                    blob_id = %blob_id,
                    error = %e,
                    "'upload_blob' 'unknown message' error from the agent"
                );
                Err(AgentError::UnsupportedAction(AgentMethod::UploadBlob))
            }
            Err(e) if e.is_blobstore_path_missing() => {
                warn!(
                    agent_id = %self.client_id,
                    blob_id = %blob_id,
                    error = %e,
                    "'upload_blob' error from the agent"
                );
                Err(AgentError::UploadFailure)
            }
            result => result,
        }
    }

    /// Run a job script on every job that has one. Returns `None` if the
    /// agent does not support scripts.
    pub async fn run_script(
        &self,
        script_name: &str,
        options: Value,
    ) -> Result<Option<Value>, AgentError> {
        match self
            .send_message(AgentMethod::RunScript, &[json!(script_name), options], None)
            .await
        {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_unknown_message() => {
                warn!(
                    agent_id = %self.client_id,
                    script_name = %script_name,
                    error = %e,
                    "Ignoring run_script 'unknown message' error from the agent"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Start an errand and return without waiting for it.
    pub async fn run_errand(&self, args: Vec<Value>) -> Result<StartedTask, AgentError> {
        self.start_task(AgentMethod::RunErrand, &args, None).await
    }

    // ========================================================================
    // Quiet
    // ========================================================================

    /// Send `sync_dns` without audit logging. The caller owns the pending
    /// reply and may cancel it with [`Self::cancel_sync_dns`].
    pub async fn sync_dns(&self, args: Vec<Value>) -> Result<PendingRequest, AgentError> {
        self.send_quietly(AgentMethod::SyncDns, args).await
    }

    pub async fn sync_dns_with_signed_url(
        &self,
        args: Vec<Value>,
    ) -> Result<PendingRequest, AgentError> {
        self.send_quietly(AgentMethod::SyncDnsWithSignedUrl, args)
            .await
    }

    pub fn cancel_sync_dns(&self, request_id: &RequestId) {
        self.transport.cancel_request(request_id);
    }

    async fn send_quietly(
        &self,
        method: AgentMethod,
        args: Vec<Value>,
    ) -> Result<PendingRequest, AgentError> {
        let (reply_tx, reply) = oneshot::channel();
        let request_id = self
            .send_request(method, args, RequestOptions::quiet(), reply_tx)
            .await?;

        Ok(PendingRequest { request_id, reply })
    }
}
