// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! The messaging bus seam.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use agent_protocol::{AgentRequest, RequestId, RequestOptions};

use crate::error::TransportError;

/// Channel on which the transport delivers the raw reply to a request.
pub type ReplySender = oneshot::Sender<Value>;

/// Publish/subscribe request-reply delivery to agents.
///
/// Implementations publish `request` to `recipient` and deliver the single
/// reply, if one ever arrives, on `reply_tx`. The returned id identifies the
/// pending request until the reply is delivered or the request is cancelled.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_request(
        &self,
        recipient: &str,
        sender_id: &str,
        request: &AgentRequest,
        options: RequestOptions,
        reply_tx: ReplySender,
    ) -> Result<RequestId, TransportError>;

    /// Stop waiting for the reply to `request_id`. Best effort; a reply that
    /// is already in flight may still be dropped on the floor.
    fn cancel_request(&self, request_id: &str);
}

/// A request sent on the quiet channel whose reply belongs to the caller.
#[derive(Debug)]
pub struct PendingRequest {
    pub request_id: RequestId,
    /// Raw reply, delivered without post-processing.
    pub reply: oneshot::Receiver<Value>,
}
