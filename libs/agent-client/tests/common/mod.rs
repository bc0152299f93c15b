// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Test doubles for the transport and resource store.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use agent_client::{
    AgentClient, AgentClientConfig, ReplySender, ResourceStore, StoreError, Transport,
    TransportError,
};
use agent_protocol::{AgentMethod, AgentRequest, RequestId, RequestOptions};
use async_trait::async_trait;
use serde_json::{Value, json};

pub const AGENT_ID: &str = "agent-1";
pub const INSTANCE: &str = "web/0";

// ============================================================================
// Mock Transport
// ============================================================================

/// What the mock transport does with one request.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Deliver this raw reply right away.
    Reply(Value),
    /// Accept the request and never answer it.
    NoReply,
    /// Fail the send.
    SendError,
}

impl Scripted {
    pub fn value(value: Value) -> Self {
        Scripted::Reply(json!({ "value": value }))
    }

    pub fn exception(message: &str) -> Self {
        Scripted::Reply(json!({ "exception": { "message": message } }))
    }

    pub fn task(agent_task_id: &str) -> Self {
        Scripted::value(json!({ "agent_task_id": agent_task_id, "state": "running" }))
    }
}

#[derive(Debug, Clone)]
pub struct SentRequest {
    pub request_id: RequestId,
    pub recipient: String,
    pub sender_id: String,
    pub request: AgentRequest,
    pub options: RequestOptions,
}

/// Transport that answers from a per-method script and records traffic.
///
/// Scripted entries are consumed in order; once a method's queue is empty its
/// fallback is used, and without a fallback the request is never answered.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<AgentMethod, VecDeque<Scripted>>>,
    fallbacks: Mutex<HashMap<AgentMethod, Scripted>>,
    sent: Mutex<Vec<SentRequest>>,
    cancelled: Mutex<Vec<RequestId>>,
    pending: Mutex<HashMap<RequestId, ReplySender>>,
    next_id: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, method: AgentMethod, entries: Vec<Scripted>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .extend(entries);
    }

    pub fn always(&self, method: AgentMethod, entry: Scripted) {
        self.fallbacks.lock().unwrap().insert(method, entry);
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_for(&self, method: AgentMethod) -> Vec<SentRequest> {
        self.sent()
            .into_iter()
            .filter(|s| s.request.method == method)
            .collect()
    }

    pub fn cancelled(&self) -> Vec<RequestId> {
        self.cancelled.lock().unwrap().clone()
    }

    fn next_entry(&self, method: AgentMethod) -> Scripted {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&method)
            .and_then(VecDeque::pop_front);

        scripted
            .or_else(|| self.fallbacks.lock().unwrap().get(&method).cloned())
            .unwrap_or(Scripted::NoReply)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_request(
        &self,
        recipient: &str,
        sender_id: &str,
        request: &AgentRequest,
        options: RequestOptions,
        reply_tx: ReplySender,
    ) -> Result<RequestId, TransportError> {
        let entry = self.next_entry(request.method);

        if let Scripted::SendError = entry {
            return Err(TransportError::Publish {
                recipient: recipient.to_string(),
                reason: "connection closed".to_string(),
            });
        }

        let request_id = format!("req-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push(SentRequest {
            request_id: request_id.clone(),
            recipient: recipient.to_string(),
            sender_id: sender_id.to_string(),
            request: request.clone(),
            options,
        });

        match entry {
            Scripted::Reply(reply) => {
                let _ = reply_tx.send(reply);
            }
            Scripted::NoReply => {
                self.pending
                    .lock()
                    .unwrap()
                    .insert(request_id.clone(), reply_tx);
            }
            Scripted::SendError => unreachable!(),
        }

        Ok(request_id)
    }

    fn cancel_request(&self, request_id: &str) {
        self.pending.lock().unwrap().remove(request_id);
        self.cancelled.lock().unwrap().push(request_id.to_string());
    }
}

// ============================================================================
// Mock Resource Store
// ============================================================================

#[derive(Default)]
pub struct MockStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    deleted: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, id: &str, content: &str) {
        self.blobs
            .lock()
            .unwrap()
            .insert(id.to_string(), content.as_bytes().to_vec());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(id)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceStore for MockStore {
    async fn get(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.blobs.lock().unwrap().remove(id);
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn client(transport: &Arc<MockTransport>, store: &Arc<MockStore>) -> AgentClient {
    client_with_config(transport, store, &AgentClientConfig::default())
}

pub fn client_with_config(
    transport: &Arc<MockTransport>,
    store: &Arc<MockStore>,
    config: &AgentClientConfig,
) -> AgentClient {
    AgentClient::with_agent_id(
        AGENT_ID,
        Some(INSTANCE),
        transport.clone(),
        store.clone(),
        config,
    )
    .expect("valid config")
}
