// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Client for VM agents reached over a request/reply messaging bus.
//!
//! The client publishes [`agent_protocol::AgentRequest`] envelopes through a
//! [`Transport`], correlates replies, enforces per-call timeouts, retries
//! local timeouts within a per-method budget, polls long-running agent tasks
//! and honours cooperative cancellation through a [`CancelSignal`]. Large
//! payloads that agents upload out of band are recovered from a
//! [`ResourceStore`].
//!
//! # Example
//!
//! ```ignore
//! use agent_client::{AgentClient, AgentClientConfig, CancelSignal};
//!
//! let config = AgentClientConfig::from_env()?;
//! let client = AgentClient::with_agent_id(
//!     "7b6c0d9e-agent",
//!     Some("web/0"),
//!     transport,
//!     store,
//!     &config,
//! )?;
//!
//! client.wait_until_ready(None, None).await?;
//! let state = client.get_state(vec![], None).await?;
//!
//! let (cancel_tx, cancel) = CancelSignal::channel();
//! client.drain(vec!["shutdown".into()], &cancel).await?;
//! ```

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
mod operations;
mod poller;
mod readiness;
pub mod reply;
pub mod store;
pub mod transport;

pub use cancel::CancelSignal;
pub use client::{AgentClient, StartedTask};
pub use config::{AgentClientConfig, RetryPolicy};
pub use error::{AgentError, ConfigError, StoreError, TransportError};
pub use store::ResourceStore;
pub use transport::{PendingRequest, ReplySender, Transport};
