// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Configuration for the agent client

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use strum::IntoEnumIterator;

use agent_protocol::AgentMethod;

use crate::error::ConfigError;

/// Agent client configuration loaded from environment variables or a JSON
/// file.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AgentClientConfig {
    /// Seconds to wait for a reply to a single request
    pub timeout_secs: u64,

    /// Milliseconds between task status polls
    pub poll_interval_ms: u64,

    /// Absolute deadline for `stop`, in seconds
    pub stop_timeout_secs: u64,

    /// Default overall deadline for `wait_until_ready`, in seconds
    pub agent_wait_timeout_secs: u64,

    /// Per-attempt ping timeout used by `wait_until_ready`, in milliseconds
    pub ping_timeout_ms: u64,

    /// Retry budget per method name, consumed only by local timeouts
    pub retry_methods: BTreeMap<String, u32>,
}

impl Default for AgentClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 45,
            poll_interval_ms: 1000,
            stop_timeout_secs: 300,
            agent_wait_timeout_secs: 600,
            ping_timeout_ms: 1000,
            retry_methods: RetryPolicy::agent_defaults()
                .budgets
                .into_iter()
                .map(|(method, budget)| (method.to_string(), budget))
                .collect(),
        }
    }
}

impl AgentClientConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults. `AGENT_RETRY_METHODS` is a
    /// comma-separated list of `method=budget` entries layered over the
    /// default budgets.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        config.timeout_secs = env_or("AGENT_RPC_TIMEOUT_SECS", config.timeout_secs)?;
        config.poll_interval_ms = env_or("AGENT_POLL_INTERVAL_MS", config.poll_interval_ms)?;
        config.stop_timeout_secs = env_or("AGENT_STOP_TIMEOUT_SECS", config.stop_timeout_secs)?;
        config.agent_wait_timeout_secs =
            env_or("AGENT_WAIT_TIMEOUT_SECS", config.agent_wait_timeout_secs)?;
        config.ping_timeout_ms = env_or("AGENT_PING_TIMEOUT_MS", config.ping_timeout_ms)?;

        if let Ok(entries) = std::env::var("AGENT_RETRY_METHODS") {
            let overrides =
                parse_retry_entries(&entries).context("Invalid AGENT_RETRY_METHODS")?;
            config.retry_methods.extend(overrides);
        }

        config
            .retry_policy()
            .context("Invalid retry policy in environment")?;

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .retry_policy()
            .with_context(|| format!("Invalid retry policy in {}", path.display()))?;

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn agent_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_wait_timeout_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// Resolve `retry_methods` against the method table.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let mut policy = RetryPolicy::default();
        for (name, budget) in &self.retry_methods {
            let method = AgentMethod::from_str(name)
                .map_err(|_| ConfigError::UnknownMethod(name.clone()))?;
            policy.set_budget(method, *budget);
        }
        Ok(policy)
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

fn parse_retry_entries(entries: &str) -> Result<BTreeMap<String, u32>, ConfigError> {
    entries
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, budget) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidRetryEntry(entry.to_string()))?;
            let budget = budget
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidRetryEntry(entry.to_string()))?;
            Ok((name.trim().to_string(), budget))
        })
        .collect()
}

/// Per-method retry budgets. Methods without an entry get no retries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    budgets: HashMap<AgentMethod, u32>,
}

impl RetryPolicy {
    /// The budgets every agent client starts with, taken from the method
    /// table.
    pub fn agent_defaults() -> Self {
        Self {
            budgets: AgentMethod::iter()
                .map(|method| (method, method.default_retries()))
                .filter(|(_, budget)| *budget > 0)
                .collect(),
        }
    }

    pub fn budget(&self, method: AgentMethod) -> u32 {
        self.budgets.get(&method).copied().unwrap_or(0)
    }

    pub fn set_budget(&mut self, method: AgentMethod, budget: u32) {
        self.budgets.insert(method, budget);
    }

    pub fn with_budget(mut self, method: AgentMethod, budget: u32) -> Self {
        self.set_budget(method, budget);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = AgentClientConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(45));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.stop_timeout(), Duration::from_secs(300));
        assert_eq!(config.ping_timeout(), Duration::from_secs(1));

        let policy = config.retry_policy().unwrap();
        assert_eq!(policy, RetryPolicy::agent_defaults());
        assert_eq!(policy.budget(AgentMethod::GetState), 2);
        assert_eq!(policy.budget(AgentMethod::GetTask), 2);
        assert_eq!(policy.budget(AgentMethod::UploadBlob), 3);
        assert_eq!(policy.budget(AgentMethod::Apply), 0);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let mut config = AgentClientConfig::default();
        config.retry_methods.insert("get_stat".to_string(), 1);
        assert!(matches!(
            config.retry_policy(),
            Err(ConfigError::UnknownMethod(name)) if name == "get_stat"
        ));
    }

    #[test]
    fn retry_entries() {
        let parsed = parse_retry_entries(" apply=1, mount_disk = 4 ,").unwrap();
        assert_eq!(parsed.get("apply"), Some(&1));
        assert_eq!(parsed.get("mount_disk"), Some(&4));

        assert!(matches!(
            parse_retry_entries("apply"),
            Err(ConfigError::InvalidRetryEntry(_))
        ));
        assert!(matches!(
            parse_retry_entries("apply=lots"),
            Err(ConfigError::InvalidRetryEntry(_))
        ));
    }

    #[tokio::test]
    async fn from_file_keeps_unset_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"timeout_secs": 10, "retry_methods": {{"apply": 1}}}}"#
        )
        .unwrap();

        let config = AgentClientConfig::from_file(file.path()).await.unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.stop_timeout_secs, 300);

        // A file that names retry_methods replaces the default map.
        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.budget(AgentMethod::Apply), 1);
        assert_eq!(policy.budget(AgentMethod::GetState), 0);
    }

    #[tokio::test]
    async fn from_file_accepts_largest_timeouts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"timeout_secs": {max}, "stop_timeout_secs": {max}, "agent_wait_timeout_secs": {max}}}"#,
            max = u64::MAX
        )
        .unwrap();

        let config = AgentClientConfig::from_file(file.path()).await.unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(u64::MAX));
        assert_eq!(config.stop_timeout(), Duration::from_secs(u64::MAX));
        assert_eq!(config.agent_wait_timeout(), Duration::from_secs(u64::MAX));

        // Deadlines built from these are clamped instead of overflowing.
        let now = tokio::time::Instant::now();
        assert!(crate::client::deadline_after(config.timeout()) > now);
        assert!(crate::client::deadline_after(config.stop_timeout()) > now);
    }

    #[tokio::test]
    async fn from_file_rejects_unknown_methods() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"retry_methods": {{"bogus": 1}}}}"#).unwrap();

        let err = AgentClientConfig::from_file(file.path()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown agent method"));
    }
}
