// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::Config as ConfigError;
use crate::labels::Labels;
use crate::level::{ColorTable, Level};
use crate::policy::{FlushPolicy, FlushTrigger};
use crate::{DEFAULT_ENDPOINT, PUSH_PATH};

const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;
const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 5;

/// Wire encoding of push requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Protocol {
    /// `application/json` body with `[timestamp, line]` value pairs.
    JsonLines,
    /// Snappy-compressed `logproto.PushRequest`.
    #[default]
    BinaryCompressed,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Protocol::JsonLines),
            "protobuf" | "proto" => Ok(Protocol::BinaryCompressed),
            other => Err(format!("unknown protocol '{other}', expected json or protobuf")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Static label set of the single stream this agent ships. Must not be empty.
    pub labels: Labels,
    /// Full push URL, including the `/loki/api/v1/push` path.
    pub endpoint: String,
    pub flush_threshold: usize,
    /// Stored for external schedulers; the agent itself never flushes on a timer.
    pub flush_interval: Duration,
    /// Minimum level for a line to be buffered.
    pub storage_level: Level,
    /// Minimum level for a line to be printed.
    pub echo_level: Level,
    pub protocol: Protocol,
    pub colors: ColorTable,
    pub flush_trigger: FlushTrigger,
    pub push_timeout: Duration,
    /// Sent as `X-Scope-OrgID` by [`HttpTransport`](crate::transport::HttpTransport).
    pub tenant_id: Option<String>,
}

impl AgentConfig {
    #[must_use]
    pub fn new(labels: Labels) -> Self {
        AgentConfig {
            labels,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            flush_threshold: 0,
            flush_interval: Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS),
            storage_level: Level::Info,
            echo_level: Level::Info,
            protocol: Protocol::default(),
            colors: ColorTable::default(),
            flush_trigger: FlushPolicy::default().trigger(),
            push_timeout: Duration::from_secs(DEFAULT_PUSH_TIMEOUT_SECS),
            tenant_id: None,
        }
    }

    /// Loads configuration from `LOKI_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `LOKI_LABELS` is unset or empty, or if any variable
    /// holds a value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let labels = env::var("LOKI_LABELS").map_err(|_| ConfigError::MissingVar("LOKI_LABELS"))?;
        let mut config = AgentConfig::new(parse_labels(&labels)?);

        if let Ok(url) = env::var("LOKI_URL") {
            config.endpoint = push_url(&url);
        }
        if let Some(threshold) = parse_var::<usize>("LOKI_FLUSH_THRESHOLD")? {
            config.flush_threshold = threshold;
        }
        if let Some(secs) = parse_var::<u64>("LOKI_FLUSH_INTERVAL_SECS")? {
            config.flush_interval = Duration::from_secs(secs);
        }
        if let Some(level) = parse_var::<Level>("LOKI_STORAGE_LEVEL")? {
            config.storage_level = level;
        }
        if let Some(level) = parse_var::<Level>("LOKI_ECHO_LEVEL")? {
            config.echo_level = level;
        }
        if let Some(protocol) = parse_var::<Protocol>("LOKI_PROTOCOL")? {
            config.protocol = protocol;
        }
        if let Some(policy) = parse_var::<FlushPolicy>("LOKI_FLUSH_POLICY")? {
            config.flush_trigger = policy.trigger();
        }
        if let Some(secs) = parse_var::<u64>("LOKI_PUSH_TIMEOUT_SECS")? {
            config.push_timeout = Duration::from_secs(secs);
        }
        config.tenant_id = env::var("LOKI_TENANT_ID").ok().filter(|t| !t.is_empty());

        Ok(config)
    }
}

fn parse_var<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                var,
                value,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// Parses `k1=v1,k2=v2`. Surrounding whitespace is trimmed and values may
/// be double-quoted.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidLabel`] for a pair without `=` or with an
/// empty key, and [`ConfigError::Creation`] when no pairs are present.
pub fn parse_labels(input: &str) -> Result<Labels, ConfigError> {
    let mut labels = Labels::new();
    for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ConfigError::InvalidLabel(pair.to_string()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidLabel(pair.to_string()));
        }
        let value = value.trim().trim_matches('"');
        labels.insert(key.to_string(), value.to_string());
    }
    if labels.is_empty() {
        return Err(crate::errors::Creation::EmptyLabels.into());
    }
    Ok(labels)
}

/// Appends the push path to a base URL unless it is already there.
#[must_use]
pub fn push_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.ends_with(PUSH_PATH) {
        base.to_string()
    } else {
        format!("{base}{PUSH_PATH}")
    }
}
