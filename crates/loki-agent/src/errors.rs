// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Failure to build an agent.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Creation {
    #[error("label set is empty: at least one label is required to form a stream selector")]
    EmptyLabels,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure to load an [`AgentConfig`](crate::config::AgentConfig) from the environment.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Config {
    #[error("{0} environment variable is not set")]
    MissingVar(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid label {0:?}: expected key=value")]
    InvalidLabel(String),

    #[error(transparent)]
    Creation(#[from] Creation),
}
