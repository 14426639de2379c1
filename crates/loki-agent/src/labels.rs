// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Label compilation.
//!
//! The agent ships every line under one static label set. The set is turned
//! into the protocol's textual stream selector once, when the agent is built,
//! and the resulting string is embedded verbatim in every push request:
//!
//! - protobuf: `{job="app",env="prod"}` (the selector syntax Loki parses)
//! - json: `{"job":"app","env":"prod"}` (the `stream` object of the JSON body)
//!
//! Keys are emitted in ascending order. Values are not escaped.

use std::collections::BTreeMap;

use crate::config::Protocol;
use crate::errors::Creation;

pub type Labels = BTreeMap<String, String>;

/// Builds the stream selector for `protocol`.
///
/// # Errors
///
/// Returns [`Creation::EmptyLabels`] when `labels` is empty.
pub fn compile(labels: &Labels, protocol: Protocol) -> Result<String, Creation> {
    if labels.is_empty() {
        return Err(Creation::EmptyLabels);
    }

    let pairs = labels
        .iter()
        .map(|(key, value)| match protocol {
            Protocol::BinaryCompressed => format!("{key}=\"{value}\""),
            Protocol::JsonLines => format!("\"{key}\":\"{value}\""),
        })
        .collect::<Vec<String>>();

    Ok(format!("{{{}}}", pairs.join(",")))
}
