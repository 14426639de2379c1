// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-process log shipping to a Loki push endpoint.
//!
//! An [`agent::Agent`] accepts lines from any number of threads, keeps the
//! ones that meet its storage level in a lock-guarded FIFO buffer, optionally
//! echoes them to a colored console, and drains the buffer into either a JSON
//! or a snappy-compressed protobuf push request.
//!
//! ```text
//!   caller ──> Agent::log ──> buffer (Mutex<VecDeque<Entry>>)
//!                  │                     │
//!                  v                     v  flush
//!               console        json::encode | logproto::encode + codec
//!                                        │
//!                                        v
//!                                 Transport::post
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod agent;
pub mod codec;
pub mod config;
pub mod console;
pub mod entry;
pub mod errors;
pub mod json;
pub mod labels;
pub mod level;
pub mod logproto;
pub mod policy;
pub mod transport;

/// Path of the Loki push API, appended to a bare base URL.
pub const PUSH_PATH: &str = "/loki/api/v1/push";

/// Endpoint used when no URL is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3100/loki/api/v1/push";
