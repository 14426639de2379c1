// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Loki `logproto` push messages.
//!
//! Field numbers follow `pkg/push/push.proto`:
//!
//! ```proto
//! message PushRequest   { repeated StreamAdapter streams = 1; }
//! message StreamAdapter { string labels = 1; repeated EntryAdapter entries = 2; uint64 hash = 3; }
//! message EntryAdapter  { google.protobuf.Timestamp timestamp = 1; string line = 2; }
//! ```

use prost::Message;

use crate::entry::Entry;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushRequest {
    #[prost(message, repeated, tag = "1")]
    pub streams: Vec<StreamAdapter>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamAdapter {
    #[prost(string, tag = "1")]
    pub labels: String,
    #[prost(message, repeated, tag = "2")]
    pub entries: Vec<EntryAdapter>,
    #[prost(uint64, tag = "3")]
    pub hash: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EntryAdapter {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<prost_types::Timestamp>,
    #[prost(string, tag = "2")]
    pub line: String,
}

impl From<Entry> for EntryAdapter {
    fn from(entry: Entry) -> Self {
        EntryAdapter {
            timestamp: Some(prost_types::Timestamp {
                seconds: entry.timestamp.seconds,
                nanos: entry.timestamp.nanos,
            }),
            line: entry.line,
        }
    }
}

/// Builds a one-stream push request from `entries`, consuming them in order.
pub fn push_request(labels: &str, entries: impl IntoIterator<Item = Entry>) -> PushRequest {
    PushRequest {
        streams: vec![StreamAdapter {
            labels: labels.to_string(),
            entries: entries.into_iter().map(EntryAdapter::from).collect(),
            hash: 0,
        }],
    }
}

/// Serializes a one-stream push request. Returns the bytes and the number of entries.
pub fn encode(labels: &str, entries: impl IntoIterator<Item = Entry>) -> (Vec<u8>, usize) {
    let request = push_request(labels, entries);
    let count = request.streams.iter().map(|s| s.entries.len()).sum();
    (request.encode_to_vec(), count)
}
