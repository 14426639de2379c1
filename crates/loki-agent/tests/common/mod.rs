// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for agent integration tests

#![allow(dead_code)]

use loki_agent::config::{AgentConfig, Protocol};
use loki_agent::entry::{Entry, Timestamp};
use loki_agent::labels::Labels;
use loki_agent::logproto::PushRequest;
use loki_agent::transport::{ContentType, ShippingError, Transport};
use prost::Message;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Transport that records every post and always succeeds
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub posts: Arc<Mutex<Vec<(String, Vec<u8>, ContentType)>>>,
}

impl Transport for RecordingTransport {
    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        content_type: ContentType,
    ) -> Result<(), ShippingError> {
        self.posts
            .lock()
            .unwrap()
            .push((url.to_string(), body, content_type));
        Ok(())
    }
}

impl RecordingTransport {
    pub fn count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body, _)| body.clone())
            .collect()
    }

    /// Decodes every recorded post, in delivery order.
    pub fn batches(&self) -> Vec<Vec<Entry>> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body, content_type)| match content_type {
                ContentType::Json => decode_json(body),
                ContentType::Protobuf => decode_proto(body).1,
            })
            .collect()
    }
}

/// Console sink shared with the test body
#[derive(Clone, Default)]
pub struct SharedConsole(pub Arc<Mutex<Vec<u8>>>);

impl Write for SharedConsole {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedConsole {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

pub fn config(pairs: &[(&str, &str)], protocol: Protocol) -> AgentConfig {
    let labels: Labels = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let mut config = AgentConfig::new(labels);
    config.protocol = protocol;
    config
}

pub fn decode_json(body: &[u8]) -> Vec<Entry> {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap();
    value["streams"][0]["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let (secs, nanos) = pair[0].as_str().unwrap().split_once('.').unwrap();
            assert_eq!(nanos.len(), 9);
            Entry::new(
                Timestamp::new(secs.parse().unwrap(), nanos.parse().unwrap()),
                pair[1].as_str().unwrap(),
            )
        })
        .collect()
}

/// Returns the stream labels and entries of a snappy-compressed push request.
pub fn decode_proto(body: &[u8]) -> (String, Vec<Entry>) {
    let raw = snap::raw::Decoder::new().decompress_vec(body).unwrap();
    let request = PushRequest::decode(raw.as_slice()).unwrap();
    assert_eq!(request.streams.len(), 1);
    let stream = &request.streams[0];
    let entries = stream
        .entries
        .iter()
        .map(|e| {
            let ts = e.timestamp.clone().unwrap();
            Entry::new(Timestamp::new(ts.seconds, ts.nanos), e.line.clone())
        })
        .collect();
    (stream.labels.clone(), entries)
}
