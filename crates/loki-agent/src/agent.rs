// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffering, flush triggering and delivery.
//!
//! A single mutex guards the pending entries together with the console
//! writer. Every buffer mutation, every drain and every echo happens while
//! it is held, and a flush keeps holding it across the transport call, so
//! drains never interleave and a slow endpoint stalls every caller.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::codec;
use crate::config::{AgentConfig, Protocol};
use crate::console;
use crate::entry::{Entry, Timestamp};
use crate::errors::Creation;
use crate::json;
use crate::labels;
use crate::level::Level;
use crate::logproto;
use crate::transport::{ContentType, ShippingError, Transport};

struct State {
    buffer: VecDeque<Entry>,
    console: Box<dyn Write + Send>,
}

/// Thread-safe buffer of log lines for one static label set, shipped to a
/// single push endpoint.
pub struct Agent {
    config: AgentConfig,
    compiled_labels: String,
    state: Mutex<State>,
    transport: Box<dyn Transport>,
}

impl Agent {
    /// Builds an agent that echoes to stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Creation::EmptyLabels`] if `config.labels` is empty.
    pub fn new(config: AgentConfig, transport: Box<dyn Transport>) -> Result<Self, Creation> {
        Self::with_console(config, transport, console::stdout())
    }

    /// Builds an agent that echoes to `console`.
    ///
    /// # Errors
    ///
    /// Returns [`Creation::EmptyLabels`] if `config.labels` is empty.
    pub fn with_console(
        config: AgentConfig,
        transport: Box<dyn Transport>,
        console: Box<dyn Write + Send>,
    ) -> Result<Self, Creation> {
        let compiled_labels = labels::compile(&config.labels, config.protocol)?;
        debug!(
            "LOKI | Agent created for stream {compiled_labels} ({:?}, threshold {})",
            config.protocol, config.flush_threshold
        );
        Ok(Agent {
            config,
            compiled_labels,
            state: Mutex::new(State {
                buffer: VecDeque::new(),
                console,
            }),
            transport,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    #[must_use]
    pub fn compiled_labels(&self) -> &str {
        &self.compiled_labels
    }

    // A panic while the lock was held cannot leave a half-drained buffer
    // behind, so a poisoned state is still usable.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether any entry is buffered. The answer may be stale by the time it
    /// is read.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.lock().buffer.is_empty()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Accepts one line.
    ///
    /// The line is buffered when its level is at least the storage level and
    /// echoed when it is at least the echo level. Lines at [`Level::Disable`]
    /// are never echoed.
    ///
    /// The flush trigger is consulted with the current buffer size before the
    /// line is stored; when it fires the lock is released for the flush and
    /// re-acquired afterwards. Delivery failures are logged, never returned.
    pub fn log(&self, line: &str, level: Level) {
        let mut state = self.lock();
        let timestamp = Timestamp::now();

        if (self.config.flush_trigger)(state.buffer.len(), self.config.flush_threshold) {
            drop(state);
            if let Err(e) = self.flush() {
                error!("LOKI | Flush triggered by log failed: {e}");
            }
            state = self.lock();
        }

        if self.config.storage_level <= level {
            state.buffer.push_back(Entry::new(timestamp, line));
        }

        if self.config.echo_level.prints(level) {
            console::echo(
                state.console.as_mut(),
                level,
                timestamp,
                line,
                &self.config.colors,
            );
        }
    }

    /// Drains the buffer with the configured protocol.
    ///
    /// # Errors
    ///
    /// Returns the transport or payload error. The drained entries are lost
    /// either way.
    pub fn flush(&self) -> Result<usize, ShippingError> {
        match self.config.protocol {
            Protocol::JsonLines => self.flush_json(),
            Protocol::BinaryCompressed => self.flush_proto(),
        }
    }

    /// Drains the buffer into a JSON push request. An empty buffer sends
    /// nothing. Returns the number of entries drained.
    ///
    /// # Errors
    ///
    /// Returns the transport error; the drained entries are not restored.
    pub fn flush_json(&self) -> Result<usize, ShippingError> {
        let mut state = self.lock();

        let (values, count) = json::encode_values(state.buffer.drain(..));
        if count == 0 {
            return Ok(0);
        }

        let payload = json::envelope(&self.compiled_labels, &values);
        debug!("LOKI | Flushing {count} entries as json ({} bytes)", payload.len());

        let result = self
            .transport
            .post(&self.config.endpoint, payload.into_bytes(), ContentType::Json);
        drop(state);

        result.map(|()| count).map_err(|e| {
            error!("LOKI | Failed to push {count} entries, batch dropped: {e}");
            e
        })
    }

    /// Drains the buffer into a snappy-compressed protobuf push request.
    /// The request is sent even when the buffer is empty. Returns the number
    /// of entries drained.
    ///
    /// # Errors
    ///
    /// Returns the compression or transport error; the drained entries are
    /// not restored.
    pub fn flush_proto(&self) -> Result<usize, ShippingError> {
        let mut state = self.lock();

        let (payload, count) = logproto::encode(&self.compiled_labels, state.buffer.drain(..));
        let compressed = codec::compress(&payload).map_err(|e| {
            error!("LOKI | Failed to compress {count} entries, batch dropped: {e}");
            e
        })?;
        debug!(
            "LOKI | Flushing {count} entries as protobuf ({} bytes, {} compressed)",
            payload.len(),
            compressed.len()
        );

        let result = self
            .transport
            .post(&self.config.endpoint, compressed, ContentType::Protobuf);
        drop(state);

        result.map(|()| count).map_err(|e| {
            error!("LOKI | Failed to push {count} entries, batch dropped: {e}");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Labels;
    use crate::policy;
    use std::sync::Arc;
    use tracing_test::traced_test;

    #[derive(Clone, Default)]
    struct Recorder {
        posts: Arc<Mutex<Vec<(String, Vec<u8>, ContentType)>>>,
        fail: bool,
    }

    impl Transport for Recorder {
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
            if self.fail {
                return Err(ShippingError::Destination(None, "connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Console(Arc<Mutex<Vec<u8>>>);

    impl Write for Console {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn config(protocol: Protocol) -> AgentConfig {
        let mut labels = Labels::new();
        labels.insert("job".to_string(), "app".to_string());
        let mut config = AgentConfig::new(labels);
        config.protocol = protocol;
        config
    }

    fn agent(config: AgentConfig, recorder: &Recorder, console: &Console) -> Agent {
        Agent::with_console(config, Box::new(recorder.clone()), Box::new(console.clone())).unwrap()
    }

    #[test]
    fn test_empty_labels_fail_construction() {
        let config = AgentConfig::new(Labels::new());
        let result = Agent::new(config, Box::new(Recorder::default()));
        assert!(matches!(result, Err(Creation::EmptyLabels)));
    }

    #[test]
    fn test_compiled_labels_follow_protocol() {
        let recorder = Recorder::default();
        let console = Console::default();
        assert_eq!(
            agent(config(Protocol::JsonLines), &recorder, &console).compiled_labels(),
            r#"{"job":"app"}"#
        );
        assert_eq!(
            agent(config(Protocol::BinaryCompressed), &recorder, &console).compiled_labels(),
            r#"{job="app"}"#
        );
    }

    #[test]
    fn test_storage_and_echo_levels_are_independent() {
        let recorder = Recorder::default();
        let console = Console::default();
        let mut config = config(Protocol::JsonLines);
        config.flush_trigger = |_, _| false;
        config.storage_level = Level::Warn;
        config.echo_level = Level::Debug;
        let agent = agent(config, &recorder, &console);

        agent.log("debug line", Level::Debug);
        assert!(!agent.has_pending());
        agent.log("warn line", Level::Warn);
        assert_eq!(agent.pending(), 1);

        let printed = String::from_utf8(console.0.lock().unwrap().clone()).unwrap();
        assert_eq!(printed.lines().count(), 2);
        assert!(printed.contains("[DEBUG] debug line"));
        assert!(printed.contains("[ WARN] warn line"));
    }

    #[test]
    fn test_disable_threshold_turns_echo_off() {
        let recorder = Recorder::default();
        let console = Console::default();
        let mut config = config(Protocol::JsonLines);
        config.flush_trigger = |_, _| false;
        config.echo_level = Level::Disable;
        let agent = agent(config, &recorder, &console);

        agent.log("stored only", Level::Error);
        assert_eq!(agent.pending(), 1);
        assert!(console.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_disable_level_line_is_stored_but_not_echoed() {
        let recorder = Recorder::default();
        let console = Console::default();
        let mut config = config(Protocol::JsonLines);
        config.flush_trigger = |_, _| false;
        config.storage_level = Level::Info;
        config.echo_level = Level::Debug;
        let agent = agent(config, &recorder, &console);

        agent.log("silent", Level::Disable);
        assert_eq!(agent.pending(), 1);
        assert!(console.0.lock().unwrap().is_empty());

        assert_eq!(agent.flush().unwrap(), 1);
        let posts = recorder.posts.lock().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&posts[0].1).unwrap();
        assert_eq!(body["streams"][0]["values"][0][1], "silent");
    }

    #[test]
    fn test_disable_storage_level_keeps_only_disable_lines() {
        let recorder = Recorder::default();
        let console = Console::default();
        let mut config = config(Protocol::JsonLines);
        config.flush_trigger = |_, _| false;
        config.storage_level = Level::Disable;
        config.echo_level = Level::Disable;
        let agent = agent(config, &recorder, &console);

        agent.log("error", Level::Error);
        assert!(!agent.has_pending());
        agent.log("disable", Level::Disable);
        assert_eq!(agent.pending(), 1);
        assert!(console.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_json_flush_of_empty_buffer_sends_nothing() {
        let recorder = Recorder::default();
        let console = Console::default();
        let agent = agent(config(Protocol::JsonLines), &recorder, &console);

        assert_eq!(agent.flush_json().unwrap(), 0);
        assert!(recorder.posts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_proto_flush_of_empty_buffer_still_sends() {
        let recorder = Recorder::default();
        let console = Console::default();
        let agent = agent(config(Protocol::BinaryCompressed), &recorder, &console);

        assert_eq!(agent.flush_proto().unwrap(), 0);
        let posts = recorder.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, crate::DEFAULT_ENDPOINT);
        assert_eq!(posts[0].2, ContentType::Protobuf);
    }

    #[test]
    fn test_threshold_zero_only_flushes_empty_buffer() {
        let recorder = Recorder::default();
        let console = Console::default();
        let agent = agent(config(Protocol::JsonLines), &recorder, &console);

        agent.log("first", Level::Info);
        agent.log("second", Level::Info);
        assert!(recorder.posts.lock().unwrap().is_empty());
        assert_eq!(agent.pending(), 2);

        assert_eq!(agent.flush().unwrap(), 2);
        let posts = recorder.posts.lock().unwrap();
        let body = String::from_utf8(posts[0].1.clone()).unwrap();
        assert!(body.contains(r#""first"],["#));
        assert!(body.ends_with(r#""second"]]}]}"#));
    }

    #[test]
    fn test_under_threshold_policy_stops_flushing_past_threshold() {
        let recorder = Recorder::default();
        let console = Console::default();
        let mut config = config(Protocol::JsonLines);
        config.flush_threshold = 2;
        config.flush_trigger = policy::flush_while_under_threshold;
        let agent = agent(config, &recorder, &console);

        // Each log flushes what is pending while at most two entries wait.
        for i in 0..3 {
            agent.log(&format!("line {i}"), Level::Info);
        }
        assert_eq!(recorder.posts.lock().unwrap().len(), 2);
        assert_eq!(agent.pending(), 1);
    }

    #[test]
    fn test_at_threshold_policy_batches() {
        let recorder = Recorder::default();
        let console = Console::default();
        let mut config = config(Protocol::JsonLines);
        config.flush_threshold = 3;
        config.flush_trigger = policy::flush_at_threshold;
        let agent = agent(config, &recorder, &console);

        for i in 0..4 {
            agent.log(&format!("line {i}"), Level::Info);
        }
        let posts = recorder.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&posts[0].1).unwrap();
        assert_eq!(body["streams"][0]["values"].as_array().unwrap().len(), 3);
        drop(posts);
        assert_eq!(agent.pending(), 1);
    }

    #[test]
    fn test_failed_delivery_drops_batch() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let console = Console::default();
        let mut config = config(Protocol::JsonLines);
        config.flush_trigger = |_, _| false;
        let agent = agent(config, &recorder, &console);

        agent.log("lost", Level::Info);
        assert!(matches!(
            agent.flush(),
            Err(ShippingError::Destination(None, _))
        ));
        assert!(!agent.has_pending());
        assert_eq!(agent.flush().unwrap(), 0);
        assert_eq!(recorder.posts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_delivery_is_not_surfaced_by_log() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let console = Console::default();
        let mut config = config(Protocol::BinaryCompressed);
        config.flush_threshold = 5;
        let agent = agent(config, &recorder, &console);

        // The first log ships an empty request, the second ships "one".
        agent.log("one", Level::Info);
        agent.log("two", Level::Info);
        assert_eq!(recorder.posts.lock().unwrap().len(), 2);
        assert_eq!(agent.pending(), 1);
    }

    #[test]
    #[traced_test]
    fn test_failed_delivery_is_logged() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let console = Console::default();
        let mut config = config(Protocol::JsonLines);
        config.flush_threshold = 1;
        let agent = agent(config, &recorder, &console);

        agent.log("lost", Level::Info);
        agent.log("next", Level::Info);
        assert!(logs_contain("Failed to push 1 entries, batch dropped"));
        assert!(logs_contain("Flush triggered by log failed"));
    }
}
