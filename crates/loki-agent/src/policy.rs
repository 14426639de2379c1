// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Flush-trigger policies consulted by [`Agent::log`](crate::agent::Agent::log).
//!
//! A policy receives the number of entries currently buffered and the
//! configured threshold, and returns whether the agent flushes before
//! storing the new line.

use std::str::FromStr;

pub type FlushTrigger = fn(pending: usize, threshold: usize) -> bool;

/// Flushes while the buffer holds no more than `threshold` entries and stops
/// flushing once it grows past it. Below the threshold nearly every call
/// ships what is pending; with a threshold of 0 a flush only runs when the
/// buffer is already empty.
#[must_use]
pub fn flush_while_under_threshold(pending: usize, threshold: usize) -> bool {
    pending <= threshold
}

/// Flushes once the buffer has reached `threshold` entries.
#[must_use]
pub fn flush_at_threshold(pending: usize, threshold: usize) -> bool {
    pending >= threshold
}

/// Named selector for the built-in policies, used by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    #[default]
    UnderThreshold,
    AtThreshold,
}

impl FlushPolicy {
    #[must_use]
    pub fn trigger(self) -> FlushTrigger {
        match self {
            FlushPolicy::UnderThreshold => flush_while_under_threshold,
            FlushPolicy::AtThreshold => flush_at_threshold,
        }
    }
}

impl FromStr for FlushPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "under_threshold" => Ok(FlushPolicy::UnderThreshold),
            "at_threshold" => Ok(FlushPolicy::AtThreshold),
            other => Err(format!(
                "unknown flush policy '{other}', expected under_threshold or at_threshold"
            )),
        }
    }
}
