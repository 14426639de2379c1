// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! JSON push request encoding.
//!
//! ```json
//! {"streams":[{"stream":{"job":"app"},"values":[["1700000000.000000001","hello"]]}]}
//! ```
//!
//! Only backslash and double quote are escaped in line text; every other
//! byte passes through unchanged.

use crate::entry::Entry;

/// Appends `line` to `out`, escaping `\` and `"`.
pub fn escape_into(out: &mut String, line: &str) {
    for c in line.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
}

/// Encodes `entries` as a `values` array of `[timestamp, line]` pairs,
/// consuming them in order. Returns the array and the number of entries.
pub fn encode_values(entries: impl IntoIterator<Item = Entry>) -> (String, usize) {
    let mut values = String::from("[");
    let mut count = 0;
    for entry in entries {
        if count > 0 {
            values.push(',');
        }
        values.push_str("[\"");
        values.push_str(&entry.timestamp.to_string());
        values.push_str("\",\"");
        escape_into(&mut values, &entry.line);
        values.push_str("\"]");
        count += 1;
    }
    values.push(']');
    (values, count)
}

/// Wraps a `values` array into the single-stream push envelope.
/// `stream` is embedded verbatim.
#[must_use]
pub fn envelope(stream: &str, values: &str) -> String {
    format!(r#"{{"streams":[{{"stream":{stream},"values":{values}}}]}}"#)
}
