// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Colored console echo of accepted lines.
//!
//! ```text
//! ESC[<color>m2023-11-14 22:13:20.000000042 [ INFO] hello ESC[0m
//! ```

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use crate::entry::Timestamp;
use crate::level::{ColorTable, Level};

/// Formats one echo line without the trailing newline.
///
/// Returns `None` for [`Level::Disable`], which has no tag and is never printed.
#[must_use]
pub fn format_line(
    level: Level,
    timestamp: Timestamp,
    line: &str,
    colors: &ColorTable,
) -> Option<String> {
    let tag = level.tag()?;
    let nanos = u32::try_from(timestamp.nanos).unwrap_or(0);
    let date = DateTime::<Utc>::from_timestamp(timestamp.seconds, nanos)
        .map(|time| time.format("%F %T").to_string())
        .unwrap_or_else(|| timestamp.seconds.to_string());
    Some(format!(
        "\x1b[{}m{}.{:09} {} {}\x1b[0m",
        colors.get(level).code(),
        date,
        timestamp.nanos,
        tag,
        line
    ))
}

/// Writes the formatted line to `out`. Write failures are logged and dropped.
pub fn echo(
    out: &mut dyn Write,
    level: Level,
    timestamp: Timestamp,
    line: &str,
    colors: &ColorTable,
) {
    let Some(formatted) = format_line(level, timestamp, line, colors) else {
        return;
    };
    if let Err(e) = writeln!(out, "{formatted}").and_then(|()| out.flush()) {
        tracing::debug!("LOKI | Failed to echo line to console: {e}");
    }
}

/// Default echo target.
#[must_use]
pub fn stdout() -> Box<dyn Write + Send> {
    Box::new(io::stdout())
}
