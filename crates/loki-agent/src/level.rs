// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Severity levels and their console presentation.
//!
//! Levels are ordered from least to most severe, with [`Level::Disable`]
//! above every printable level. Storage compares levels plainly, so a
//! `Disable` storage threshold keeps only lines submitted at `Disable`.
//! Echo never prints a `Disable` line, so the console formatter only ever
//! sees the four printable levels.

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Disable,
}

impl Level {
    /// Returns true when a line at `level` is echoed under an echo threshold
    /// of `self`.
    #[must_use]
    pub fn prints(self, level: Level) -> bool {
        level != Level::Disable && self <= level
    }

    /// Fixed-width bracketed tag printed before echoed lines.
    #[must_use]
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Level::Debug => Some("[DEBUG]"),
            Level::Info => Some("[ INFO]"),
            Level::Warn => Some("[ WARN]"),
            Level::Error => Some("[ERROR]"),
            Level::Disable => None,
        }
    }
}

impl AsRef<str> for Level {
    fn as_ref(&self) -> &str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Disable => "disable",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "disable" | "disabled" | "off" => Ok(Level::Disable),
            other => Err(format!(
                "unknown level '{other}', expected one of debug, info, warn, error, disable"
            )),
        }
    }
}

/// ANSI SGR foreground colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Reset,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Default,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Color {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Color::Reset => 0,
            Color::Black => 30,
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
            Color::Magenta => 35,
            Color::Cyan => 36,
            Color::White => 37,
            Color::Default => 39,
            Color::BrightBlack => 90,
            Color::BrightRed => 91,
            Color::BrightGreen => 92,
            Color::BrightYellow => 93,
            Color::BrightBlue => 94,
            Color::BrightMagenta => 95,
            Color::BrightCyan => 96,
            Color::BrightWhite => 97,
        }
    }
}

/// One color per printable level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorTable {
    pub debug: Color,
    pub info: Color,
    pub warn: Color,
    pub error: Color,
}

impl Default for ColorTable {
    fn default() -> Self {
        ColorTable {
            debug: Color::BrightBlack,
            info: Color::Default,
            warn: Color::Yellow,
            error: Color::Red,
        }
    }
}

impl ColorTable {
    /// `Disable` has no slot in the table and maps to [`Color::Reset`].
    #[must_use]
    pub fn get(&self, level: Level) -> Color {
        match level {
            Level::Debug => self.debug,
            Level::Info => self.info,
            Level::Warn => self.warn,
            Level::Error => self.error,
            Level::Disable => Color::Reset,
        }
    }
}
