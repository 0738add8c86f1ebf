// LdapWatch - GPL-3.0-or-later
// This file is part of LdapWatch.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// LdapWatch is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// LdapWatch is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with LdapWatch.  If not, see <https://www.gnu.org/licenses/>.

//! Recognizers for directory server access log lines.
//!
//! Every line is reduced to an optional one-second window token and at most
//! one signal. The window is extracted independently of the signal, so a
//! line can carry a window without any signal and vice versa.

use fancy_regex::Regex;
use std::sync::LazyLock;

// [17/Oct/2026:10:15:42.123456789 +0200] -> 17/Oct/2026:10:15:42
static WINDOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2})").expect("valid window regex")
});

static ABANDON_ETIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ABANDON targetop=\d+\b.*?\betime=(\d+(?:\.\d+)?)")
        .expect("valid abandon etime regex")
});

static ABANDON_NOTFOUND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ABANDON targetop=NOTFOUND\b").expect("valid abandon notfound regex")
});

static CONNECTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)connection from").expect("valid connection regex"));

/// Signal category recognised on a single line. The categories are mutually
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSignal {
    /// `ABANDON targetop=<opid> ... etime=<n>`
    AbandonWithEtime { etime: f64 },
    /// `ABANDON targetop=NOTFOUND`
    AbandonNotFound,
    /// `connection from`, any case
    IncomingConnection,
}

/// Result of matching one line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedLine<'a> {
    /// `DD/Mon/YYYY:HH:MM:SS`, borrowed from the line
    pub window: Option<&'a str>,
    pub signal: Option<LineSignal>,
}

impl MatchedLine<'_> {
    pub const fn is_incoming_connection(&self) -> bool {
        matches!(self.signal, Some(LineSignal::IncomingConnection))
    }

    pub const fn is_abandon_not_found(&self) -> bool {
        matches!(self.signal, Some(LineSignal::AbandonNotFound))
    }

    pub const fn abandon_etime(&self) -> Option<f64> {
        match self.signal {
            Some(LineSignal::AbandonWithEtime { etime }) => Some(etime),
            Some(LineSignal::AbandonNotFound | LineSignal::IncomingConnection) | None => None,
        }
    }
}

/// Extract the one-second window token of a line, if any
pub fn extract_window(content: &str) -> Option<&str> {
    WINDOW_PATTERN
        .captures(content)
        .ok()
        .flatten()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Classify the signal carried by a line, if any
pub fn classify_signal(content: &str) -> Option<LineSignal> {
    if let Ok(Some(caps)) = ABANDON_ETIME_PATTERN.captures(content) {
        if let Some(etime) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
            return Some(LineSignal::AbandonWithEtime { etime });
        }
    }

    if ABANDON_NOTFOUND_PATTERN.is_match(content).unwrap_or(false) {
        return Some(LineSignal::AbandonNotFound);
    }

    if CONNECTION_PATTERN.is_match(content).unwrap_or(false) {
        return Some(LineSignal::IncomingConnection);
    }

    None
}

/// Match a raw line against all recognizers
pub fn match_line(content: &str) -> MatchedLine<'_> {
    MatchedLine {
        window: extract_window(content),
        signal: classify_signal(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_drops_fraction_and_zone() {
        let raw = "[17/Oct/2026:10:15:42.123456789 +0200] conn=12 op=5 SRCH base=\"dc=example\"";
        assert_eq!(extract_window(raw), Some("17/Oct/2026:10:15:42"));
    }

    #[test]
    fn test_window_without_fraction() {
        let raw = "[01/Jan/2025:00:00:07 -0500] conn=1 op=-1 fd=64 closed - B1";
        assert_eq!(extract_window(raw), Some("01/Jan/2025:00:00:07"));
    }

    #[test]
    fn test_missing_window() {
        assert_eq!(extract_window("389-Directory/2.4.4 B2024.010.0000"), None);
        assert_eq!(extract_window("[2025-11-20 14:23:45] not an access log"), None);
    }

    #[test]
    fn test_abandon_with_etime() {
        let raw = "[17/Oct/2026:10:15:42.1 +0200] conn=12 op=5 ABANDON targetop=3 msgid=4 nentries=0 etime=25.001";
        assert_eq!(
            classify_signal(raw),
            Some(LineSignal::AbandonWithEtime { etime: 25.001 })
        );
    }

    #[test]
    fn test_abandon_with_integer_etime() {
        let raw = "[17/Oct/2026:10:15:42 +0200] conn=12 op=5 ABANDON targetop=3 msgid=4 nentries=0 etime=7";
        assert_eq!(
            match_line(raw).signal,
            Some(LineSignal::AbandonWithEtime { etime: 7.0 })
        );
    }

    #[test]
    fn test_abandon_not_found() {
        let raw = "[17/Oct/2026:10:15:42 +0200] conn=9 op=2 ABANDON targetop=NOTFOUND msgid=3";
        assert_eq!(match_line(raw).signal, Some(LineSignal::AbandonNotFound));
    }

    #[test]
    fn test_incoming_connection_any_case() {
        let raw = "[17/Oct/2026:10:15:42 +0200] conn=44 fd=70 slot=70 Connection From 10.0.0.7 to 10.0.0.1";
        assert_eq!(
            match_line(raw).signal,
            Some(LineSignal::IncomingConnection)
        );
    }

    #[test]
    fn test_unrelated_line_keeps_window() {
        let raw = "[17/Oct/2026:10:15:42 +0200] conn=12 op=6 RESULT err=0 tag=101 nentries=1 etime=0.000211";
        let matched = match_line(raw);
        assert_eq!(matched.signal, None);
        assert_eq!(matched.window, Some("17/Oct/2026:10:15:42"));
    }

    #[test]
    fn test_abandon_without_etime_is_not_etime_signal() {
        let raw = "[17/Oct/2026:10:15:42 +0200] conn=12 op=5 ABANDON targetop=3 msgid=4";
        assert_eq!(classify_signal(raw), None);
    }
}
