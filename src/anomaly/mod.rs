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

pub mod abandon;
pub mod results;
pub mod severity;
pub mod tracker;
pub mod unresponsive;

use crate::parser::{match_line, LogLine};
use abandon::AbandonTracker;
use rayon::prelude::*;
use results::ResultsStore;
use serde::{Deserialize, Serialize};
use severity::{Thresholds, Tier};
use std::fmt;
use tracker::SignalTracker;
use unresponsive::UnresponsiveTracker;

/// The three anomaly categories the detector knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    AbandonHighEtime,
    AbandonTooLate,
    ServerUnresponsive,
}

impl Signal {
    pub const ALL: [Self; 3] = [
        Self::AbandonHighEtime,
        Self::AbandonTooLate,
        Self::ServerUnresponsive,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::AbandonHighEtime => "abandon_high_etime",
            Self::AbandonTooLate => "abandon_too_late",
            Self::ServerUnresponsive => "server_unresponsive",
        }
    }

    /// Smallest closed run that is recorded as an event
    pub const fn min_count(self) -> usize {
        match self {
            Self::AbandonHighEtime => 5,
            Self::AbandonTooLate | Self::ServerUnresponsive => 10,
        }
    }

    pub const fn thresholds(self) -> Thresholds {
        match self {
            Self::AbandonHighEtime => Thresholds::new(50, 30, 15),
            Self::AbandonTooLate => Thresholds::new(100, 50, 20),
            Self::ServerUnresponsive => Thresholds::new(150, 75, 10),
        }
    }

    /// Tier a run starts with, kept when no threshold is reached
    pub const fn base_tier(self) -> Tier {
        match self {
            Self::AbandonTooLate => Tier::Warning,
            Self::AbandonHighEtime | Self::ServerUnresponsive => Tier::Normal,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a closed run of `count` lines for `signal`
pub const fn classify(signal: Signal, count: usize, prior: Tier) -> Tier {
    signal.thresholds().classify(count, prior)
}

/// How lines from several files are fed to the trackers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionScope {
    /// One tracker set over the concatenated stream
    #[default]
    Merged,
    /// A fresh tracker set per source file
    PerFile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorOptions {
    /// Close runs still open after the last line
    pub flush_open_runs: bool,
    pub scope: DetectionScope,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub lines_seen: usize,
    /// Lines without a window token. The abandon trackers ignore them; the
    /// unresponsive tracker still acts on their signal.
    pub skipped_lines: usize,
}

impl DetectionStats {
    const fn merge(self, other: Self) -> Self {
        Self {
            lines_seen: self.lines_seen + other.lines_seen,
            skipped_lines: self.skipped_lines + other.skipped_lines,
        }
    }
}

/// Output of one analysis pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub results: ResultsStore,
    pub stats: DetectionStats,
}

/// Single-pass detector owning one tracker per signal.
///
/// A detector holds all state of one pass; create a new one for every pass.
pub struct Detector {
    trackers: Vec<Box<dyn SignalTracker>>,
    results: ResultsStore,
    stats: DetectionStats,
    flush_open_runs: bool,
}

impl Detector {
    /// Detector without any tracker
    pub fn empty() -> Self {
        Self {
            trackers: Vec::new(),
            results: ResultsStore::new(),
            stats: DetectionStats::default(),
            flush_open_runs: false,
        }
    }

    pub fn add_tracker(mut self, tracker: Box<dyn SignalTracker>) -> Self {
        self.trackers.push(tracker);
        self
    }

    pub fn flush_open_runs(mut self, flush: bool) -> Self {
        self.flush_open_runs = flush;
        self
    }

    /// Feed one raw line
    pub fn observe(&mut self, content: &str) {
        self.stats.lines_seen += 1;

        let matched = match_line(content);
        if matched.window.is_none() {
            self.stats.skipped_lines += 1;
            tracing::debug!("Line without timestamp: {content:.120}");
        }

        for tracker in &mut self.trackers {
            tracker.observe(&matched, &mut self.results);
        }
    }

    pub fn finish(mut self) -> Detection {
        if self.flush_open_runs {
            for tracker in &mut self.trackers {
                tracker.flush(&mut self.results);
            }
        }

        Detection {
            results: self.results,
            stats: self.stats,
        }
    }
}

/// Create the detector with the three standard trackers
pub fn create_default_detector(options: DetectorOptions) -> Detector {
    Detector::empty()
        .add_tracker(Box::new(AbandonTracker::high_etime()))
        .add_tracker(Box::new(AbandonTracker::too_late()))
        .add_tracker(Box::new(UnresponsiveTracker::new()))
        .flush_open_runs(options.flush_open_runs)
}

/// Run one pass over `lines`, honoring `options.scope`
pub fn detect(lines: &[LogLine], options: DetectorOptions) -> Detection {
    match options.scope {
        DetectionScope::Merged => detect_stream(lines, options),
        DetectionScope::PerFile => detect_per_file(lines, options),
    }
}

fn detect_stream(lines: &[LogLine], options: DetectorOptions) -> Detection {
    let mut detector = create_default_detector(options);
    for line in lines {
        detector.observe(&line.content);
    }
    detector.finish()
}

/// Each consecutive block of lines from the same file is analysed on its
/// own; per-file results are appended in input order.
fn detect_per_file(lines: &[LogLine], options: DetectorOptions) -> Detection {
    let files: Vec<&[LogLine]> = lines.chunk_by(|a, b| a.source == b.source).collect();
    tracing::debug!("Running detection on {} files in parallel", files.len());

    files
        .par_iter()
        .map(|file_lines| detect_stream(file_lines, options))
        .collect::<Vec<_>>()
        .into_iter()
        .fold(Detection::default(), |mut acc, detection| {
            acc.results.append(detection.results);
            acc.stats = acc.stats.merge(detection.stats);
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    fn abandon_line(second: u32, etime: u32) -> String {
        format!(
            "[17/Oct/2026:10:15:{second:02}.5 +0200] conn=7 op=3 ABANDON targetop=2 msgid=3 nentries=0 etime={etime}.004"
        )
    }

    fn result_line(second: u32) -> String {
        format!("[17/Oct/2026:10:15:{second:02}.7 +0200] conn=7 op=4 RESULT err=0 tag=101 nentries=0 etime=0")
    }

    fn connection_line(second: u32) -> String {
        format!("[17/Oct/2026:10:15:{second:02}.1 +0200] conn={second} fd=64 slot=64 connection from 10.0.0.1 to 10.0.0.2")
    }

    fn lines_from(source: &str, contents: &[String]) -> Vec<LogLine> {
        let source: Arc<Path> = Arc::from(Path::new(source));
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| LogLine::new(c.clone(), i + 1, Arc::clone(&source)))
            .collect()
    }

    #[test]
    fn test_signal_table() {
        assert_eq!(Signal::AbandonHighEtime.min_count(), 5);
        assert_eq!(Signal::AbandonTooLate.thresholds(), Thresholds::new(100, 50, 20));
        assert_eq!(Signal::ServerUnresponsive.thresholds().fatal, 150);
        assert_eq!(Signal::AbandonTooLate.base_tier(), Tier::Warning);
    }

    #[test]
    fn test_classify_uses_signal_thresholds() {
        assert_eq!(classify(Signal::ServerUnresponsive, 10, Tier::Normal), Tier::Warning);
        assert_eq!(classify(Signal::AbandonTooLate, 99, Tier::Warning), Tier::Critical);
        assert_eq!(classify(Signal::AbandonHighEtime, 12, Tier::Normal), Tier::Normal);
    }

    #[test]
    fn test_lines_without_timestamp_are_counted() {
        let mut detector = create_default_detector(DetectorOptions::default());
        detector.observe("389-Directory/2.4.4 B2024.010.0000");
        detector.observe("conn=1 fd=64 slot=64 connection from 10.0.0.1 to 10.0.0.2");
        detector.observe(&result_line(1));
        let detection = detector.finish();
        assert_eq!(detection.stats.lines_seen, 3);
        assert_eq!(detection.stats.skipped_lines, 2);
        assert!(detection.results.is_empty());
    }

    #[test]
    fn test_untimed_banner_ends_unresponsive_episode() {
        let mut detector = create_default_detector(DetectorOptions::default());
        for second in 0..9 {
            detector.observe(&connection_line(second));
        }
        detector.observe("389-Directory/2.4.4 B2024.010.0000");
        for second in 10..19 {
            detector.observe(&connection_line(second));
        }
        detector.observe(&result_line(20));
        assert!(detector.finish().results.is_empty());
    }

    #[test]
    fn test_untimed_connections_extend_unresponsive_episode() {
        let mut detector = create_default_detector(DetectorOptions::default());
        for i in 0..160 {
            if i == 9 {
                detector.observe(&connection_line(9));
            } else {
                detector.observe("conn=1 fd=64 slot=64 connection from 10.0.0.1 to 10.0.0.2");
            }
        }
        detector.observe(&result_line(30));

        let detection = detector.finish();
        let events = detection.results.events(Signal::ServerUnresponsive);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].count, 160);
        assert_eq!(events[0].window, "17/Oct/2026:10:15:09");
        assert_eq!(events[0].severity, Tier::Fatal);
        assert_eq!(detection.stats.skipped_lines, 159);
    }

    #[test]
    fn test_window_less_line_does_not_close_run() {
        let mut detector = create_default_detector(DetectorOptions::default());
        for _ in 0..6 {
            detector.observe(&abandon_line(1, 30));
            detector.observe("garbage without a timestamp");
        }
        detector.observe(&result_line(2));
        let detection = detector.finish();
        assert_eq!(detection.results.events(Signal::AbandonHighEtime)[0].count, 6);
    }

    #[test]
    fn test_flush_closes_open_runs() {
        let lines = lines_from("a.log", &vec![abandon_line(1, 30); 20]);

        let kept_open = detect(&lines, DetectorOptions::default());
        assert!(kept_open.results.is_empty());

        let flushed = detect(
            &lines,
            DetectorOptions {
                flush_open_runs: true,
                ..DetectorOptions::default()
            },
        );
        let events = flushed.results.events(Signal::AbandonHighEtime);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].count, 20);
        assert_eq!(events[0].severity, Tier::Warning);
    }

    #[test]
    fn test_per_file_scope_isolates_runs() {
        // Same second in both files; merged, the runs join into one
        let mut lines = lines_from("a.log", &vec![abandon_line(1, 30); 3]);
        lines.extend(lines_from("b.log", &vec![abandon_line(1, 30); 3]));
        lines.extend(lines_from("c.log", &[result_line(2)]));

        let merged = detect(&lines, DetectorOptions::default());
        assert_eq!(merged.results.events(Signal::AbandonHighEtime)[0].count, 6);

        let per_file = detect(
            &lines,
            DetectorOptions {
                scope: DetectionScope::PerFile,
                ..DetectorOptions::default()
            },
        );
        assert!(per_file.results.is_empty());
        assert_eq!(per_file.stats.lines_seen, 7);
    }

    #[test]
    fn test_per_file_results_follow_file_order() {
        let mut first = vec![abandon_line(1, 30); 16];
        first.push(result_line(2));
        let mut second = vec![abandon_line(5, 30); 31];
        second.push(result_line(6));

        let mut lines = lines_from("a.log", &first);
        lines.extend(lines_from("b.log", &second));

        let detection = detect(
            &lines,
            DetectorOptions {
                scope: DetectionScope::PerFile,
                ..DetectorOptions::default()
            },
        );
        let counts: Vec<_> = detection
            .results
            .events(Signal::AbandonHighEtime)
            .iter()
            .map(|e| e.count)
            .collect();
        assert_eq!(counts, vec![16, 31]);
    }
}
