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

use crate::anomaly::results::{AnomalyEvent, ResultsStore};
use crate::anomaly::severity::Tier;
use crate::anomaly::Signal;
use crate::parser::MatchedLine;

/// Current run of one signal.
///
/// `window` is empty before the first qualifying line, after a reset that
/// clears it, or while an unresponsive run has seen no timestamped line at or
/// past its minimum count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub severity: Tier,
    pub count: usize,
    pub window: String,
}

impl RunState {
    pub const fn new(base: Tier) -> Self {
        Self {
            severity: base,
            count: 0,
            window: String::new(),
        }
    }

    /// Start over with `count` observations in `window`
    pub fn restart(&mut self, base: Tier, count: usize, window: &str) {
        self.severity = base;
        self.count = count;
        self.window.clear();
        self.window.push_str(window);
    }

    pub fn same_window(&self, window: &str) -> bool {
        self.window == window
    }

    /// Record the run if it reached the signal's minimum count.
    ///
    /// The run itself is left untouched apart from its severity; callers
    /// reset it according to their own conventions.
    pub fn close(&mut self, signal: Signal, results: &mut ResultsStore) {
        if self.count < signal.min_count() {
            return;
        }

        self.severity = signal.thresholds().classify(self.count, self.severity);
        tracing::debug!(
            signal = signal.name(),
            count = self.count,
            window = %self.window,
            severity = %self.severity,
            "run closed above minimum count"
        );
        results.record(
            signal,
            AnomalyEvent {
                count: self.count,
                window: self.window.clone(),
                severity: self.severity,
            },
        );
    }
}

/// One independent state machine per signal
pub trait SignalTracker: Send {
    fn signal(&self) -> Signal;

    /// Feed the next line of the stream, with or without a window
    fn observe(&mut self, line: &MatchedLine<'_>, results: &mut ResultsStore);

    /// Apply the closure test to the open run after the last line
    fn flush(&mut self, results: &mut ResultsStore);

    fn state(&self) -> &RunState;
}
