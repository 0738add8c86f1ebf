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

//! Window-grouped run trackers for the two abandon signals.
//!
//! Both count qualifying lines that share a one-second window. They differ
//! only in what qualifies and in where the window points after a
//! non-qualifying line from another second resets the run: the high-etime
//! tracker adopts that line's window, the too-late tracker clears it.
//!
//! Lines without a window cannot be compared and leave the run untouched.

use crate::anomaly::results::ResultsStore;
use crate::anomaly::tracker::{RunState, SignalTracker};
use crate::anomaly::Signal;
use crate::parser::MatchedLine;

/// Abandons of operations running at least this long (seconds) count as slow
pub const HIGH_ETIME_SECS: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResetWindow {
    /// Adopt the window of the line that caused the reset
    Adopt,
    /// Clear the window
    Clear,
}

pub struct AbandonTracker {
    signal: Signal,
    qualifies: fn(&MatchedLine<'_>) -> bool,
    reset: ResetWindow,
    state: RunState,
}

impl AbandonTracker {
    /// Clients giving up on operations whose etime reached [`HIGH_ETIME_SECS`]
    pub fn high_etime() -> Self {
        Self::with(
            Signal::AbandonHighEtime,
            |line| line.abandon_etime().is_some_and(|etime| etime >= HIGH_ETIME_SECS),
            ResetWindow::Adopt,
        )
    }

    /// Clients abandoning operations the server already finished
    pub fn too_late() -> Self {
        Self::with(
            Signal::AbandonTooLate,
            |line| line.is_abandon_not_found(),
            ResetWindow::Clear,
        )
    }

    const fn with(
        signal: Signal,
        qualifies: fn(&MatchedLine<'_>) -> bool,
        reset: ResetWindow,
    ) -> Self {
        Self {
            signal,
            qualifies,
            reset,
            state: RunState::new(signal.base_tier()),
        }
    }
}

impl SignalTracker for AbandonTracker {
    fn signal(&self) -> Signal {
        self.signal
    }

    fn observe(&mut self, line: &MatchedLine<'_>, results: &mut ResultsStore) {
        let Some(line_window) = line.window else {
            return;
        };
        let same_window = self.state.same_window(line_window);

        if (self.qualifies)(line) {
            if same_window {
                self.state.count += 1;
            } else {
                self.state.close(self.signal, results);
                self.state.restart(self.signal.base_tier(), 1, line_window);
            }
        } else if !same_window {
            // Unrelated lines from the open run's own second are ignored
            self.state.close(self.signal, results);
            let window = match self.reset {
                ResetWindow::Adopt => line_window,
                ResetWindow::Clear => "",
            };
            self.state.restart(self.signal.base_tier(), 0, window);
        }
    }

    fn flush(&mut self, results: &mut ResultsStore) {
        self.state.close(self.signal, results);
        self.state.restart(self.signal.base_tier(), 0, "");
    }

    fn state(&self) -> &RunState {
        &self.state
    }
}
