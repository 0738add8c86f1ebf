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

use crate::anomaly::results::ResultsStore;
use crate::anomaly::severity::Tier;
use crate::anomaly::tracker::{RunState, SignalTracker};
use crate::anomaly::Signal;
use crate::parser::MatchedLine;

/// Detects bursts of new connections with nothing else logged in between,
/// i.e. the server accepts sockets but never gets to process operations.
///
/// Windows do not group this signal: every consecutive connection line
/// counts, timestamped or not, and any other line ends the episode. The
/// window is recorded once, on the line where the run reaches the minimum
/// count. If that line has no timestamp, the next connection line of the same
/// run that has one supplies it.
pub struct UnresponsiveTracker {
    state: RunState,
}

impl UnresponsiveTracker {
    pub const fn new() -> Self {
        Self {
            state: RunState::new(Tier::Normal),
        }
    }

    fn reset(&mut self) {
        self.state.restart(Signal::ServerUnresponsive.base_tier(), 0, "");
    }
}

impl Default for UnresponsiveTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalTracker for UnresponsiveTracker {
    fn signal(&self) -> Signal {
        Signal::ServerUnresponsive
    }

    fn observe(&mut self, line: &MatchedLine<'_>, results: &mut ResultsStore) {
        if line.is_incoming_connection() {
            self.state.count += 1;
            if self.state.count >= Signal::ServerUnresponsive.min_count()
                && self.state.window.is_empty()
            {
                if let Some(window) = line.window {
                    self.state.window.push_str(window);
                }
            }
        } else {
            self.state.close(Signal::ServerUnresponsive, results);
            self.reset();
        }
    }

    fn flush(&mut self, results: &mut ResultsStore) {
        self.state.close(Signal::ServerUnresponsive, results);
        self.reset();
    }

    fn state(&self) -> &RunState {
        &self.state
    }
}
