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

//! Turns recorded anomaly events into diagnostic recommendations.
//!
//! Text is fixed per signal and tier and always names the affected window.
//! Events that stayed at [`Tier::Normal`] have no template and are skipped.

pub mod enrich;
pub mod ollama;

use crate::anomaly::results::{AnomalyEvent, ResultsStore};
use crate::anomaly::severity::Tier;
use crate::anomaly::Signal;
use serde::{Deserialize, Serialize};

/// Recommendation derived from one anomaly event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub problem: String,
    pub solution: String,
    pub root_cause: String,
    pub further_investigation: String,
}

/// Build the recommendation for one event, `None` for normal-tier events
pub fn synthesize(signal: Signal, event: &AnomalyEvent) -> Option<SolutionRecord> {
    let window = event.window.as_str();
    let count = event.count;

    let record = match (signal, event.severity) {
        (_, Tier::Normal) => {
            tracing::debug!(
                signal = signal.name(),
                count,
                window,
                "Suppressing solution for event below warning threshold"
            );
            return None;
        }
        (Signal::AbandonHighEtime, tier) => abandon_high_etime(tier, count, window),
        (Signal::AbandonTooLate, tier) => abandon_too_late(tier, count, window),
        (Signal::ServerUnresponsive, tier) => server_unresponsive(tier, count, window),
    };

    Some(record)
}

/// Recommendations for every event, in the order of the results store
pub fn synthesize_all(results: &ResultsStore) -> Vec<SolutionRecord> {
    results
        .iter()
        .filter_map(|(signal, event)| synthesize(signal, event))
        .collect()
}

const WORKER_THREADS: &str = "increase the number of worker threads (nsslapd-threadnumber)";
const BLOCKING_PLUGINS: &str =
    "tune or disable plugins known to block other threads (referential integrity, memberOf, retro changelog)";
const UNINDEXED_SEARCHES: &str =
    "check the access log for unindexed searches (notes=A or notes=U) and add the missing indexes";

fn abandon_high_etime(tier: Tier, count: usize, window: &str) -> SolutionRecord {
    let (problem, urgency) = match tier {
        Tier::Fatal => (
            format!("Fatal: {count} slow operations abandoned by clients at {window}"),
            "The server is effectively stalled. Act immediately:",
        ),
        Tier::Critical => (
            format!("Critical: {count} slow operations abandoned by clients at {window}"),
            "Operations are queuing far beyond client patience. Soon:",
        ),
        Tier::Warning | Tier::Normal => (
            format!("Warning: {count} slow operations abandoned by clients at {window}"),
            "Some operations exceed client timeouts. When convenient:",
        ),
    };

    SolutionRecord {
        problem,
        solution: format!("{urgency} {WORKER_THREADS}; {BLOCKING_PLUGINS}; {UNINDEXED_SEARCHES}."),
        root_cause: format!(
            "Clients gave up on operations that had already run for 20 seconds or more during {window}. \
             Long etimes usually come from worker thread starvation, lock contention inside plugins or \
             searches that scan the whole database."
        ),
        further_investigation: format!(
            "Collect periodic stack samples of ns-slapd around {window}; compare operation latency \
             (etime) before and after {window}; look for unindexed searches started shortly before the window."
        ),
    }
}

fn abandon_too_late(tier: Tier, count: usize, window: &str) -> SolutionRecord {
    let (problem, urgency) = match tier {
        Tier::Fatal => (
            format!("Fatal: {count} abandons of already finished operations at {window}"),
            "Clients are hammering the server with useless abandons. Act immediately:",
        ),
        Tier::Critical => (
            format!("Critical: {count} abandons of already finished operations at {window}"),
            "Responses reach clients too late to be useful. Soon:",
        ),
        Tier::Warning | Tier::Normal => (
            format!("Warning: {count} abandons of already finished operations at {window}"),
            "Responses sometimes arrive after clients gave up. When convenient:",
        ),
    };

    SolutionRecord {
        problem,
        solution: format!(
            "{urgency} {WORKER_THREADS}; {BLOCKING_PLUGINS}; review client side timeouts against the server's real response times."
        ),
        root_cause: format!(
            "During {window} clients abandoned operations the server could no longer find (targetop=NOTFOUND), \
             meaning the result was produced but delivered after the client timed out."
        ),
        further_investigation: format!(
            "Compare operation latency before and after {window}; collect periodic stack samples while \
             the pattern repeats; check which client connections issue the abandons."
        ),
    }
}

fn server_unresponsive(tier: Tier, count: usize, window: &str) -> SolutionRecord {
    let (problem, urgency) = match tier {
        Tier::Fatal => (
            format!("Fatal: server unresponsive, {count} connections accepted without any operation from {window}"),
            "The server no longer processes requests. Act immediately:",
        ),
        Tier::Critical => (
            format!("Critical: server barely responsive, {count} connections accepted without any operation from {window}"),
            "The server is falling behind on new connections. Soon:",
        ),
        Tier::Warning | Tier::Normal => (
            format!("Warning: server slow to respond, {count} connections accepted without any operation from {window}"),
            "New connections wait before being served. When convenient:",
        ),
    };

    SolutionRecord {
        problem,
        solution: format!("{urgency} {WORKER_THREADS}; {BLOCKING_PLUGINS}; {UNINDEXED_SEARCHES}."),
        root_cause: format!(
            "Starting at {window} the server logged only new connections and no operations, \
             so every worker thread was busy or blocked."
        ),
        further_investigation: format!(
            "Collect periodic stack samples of ns-slapd starting at {window}; check connection-count spikes \
             in server monitoring around {window}; compare operation latency before and after the window."
        ),
    }
}
