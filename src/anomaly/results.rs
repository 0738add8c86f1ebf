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

//! Append-only store of closed, threshold-exceeding runs.

use crate::anomaly::severity::Tier;
use crate::anomaly::Signal;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A closed run that reached its signal's minimum count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub count: usize,
    pub window: String,
    pub severity: Tier,
}

/// Events recorded for one signal, in detection order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvents {
    pub events: Vec<AnomalyEvent>,
}

/// Results of one analysis pass, keyed by signal name.
///
/// A signal only appears once it has at least one event, so a pass without
/// anomalies serializes to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsStore {
    signals: IndexMap<Signal, SignalEvents>,
}

impl ResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, signal: Signal, event: AnomalyEvent) {
        self.signals.entry(signal).or_default().events.push(event);
    }

    /// Events of a single signal, empty if none were recorded
    pub fn events(&self, signal: Signal) -> &[AnomalyEvent] {
        match self.signals.get(&signal) {
            Some(entry) => &entry.events,
            None => &[],
        }
    }

    /// Every event, signal by signal, each signal's events in line order
    pub fn iter(&self) -> impl Iterator<Item = (Signal, &AnomalyEvent)> {
        self.signals
            .iter()
            .flat_map(|(signal, entry)| entry.events.iter().map(move |event| (*signal, event)))
    }

    pub fn signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn total_events(&self) -> usize {
        self.signals.values().map(|entry| entry.events.len()).sum()
    }

    /// Append all events of `other` after the events already stored
    pub fn append(&mut self, other: Self) {
        for (signal, entry) in other.signals {
            self.signals
                .entry(signal)
                .or_default()
                .events
                .extend(entry.events);
        }
    }
}
