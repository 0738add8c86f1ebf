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

//! `LdapWatch` - anomaly detection for directory server access logs
//!
//! Lines flow strictly forward: the line search collects [`LogLine`]s, the
//! [`anomaly`] trackers turn them into a [`ResultsStore`], the [`solution`]
//! module derives recommendations, and an optional enricher rewrites them.

pub mod anomaly;
pub mod config;
pub mod core;
pub mod parser;
pub mod report;
pub mod solution;

pub use anomaly::results::{AnomalyEvent, ResultsStore};
pub use anomaly::severity::Tier;
pub use anomaly::{detect, Detection, DetectionScope, DetectorOptions, Signal};
pub use parser::LogLine;
pub use solution::enrich::{EnrichmentOutcome, SolutionEnricher};
pub use solution::SolutionRecord;

/// Detection, synthesis and enrichment of one ordered line sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub detection: Detection,
    pub enrichment: EnrichmentOutcome,
}

/// Run the whole pipeline over `lines`.
///
/// Enrichment only starts once detection has finished; its failures never
/// affect the detected events.
pub fn analyze(
    lines: &[LogLine],
    options: DetectorOptions,
    enricher: &dyn SolutionEnricher,
) -> Analysis {
    let detection = detect(lines, options);
    tracing::info!(
        "Detected {} anomaly events in {} lines",
        detection.results.total_events(),
        detection.stats.lines_seen
    );

    let records = solution::synthesize_all(&detection.results);
    let enrichment = solution::enrich::enrich_solutions(enricher, records);

    Analysis {
        detection,
        enrichment,
    }
}
