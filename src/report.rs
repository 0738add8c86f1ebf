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

//! The analysis report written to disk and printed to the console.

use crate::anomaly::results::ResultsStore;
use crate::anomaly::DetectionScope;
use crate::solution::enrich::{EnrichedSolution, EnrichmentOutcome};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub logs_directory: String,
    pub search_term: String,
    /// RFC 3339 time the report was produced
    pub timestamp: String,
    pub total_files_searched: usize,
    pub total_matches: usize,
    pub skipped_lines: usize,
    pub scope: DetectionScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub results: ResultsStore,
    pub solutions: Vec<EnrichedSolution>,
    pub ai_enhancement_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_error: Option<String>,
    pub metadata: ReportMetadata,
}

impl AnalysisReport {
    pub fn new(results: ResultsStore, enrichment: EnrichmentOutcome, metadata: ReportMetadata) -> Self {
        Self {
            results,
            solutions: enrichment.solutions,
            ai_enhancement_used: enrichment.ai_enhancement_used,
            ollama_model_used: enrichment.model,
            ai_error: enrichment.error,
            metadata,
        }
    }

    /// # Errors
    ///
    /// Fails if the report cannot be serialized or written.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Results saved to {}", path.display());
        Ok(())
    }
}

/// Human readable summary of a report
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let meta = &report.metadata;

    let _ = writeln!(out, "===== Analysis Results =====");
    let _ = writeln!(
        out,
        "Searched {} files in {}, {} lines analysed",
        meta.total_files_searched, meta.logs_directory, meta.total_matches
    );
    if meta.skipped_lines > 0 {
        let _ = writeln!(out, "{} lines without timestamp", meta.skipped_lines);
    }

    if report.results.is_empty() {
        let _ = writeln!(out, "\nNo anomalies detected.");
    } else {
        for signal in report.results.signals() {
            let events = report.results.events(signal);
            let _ = writeln!(out, "\n{signal}: {} events", events.len());
            for event in events {
                let _ = writeln!(
                    out,
                    "  - [{}] {} lines at {}",
                    event.severity, event.count, event.window
                );
            }
        }
    }

    let _ = writeln!(out, "\n===== Suggested Solutions =====");
    if report.solutions.is_empty() {
        let _ = writeln!(out, "No solutions needed.");
    }
    for (i, solution) in report.solutions.iter().enumerate() {
        let marker = if solution.ai_enhanced { " (AI enhanced)" } else { "" };
        let _ = writeln!(out, "{}. Problem: {}{marker}", i + 1, solution.record.problem);
        let _ = writeln!(out, "   Solution: {}", solution.record.solution);
        let _ = writeln!(out, "   Root cause: {}", solution.record.root_cause);
        let _ = writeln!(
            out,
            "   Further investigation: {}",
            solution.record.further_investigation
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::results::AnomalyEvent;
    use crate::anomaly::severity::Tier;
    use crate::anomaly::Signal;
    use crate::solution::synthesize_all;

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            logs_directory: "/var/log/dirsrv".to_string(),
            search_term: String::new(),
            timestamp: "2026-10-17T10:00:00+02:00".to_string(),
            total_files_searched: 2,
            total_matches: 5000,
            skipped_lines: 3,
            scope: DetectionScope::Merged,
        }
    }

    fn report() -> AnalysisReport {
        let mut results = ResultsStore::new();
        results.record(
            Signal::AbandonTooLate,
            AnomalyEvent {
                count: 12,
                window: "17/Oct/2026:10:15:42".to_string(),
                severity: Tier::Warning,
            },
        );
        let enrichment = EnrichmentOutcome::unenhanced(synthesize_all(&results));
        AnalysisReport::new(results, enrichment, metadata())
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&report());
        assert!(text.contains("abandon_too_late: 1 events"));
        assert!(text.contains("[warning] 12 lines at 17/Oct/2026:10:15:42"));
        assert!(text.contains("1. Problem: Warning: 12 abandons"));
        assert!(text.contains("3 lines without timestamp"));
    }

    #[test]
    fn test_render_events_in_solution_order() {
        let mut results = ResultsStore::new();
        for (signal, count, severity) in [
            (Signal::AbandonTooLate, 25, Tier::Warning),
            (Signal::AbandonHighEtime, 31, Tier::Critical),
        ] {
            results.record(
                signal,
                AnomalyEvent {
                    count,
                    window: "17/Oct/2026:10:15:42".to_string(),
                    severity,
                },
            );
        }
        let enrichment = EnrichmentOutcome::unenhanced(synthesize_all(&results));
        let text = render_text(&AnalysisReport::new(results, enrichment, metadata()));

        let too_late = text.find("abandon_too_late:").unwrap();
        let high_etime = text.find("abandon_high_etime:").unwrap();
        assert!(too_late < high_etime);
        let first = text.find("1. Problem: Warning").unwrap();
        let second = text.find("2. Problem: Critical").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_render_empty_report() {
        let report = AnalysisReport::new(
            ResultsStore::new(),
            EnrichmentOutcome::default(),
            metadata(),
        );
        let text = render_text(&report);
        assert!(text.contains("No anomalies detected."));
        assert!(text.contains("No solutions needed."));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = report();
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["results"]["abandon_too_late"]["events"][0]["count"], 12);
        assert_eq!(value["solutions"][0]["ai_enhanced"], false);
        assert_eq!(value["ai_enhancement_used"], false);
        assert_eq!(value["metadata"]["scope"], "merged");
        assert!(value.get("ollama_model_used").is_none());
    }
}
