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

//! Optional rewriting of solution text by an external model.
//!
//! Enrichment runs strictly after detection and never touches events. Every
//! failure degrades to the template text of the affected record.

use crate::solution::SolutionRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest response accepted as an enhanced solution
pub const MIN_ENHANCED_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("enrichment service is unavailable: {0}")]
    Unavailable(String),

    #[error("enrichment request timed out after {0} seconds")]
    Timeout(u64),

    #[error("enrichment service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("could not decode enrichment response: {0}")]
    Parse(String),

    #[error("enhanced text too short ({0} characters)")]
    TooShort(usize),
}

/// A capability that rewrites the solution text of a record
pub trait SolutionEnricher: Send + Sync {
    /// Name reported as the model used
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Return the enhanced solution text for `record`
    fn enhance(&self, record: &SolutionRecord) -> Result<String, EnrichError>;
}

/// Default enricher, never available
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEnricher;

impl SolutionEnricher for DisabledEnricher {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn enhance(&self, _record: &SolutionRecord) -> Result<String, EnrichError> {
        Err(EnrichError::Unavailable("enrichment is disabled".to_string()))
    }
}

/// A solution as handed to the caller, possibly rewritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedSolution {
    #[serde(flatten)]
    pub record: SolutionRecord,
    pub ai_enhanced: bool,
    /// Template text replaced by the enhancement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_solution: Option<String>,
}

impl EnrichedSolution {
    pub const fn plain(record: SolutionRecord) -> Self {
        Self {
            record,
            ai_enhanced: false,
            original_solution: None,
        }
    }

    fn enhanced(mut record: SolutionRecord, text: String) -> Self {
        let original = std::mem::replace(&mut record.solution, text);
        Self {
            record,
            ai_enhanced: true,
            original_solution: Some(original),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    pub solutions: Vec<EnrichedSolution>,
    pub ai_enhancement_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Last error seen while enhancing, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichmentOutcome {
    /// All records unchanged and flagged as not enhanced
    pub fn unenhanced(records: Vec<SolutionRecord>) -> Self {
        Self {
            solutions: records.into_iter().map(EnrichedSolution::plain).collect(),
            ai_enhancement_used: false,
            model: None,
            error: None,
        }
    }

    pub fn enhanced_count(&self) -> usize {
        self.solutions.iter().filter(|s| s.ai_enhanced).count()
    }
}

/// Enhance every record with `enricher`, falling back per record
pub fn enrich_solutions(
    enricher: &dyn SolutionEnricher,
    records: Vec<SolutionRecord>,
) -> EnrichmentOutcome {
    if records.is_empty() {
        return EnrichmentOutcome::unenhanced(records);
    }

    if !enricher.is_available() {
        tracing::info!(
            "AI enhancement disabled ({} not available), keeping template solutions",
            enricher.name()
        );
        return EnrichmentOutcome::unenhanced(records);
    }

    tracing::info!(
        "Enhancing {} solutions with {}",
        records.len(),
        enricher.name()
    );

    let mut last_error = None;
    let solutions: Vec<EnrichedSolution> = records
        .into_iter()
        .map(|record| match enhance_checked(enricher, &record) {
            Ok(text) => EnrichedSolution::enhanced(record, text),
            Err(e) => {
                tracing::warn!("Keeping template solution for '{}': {e}", record.problem);
                last_error = Some(e.to_string());
                EnrichedSolution::plain(record)
            }
        })
        .collect();

    let outcome = EnrichmentOutcome {
        solutions,
        ai_enhancement_used: true,
        model: Some(enricher.name().to_string()),
        error: last_error,
    };
    tracing::info!(
        "{} of {} solutions enhanced",
        outcome.enhanced_count(),
        outcome.solutions.len()
    );
    outcome
}

fn enhance_checked(
    enricher: &dyn SolutionEnricher,
    record: &SolutionRecord,
) -> Result<String, EnrichError> {
    let text = enricher.enhance(record)?;
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_ENHANCED_LEN {
        return Err(EnrichError::TooShort(trimmed.chars().count()));
    }
    Ok(trimmed.to_string())
}
