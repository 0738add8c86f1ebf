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

//! Solution enrichment through a local Ollama server (`/api/generate`).

use crate::config::EnrichmentConfig;
use crate::solution::enrich::{EnrichError, SolutionEnricher};
use crate::solution::SolutionRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Body of `POST /api/generate`
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            top_p: 0.85,
            num_predict: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Enricher backed by an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaEnricher {
    model: String,
    base_url: String,
    timeout: Duration,
    probe_timeout: Duration,
    client: reqwest::blocking::Client,
}

impl OllamaEnricher {
    /// # Errors
    ///
    /// Returns `EnrichError::Unavailable` if the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, EnrichError> {
        // Ollama runs on the local network; never route it through HTTP_PROXY
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| EnrichError::Unavailable(format!("cannot build HTTP client: {e}")))?;

        let base_url = base_url.trim().trim_end_matches('/');
        let model = model.trim();

        Ok(Self {
            model: if model.is_empty() {
                DEFAULT_OLLAMA_MODEL.to_string()
            } else {
                model.to_string()
            },
            base_url: if base_url.is_empty() {
                DEFAULT_OLLAMA_URL.to_string()
            } else {
                base_url.to_string()
            },
            timeout,
            probe_timeout: Duration::from_millis(500),
            client,
        })
    }

    /// # Errors
    ///
    /// Returns `EnrichError::Unavailable` if the HTTP client cannot be built.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, EnrichError> {
        let mut enricher = Self::new(
            &config.api_base,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )?;
        enricher.probe_timeout = Duration::from_millis(config.probe_timeout_ms);
        Ok(enricher)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl SolutionEnricher for OllamaEnricher {
    fn name(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        tracing::debug!("Checking Ollama availability at {url}");

        match self.client.get(&url).timeout(self.probe_timeout).send() {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::info!("Ollama not reachable at {}: {e}", self.base_url);
                false
            }
        }
    }

    fn enhance(&self, record: &SolutionRecord) -> Result<String, EnrichError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = build_request(&self.model, record);
        tracing::debug!(
            "Sending enhancement request for '{}' (timeout {:?})",
            record.problem,
            self.timeout
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    EnrichError::Timeout(self.timeout.as_secs())
                } else {
                    EnrichError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                EnrichError::Timeout(self.timeout.as_secs())
            } else {
                EnrichError::Parse(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(EnrichError::Http {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

/// Prompt asking the model to expand one recommendation
pub fn build_prompt(record: &SolutionRecord) -> String {
    format!(
        "Enhance this log analysis solution:\n\
         Problem: {}\n\
         Basic solution: {}\n\
         Root cause: {}\n\
         Further investigations: {}\n\n\
         Provide a detailed explanation of the proposed solution and the root cause. \
         Also describe specific steps to resolve the issue, drawing on the suggested investigations.",
        record.problem, record.solution, record.root_cause, record.further_investigation
    )
}

pub fn build_request<'a>(model: &'a str, record: &SolutionRecord) -> GenerateRequest<'a> {
    GenerateRequest {
        model,
        prompt: build_prompt(record),
        stream: false,
        options: GenerateOptions::default(),
    }
}

/// Extract the generated text from a `/api/generate` response body
///
/// # Errors
///
/// Returns `EnrichError::Parse` if the body is not a generate response.
pub fn parse_response(body: &str) -> Result<String, EnrichError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| EnrichError::Parse(e.to_string()))?;
    Ok(response.response)
}
