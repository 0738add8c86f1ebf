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

use anyhow::{bail, Context};
use clap::Parser;
use ldapwatch::config::AppConfig;
use ldapwatch::core::{find_log_files, search_files};
use ldapwatch::report::{render_text, AnalysisReport, ReportMetadata};
use ldapwatch::solution::enrich::{DisabledEnricher, SolutionEnricher};
use ldapwatch::solution::ollama::OllamaEnricher;
use ldapwatch::{analyze, DetectionScope, DetectorOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ldapwatch")]
#[command(version)]
#[command(about = "Detect abandon storms and unresponsive periods in directory server access logs", long_about = None)]
struct Args {
    /// Log file or directory containing log files
    #[arg(long, value_name = "PATH", default_value = "./data/logs")]
    logs: PathBuf,

    /// Only analyse lines containing this text (case-insensitive); empty keeps every line
    #[arg(long, default_value = "")]
    term: String,

    /// Write the full report as JSON to this file
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Analyse every file with its own trackers instead of one merged stream
    #[arg(long)]
    per_file: bool,

    /// Close runs still open at the end of the input
    #[arg(long)]
    flush_open_runs: bool,

    /// Enhance solutions with a local Ollama model
    #[arg(long)]
    enrich: bool,

    /// Ollama model used for enhancement
    #[arg(long, value_name = "MODEL")]
    ollama_model: Option<String>,

    /// Base URL of the Ollama API
    #[arg(long, value_name = "URL")]
    ollama_url: Option<String>,

    /// Read configuration from this file instead of the user config directory
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

fn init_logging(verbose: bool) {
    // RUST_LOG wins over --verbose
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };

    let enrichment = &mut config.enrichment;
    enrichment.enabled |= args.enrich;
    enrichment.apply_env(|key| std::env::var(key).ok());
    if let Some(model) = &args.ollama_model {
        enrichment.model.clone_from(model);
    }
    if let Some(url) = &args.ollama_url {
        enrichment.api_base.clone_from(url);
    }

    Ok(config)
}

fn build_enricher(config: &AppConfig) -> Box<dyn SolutionEnricher> {
    if !config.enrichment.enabled {
        return Box::new(DisabledEnricher);
    }

    match OllamaEnricher::from_config(&config.enrichment) {
        Ok(enricher) => Box::new(enricher),
        Err(e) => {
            tracing::warn!("AI enhancement unavailable: {e}");
            Box::new(DisabledEnricher)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    tracing::info!("LdapWatch starting up (version {})", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        let path = args
            .config
            .clone()
            .or_else(AppConfig::config_path)
            .context("Could not determine config directory")?;
        AppConfig::default().save_to(&path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config = load_config(&args)?;

    if !args.logs.exists() {
        bail!("Log path '{}' does not exist", args.logs.display());
    }

    tracing::info!("Searching in {} for term {:?}", args.logs.display(), args.term);
    let files = find_log_files(&args.logs, &config.search);
    tracing::info!("Found {} log files", files.len());
    for file in files.iter().take(10) {
        tracing::debug!("  - {}", file.display());
    }

    let search = search_files(&files, &args.term, config.search.max_matches);
    tracing::info!("Found {} matching lines", search.lines.len());

    let options = DetectorOptions {
        flush_open_runs: args.flush_open_runs,
        scope: if args.per_file {
            DetectionScope::PerFile
        } else {
            DetectionScope::Merged
        },
    };

    let enricher = build_enricher(&config);
    let analysis = analyze(&search.lines, options, enricher.as_ref());

    let metadata = ReportMetadata {
        logs_directory: args.logs.display().to_string(),
        search_term: args.term.clone(),
        timestamp: chrono::Local::now().to_rfc3339(),
        total_files_searched: files.len(),
        total_matches: search.lines.len(),
        skipped_lines: analysis.detection.stats.skipped_lines,
        scope: options.scope,
    };
    let report = AnalysisReport::new(analysis.detection.results, analysis.enrichment, metadata);

    print!("{}", render_text(&report));

    if let Some(output) = &args.output {
        report.write_json(output)?;
    }

    Ok(())
}
