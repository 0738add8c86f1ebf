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

//! File discovery and line search feeding the detector.
//!
//! Files are read in parallel, but the returned lines always follow the
//! file-then-line order the trackers depend on.

use crate::config::SearchConfig;
use crate::parser::LogLine;
use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lines collected by [`search_files`]
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub lines: Vec<LogLine>,
    pub files_searched: usize,
    /// Files that could not be read
    pub files_failed: usize,
    /// Whether `max_matches` cut the output short
    pub truncated: bool,
}

/// Collect the log files below `root`, sorted by path.
///
/// A `root` that is a file is returned as is, whatever its extension.
pub fn find_log_files(root: &Path, config: &SearchConfig) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut files = Vec::new();
    collect_log_files(root, &config.extension, &mut files);
    files.sort();

    if files.len() > config.max_files {
        tracing::warn!(
            "Found {} log files below {}, only the first {} are searched",
            files.len(),
            root.display(),
            config.max_files
        );
        files.truncate(config.max_files);
    }

    files
}

fn collect_log_files(dir: &Path, extension: &str, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list directory {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_log_files(&path, extension, files);
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            files.push(path);
        }
    }
}

/// Search `files` for lines containing `term`, ignoring case.
///
/// An empty term keeps every non-empty line. Unreadable files are logged and
/// skipped.
pub fn search_files(files: &[PathBuf], term: &str, max_matches: Option<usize>) -> SearchOutcome {
    let needle = term.to_lowercase();

    let per_file: Vec<Option<Vec<LogLine>>> = files
        .par_iter()
        .map(|path| match read_lossy(path) {
            Ok(content) => Some(matching_lines(path, &content, &needle)),
            Err(e) => {
                tracing::warn!("Error reading file {}: {e}", path.display());
                None
            }
        })
        .collect();

    let mut outcome = SearchOutcome {
        files_searched: files.len(),
        ..SearchOutcome::default()
    };

    for file_lines in per_file {
        let Some(file_lines) = file_lines else {
            outcome.files_failed += 1;
            continue;
        };
        outcome.lines.extend(file_lines);
    }

    if let Some(max) = max_matches {
        if outcome.lines.len() > max {
            tracing::info!(
                "Keeping the first {max} of {} matching lines",
                outcome.lines.len()
            );
            outcome.lines.truncate(max);
            outcome.truncated = true;
        }
    }

    tracing::debug!(
        "Search for {term:?} matched {} lines in {} files",
        outcome.lines.len(),
        outcome.files_searched - outcome.files_failed
    );
    outcome
}

/// Read a file, replacing invalid UTF-8 sequences
fn read_lossy(path: &Path) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    File::open(path)?.read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn matching_lines(path: &Path, content: &str, needle: &str) -> Vec<LogLine> {
    let source: Arc<Path> = Arc::from(path);

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| needle.is_empty() || line.to_lowercase().contains(needle))
        .map(|(index, line)| LogLine::new(line.trim().to_string(), index + 1, Arc::clone(&source)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_find_log_files_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b/access.log", "x");
        write(dir.path(), "a/access.log", "x");
        write(dir.path(), "a/errors", "x");
        write(dir.path(), "access.LOG", "x");

        let files = find_log_files(dir.path(), &SearchConfig::default());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a/access.log"),
                PathBuf::from("access.LOG"),
                PathBuf::from("b/access.log"),
            ]
        );
    }

    #[test]
    fn test_find_log_files_caps_count() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            write(dir.path(), &format!("access.{i}.log"), "x");
        }
        let config = SearchConfig {
            max_files: 2,
            ..SearchConfig::default()
        };
        assert_eq!(find_log_files(dir.path(), &config).len(), 2);
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "access", "x");
        assert_eq!(find_log_files(&path, &SearchConfig::default()), vec![path]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "1.log", "ABANDON one\nnothing\n  abandon two  \n");
        let second = write(dir.path(), "2.log", "\nAbandon three\n");

        let outcome = search_files(&[first.clone(), second.clone()], "abandon", None);
        let found: Vec<_> = outcome
            .lines
            .iter()
            .map(|l| (l.content.as_str(), l.line_number))
            .collect();
        assert_eq!(found, vec![("ABANDON one", 1), ("abandon two", 3), ("Abandon three", 2)]);
        assert_eq!(&*outcome.lines[0].source, first.as_path());
        assert_eq!(&*outcome.lines[2].source, second.as_path());
        assert_eq!(outcome.files_searched, 2);
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_empty_term_keeps_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "1.log", "a\n\nb\nc\n");
        let outcome = search_files(&[path], "", None);
        assert_eq!(outcome.lines.len(), 4);
        assert_eq!(outcome.lines[1].content, "");
        assert_eq!(outcome.lines[1].line_number, 2);
    }

    #[test]
    fn test_max_matches_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "1.log", "a\nb\nc\n");
        let outcome = search_files(&[path], "", Some(2));
        assert_eq!(outcome.lines.len(), 2);
        assert!(outcome.truncated);
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "1.log", "connection from 10.0.0.1\n");
        let missing = dir.path().join("missing.log");

        let outcome = search_files(&[missing, good], "connection", None);
        assert_eq!(outcome.lines.len(), 1);
        assert_eq!(outcome.files_failed, 1);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.log");
        fs::write(&path, b"conn=1 \xff\xfe connection from x\n").unwrap();
        let outcome = search_files(&[path], "connection", None);
        assert_eq!(outcome.lines.len(), 1);
        assert!(outcome.lines[0].content.contains('\u{FFFD}'));
    }
}
