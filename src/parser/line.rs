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

use std::path::Path;
use std::sync::Arc;

/// A single line produced by the line search.
///
/// Lines are immutable once read. The source path is shared between all
/// lines of the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub content: String,
    /// 1-based line number within `source`
    pub line_number: usize,
    pub source: Arc<Path>,
}

impl LogLine {
    pub fn new(content: String, line_number: usize, source: Arc<Path>) -> Self {
        Self {
            content,
            line_number,
            source,
        }
    }

    /// Build a line that does not originate from a file (stdin, tests)
    pub fn detached(content: impl Into<String>, line_number: usize) -> Self {
        Self::new(content.into(), line_number, Arc::from(Path::new("-")))
    }
}
