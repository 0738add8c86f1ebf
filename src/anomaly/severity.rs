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

//! Severity tiers and per-signal thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity assigned to a run when it closes.
///
/// Ordered `Normal < Warning < Critical < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Normal,
    Warning,
    Critical,
    Fatal,
}

impl Tier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum run counts for each tier above `Normal`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub fatal: usize,
    pub critical: usize,
    pub warning: usize,
}

impl Thresholds {
    pub const fn new(fatal: usize, critical: usize, warning: usize) -> Self {
        Self {
            fatal,
            critical,
            warning,
        }
    }

    /// Highest tier whose threshold `count` reaches, or `prior` when none does
    pub const fn classify(&self, count: usize, prior: Tier) -> Tier {
        if count >= self.fatal {
            Tier::Fatal
        } else if count >= self.critical {
            Tier::Critical
        } else if count >= self.warning {
            Tier::Warning
        } else {
            prior
        }
    }
}
