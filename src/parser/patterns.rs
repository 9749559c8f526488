// LogSpan - GPL-3.0-or-later
// This file is part of LogSpan.
//
// Copyright (C) 2026 Daniel Freiermuth
//
// LogSpan is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// LogSpan is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with LogSpan.  If not, see <https://www.gnu.org/licenses/>.

//! Named pattern matchers shared by every branch of the stateful line parser.
//!
//! Timestamp shapes are fixed and compiled once per process. The service and
//! machine identifier shapes depend on the deployment and are compiled into an
//! [`Extractor`] from configuration.

use fancy_regex::Regex;
use std::sync::LazyLock;

/// Default service pattern: stack tag followed by word characters/hyphens
pub const DEFAULT_SERVICE_PATTERN: &str = r"mystack_[\w-]+";

/// Default machine identifier pattern (without the leading `@`)
pub const DEFAULT_MACHINE_PATTERN: &str = r"MSVirtualMachine-\d+";

// Matches: MSVirtualMachine-3,2025-11-21T10
static PREFIX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<vm>[^,]+),(?P<prefix>\d{4}-\d{2}-\d{2}T\d{2})").expect("valid regex literal")
});

// Matches: ,54:40.479Z <rest>
static FRAGMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^,?\s*(?P<frag>\d{2}:\d{2}(?:\.\d+)?Z)\s+(?P<rest>.*)$")
        .expect("valid regex literal")
});

static EMBEDDED_ISO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z").expect("valid regex literal")
});

// Either HH:MM:SS[.f]Z or MM:SS[.f]Z anywhere in the line
static BARE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:(?P<hour>\d{2}):)?(?P<frag>\d{2}:\d{2}(?:\.\d+)?Z)")
        .expect("valid regex literal")
});

static REQUEST_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"RequestId:\s*(?P<id>[0-9a-fA-F-]{36})").expect("valid regex literal")
});

/// A prefix line: machine identifier plus `YYYY-MM-DDTHH`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixLine {
    pub vm: String,
    pub date_hour: String,
}

/// Recognize a prefix line at the start of `line`
pub fn prefix_line(line: &str) -> Option<PrefixLine> {
    let caps = PREFIX_LINE.captures(line).ok()??;
    Some(PrefixLine {
        vm: caps.name("vm")?.as_str().to_string(),
        date_hour: caps.name("prefix")?.as_str().to_string(),
    })
}

/// Recognize a fragment line, returning the `MM:SS[.f]Z` fragment and the remainder
pub fn fragment_line(line: &str) -> Option<(&str, &str)> {
    let caps = FRAGMENT_LINE.captures(line).ok()??;
    let frag = caps.name("frag")?;
    let rest = caps.name("rest")?;
    Some((&line[frag.start()..frag.end()], &line[rest.start()..rest.end()]))
}

/// Locate the first full ISO-8601 UTC timestamp in `line`
///
/// Returns the timestamp text and the byte offset just past it.
pub fn embedded_iso(line: &str) -> Option<(&str, usize)> {
    let found = EMBEDDED_ISO.find(line).ok()??;
    Some((&line[found.start()..found.end()], found.end()))
}

/// A bare time-of-day fragment found somewhere in a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFragment<'a> {
    pub hour: Option<&'a str>,
    pub minute_second: &'a str,
}

impl TimeFragment<'_> {
    /// Combine with a `YYYY-MM-DDTHH` prefix into a full timestamp
    ///
    /// A fragment carrying its own hour only borrows the date from the prefix.
    pub fn resolve(&self, date_hour: &str) -> String {
        match self.hour {
            Some(hour) => {
                let date = date_hour.split('T').next().unwrap_or(date_hour);
                format!("{date}T{hour}:{}", self.minute_second)
            }
            None => join_fragment(date_hour, self.minute_second),
        }
    }
}

/// Find the first bare time fragment in `line`
pub fn bare_time(line: &str) -> Option<TimeFragment<'_>> {
    let caps = BARE_TIME.captures(line).ok()??;
    let hour = caps.name("hour").map(|m| &line[m.start()..m.end()]);
    let frag = caps.name("frag")?;
    Some(TimeFragment {
        hour,
        minute_second: &line[frag.start()..frag.end()],
    })
}

/// `2025-01-01T10` + `30:00Z` -> `2025-01-01T10:30:00Z`
pub fn join_fragment(date_hour: &str, fragment: &str) -> String {
    format!("{date_hour}:{fragment}")
}

/// 36-character request identifier following `RequestId:`
pub fn request_id(text: &str) -> Option<String> {
    let caps = REQUEST_ID.captures(text).ok()??;
    caps.name("id").map(|m| m.as_str().to_string())
}

/// Message body: text after the last `|`, trimmed
pub fn message_body(text: &str) -> String {
    text.rsplit('|').next().unwrap_or(text).trim().to_string()
}

/// Fields pulled from the interesting part of a line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub service: Option<String>,
    pub vm: Option<String>,
    pub request_id: Option<String>,
}

/// Deployment-specific matchers for service names and `@machine` tags
#[derive(Debug, Clone)]
pub struct Extractor {
    service: Regex,
    machine: Regex,
}

impl Extractor {
    /// Compile the service and machine patterns
    ///
    /// `machine_pattern` describes the identifier only; the leading `@` is implied.
    pub fn new(service_pattern: &str, machine_pattern: &str) -> Result<Self, fancy_regex::Error> {
        Ok(Self {
            service: Regex::new(service_pattern)?,
            machine: Regex::new(&format!("@(?P<vm>{machine_pattern})"))?,
        })
    }

    pub fn service(&self, text: &str) -> Option<String> {
        self.service
            .find(text)
            .ok()
            .flatten()
            .map(|m| m.as_str().to_string())
    }

    pub fn machine(&self, text: &str) -> Option<String> {
        let caps = self.machine.captures(text).ok()??;
        caps.name("vm").map(|m| m.as_str().to_string())
    }

    pub fn extract(&self, text: &str) -> Extracted {
        Extracted {
            service: self.service(text),
            vm: self.machine(text),
            request_id: request_id(text),
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_PATTERN, DEFAULT_MACHINE_PATTERN).expect("valid regex literal")
    }
}
