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

use super::patterns::{self, Extractor};
use super::record::Record;

/// Context carried from line to line within one file
///
/// Updated by prefix lines, read by the lines that follow until the next prefix
/// line overwrites it. Never crosses a file boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseState {
    pub current_vm: Option<String>,
    pub current_date_hour_prefix: Option<String>,
}

/// Which rule recognized a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Prefix,
    Fragment,
    EmbeddedTimestamp,
    Fallback,
}

/// Parser for logs that interleave `vm,date-hour` prefix lines with
/// `MM:SS.fffZ` fragment lines
#[derive(Debug, Clone, Default)]
pub struct StatefulParser {
    extractor: Extractor,
}

impl StatefulParser {
    pub const fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    /// Advance over one line
    ///
    /// Prefix and blank lines yield no record; every other line yields exactly one.
    pub fn step(&self, state: ParseState, line: &str) -> (ParseState, Option<Record>) {
        let (state, _, record) = self.step_with_kind(state, line);
        (state, record)
    }

    pub fn step_with_kind(
        &self,
        state: ParseState,
        line: &str,
    ) -> (ParseState, LineKind, Option<Record>) {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return (state, LineKind::Blank, None);
        }

        if let Some(prefix) = patterns::prefix_line(line) {
            let next = ParseState {
                current_vm: Some(prefix.vm),
                current_date_hour_prefix: Some(prefix.date_hour),
            };
            return (next, LineKind::Prefix, None);
        }

        let (kind, record) = self.record_for(&state, line);
        (state, kind, Some(record))
    }

    /// Parse a whole file's lines, starting from a fresh state
    pub fn parse_lines<'a, I>(&self, lines: I) -> Vec<Record>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (_, records) = lines.into_iter().fold(
            (ParseState::default(), Vec::new()),
            |(state, mut records), line| {
                let (state, record) = self.step(state, line);
                records.extend(record);
                (state, records)
            },
        );
        records
    }

    fn record_for(&self, state: &ParseState, line: &str) -> (LineKind, Record) {
        let prefix = state.current_date_hour_prefix.as_deref();

        if let Some(prefix) = prefix {
            if let Some((fragment, rest)) = patterns::fragment_line(line) {
                let timestamp = patterns::join_fragment(prefix, fragment);
                return (LineKind::Fragment, self.build(state, Some(timestamp), rest));
            }
        }

        if let Some((iso, end)) = patterns::embedded_iso(line) {
            let rest = line[end..].trim();
            return (
                LineKind::EmbeddedTimestamp,
                self.build(state, Some(iso.to_string()), rest),
            );
        }

        let timestamp = prefix.and_then(|prefix| {
            patterns::bare_time(line).map(|fragment| fragment.resolve(prefix))
        });
        (LineKind::Fallback, self.build(state, timestamp, line))
    }

    fn build(&self, state: &ParseState, timestamp: Option<String>, text: &str) -> Record {
        let found = self.extractor.extract(text);
        Record {
            vm: found.vm.or_else(|| state.current_vm.clone()),
            timestamp,
            service: found.service,
            message: patterns::message_body(text),
            request_id: found.request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQ: &str = "b69c7c19-8808-411c-813b-deaaa6b55295";

    fn parser() -> StatefulParser {
        StatefulParser::default()
    }

    #[test]
    fn test_prefix_then_fragment_reconstructs_timestamp() {
        let records = parser().parse_lines(["vm1,2025-01-01T10", ",30:00Z rest"]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp.as_deref(), Some("2025-01-01T10:30:00Z"));
        assert_eq!(records[0].vm.as_deref(), Some("vm1"));
        assert_eq!(records[0].message, "rest");
    }

    #[test]
    fn test_fragment_extracts_fields() {
        let line = format!(
            ",54:40.479Z mystack_get-data.1.x@MSVirtualMachine-7 | START RequestId: {REQ} | fetching"
        );
        let records = parser().parse_lines(["MSVirtualMachine-1,2025-11-21T10", line.as_str()]);
        let record = &records[0];
        assert_eq!(record.timestamp.as_deref(), Some("2025-11-21T10:54:40.479Z"));
        assert_eq!(record.service.as_deref(), Some("mystack_get-data"));
        // `@machine` in the line overrides the carried one
        assert_eq!(record.vm.as_deref(), Some("MSVirtualMachine-7"));
        assert_eq!(record.request_id.as_deref(), Some(REQ));
        assert_eq!(record.message, "fetching");
    }

    #[test]
    fn test_fragment_without_prefix_falls_back() {
        let (state, kind, record) = parser().step_with_kind(ParseState::default(), ",30:00Z rest");
        assert_eq!(kind, LineKind::Fallback);
        assert_eq!(state, ParseState::default());
        let record = record.expect("fallback record");
        assert_eq!(record.timestamp, None);
        assert_eq!(record.message, ",30:00Z rest");
    }

    #[test]
    fn test_embedded_iso_timestamp() {
        let line = format!("2025-11-21T10:54:41.100Z mystack_mongo | RequestId: {REQ} | done");
        let (_, kind, record) = parser().step_with_kind(ParseState::default(), &line);
        assert_eq!(kind, LineKind::EmbeddedTimestamp);
        let record = record.expect("record");
        assert_eq!(record.timestamp.as_deref(), Some("2025-11-21T10:54:41.100Z"));
        assert_eq!(record.service.as_deref(), Some("mystack_mongo"));
        assert_eq!(record.request_id.as_deref(), Some(REQ));
        assert_eq!(record.vm, None);
        assert_eq!(record.message, "done");
    }

    #[test]
    fn test_embedded_iso_uses_carried_vm() {
        let records = parser().parse_lines([
            "vm9,2025-11-21T10",
            "prefix text 2025-11-21T11:00:00Z body",
        ]);
        assert_eq!(records[0].vm.as_deref(), Some("vm9"));
        assert_eq!(records[0].timestamp.as_deref(), Some("2025-11-21T11:00:00Z"));
        assert_eq!(records[0].message, "body");
    }

    #[test]
    fn test_fallback_with_bare_time() {
        let records = parser().parse_lines([
            "vm1,2025-01-01T10",
            "note 12:15:30.250Z mystack_api | retry",
            "note 15:30Z | later",
        ]);
        assert_eq!(records[0].timestamp.as_deref(), Some("2025-01-01T12:15:30.250Z"));
        assert_eq!(records[0].service.as_deref(), Some("mystack_api"));
        assert_eq!(records[0].message, "retry");
        assert_eq!(records[1].timestamp.as_deref(), Some("2025-01-01T10:15:30Z"));
    }

    #[test]
    fn test_fallback_opaque_line_is_kept_whole() {
        let records = parser().parse_lines(["  just some text  "]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "just some text");
        assert_eq!(records[0].timestamp, None);
        assert_eq!(records[0].service, None);
    }

    #[test]
    fn test_prefix_state_persists_until_overwritten() {
        let records = parser().parse_lines([
            "vmA,2025-01-01T10",
            ",00:01Z one",
            ",00:02Z two",
            "vmB,2025-01-01T11",
            ",00:03Z three",
        ]);
        let stamps: Vec<_> = records.iter().map(|r| r.timestamp.as_deref()).collect();
        assert_eq!(
            stamps,
            [
                Some("2025-01-01T10:00:01Z"),
                Some("2025-01-01T10:00:02Z"),
                Some("2025-01-01T11:00:03Z"),
            ]
        );
        let vms: Vec<_> = records.iter().map(|r| r.vm.as_deref()).collect();
        assert_eq!(vms, [Some("vmA"), Some("vmA"), Some("vmB")]);
    }

    #[test]
    fn test_totality_one_record_per_non_prefix_line() {
        let lines = [
            "vm1,2025-01-01T10",
            ",30:00Z a",
            "",
            "   ",
            "{\"json\": true}",
            "key=value",
            "|||",
            "2025-01-01T10:00:00Z",
            "\u{fffd}\u{fffd} broken bytes",
        ];
        let parser = parser();
        let mut state = ParseState::default();
        let mut records = 0;
        for line in lines {
            let (next, kind, record) = parser.step_with_kind(state.clone(), line);
            match kind {
                LineKind::Blank => {
                    assert!(record.is_none());
                    assert_eq!(next, state);
                }
                LineKind::Prefix => {
                    assert!(record.is_none());
                    assert_ne!(next, state);
                }
                LineKind::Fragment | LineKind::EmbeddedTimestamp | LineKind::Fallback => {
                    assert!(record.is_some());
                    records += 1;
                }
            }
            state = next;
        }
        assert_eq!(records, 6);
    }

    #[test]
    fn test_crlf_line_endings() {
        let records = parser().parse_lines(["vm1,2025-01-01T10\r", ",30:00Z rest\r"]);
        assert_eq!(records[0].timestamp.as_deref(), Some("2025-01-01T10:30:00Z"));
        assert_eq!(records[0].message, "rest");
    }
}
