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

//! Whole-file format classification for logs without the prefix/fragment shape.
//!
//! Strategies are tried in strict priority order and the first one that accepts
//! every non-blank line wins. A single disagreeing line disqualifies a strategy
//! for the whole file; the opaque fallback always accepts.

use crate::core::normalize::{flatten, FieldMap};
use fancy_regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// key=value, key: value, key="quoted value"
static KV_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<key>\w[\w\-./]*)\s*[=:]\s*(?P<value>"(?:[^"\\]|\\.)*"|\S*)"#)
        .expect("valid regex literal")
});

/// Column name used by the opaque fallback
pub const RAW_COLUMN: &str = "raw";

/// Outcome of classifying a file, carrying the extracted rows
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Every line is a JSON object; rows are flattened objects
    JsonLines(Vec<FieldMap>),
    /// Every line has at least one key/value token
    KeyValue(Vec<FieldMap>),
    /// Every line splits into the same number (> 1) of comma-separated fields;
    /// lines are reused verbatim
    Tabular(Vec<String>),
    /// Anything else; one `raw` field per line
    Opaque(Vec<FieldMap>),
}

type Strategy = fn(&[&str]) -> Option<Classification>;

const STRATEGIES: [Strategy; 3] = [try_json_lines, try_key_value, try_tabular];

fn try_json_lines(lines: &[&str]) -> Option<Classification> {
    json_lines(lines).map(Classification::JsonLines)
}

fn try_key_value(lines: &[&str]) -> Option<Classification> {
    key_value_lines(lines).map(Classification::KeyValue)
}

fn try_tabular(lines: &[&str]) -> Option<Classification> {
    tabular_lines(lines).map(Classification::Tabular)
}

/// Classify a file's lines
pub fn classify<'a, I>(lines: I) -> Classification
where
    I: IntoIterator<Item = &'a str>,
{
    // Blank lines are dropped; the rest keep their original text
    let lines: Vec<&str> = lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Classification::Opaque(Vec::new());
    }

    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(&lines))
        .unwrap_or_else(|| Classification::Opaque(opaque_lines(&lines)))
}

/// Parse every line as a JSON object, or give up
pub fn json_lines(lines: &[&str]) -> Option<Vec<FieldMap>> {
    lines
        .iter()
        .map(|line| match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(object)) => Some(flatten(&object)),
            Ok(_) | Err(_) => None,
        })
        .collect()
}

/// Key/value tokens of one line; later duplicates overwrite earlier ones
pub fn key_value_pairs(line: &str) -> FieldMap {
    let mut pairs = FieldMap::new();
    for caps in KV_TOKEN.captures_iter(line).flatten() {
        let (Some(key), Some(value)) = (caps.name("key"), caps.name("value")) else {
            continue;
        };
        let value = value.as_str();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        pairs.insert(key.as_str().to_string(), Value::String(value.to_string()));
    }
    pairs
}

/// Extract key/value pairs from every line, or give up on the first line without any
pub fn key_value_lines(lines: &[&str]) -> Option<Vec<FieldMap>> {
    lines
        .iter()
        .map(|line| Some(key_value_pairs(line)).filter(|pairs| !pairs.is_empty()))
        .collect()
}

/// Number of comma-separated fields, honoring quoting
pub fn field_count(line: &str) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.len(),
        Ok(false) | Err(_) => 0,
    }
}

/// Accept lines that all share one field count greater than one
pub fn tabular_lines(lines: &[&str]) -> Option<Vec<String>> {
    let first = field_count(lines.first()?.trim());
    let consistent = first > 1
        && lines
            .iter()
            .skip(1)
            .all(|line| field_count(line.trim()) == first);
    consistent.then(|| lines.iter().map(|line| (*line).to_string()).collect())
}

fn opaque_lines(lines: &[&str]) -> Vec<FieldMap> {
    lines
        .iter()
        .map(|line| {
            let mut row = FieldMap::with_capacity(1);
            row.insert(RAW_COLUMN.to_string(), Value::String((*line).to_string()));
            row
        })
        .collect()
}
