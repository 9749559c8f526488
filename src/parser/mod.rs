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

pub mod classify;
pub mod patterns;
pub mod record;
pub mod stateful;

use crate::core::normalize::FieldMap;
use classify::Classification;
use serde::{Deserialize, Serialize};
use stateful::StatefulParser;

pub use record::Record;

/// How a file's lines are turned into rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConvertStrategy {
    /// JSON-lines first, then the stateful parser if the file carries
    /// prefix lines or ISO timestamps, otherwise the format classifier
    #[default]
    Auto,
    /// Always the prefix/fragment-aware line parser
    Stateful,
    /// Always the whole-file format classifier
    Classify,
}

/// Detected log format for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Operational log parsed line by line with carried prefix state
    Stateful,
    JsonLines,
    KeyValue,
    Tabular,
    Opaque,
}

impl LogFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stateful => "stateful",
            Self::JsonLines => "json_lines",
            Self::KeyValue => "key_value",
            Self::Tabular => "tabular",
            Self::Opaque => "opaque",
        }
    }
}

/// Rows ready to be written
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    /// Field maps; the header is their column union
    Fields(Vec<FieldMap>),
    /// Already-delimited lines copied as-is, without a header
    Rows(Vec<String>),
}

impl Table {
    pub fn len(&self) -> usize {
        match self {
            Self::Fields(rows) => rows.len(),
            Self::Rows(rows) => rows.len(),
        }
    }

    /// No rows, or only field rows without any field, so no column to write
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Fields(rows) => rows.iter().all(FieldMap::is_empty),
            Self::Rows(rows) => rows.is_empty(),
        }
    }
}

/// A file's content after parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub format: LogFormat,
    pub table: Table,
}

impl From<Classification> for ParsedFile {
    fn from(classification: Classification) -> Self {
        let (format, table) = match classification {
            Classification::JsonLines(rows) => (LogFormat::JsonLines, Table::Fields(rows)),
            Classification::KeyValue(rows) => (LogFormat::KeyValue, Table::Fields(rows)),
            Classification::Tabular(rows) => (LogFormat::Tabular, Table::Rows(rows)),
            Classification::Opaque(rows) => (LogFormat::Opaque, Table::Fields(rows)),
        };
        Self { format, table }
    }
}

/// True when some line carries a prefix or a full ISO timestamp
pub fn has_operational_shape(text: &str) -> bool {
    text.lines()
        .any(|line| patterns::prefix_line(line).is_some() || patterns::embedded_iso(line).is_some())
}

/// Parse a whole file's text with the given strategy
pub fn parse_text(text: &str, strategy: ConvertStrategy, parser: &StatefulParser) -> ParsedFile {
    let stateful = || {
        let records = parser.parse_lines(text.lines());
        ParsedFile {
            format: LogFormat::Stateful,
            table: Table::Fields(records.iter().map(Record::to_fields).collect()),
        }
    };

    match strategy {
        ConvertStrategy::Stateful => stateful(),
        ConvertStrategy::Classify => classify::classify(text.lines()).into(),
        ConvertStrategy::Auto => {
            let classification = classify::classify(text.lines());
            if matches!(classification, Classification::JsonLines(_)) {
                tracing::debug!("every line is a JSON object, using JSON-lines");
                classification.into()
            } else if has_operational_shape(text) {
                tracing::debug!("found prefix lines or ISO timestamps, using stateful parser");
                stateful()
            } else {
                classification.into()
            }
        }
    }
}
