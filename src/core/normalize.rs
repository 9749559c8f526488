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

//! Record normalization: flattening nested objects and computing the column header.

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

/// Flat field mapping for one output row, in insertion order
pub type FieldMap = IndexMap<String, Value>;

const KEY_SEPARATOR: char = '.';

/// Flatten a JSON object into dotted-path scalar fields
///
/// Only objects are descended into. Arrays and scalars are kept as-is under
/// their joined key.
pub fn flatten(object: &Map<String, Value>) -> FieldMap {
    let mut out = FieldMap::with_capacity(object.len());
    flatten_into(&mut out, None, object);
    out
}

fn flatten_into(out: &mut FieldMap, parent: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let joined = match parent {
            Some(parent) => format!("{parent}{KEY_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(child) => flatten_into(out, Some(&joined), child),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
                out.insert(joined, value.clone());
            }
        }
    }
}

/// Distinct field names across all records, in first-seen order
pub fn column_union(records: &[FieldMap]) -> Vec<String> {
    let mut columns: IndexSet<&str> = IndexSet::new();
    for record in records {
        columns.extend(record.keys().map(String::as_str));
    }
    columns.into_iter().map(str::to_string).collect()
}

/// Render a field value for a delimited cell; absent and null become empty
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One row of cells aligned to `columns`
pub fn render_row(record: &FieldMap, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|column| render_value(record.get(column)))
        .collect()
}
