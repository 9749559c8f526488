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

use crate::core::normalize::FieldMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column order of a record table
pub const RECORD_COLUMNS: [&str; 5] = ["vm", "timestamp", "service", "message", "requestId"];

/// One normalized log event
///
/// Every non-blank, non-prefix input line produces exactly one `Record`. Fields
/// the line did not carry stay `None`; `message` falls back to the line itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub vm: Option<String>,
    /// Ideally ISO-8601 with a trailing `Z`; kept verbatim even when unparseable
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "requestId")]
    pub request_id: Option<String>,
}

impl Record {
    /// Request id, treating an empty string as absent
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Service name, treating an empty string as absent
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref().filter(|s| !s.is_empty())
    }

    pub fn to_fields(&self) -> FieldMap {
        let opt = |v: &Option<String>| v.clone().map_or(Value::Null, Value::String);
        let mut fields = FieldMap::with_capacity(RECORD_COLUMNS.len());
        fields.insert("vm".to_string(), opt(&self.vm));
        fields.insert("timestamp".to_string(), opt(&self.timestamp));
        fields.insert("service".to_string(), opt(&self.service));
        fields.insert("message".to_string(), Value::String(self.message.clone()));
        fields.insert("requestId".to_string(), opt(&self.request_id));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fields_keeps_column_order() {
        let record = Record {
            vm: Some("vm1".to_string()),
            message: "hello".to_string(),
            ..Record::default()
        };
        let fields = record.to_fields();
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, RECORD_COLUMNS);
        assert_eq!(fields["vm"], Value::String("vm1".to_string()));
        assert_eq!(fields["timestamp"], Value::Null);
    }

    #[test]
    fn test_empty_ids_are_absent() {
        let record = Record {
            request_id: Some(String::new()),
            service: Some(String::new()),
            ..Record::default()
        };
        assert_eq!(record.request_id(), None);
        assert_eq!(record.service(), None);
    }
}
