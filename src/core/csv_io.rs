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

use crate::core::normalize::{column_union, render_row};
use crate::parser::{Record, Table};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Write a parsed table as comma-separated text
///
/// Field tables get a header row made of the column union; verbatim rows are
/// copied line by line.
pub fn write_table<W: Write>(mut writer: W, table: &Table) -> Result<(), csv::Error> {
    match table {
        Table::Fields(records) => {
            let columns = column_union(records);
            let mut csv_writer = csv::Writer::from_writer(writer);
            csv_writer.write_record(&columns)?;
            for record in records {
                csv_writer.write_record(render_row(record, &columns))?;
            }
            csv_writer.flush()?;
        }
        Table::Rows(rows) => {
            for row in rows {
                writeln!(writer, "{row}")?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

pub fn write_table_to_path(path: &Path, table: &Table) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    write_table(std::io::BufWriter::new(file), table)
}

/// Read a converted record table back
///
/// Columns are matched by header name; missing ones stay empty and unknown ones
/// are ignored, so tables from any strategy can be fed to trace analysis.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    csv_reader.deserialize().collect()
}

pub fn read_records_from_path(path: &Path) -> Result<Vec<Record>, csv::Error> {
    read_records(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::FieldMap;
    use serde_json::json;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn written(table: &Table) -> String {
        let mut out = Vec::new();
        write_table(&mut out, table).expect("write to memory");
        String::from_utf8(out).expect("utf-8 output")
    }

    #[test]
    fn test_header_is_column_union_and_missing_cells_are_empty() {
        let table = Table::Fields(vec![
            fields(&[("a", json!(1)), ("b", json!(2))]),
            fields(&[("b", json!(3)), ("c", json!(4))]),
        ]);
        assert_eq!(written(&table), "a,b,c\n1,2,\n,3,4\n");
    }

    #[test]
    fn test_cells_are_quoted_as_needed() {
        let table = Table::Fields(vec![fields(&[
            ("message", json!("hello, \"world\"")),
            ("n", serde_json::Value::Null),
        ])]);
        assert_eq!(written(&table), "message,n\n\"hello, \"\"world\"\"\",\n");
    }

    #[test]
    fn test_rows_are_copied_verbatim() {
        let table = Table::Rows(vec!["1,\"x, y\",z".to_string(), "2,w,v".to_string()]);
        assert_eq!(written(&table), "1,\"x, y\",z\n2,w,v\n");
    }

    #[test]
    fn test_records_round_trip_through_header_names() {
        let record = Record {
            vm: Some("vm1".to_string()),
            timestamp: Some("2025-01-01T10:30:00Z".to_string()),
            service: None,
            message: "a, b".to_string(),
            request_id: Some("00000000-0000-0000-0000-000000000001".to_string()),
        };
        let table = Table::Fields(vec![record.to_fields()]);
        let text = written(&table);

        let records = read_records(text.as_bytes()).expect("read back");
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_read_tolerates_missing_and_extra_columns() {
        let text = "requestId,extra,message\nabc,zzz,hi\n";
        let records = read_records(text.as_bytes()).expect("read");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request_id.as_deref(), Some("abc"));
        assert_eq!(records[0].message, "hi");
        assert_eq!(records[0].timestamp, None);
    }
}
