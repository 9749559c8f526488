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

use crate::config::Config;
use crate::core::csv_io;
use crate::parser::patterns::Extractor;
use crate::parser::stateful::StatefulParser;
use crate::parser::{parse_text, ConvertStrategy, LogFormat, ParsedFile};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input directory does not exist: {}", .0.display())]
    NoInputDir(PathBuf),

    #[error("no files with extension '{ext}' in {}", .dir.display())]
    NoMatchingFiles { dir: PathBuf, ext: String },

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: csv::Error },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] fancy_regex::Error),

    #[error("parser panic: {0}")]
    ParserPanic(String),
}

/// Result of converting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Written { format: LogFormat, rows: usize },
    /// Nothing to write; no output file is created
    Empty,
}

/// Per-file results of a directory conversion
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, ConvertError)>,
}

/// Turns log files into CSV tables
#[derive(Debug, Clone, Default)]
pub struct Converter {
    parser: StatefulParser,
    strategy: ConvertStrategy,
}

impl Converter {
    pub const fn new(parser: StatefulParser, strategy: ConvertStrategy) -> Self {
        Self { parser, strategy }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConvertError> {
        let extractor = Extractor::new(&config.service_pattern, &config.machine_pattern)?;
        Ok(Self::new(StatefulParser::new(extractor), config.strategy))
    }

    pub fn convert_text(&self, text: &str) -> ParsedFile {
        parse_text(text, self.strategy, &self.parser)
    }

    /// Convert one file; undecodable bytes are replaced rather than rejected
    pub fn convert_file(&self, src: &Path, dst: &Path) -> Result<FileOutcome, ConvertError> {
        let bytes = std::fs::read(src).map_err(|source| ConvertError::Read {
            path: src.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let parsed = self.convert_text(&text);

        if parsed.table.is_empty() {
            tracing::warn!("No records in {}, skipping", src.display());
            return Ok(FileOutcome::Empty);
        }

        csv_io::write_table_to_path(dst, &parsed.table).map_err(|source| ConvertError::Write {
            path: dst.to_path_buf(),
            source,
        })?;

        tracing::info!(
            "Parsed {} as {} ({} rows) -> {}",
            src.display(),
            parsed.format.as_str(),
            parsed.table.len(),
            dst.display()
        );
        Ok(FileOutcome::Written {
            format: parsed.format,
            rows: parsed.table.len(),
        })
    }

    /// Like [`Self::convert_file`], but a panic while parsing becomes an error
    fn convert_file_isolated(&self, src: &Path, dst: &Path) -> Result<FileOutcome, ConvertError> {
        std::panic::catch_unwind(AssertUnwindSafe(|| self.convert_file(src, dst))).unwrap_or_else(
            |payload| {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ConvertError::ParserPanic(reason))
            },
        )
    }

    /// Convert every matching file in `in_dir` into `out_dir`
    ///
    /// A failing file is logged and recorded in the report; the rest still run.
    pub fn convert_dir(
        &self,
        in_dir: &Path,
        out_dir: &Path,
        extension: &str,
    ) -> Result<BatchReport, ConvertError> {
        let inputs = discover_inputs(in_dir, extension)?;
        std::fs::create_dir_all(out_dir).map_err(|source| ConvertError::OutputDir {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let mut report = BatchReport::default();
        for src in inputs {
            let dst = output_path(out_dir, &src);
            match self.convert_file_isolated(&src, &dst) {
                Ok(FileOutcome::Written { .. }) => report.converted.push(src),
                Ok(FileOutcome::Empty) => report.skipped.push(src),
                Err(e) => {
                    tracing::error!("Failed to convert {}: {e}", src.display());
                    report.failed.push((src, e));
                }
            }
        }
        Ok(report)
    }
}

/// Files in `dir` ending with `extension`, sorted by name
pub fn discover_inputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ConvertError> {
    if !dir.is_dir() {
        return Err(ConvertError::NoInputDir(dir.to_path_buf()));
    }
    let entries = std::fs::read_dir(dir).map_err(|source| ConvertError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(std::ffi::OsStr::to_str)
                .is_some_and(|name| name.ends_with(extension))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(ConvertError::NoMatchingFiles {
            dir: dir.to_path_buf(),
            ext: extension.to_string(),
        });
    }
    Ok(files)
}

/// `<out_dir>/<input stem>.csv`
pub fn output_path(out_dir: &Path, src: &Path) -> PathBuf {
    let mut name = src.file_stem().unwrap_or(src.as_os_str()).to_os_string();
    name.push(".csv");
    out_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_uses_stem() {
        let out = output_path(Path::new("/out"), Path::new("/logs/2025-11-21T10:54.txt"));
        assert_eq!(out, PathBuf::from("/out/2025-11-21T10:54.csv"));

        let dotted = output_path(Path::new("out"), Path::new("app.2025.txt"));
        assert_eq!(dotted, PathBuf::from("out/app.2025.csv"));
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let config = Config {
            service_pattern: "(".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            Converter::from_config(&config),
            Err(ConvertError::Pattern(_))
        ));
    }

    #[test]
    fn test_objects_without_fields_write_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let src = dir.path().join("empty_objects.txt");
        let dst = dir.path().join("empty_objects.csv");
        std::fs::write(&src, "{}\n{}\n").expect("write input");

        let outcome = Converter::default().convert_file(&src, &dst).expect("converts");
        assert_eq!(outcome, FileOutcome::Empty);
        assert!(!dst.exists());
    }

    #[test]
    fn test_undecodable_bytes_are_replaced() {
        let dir = tempfile::tempdir().expect("temp dir");
        let src = dir.path().join("binary.txt");
        let dst = dir.path().join("binary.csv");
        let mut bytes = b"vm1,2025-01-01T10\n".to_vec();
        bytes.extend_from_slice(b"\xff\xfe ,30:00Z x\n,31:00Z mystack_api | ok \xc3\n");
        std::fs::write(&src, bytes).expect("write input");

        let outcome = Converter::default().convert_file(&src, &dst).expect("converts");
        assert!(matches!(outcome, FileOutcome::Written { rows: 2, .. }));

        let records = csv_io::read_records_from_path(&dst).expect("read back");
        assert_eq!(records[0].message, "\u{fffd}\u{fffd} ,30:00Z x");
        assert_eq!(records[1].timestamp.as_deref(), Some("2025-01-01T10:31:00Z"));
        assert_eq!(records[1].message, "ok \u{fffd}");
    }

    #[test]
    fn test_convert_text_default_strategy() {
        let parsed = Converter::default().convert_text("vm1,2025-01-01T10\n,30:00Z rest\n");
        assert_eq!(parsed.format, LogFormat::Stateful);
        assert_eq!(parsed.table.len(), 1);
    }
}
