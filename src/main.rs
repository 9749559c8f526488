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

use anyhow::Context;
use clap::Parser;
use logspan::config::Config;
use logspan::core::{ConvertError, Converter};
use logspan::parser::ConvertStrategy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logspan")]
#[command(author = "Daniel Freiermuth")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
#[command(about = "Convert raw log files into normalized CSV tables", long_about = None)]
struct Args {
    /// Directory containing the log files
    #[arg(long = "in", value_name = "DIR", default_value = "logs")]
    input: PathBuf,

    /// Directory the CSV files are written to
    #[arg(long = "out", value_name = "DIR", default_value = "converted")]
    output: PathBuf,

    /// Only convert files ending with this suffix (overrides the config)
    #[arg(long = "ext", value_name = "SUFFIX")]
    extension: Option<String>,

    /// How lines are turned into rows (overrides the config)
    #[arg(long, value_enum)]
    strategy: Option<ConvertStrategy>,

    /// Config file to use instead of the global one
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log parser decisions
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logspan::logging::init(args.verbose);
    tracing::info!("LogSpan starting up (version {})", env!("CARGO_PKG_VERSION"));

    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(extension) = args.extension {
        config.input_extension = extension;
    }

    let converter = Converter::from_config(&config).context("invalid pattern in config")?;
    let report = match converter.convert_dir(&args.input, &args.output, &config.input_extension) {
        Ok(report) => report,
        Err(e @ (ConvertError::NoInputDir(_) | ConvertError::NoMatchingFiles { .. })) => {
            tracing::warn!("{e}; nothing to convert");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "Converted {} file(s), skipped {} empty, {} failed -> {}",
        report.converted.len(),
        report.skipped.len(),
        report.failed.len(),
        args.output.display()
    );
    for (path, error) in &report.failed {
        println!("  failed: {}: {error}", path.display());
    }
    Ok(())
}
