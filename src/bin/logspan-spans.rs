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
use logspan::anomaly::span::{sample_request_ids, Inspection};
use logspan::anomaly::trace::format_timestamp_ms;
use logspan::anomaly::{SpanAnalyzer, SpanReport};
use logspan::config::Config;
use logspan::core::csv_io;
use std::path::PathBuf;

/// Events shown in the timeline of one inspected request
const TIMELINE_EVENTS: usize = 20;
/// Request ids suggested when the inspected one is unknown
const SAMPLE_IDS: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "logspan-spans")]
#[command(author = "Daniel Freiermuth")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
#[command(about = "Find requests whose span hides unaccounted latency", long_about = None)]
struct Args {
    /// Converted CSV file to analyze
    #[arg(value_name = "CSV")]
    file: PathBuf,

    /// Show the per-service timeline of one request instead
    #[arg(long, value_name = "ID")]
    request: Option<String>,

    /// How many problematic requests to print (overrides the config)
    #[arg(long)]
    limit: Option<usize>,

    /// Also list every request by descending span
    #[arg(long, conflicts_with = "request")]
    all: bool,

    /// Print the full report as JSON
    #[arg(long, conflicts_with = "request")]
    json: bool,

    /// Config file to use instead of the global one
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logspan::logging::init(args.verbose);

    let config = Config::resolve(args.config.as_deref())?;
    let records = csv_io::read_records_from_path(&args.file)
        .with_context(|| format!("cannot read records from {}", args.file.display()))?;
    tracing::info!("Loaded {} records from {}", records.len(), args.file.display());

    if let Some(request_id) = &args.request {
        match SpanAnalyzer::inspect(&records, request_id, &config.service_flow) {
            Some(inspection) => print_inspection(&inspection),
            None => {
                println!("Request {request_id} not found. Some known request ids:");
                for id in sample_request_ids(&records, SAMPLE_IDS) {
                    println!("  {id}");
                }
            }
        }
        return Ok(());
    }

    let report = SpanAnalyzer::new(config.thresholds).analyze(&records);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, args.limit.unwrap_or(config.report_limit), &config);
        if args.all {
            print_all_requests(&report);
        }
    }
    Ok(())
}

fn timestamp(ms: Option<i64>) -> String {
    ms.and_then(format_timestamp_ms).unwrap_or_else(|| "-".to_string())
}

fn millis(ms: Option<i64>) -> String {
    ms.map_or_else(|| "-".to_string(), |ms| format!("{ms} ms"))
}

fn print_report(report: &SpanReport, limit: usize, config: &Config) {
    println!(
        "{} requests, {} problematic (span > max({} ms, {} x summed service time))",
        report.requests.len(),
        report.problematic.len(),
        config.thresholds.min_span_ms,
        config.thresholds.span_factor
    );
    for request in report.problematic_requests().take(limit) {
        println!(
            "  {}  span={}  sum={} ms  busy={} ms  events={}",
            request.request_id,
            millis(request.stats.span_ms),
            request.stats.sum_dur_ms,
            request.stats.busy_ms,
            request.event_count
        );
    }

    if let Some(window) = report.window {
        println!(
            "File window: {} .. {} ({} ms)",
            timestamp(Some(window.start_ms)),
            timestamp(Some(window.end_ms)),
            window.total_ms()
        );
    }
}

fn print_all_requests(report: &SpanReport) {
    println!("All requests by span:");
    for request in report.ranked_requests() {
        println!(
            "  {}  span={}  events={}",
            request.request_id,
            millis(request.stats.span_ms),
            request.event_count
        );
    }
}

fn print_inspection(inspection: &Inspection) {
    println!("Request {}", inspection.request_id);
    for service in &inspection.services {
        println!(
            "  {:<32} {} .. {}  dur={}  events={}  vm={}",
            service.service,
            timestamp(service.min_ms),
            timestamp(service.max_ms),
            millis(service.duration_ms()),
            service.event_count,
            service.vm.as_deref().unwrap_or("-")
        );
    }
    println!(
        "Sum of service durations: {} ms, non-overlapping total: {} ms, span: {}",
        inspection.stats.sum_dur_ms,
        inspection.stats.busy_ms,
        millis(inspection.stats.span_ms)
    );

    println!("First {TIMELINE_EVENTS} events:");
    for event in inspection.events.iter().take(TIMELINE_EVENTS) {
        println!(
            "  {} [{}] {}",
            event.timestamp.as_deref().unwrap_or("-"),
            event.service().unwrap_or("-"),
            event.message
        );
    }
}
