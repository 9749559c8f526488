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

use super::trace::{group_by_request, parse_timestamp_ms, RequestTrace, ServiceInterval};
use crate::parser::Record;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// When a request's span counts as hiding unaccounted latency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanThresholds {
    /// Absolute floor the span must exceed
    pub min_span_ms: i64,
    /// Multiple of summed service durations the span must exceed
    pub span_factor: f64,
}

impl Default for SpanThresholds {
    fn default() -> Self {
        Self {
            min_span_ms: 5000,
            span_factor: 5.0,
        }
    }
}

impl SpanThresholds {
    /// `span > max(min_span_ms, sum_dur * span_factor)`
    pub fn is_problematic(&self, span_ms: i64, sum_dur_ms: i64) -> bool {
        let floor = self.min_span_ms as f64;
        let scaled = sum_dur_ms as f64 * self.span_factor;
        span_ms as f64 > floor.max(scaled)
    }
}

/// Total length of the union of `(start, end)` intervals
pub fn merged_busy_ms(intervals: &[(i64, i64)]) -> i64 {
    let mut sorted = intervals.to_vec();
    sorted.sort_unstable_by_key(|&(start, _)| start);

    let mut iter = sorted.into_iter();
    let Some(mut current) = iter.next() else {
        return 0;
    };
    let mut total = 0;
    for (start, end) in iter {
        if start <= current.1 {
            current.1 = current.1.max(end);
        } else {
            total += current.1 - current.0;
            current = (start, end);
        }
    }
    total + (current.1 - current.0)
}

/// Timing summary of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpanStats {
    /// Sum of each service's own duration, ignoring overlap
    pub sum_dur_ms: i64,
    /// Latest service end minus earliest service start
    pub span_ms: Option<i64>,
    /// Time during which at least one service was active
    pub busy_ms: i64,
}

impl SpanStats {
    pub fn from_services(services: &[ServiceInterval]) -> Self {
        let bounds: Vec<(i64, i64)> = services.iter().filter_map(ServiceInterval::bounds).collect();
        let sum_dur_ms = bounds.iter().map(|(min, max)| (max - min).max(0)).sum();
        let start = bounds.iter().map(|&(min, _)| min).min();
        let end = bounds.iter().map(|&(_, max)| max).max();
        Self {
            sum_dur_ms,
            span_ms: start.zip(end).map(|(start, end)| end - start),
            busy_ms: merged_busy_ms(&bounds),
        }
    }
}

/// One analyzed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSpan {
    pub request_id: String,
    pub event_count: usize,
    pub services: Vec<ServiceInterval>,
    pub stats: SpanStats,
}

/// Earliest to latest timestamp across all grouped requests of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl FileWindow {
    pub const fn total_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Result of analyzing one file's records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanReport {
    /// Every request with its per-service timings, in first-seen order
    pub requests: Vec<RequestSpan>,
    /// Indices into `requests` of the flagged ones, by descending span
    pub problematic: Vec<usize>,
    pub window: Option<FileWindow>,
}

impl SpanReport {
    pub fn problematic_requests(&self) -> impl Iterator<Item = &RequestSpan> + '_ {
        self.problematic.iter().map(|&i| &self.requests[i])
    }

    /// All requests by descending span; requests without a span sort as zero
    pub fn ranked_requests(&self) -> Vec<&RequestSpan> {
        let mut ranked: Vec<&RequestSpan> = self.requests.iter().collect();
        ranked.sort_by_key(|request| Reverse(request.stats.span_ms.unwrap_or(0)));
        ranked
    }

    pub fn request(&self, request_id: &str) -> Option<&RequestSpan> {
        self.requests.iter().find(|r| r.request_id == request_id)
    }
}

/// Detailed view of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub request_id: String,
    /// Services in flow order, then the rest by start time
    pub services: Vec<ServiceInterval>,
    pub stats: SpanStats,
    /// Events sorted by time; untimed events last in file order
    pub events: Vec<Record>,
}

/// Computes span statistics and flags requests with hidden latency
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanAnalyzer {
    thresholds: SpanThresholds,
}

impl SpanAnalyzer {
    pub const fn new(thresholds: SpanThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze(&self, records: &[Record]) -> SpanReport {
        let traces = group_by_request(records);

        let window = traces
            .values()
            .filter_map(RequestTrace::time_window)
            .reduce(|(lo, hi), (start, end)| (lo.min(start), hi.max(end)))
            .map(|(start_ms, end_ms)| FileWindow { start_ms, end_ms });

        let requests: Vec<RequestSpan> = traces
            .into_values()
            .map(|trace| RequestSpan {
                request_id: trace.request_id.to_string(),
                event_count: trace.event_count(),
                stats: SpanStats::from_services(&trace.services),
                services: trace.services,
            })
            .collect();

        let mut problematic: Vec<usize> = requests
            .iter()
            .enumerate()
            .filter(|(_, request)| self.is_problematic(&request.stats))
            .map(|(i, _)| i)
            .collect();
        problematic.sort_by_key(|&i| Reverse(requests[i].stats.span_ms.unwrap_or(0)));

        tracing::debug!(
            "Analyzed {} requests, {} problematic",
            requests.len(),
            problematic.len()
        );
        SpanReport {
            requests,
            problematic,
            window,
        }
    }

    /// A request without any timed service has no span and is never flagged
    pub fn is_problematic(&self, stats: &SpanStats) -> bool {
        stats
            .span_ms
            .is_some_and(|span| self.thresholds.is_problematic(span, stats.sum_dur_ms))
    }

    /// Look at one request in detail; `None` if no record carries this id
    pub fn inspect(records: &[Record], request_id: &str, flow: &[String]) -> Option<Inspection> {
        let traces = group_by_request(records);
        let trace = traces.get(request_id)?;

        let services = order_by_flow(trace.services.clone(), flow);
        let stats = SpanStats::from_services(&services);

        let mut events: Vec<Record> = trace.events.iter().copied().cloned().collect();
        events.sort_by_key(|event| {
            let at = event.timestamp.as_deref().and_then(parse_timestamp_ms);
            (at.is_none(), at)
        });

        Some(Inspection {
            request_id: request_id.to_string(),
            services,
            stats,
            events,
        })
    }
}

/// Up to `limit` distinct request ids, in first-seen order
pub fn sample_request_ids(records: &[Record], limit: usize) -> Vec<&str> {
    group_by_request(records).into_keys().take(limit).collect()
}

// Flow services first (duplicates in the flow count once), then the others by start
fn order_by_flow(mut services: Vec<ServiceInterval>, flow: &[String]) -> Vec<ServiceInterval> {
    let mut ordered = Vec::with_capacity(services.len());
    for name in flow {
        if let Some(pos) = services.iter().position(|s| &s.service == name) {
            ordered.push(services.remove(pos));
        }
    }
    services.sort_by_key(|s| (s.min_ms.is_none(), s.min_ms));
    ordered.extend(services);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(service: &str, min: Option<i64>, max: Option<i64>) -> ServiceInterval {
        ServiceInterval {
            service: service.to_string(),
            min_ms: min,
            max_ms: max,
            event_count: 1,
            timed_count: usize::from(min.is_some()),
            vm: None,
        }
    }

    fn record(id: &str, service: &str, ts: &str) -> Record {
        Record {
            vm: None,
            timestamp: Some(ts.to_string()),
            service: Some(service.to_string()),
            message: format!("{service} at {ts}"),
            request_id: Some(id.to_string()),
        }
    }

    #[test]
    fn test_merged_busy_time() {
        assert_eq!(merged_busy_ms(&[(0, 100), (50, 150), (200, 250)]), 200);
        assert_eq!(merged_busy_ms(&[(200, 250), (0, 100), (50, 150)]), 200);
        // Adjacent intervals merge
        assert_eq!(merged_busy_ms(&[(0, 100), (100, 150)]), 150);
        // Contained interval does not shrink the running end
        assert_eq!(merged_busy_ms(&[(0, 300), (10, 20)]), 300);
        assert_eq!(merged_busy_ms(&[]), 0);
    }

    #[test]
    fn test_thresholds() {
        let thresholds = SpanThresholds::default();
        assert!(thresholds.is_problematic(6000, 1000));
        assert!(!thresholds.is_problematic(9000, 2000));
        // Floor applies when work is tiny
        assert!(!thresholds.is_problematic(5000, 0));
        assert!(thresholds.is_problematic(5001, 0));
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = SpanThresholds {
            min_span_ms: 100,
            span_factor: 2.0,
        };
        assert!(thresholds.is_problematic(250, 100));
        assert!(!thresholds.is_problematic(200, 100));
    }

    #[test]
    fn test_span_stats() {
        let services = vec![
            interval("a", Some(0), Some(100)),
            interval("b", Some(50), Some(150)),
            interval("c", Some(200), Some(250)),
            interval("d", Some(300), Some(300)),
            interval("e", None, None),
        ];
        let stats = SpanStats::from_services(&services);
        assert_eq!(stats.sum_dur_ms, 250);
        assert_eq!(stats.span_ms, Some(300));
        assert_eq!(stats.busy_ms, 200);
    }

    #[test]
    fn test_span_stats_without_bounds() {
        let stats = SpanStats::from_services(&[interval("a", None, None)]);
        assert_eq!(stats.span_ms, None);
        assert_eq!(stats.sum_dur_ms, 0);
        assert!(!SpanAnalyzer::default().is_problematic(&stats));
    }

    #[test]
    fn test_analyze_flags_and_ranks() {
        let records = vec![
            // slow: 1s of work on each side of a 9s gap
            record("slow", "a", "2025-01-01T10:00:00Z"),
            record("slow", "a", "2025-01-01T10:00:01Z"),
            record("slow", "b", "2025-01-01T10:00:10Z"),
            // slower: two single events 20s apart
            record("slower", "a", "2025-01-01T10:00:00Z"),
            record("slower", "b", "2025-01-01T10:00:20Z"),
            // busy: long but fully accounted work
            record("busy", "a", "2025-01-01T10:00:00Z"),
            record("busy", "a", "2025-01-01T10:00:30Z"),
        ];
        let report = SpanAnalyzer::default().analyze(&records);

        assert_eq!(report.requests.len(), 3);
        let flagged: Vec<&str> = report
            .problematic_requests()
            .map(|r| r.request_id.as_str())
            .collect();
        assert_eq!(flagged, ["slower", "slow"]);

        let slow = report.request("slow").expect("slow request");
        assert_eq!(slow.stats.sum_dur_ms, 1000);
        assert_eq!(slow.stats.span_ms, Some(10_000));
        assert_eq!(slow.event_count, 3);

        let ranked: Vec<&str> = report
            .ranked_requests()
            .iter()
            .map(|r| r.request_id.as_str())
            .collect();
        assert_eq!(ranked, ["busy", "slower", "slow"]);

        let window = report.window.expect("timed events");
        assert_eq!(window.total_ms(), 30_000);
    }

    #[test]
    fn test_records_without_request_id_do_not_affect_spans() {
        let mut records = vec![
            record("r", "a", "2025-01-01T10:00:00Z"),
            record("r", "a", "2025-01-01T10:00:01Z"),
        ];
        let baseline = SpanAnalyzer::default().analyze(&records);

        let mut stray = record("", "a", "2025-01-01T12:00:00Z");
        stray.request_id = None;
        records.push(stray);
        records.push(record("", "a", "2025-01-01T13:00:00Z"));
        let with_stray = SpanAnalyzer::default().analyze(&records);

        assert_eq!(baseline, with_stray);
    }

    #[test]
    fn test_inspect_orders_by_flow_then_start() {
        let records = vec![
            record("r", "c", "2025-01-01T10:00:00Z"),
            record("r", "b", "2025-01-01T10:00:05Z"),
            record("r", "a", "2025-01-01T10:00:03Z"),
            Record {
                timestamp: None,
                ..record("r", "a", "")
            },
        ];
        let flow = vec!["b".to_string(), "b".to_string(), "zzz".to_string()];
        let inspection = SpanAnalyzer::inspect(&records, "r", &flow).expect("known request");

        let order: Vec<&str> = inspection.services.iter().map(|s| s.service.as_str()).collect();
        assert_eq!(order, ["b", "c", "a"]);

        let times: Vec<Option<&str>> = inspection
            .events
            .iter()
            .map(|e| e.timestamp.as_deref())
            .collect();
        assert_eq!(
            times,
            [
                Some("2025-01-01T10:00:00Z"),
                Some("2025-01-01T10:00:03Z"),
                Some("2025-01-01T10:00:05Z"),
                None,
            ]
        );
        assert_eq!(inspection.stats.span_ms, Some(5000));
    }

    #[test]
    fn test_inspect_unknown_request() {
        let records = vec![record("r1", "a", "2025-01-01T10:00:00Z")];
        assert!(SpanAnalyzer::inspect(&records, "missing", &[]).is_none());
        assert_eq!(sample_request_ids(&records, 10), ["r1"]);
    }
}
