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

use crate::parser::Record;
use chrono::{DateTime, SecondsFormat};
use indexmap::IndexMap;
use serde::Serialize;

/// Parse an ISO-8601 UTC timestamp (trailing `Z`) into epoch milliseconds
///
/// Sub-millisecond digits are truncated. Any other shape is unparseable and
/// yields `None`; callers keep the event but leave it out of timing math.
pub fn parse_timestamp_ms(timestamp: &str) -> Option<i64> {
    let timestamp = timestamp.trim();
    if !timestamp.ends_with('Z') {
        return None;
    }
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .as_ref()
        .map(DateTime::timestamp_millis)
}

/// Epoch milliseconds back to `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn format_timestamp_ms(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Timing of one service within one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInterval {
    pub service: String,
    pub min_ms: Option<i64>,
    pub max_ms: Option<i64>,
    /// Every event of this service, timed or not
    pub event_count: usize,
    /// Events whose timestamp could be parsed
    pub timed_count: usize,
    /// Machine this service ran on most often
    pub vm: Option<String>,
}

impl ServiceInterval {
    fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            min_ms: None,
            max_ms: None,
            event_count: 0,
            timed_count: 0,
            vm: None,
        }
    }

    fn observe(&mut self, at_ms: Option<i64>) {
        self.event_count += 1;
        if let Some(t) = at_ms {
            self.timed_count += 1;
            self.min_ms = Some(self.min_ms.map_or(t, |min| min.min(t)));
            self.max_ms = Some(self.max_ms.map_or(t, |max| max.max(t)));
        }
    }

    /// `(min, max)` when both are known
    pub fn bounds(&self) -> Option<(i64, i64)> {
        self.min_ms.zip(self.max_ms)
    }

    /// `max - min`; a single timed event gives zero
    pub fn duration_ms(&self) -> Option<i64> {
        self.bounds().map(|(min, max)| (max - min).max(0))
    }
}

/// All events sharing one request id
#[derive(Debug, Clone)]
pub struct RequestTrace<'a> {
    pub request_id: &'a str,
    pub events: Vec<&'a Record>,
    /// Per-service intervals in first-seen order
    pub services: Vec<ServiceInterval>,
}

impl RequestTrace<'_> {
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Earliest and latest parseable timestamp among all events
    pub fn time_window(&self) -> Option<(i64, i64)> {
        let times = self
            .events
            .iter()
            .filter_map(|event| event.timestamp.as_deref().and_then(parse_timestamp_ms));
        times.fold(None, |window, t| match window {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        })
    }
}

/// Partition records by request id, in first-seen request order
///
/// Records without a request id are left out entirely. Within a request,
/// records without a service count as events but get no interval.
pub fn group_by_request(records: &[Record]) -> IndexMap<&str, RequestTrace<'_>> {
    let mut events: IndexMap<&str, Vec<&Record>> = IndexMap::new();
    for record in records {
        if let Some(id) = record.request_id() {
            events.entry(id).or_default().push(record);
        }
    }

    events
        .into_iter()
        .map(|(request_id, events)| {
            let services = service_intervals(&events);
            (
                request_id,
                RequestTrace {
                    request_id,
                    events,
                    services,
                },
            )
        })
        .collect()
}

/// Fold a request's events into per-service intervals
pub fn service_intervals(events: &[&Record]) -> Vec<ServiceInterval> {
    let mut by_service: IndexMap<&str, (ServiceInterval, IndexMap<&str, usize>)> = IndexMap::new();
    for event in events {
        let Some(service) = event.service() else {
            continue;
        };
        let (interval, vms) = by_service
            .entry(service)
            .or_insert_with(|| (ServiceInterval::new(service), IndexMap::new()));
        interval.observe(event.timestamp.as_deref().and_then(parse_timestamp_ms));
        if let Some(vm) = event.vm.as_deref().filter(|vm| !vm.is_empty()) {
            *vms.entry(vm).or_insert(0) += 1;
        }
    }

    by_service
        .into_values()
        .map(|(mut interval, vms)| {
            interval.vm = dominant(&vms).map(str::to_string);
            interval
        })
        .collect()
}

// Most frequent key; ties go to the first seen
fn dominant<'a>(counts: &IndexMap<&'a str, usize>) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for (&key, &count) in counts {
        let better = match best {
            None => true,
            Some((_, top)) => count > top,
        };
        if better {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}
