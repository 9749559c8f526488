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

//! Log normalization and request-trace span analysis
//!
//! Raw operational logs are classified and parsed into a uniform record table
//! ([`core::convert`]), then grouped by request id so that requests whose
//! wall-clock span far exceeds the work their services account for can be
//! flagged ([`anomaly::span`]).

pub mod anomaly;
pub mod config;
pub mod core;
pub mod logging;
pub mod parser;
