// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical UTC timestamp formatting.
//!
//! Wire form: ISO-8601 with microsecond precision and a `Z` suffix,
//! e.g. `2026-01-15T12:00:00.000000Z`.

use chrono::{DateTime, NaiveDateTime, Utc};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format a UTC instant in the canonical wire form.
pub fn format_utc(at: DateTime<Utc>) -> String {
    at.format(ISO_FORMAT).to_string()
}

/// Parse a canonical timestamp. Lenient on fractional-second width.
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.fZ")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
