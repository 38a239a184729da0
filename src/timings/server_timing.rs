//! Server-Timing extraction.
//!
//! Entries the network layer already parsed are passed through untouched.
//! Raw `Server-Timing` header values are parsed following the header's
//! grammar: `metric *(";" param)` with metrics separated by commas.

use super::types::{RequestMetadata, ServerTiming};

/// Returns the server timings of a request: pre-parsed entries first, then
/// the entries found in any raw header values.
pub fn extract_server_timings(meta: &RequestMetadata) -> Vec<ServerTiming> {
    let mut timings = meta.server_timings.clone();
    for header in &meta.server_timing_headers {
        timings.extend(parse_server_timing_header(header));
    }
    timings
}

/// Parses a single `Server-Timing` header value.
pub fn parse_server_timing_header(value: &str) -> Vec<ServerTiming> {
    split_outside_quotes(value, ',')
        .into_iter()
        .filter_map(parse_metric)
        .collect()
}

fn parse_metric(metric: &str) -> Option<ServerTiming> {
    let mut parts = split_outside_quotes(metric, ';').into_iter();
    let name = parts.next()?.trim();
    if name.is_empty() {
        return None;
    }

    let mut duration = None;
    let mut description = None;
    for param in parts {
        let (key, raw) = match param.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (param.trim(), ""),
        };
        if key.eq_ignore_ascii_case("dur") && duration.is_none() {
            duration = Some(parse_duration(&unquote(raw)));
        } else if key.eq_ignore_ascii_case("desc") && description.is_none() {
            description = Some(unquote(raw));
        }
    }

    Some(ServerTiming {
        name: name.to_string(),
        duration: duration.unwrap_or(0.0),
        description: description.unwrap_or_default(),
    })
}

/// Non-finite durations (`NaN`, `inf`) have no JSON number form and are
/// treated like any other unparsable value.
fn parse_duration(raw: &str) -> f64 {
    raw.parse::<f64>()
        .ok()
        .filter(|duration| duration.is_finite())
        .unwrap_or(0.0)
}

fn split_outside_quotes(input: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                pieces.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&input[start..]);
    pieces
}

fn unquote(value: &str) -> String {
    let inner = match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner,
        None => return value.to_string(),
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
