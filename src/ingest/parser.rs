//! Line record parsing
//!
//! A record is `<tags-segment> <fields-segment> <timestamp>`. The tags segment
//! starts with the measurement, either as a bare name (`readings,...`) or as a
//! `key=value` pair whose value names it (`type=readings,...`).

use crate::error::{LoaderError, Result};
use crate::ingest::matrix::Value;

/// One parsed input line, not yet tied to a measurement family
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, Value)>,
    pub timestamp: i64,
}

impl RawRecord {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub fn parse_line(line: &str) -> Result<RawRecord> {
    let line = line.trim();
    let segments: Vec<&str> = line.split(' ').filter(|s| !s.is_empty()).collect();
    if segments.len() != 3 {
        return Err(LoaderError::Parse(format!(
            "expected 3 space-separated segments, found {} in '{}'",
            segments.len(),
            line
        )));
    }

    let (measurement, tags) = parse_tags(segments[0])?;
    let fields = parse_fields(segments[1])?;
    let timestamp = segments[2].parse::<i64>().map_err(|e| {
        LoaderError::Parse(format!("invalid timestamp '{}': {}", segments[2], e))
    })?;

    Ok(RawRecord {
        measurement,
        tags,
        fields,
        timestamp,
    })
}

fn parse_tags(segment: &str) -> Result<(String, Vec<(String, String)>)> {
    let mut parts = segment.split(',');
    let head = parts.next().unwrap_or_default();
    let measurement = match head.split_once('=') {
        Some((_, value)) => value,
        None => head,
    };
    if measurement.is_empty() {
        return Err(LoaderError::Parse(format!(
            "missing measurement in '{}'",
            segment
        )));
    }

    let tags = parts
        .map(|pair| split_pair(pair).map(|(k, v)| (k.to_string(), v.to_string())))
        .collect::<Result<Vec<_>>>()?;

    Ok((measurement.to_string(), tags))
}

fn parse_fields(segment: &str) -> Result<Vec<(String, Value)>> {
    segment
        .split(',')
        .map(|pair| {
            let (key, raw) = split_pair(pair)?;
            Ok((key.to_string(), parse_number(raw)?))
        })
        .collect()
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => Ok((key, value)),
        _ => Err(LoaderError::Parse(format!(
            "expected key=value pair, found '{}'",
            pair
        ))),
    }
}

/// Parse a numeric field value.
///
/// A trailing `i` marks an integer; plain integers are also kept as longs and
/// widened later if their column is a double.
pub fn parse_number(raw: &str) -> Result<Value> {
    if let Some(digits) = raw.strip_suffix('i') {
        return digits
            .parse::<i64>()
            .map(Value::Long)
            .map_err(|e| LoaderError::Parse(format!("invalid integer '{}': {}", raw, e)));
    }

    if let Ok(v) = raw.parse::<i64>() {
        return Ok(Value::Long(v));
    }

    let v = raw
        .parse::<f64>()
        .map_err(|e| LoaderError::Parse(format!("invalid number '{}': {}", raw, e)))?;
    if !v.is_finite() {
        return Err(LoaderError::Parse(format!("non-finite number '{}'", raw)));
    }
    Ok(Value::Double(v))
}

/// Make a name safe to use as one component of a dotted path
pub fn canonicalize(name: &str) -> String {
    name.replace(['-', '.'], "_")
}

/// Zero-pad the numeric suffix of `<prefix>_<n>` names to four digits.
///
/// Names without a numeric suffix are returned unchanged.
pub fn normalize_entity_name(name: &str) -> String {
    match name.rsplit_once('_') {
        Some((prefix, index)) if !prefix.is_empty() => match index.parse::<u32>() {
            Ok(n) => format!("{}_{:04}", prefix, n),
            Err(_) => name.to_string(),
        },
        _ => name.to_string(),
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod parser_test;
