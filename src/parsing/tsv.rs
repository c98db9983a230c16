use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::scoring::zscore::LinkEvidence;
use crate::utils::validation::{check_segment_limit, validate_text_content};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    #[error("Invalid input: {0}")]
    InvalidFormat(String),

    #[error("Line {line}: segment {segment} exceeds the maximum allowed")]
    TooManySegments { line: usize, segment: u64 },
}

/// A directly specified adjacency weight between two sides
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub side_a: i64,
    pub side_b: i64,
    pub weight: f64,
}

/// An interval to open, bounded by two stub segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubPair {
    pub left: i64,
    pub right: i64,
}

/// Pick the delimiter from a file extension: comma for `.csv`, tab otherwise
#[must_use]
pub fn delimiter_for(path: &Path) -> char {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => ',',
        _ => '\t',
    }
}

/// Data lines of `text` as `(1-based line number, fields)`.
///
/// Blank lines and `#` comments are skipped, as is the first data line when
/// its first field is not an integer (a header).
fn data_lines(text: &str, delimiter: char) -> impl Iterator<Item = (usize, Vec<&str>)> {
    let mut first_data_line = true;
    text.lines().enumerate().filter_map(move |(i, line)| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        if first_data_line {
            first_data_line = false;
            let is_header = fields
                .first()
                .is_some_and(|field| field.parse::<i64>().is_err());
            if is_header {
                return None;
            }
        }
        // Line numbers in errors are 1-based for user friendliness
        Some((i + 1, fields))
    })
}

fn require_fields(fields: &[&str], line: usize, minimum: usize) -> Result<(), ParseError> {
    if fields.len() < minimum {
        return Err(ParseError::InvalidLine {
            line,
            message: format!("expected at least {minimum} fields, found {}", fields.len()),
        });
    }
    Ok(())
}

fn parse_field<T: std::str::FromStr>(
    field: &str,
    line: usize,
    what: &str,
) -> Result<T, ParseError> {
    field.parse().map_err(|_| ParseError::InvalidLine {
        line,
        message: format!("invalid {what}: '{field}'"),
    })
}

/// Parse a nonzero signed side within the segment limit
fn parse_side(field: &str, line: usize) -> Result<i64, ParseError> {
    let side: i64 = parse_field(field, line, "side")?;
    if side == 0 {
        return Err(ParseError::InvalidLine {
            line,
            message: "side 0 does not name a segment".to_string(),
        });
    }
    let segment = side.unsigned_abs();
    if check_segment_limit(segment).is_some() {
        return Err(ParseError::TooManySegments { line, segment });
    }
    Ok(side)
}

fn parse_side_pair(fields: &[&str], line: usize) -> Result<(i64, i64), ParseError> {
    let a = parse_side(fields[0], line)?;
    let b = parse_side(fields[1], line)?;
    if a == b {
        return Err(ParseError::InvalidLine {
            line,
            message: format!("self loop on side {a}"),
        });
    }
    Ok((a, b))
}

fn parse_finite(field: &str, line: usize, what: &str) -> Result<f64, ParseError> {
    let value: f64 = parse_field(field, line, what)?;
    if !value.is_finite() {
        return Err(ParseError::InvalidLine {
            line,
            message: format!("{what} must be finite, got {value}"),
        });
    }
    Ok(value)
}

fn read_text(path: &Path) -> Result<String, ParseError> {
    let content = std::fs::read(path)?;
    let text = validate_text_content(&content)
        .map_err(|e| ParseError::InvalidFormat(format!("{}: {e}", path.display())))?;
    Ok(text.to_string())
}

/// Parse weights with columns: `side_a`, `side_b`, `weight`
///
/// # Errors
///
/// Returns `ParseError::InvalidLine` for lines with missing or invalid fields,
/// zero sides or self loops, and `ParseError::TooManySegments` when a side
/// exceeds the segment limit.
pub fn parse_weights_text(text: &str, delimiter: char) -> Result<Vec<WeightRecord>, ParseError> {
    let mut records = Vec::new();
    for (line, fields) in data_lines(text, delimiter) {
        require_fields(&fields, line, 3)?;
        let (side_a, side_b) = parse_side_pair(&fields, line)?;
        let weight = parse_finite(fields[2], line, "weight")?;
        records.push(WeightRecord {
            side_a,
            side_b,
            weight,
        });
    }
    Ok(records)
}

/// Parse link evidence with columns: `side_a`, `side_b`, `gap`, `length_a`,
/// `length_b`, [`support`]
///
/// # Errors
///
/// As [`parse_weights_text`], plus invalid gaps, lengths or support.
pub fn parse_links_text(text: &str, delimiter: char) -> Result<Vec<LinkEvidence>, ParseError> {
    let mut records = Vec::new();
    for (line, fields) in data_lines(text, delimiter) {
        require_fields(&fields, line, 5)?;
        let (side_a, side_b) = parse_side_pair(&fields, line)?;
        let support = match fields.get(5) {
            Some(field) if !field.is_empty() => parse_finite(field, line, "support")?,
            _ => 1.0,
        };
        records.push(LinkEvidence {
            side_a,
            side_b,
            gap: parse_field(fields[2], line, "gap")?,
            length_a: parse_field(fields[3], line, "length")?,
            length_b: parse_field(fields[4], line, "length")?,
            support,
        });
    }
    Ok(records)
}

/// Parse stub intervals with columns: `left`, `right`
///
/// # Errors
///
/// Returns `ParseError::InvalidLine` for malformed lines or stubs naming one
/// segment twice, and `ParseError::InvalidFormat` when a segment appears in
/// more than one stub pair.
pub fn parse_stubs_text(text: &str, delimiter: char) -> Result<Vec<StubPair>, ParseError> {
    let mut stubs = Vec::new();
    let mut seen = std::collections::BTreeSet::new();
    for (line, fields) in data_lines(text, delimiter) {
        require_fields(&fields, line, 2)?;
        let (left, right) = parse_side_pair(&fields, line)?;
        if left.unsigned_abs() == right.unsigned_abs() {
            return Err(ParseError::InvalidLine {
                line,
                message: format!("stubs {left} and {right} name the same segment"),
            });
        }
        for side in [left, right] {
            if !seen.insert(side.unsigned_abs()) {
                return Err(ParseError::InvalidFormat(format!(
                    "segment {} is used as a stub more than once (line {line})",
                    side.unsigned_abs()
                )));
            }
        }
        stubs.push(StubPair { left, right });
    }
    Ok(stubs)
}

/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or any error of
/// [`parse_weights_text`].
pub fn parse_weights_file(path: &Path) -> Result<Vec<WeightRecord>, ParseError> {
    parse_weights_text(&read_text(path)?, delimiter_for(path))
}

/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or any error of
/// [`parse_links_text`].
pub fn parse_links_file(path: &Path) -> Result<Vec<LinkEvidence>, ParseError> {
    parse_links_text(&read_text(path)?, delimiter_for(path))
}

/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or any error of
/// [`parse_stubs_text`].
pub fn parse_stubs_file(path: &Path) -> Result<Vec<StubPair>, ParseError> {
    parse_stubs_text(&read_text(path)?, delimiter_for(path))
}
