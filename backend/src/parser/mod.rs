//! Generic CSV to JSON parser with encoding and delimiter auto-detection.
//!
//! Converts CSV rows into JSON objects whose values are the raw (trimmed)
//! cell strings. No table-specific logic here: column renaming and typing
//! happen in [`crate::loader`].

pub mod dates;

use serde_json::{Map, Value};
use std::io::Read;

pub use dates::{parse_date, parse_datetime};

/// CSV parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records as JSON objects
    pub records: Vec<Value>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Detect the encoding of raw bytes.
///
/// Valid UTF-8 (BOM or not) is always reported as `utf-8`; chardet only
/// guesses for bytes that are not.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if std::str::from_utf8(body).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => {
            // BOM from spreadsheet exports would otherwise end up in the first header
            let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV from a reader into headers and JSON objects.
///
/// Short rows are padded with empty strings, extra trailing cells are
/// ignored and rows made only of empty cells are skipped.
pub fn parse_csv<R: Read>(reader: R, delimiter: char) -> Result<(Vec<String>, Vec<Value>), CsvError> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::new(0, format!("Unsupported delimiter '{}'", delimiter)))?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| CsvError::new(1, format!("Cannot read header: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::new(1, "Empty CSV file"));
    }

    let mut records = Vec::new();

    for (idx, result) in csv_reader.records().enumerate() {
        let line = idx + 2; // +1 for 0-index, +1 for header
        let row = result.map_err(|e| CsvError::new(line, format!("Cannot read line: {}", e)))?;

        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = row.get(i).unwrap_or("");
            obj.insert(header.clone(), Value::String(value.to_string()));
        }

        records.push(Value::Object(obj));
    }

    Ok((headers, records))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<ParseResult, CsvError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(CsvError::new(1, "Empty CSV file"));
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let (headers, records) = parse_csv(content.as_bytes(), delimiter)?;

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
    })
}
