//! JSON Schema validation for the normalized source tables.
//!
//! Each table has an embedded draft-7 schema listing the columns the
//! pipeline needs once renaming is done. Schemas are embedded at compile time
//! from the `schemas/` directory:
//!
//! - `students.json`
//! - `events.json`
//! - `purchases.json`
//!
//! Validation runs on the header row, so a header-only file with a missing
//! column fails just like a populated one.
//!
//! # Example
//!
//! ```rust,ignore
//! use esn_dashboard::validation::{validate_header, EVENTS_SCHEMA};
//!
//! let headers = vec!["event_id".to_string(), "event_name".to_string()];
//! let errors = validate_header(&EVENTS_SCHEMA, &headers).unwrap_err();
//! assert!(errors[0].contains("startDate"));
//! ```

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

/// Schema for normalized student rows.
pub static STUDENTS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/students.json")).expect("Invalid embedded schema")
});

/// Schema for normalized event rows.
pub static EVENTS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/events.json")).expect("Invalid embedded schema")
});

/// Schema for normalized purchase rows.
pub static PURCHASES_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/purchases.json")).expect("Invalid embedded schema")
});

/// Validate a JSON value against a schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a header row: every column becomes a key with an empty string.
pub fn validate_header(schema: &Value, headers: &[String]) -> Result<(), Vec<String>> {
    let row: Map<String, Value> = headers
        .iter()
        .map(|h| (h.clone(), Value::String(String::new())))
        .collect();
    validate(schema, &Value::Object(row))
}
