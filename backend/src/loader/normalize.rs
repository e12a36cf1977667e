//! Column renaming to the shared vocabulary used by the joiner.

use serde_json::Value;

use crate::parser::ParseResult;

/// Student export columns → shared names.
pub const STUDENT_RENAMES: &[(&str, &str)] = &[
    ("_id", "student_id"),
    ("email", "student_email"),
    ("esnCardNumber", "student_esnCard"),
];

/// Event export columns → shared names.
pub const EVENT_RENAMES: &[(&str, &str)] = &[("_id", "event_id"), ("name", "event_name")];

/// Purchase export columns → shared names. The student key columns already
/// use the shared names in this export.
pub const PURCHASE_RENAMES: &[(&str, &str)] = &[("_id", "purchase_id"), ("eventId", "event_id")];

fn renamed<'a>(column: &'a str, renames: &[(&'a str, &'a str)]) -> &'a str {
    renames
        .iter()
        .find(|(from, _)| *from == column)
        .map(|(_, to)| *to)
        .unwrap_or(column)
}

/// Rename headers and record keys. Columns not listed are left untouched.
pub fn normalize_columns(mut parsed: ParseResult, renames: &[(&str, &str)]) -> ParseResult {
    parsed.headers = parsed
        .headers
        .iter()
        .map(|h| renamed(h, renames).to_string())
        .collect();

    for record in parsed.records.iter_mut() {
        if let Value::Object(fields) = record {
            let old = std::mem::take(fields);
            *fields = old
                .into_iter()
                .map(|(k, v)| (renamed(&k, renames).to_string(), v))
                .collect();
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_bytes_auto;

    #[test]
    fn test_student_columns_renamed() {
        let parsed = parse_bytes_auto(
            b"_id,email,esnCardNumber,registerDate,nationality\ns1,ana@example.com,ESN1,2023-09-01,Portugal",
        )
        .unwrap();

        let normalized = normalize_columns(parsed, STUDENT_RENAMES);

        assert_eq!(
            normalized.headers,
            vec!["student_id", "student_email", "student_esnCard", "registerDate", "nationality"]
        );
        let row = &normalized.records[0];
        assert_eq!(row["student_id"], "s1");
        assert_eq!(row["student_email"], "ana@example.com");
        assert_eq!(row["student_esnCard"], "ESN1");
        assert!(row.get("_id").is_none());
    }

    #[test]
    fn test_purchase_and_event_columns_renamed() {
        let parsed = parse_bytes_auto(b"_id,eventId,student_email,amountPaid\np1,e1,a@b.c,5").unwrap();
        let normalized = normalize_columns(parsed, PURCHASE_RENAMES);
        assert_eq!(normalized.headers, vec!["purchase_id", "event_id", "student_email", "amountPaid"]);

        let parsed = parse_bytes_auto(b"_id,name,startDate\ne1,Welcome Party,2023-09-10").unwrap();
        let normalized = normalize_columns(parsed, EVENT_RENAMES);
        assert_eq!(normalized.records[0]["event_name"], "Welcome Party");
    }

    #[test]
    fn test_already_normalized_columns_untouched() {
        let parsed = parse_bytes_auto(b"event_id,event_name,startDate\ne1,Tour,").unwrap();
        let normalized = normalize_columns(parsed, EVENT_RENAMES);
        assert_eq!(normalized.headers, vec!["event_id", "event_name", "startDate"]);
        assert_eq!(normalized.records[0]["event_id"], "e1");
    }
}
