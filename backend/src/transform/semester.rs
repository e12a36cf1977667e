//! Semester labeling.
//!
//! The academic year runs August to July: August-January is `S1`,
//! February-July is `S2`, and the label names both calendar years, e.g.
//! `23.24-S1` for anything from August 2023 to January 2024.

use chrono::NaiveDateTime;

use crate::models::{EnrichedPurchase, Semester, MISSING_LABEL};

/// Sentinel for "no semester restriction" in selectors.
pub const ALL_SEMESTERS: &str = "All";

/// Semester of an optional date.
pub fn semester_of(date: Option<&NaiveDateTime>) -> Option<Semester> {
    date.map(Semester::of)
}

/// Semester label of an optional date, `"missing"` when there is no date.
pub fn semester_label(date: Option<&NaiveDateTime>) -> String {
    match semester_of(date) {
        Some(semester) => semester.to_string(),
        None => MISSING_LABEL.to_string(),
    }
}

/// Selector options: `"All"` followed by the distinct semesters of the
/// purchases, oldest first.
pub fn available_semesters(purchases: &[EnrichedPurchase]) -> Vec<String> {
    let mut semesters: Vec<Semester> = purchases.iter().filter_map(|p| p.semester).collect();
    semesters.sort();
    semesters.dedup();

    std::iter::once(ALL_SEMESTERS.to_string())
        .chain(semesters.into_iter().map(|s| s.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Purchase;
    use chrono::NaiveDate;

    fn first_of(y: i32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_reference_labels() {
        assert_eq!(semester_label(Some(&first_of(2023, 8))), "23.24-S1");
        assert_eq!(semester_label(Some(&first_of(2024, 1))), "23.24-S1");
        assert_eq!(semester_label(Some(&first_of(2024, 2))), "23.24-S2");
        assert_eq!(semester_label(Some(&first_of(2024, 7))), "23.24-S2");
        assert_eq!(semester_label(None), "missing");
    }

    #[test]
    fn test_every_month_is_labeled() {
        let expected = [
            "23.24-S1", // Jan 2024
            "23.24-S2", "23.24-S2", "23.24-S2", "23.24-S2", "23.24-S2", "23.24-S2",
            "24.25-S1", "24.25-S1", "24.25-S1", "24.25-S1", "24.25-S1", // Aug-Dec 2024
        ];
        for (month, label) in (1..=12).zip(expected) {
            let date = first_of(2024, month);
            assert_eq!(semester_label(Some(&date)), label, "month {}", month);
            // deterministic
            assert_eq!(semester_label(Some(&date)), semester_label(Some(&date)));
        }
    }

    #[test]
    fn test_last_instant_of_january_stays_in_s1() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(semester_label(Some(&date)), "23.24-S1");
    }

    #[test]
    fn test_available_semesters_sorted_with_all_first() {
        let purchase = |date: Option<NaiveDateTime>| EnrichedPurchase {
            purchase: Purchase {
                id: "p".into(),
                event_id: None,
                student_email: None,
                student_esn_card: None,
                purchase_date: date,
                amount_paid: None,
            },
            semester: semester_of(date.as_ref()),
            event_name: None,
            event_start: None,
            student_id: None,
            register_date: None,
            nationality: None,
        };

        let purchases = vec![
            purchase(Some(first_of(2024, 3))),
            purchase(None),
            purchase(Some(first_of(2023, 10))),
            purchase(Some(first_of(2024, 4))),
        ];

        assert_eq!(
            available_semesters(&purchases),
            vec!["All", "23.24-S1", "23.24-S2"]
        );
        assert_eq!(available_semesters(&[]), vec!["All"]);
    }
}
