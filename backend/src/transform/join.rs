//! Left joins: purchases → events → students.
//!
//! ```text
//! Purchase ──event_id──▶ Event
//!     │
//!     └──(student_email, student_esnCard)──▶ Student
//! ```
//!
//! Every purchase yields exactly one [`EnrichedPurchase`]. Unmatched keys
//! leave the joined attributes as `None`; duplicate keys on the right-hand
//! side resolve to the first row, so the purchase count never changes.

use std::collections::HashMap;

use super::semester::semester_of;
use crate::models::{EnrichedPurchase, Event, Purchase, Student};

/// Index events by id, first occurrence wins.
fn index_events(events: &[Event]) -> HashMap<&str, &Event> {
    let mut index = HashMap::with_capacity(events.len());
    for event in events {
        index.entry(event.id.as_str()).or_insert(event);
    }
    index
}

/// Index students by (email, card), first occurrence wins. Students with an
/// incomplete key cannot be matched and are left out.
fn index_students(students: &[Student]) -> HashMap<(&str, &str), &Student> {
    let mut index = HashMap::with_capacity(students.len());
    for student in students {
        if let (Some(email), Some(card)) = (student.email.as_deref(), student.esn_card.as_deref()) {
            index.entry((email, card)).or_insert(student);
        }
    }
    index
}

/// Widen every purchase with its event and student attributes.
pub fn enrich_purchases(
    purchases: &[Purchase],
    events: &[Event],
    students: &[Student],
) -> Vec<EnrichedPurchase> {
    let events_by_id = index_events(events);
    let students_by_key = index_students(students);

    purchases
        .iter()
        .map(|purchase| {
            let event = purchase
                .event_id
                .as_deref()
                .and_then(|id| events_by_id.get(id).copied());

            let student = match (purchase.student_email.as_deref(), purchase.student_esn_card.as_deref()) {
                (Some(email), Some(card)) => students_by_key.get(&(email, card)).copied(),
                _ => None,
            };

            EnrichedPurchase {
                semester: semester_of(purchase.purchase_date.as_ref()),
                event_name: event.and_then(|e| e.name.clone()),
                event_start: event.and_then(|e| e.start_date),
                student_id: student.map(|s| s.id.clone()),
                register_date: student.and_then(|s| s.register_date),
                nationality: student.and_then(|s| s.nationality.clone()),
                purchase: purchase.clone(),
            }
        })
        .collect()
}
