use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tracing::info;
use uuid::Uuid;

use crate::error::{RegisterError, Result};
use crate::model::{AttendanceRecord, AttendanceStatus, Student};
use crate::store::Store;

/// Accepts only zero-padded calendar dates; range filters compare them as strings.
pub fn parse_day(date: &str) -> Result<NaiveDate> {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) if d.format("%Y-%m-%d").to_string() == date => Ok(d),
        _ => Err(RegisterError::InvalidDate(date.to_string())),
    }
}

/// One roster entry as a marking sheet shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayMark {
    pub student: Student,
    pub status: Option<AttendanceStatus>,
}

/// The class roster with whatever statuses are already committed for `date`.
pub fn day_marks(store: &Store, class_id: &str, date: &str) -> Result<Vec<DayMark>> {
    parse_day(date)?;
    if store.class(class_id).is_none() {
        return Err(RegisterError::NotFound {
            kind: "class",
            id: class_id.to_string(),
        });
    }
    let existing: BTreeMap<String, AttendanceStatus> = store
        .attendance()
        .into_iter()
        .filter(|r| r.class_id == class_id && r.date == date)
        .map(|r| (r.student_id, r.status))
        .collect();
    Ok(store
        .roster(class_id)
        .into_iter()
        .map(|student| {
            let status = existing.get(&student.id).copied();
            DayMark { student, status }
        })
        .collect())
}

/// Gives every roster student without a mark `status`; existing marks are kept.
pub fn fill_unmarked(
    marks: &mut BTreeMap<String, AttendanceStatus>,
    roster: &[Student],
    status: AttendanceStatus,
) -> usize {
    let mut filled = 0;
    for s in roster {
        if !marks.contains_key(&s.id) {
            marks.insert(s.id.clone(), status);
            filled += 1;
        }
    }
    filled
}

/// Replaces the ledger entries for (`class_id`, `date`) with one record per
/// roster student.
///
/// Nothing is written unless every roster student is marked and every mark
/// belongs to the roster. Record ids are regenerated on each commit.
pub fn commit_day(
    store: &mut Store,
    class_id: &str,
    date: &str,
    marks: &BTreeMap<String, AttendanceStatus>,
) -> Result<Vec<AttendanceRecord>> {
    parse_day(date)?;
    if store.class(class_id).is_none() {
        return Err(RegisterError::NotFound {
            kind: "class",
            id: class_id.to_string(),
        });
    }

    let roster = store.roster(class_id);
    let roster_ids: HashSet<&str> = roster.iter().map(|s| s.id.as_str()).collect();

    let strangers: Vec<String> = marks
        .keys()
        .filter(|id| !roster_ids.contains(id.as_str()))
        .cloned()
        .collect();
    if !strangers.is_empty() {
        return Err(RegisterError::NotOnRoster { ids: strangers });
    }

    let unmarked = roster.iter().filter(|s| !marks.contains_key(&s.id)).count();
    if unmarked > 0 {
        return Err(RegisterError::IncompleteRoster { unmarked });
    }

    let previous = store.attendance();
    let before = previous.len();
    let mut ledger: Vec<AttendanceRecord> = previous
        .into_iter()
        .filter(|r| !(r.class_id == class_id && r.date == date))
        .collect();
    let replaced = before - ledger.len();

    let fresh: Vec<AttendanceRecord> = roster
        .iter()
        .filter_map(|s| {
            marks.get(&s.id).map(|status| AttendanceRecord {
                id: Uuid::new_v4().to_string(),
                student_id: s.id.clone(),
                class_id: class_id.to_string(),
                status: *status,
                date: date.to_string(),
            })
        })
        .collect();
    ledger.extend(fresh.iter().cloned());
    store.save_attendance(ledger)?;

    info!(
        class_id,
        date,
        written = fresh.len(),
        replaced,
        "attendance day committed"
    );
    Ok(fresh)
}
