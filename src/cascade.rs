use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::{RegisterError, Result};
use crate::store::{Batch, Store};

/// A deterrent against accidental deletes; not an access-control mechanism.
#[derive(Debug, Clone)]
pub struct Confirmation {
    code: String,
}

impl Confirmation {
    pub fn new(code: impl Into<String>) -> Self {
        Confirmation { code: code.into() }
    }

    pub fn check(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(t) if t.trim() == self.code => Ok(()),
            _ => {
                warn!("destructive operation refused: confirmation mismatch");
                Err(RegisterError::ConfirmationMismatch)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeOutcome {
    pub classes_removed: usize,
    pub students_removed: usize,
    pub records_removed: usize,
}

/// Removes the class, its students, and every record that names one of those
/// students or the class itself.
pub fn delete_class(
    store: &mut Store,
    confirmation: &Confirmation,
    token: Option<&str>,
    class_id: &str,
) -> Result<CascadeOutcome> {
    confirmation.check(token)?;
    let classes = store.classes();
    if !classes.iter().any(|c| c.id == class_id) {
        return Err(RegisterError::NotFound {
            kind: "class",
            id: class_id.to_string(),
        });
    }

    let (removed, kept): (Vec<_>, Vec<_>) = store
        .students()
        .into_iter()
        .partition(|s| s.class_id == class_id);
    let removed_ids: HashSet<String> = removed.into_iter().map(|s| s.id).collect();

    let attendance = store.attendance();
    let before = attendance.len();
    let attendance: Vec<_> = attendance
        .into_iter()
        .filter(|r| r.class_id != class_id && !removed_ids.contains(&r.student_id))
        .collect();

    let remaining: Vec<_> = classes.into_iter().filter(|c| c.id != class_id).collect();
    let outcome = CascadeOutcome {
        classes_removed: 1,
        students_removed: removed_ids.len(),
        records_removed: before - attendance.len(),
    };
    store.apply(
        Batch::new()
            .classes(remaining)
            .students(kept)
            .attendance(attendance),
    )?;
    info!(
        class_id,
        students = outcome.students_removed,
        records = outcome.records_removed,
        "class deleted"
    );
    Ok(outcome)
}

pub fn delete_student(
    store: &mut Store,
    confirmation: &Confirmation,
    token: Option<&str>,
    student_id: &str,
) -> Result<CascadeOutcome> {
    confirmation.check(token)?;
    let students = store.students();
    let before_students = students.len();
    let kept: Vec<_> = students.into_iter().filter(|s| s.id != student_id).collect();
    if kept.len() == before_students {
        return Err(RegisterError::NotFound {
            kind: "student",
            id: student_id.to_string(),
        });
    }

    let attendance = store.attendance();
    let before = attendance.len();
    let attendance: Vec<_> = attendance
        .into_iter()
        .filter(|r| r.student_id != student_id)
        .collect();
    let outcome = CascadeOutcome {
        classes_removed: 0,
        students_removed: 1,
        records_removed: before - attendance.len(),
    };
    store.apply(Batch::new().students(kept).attendance(attendance))?;
    info!(student_id, records = outcome.records_removed, "student deleted");
    Ok(outcome)
}

/// Empties the class roster and drops the removed students' records; the
/// class itself stays.
pub fn clear_class_roster(
    store: &mut Store,
    confirmation: &Confirmation,
    token: Option<&str>,
    class_id: &str,
) -> Result<CascadeOutcome> {
    confirmation.check(token)?;
    if store.class(class_id).is_none() {
        return Err(RegisterError::NotFound {
            kind: "class",
            id: class_id.to_string(),
        });
    }

    let (removed, kept): (Vec<_>, Vec<_>) = store
        .students()
        .into_iter()
        .partition(|s| s.class_id == class_id);
    let removed_ids: HashSet<String> = removed.into_iter().map(|s| s.id).collect();

    let attendance = store.attendance();
    let before = attendance.len();
    let attendance: Vec<_> = attendance
        .into_iter()
        .filter(|r| !removed_ids.contains(&r.student_id))
        .collect();
    let outcome = CascadeOutcome {
        classes_removed: 0,
        students_removed: removed_ids.len(),
        records_removed: before - attendance.len(),
    };
    store.apply(Batch::new().students(kept).attendance(attendance))?;
    info!(
        class_id,
        students = outcome.students_removed,
        records = outcome.records_removed,
        "class roster cleared"
    );
    Ok(outcome)
}
