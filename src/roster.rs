use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregate;
use crate::error::{RegisterError, Result};
use crate::import::ImportedIdentity;
use crate::model::{self, Class, Student};
use crate::store::Store;

#[derive(Debug, Clone, Default)]
pub struct ClassDraft {
    pub name: String,
    pub school_name: String,
    pub province: Option<String>,
    pub teacher_name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub days: Option<Vec<String>>,
}

impl ClassDraft {
    fn into_class(self, id: String) -> Result<Class> {
        let name = self.name.trim().to_string();
        let school_name = self.school_name.trim().to_string();
        if name.is_empty() {
            return Err(RegisterError::invalid("class name must not be empty"));
        }
        if school_name.is_empty() {
            return Err(RegisterError::invalid("school name must not be empty"));
        }
        Ok(Class {
            id,
            name,
            school_name,
            province: self
                .province
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            teacher_name: self.teacher_name.trim().to_string(),
            start_time: self
                .start_time
                .unwrap_or_else(|| model::DEFAULT_START_TIME.to_string()),
            end_time: self
                .end_time
                .unwrap_or_else(|| model::DEFAULT_END_TIME.to_string()),
            days: self.days.unwrap_or_else(model::default_days),
        })
    }
}

pub fn create_class(store: &mut Store, draft: ClassDraft) -> Result<Class> {
    let class = draft.into_class(Uuid::new_v4().to_string())?;
    let mut classes = store.classes();
    classes.push(class.clone());
    store.save_classes(classes)?;
    info!(class_id = %class.id, name = %class.name, "class created");
    Ok(class)
}

pub fn update_class(store: &mut Store, class_id: &str, draft: ClassDraft) -> Result<Class> {
    let mut classes = store.classes();
    let Some(slot) = classes.iter_mut().find(|c| c.id == class_id) else {
        return Err(RegisterError::NotFound {
            kind: "class",
            id: class_id.to_string(),
        });
    };
    let updated = draft.into_class(class_id.to_string())?;
    *slot = updated.clone();
    store.save_classes(classes)?;
    Ok(updated)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassListing {
    #[serde(flatten)]
    pub class: Class,
    pub student_count: usize,
}

pub fn list_classes(store: &Store) -> Vec<ClassListing> {
    let students = store.students();
    store
        .classes()
        .into_iter()
        .map(|class| {
            let student_count = students.iter().filter(|s| s.class_id == class.id).count();
            ClassListing {
                class,
                student_count,
            }
        })
        .collect()
}

pub fn list_students(store: &Store, class_id: &str, search: &str) -> Vec<Student> {
    let students = store.students();
    aggregate::filter_by_class_and_search(&students, class_id, search)
        .into_iter()
        .cloned()
        .collect()
}

fn require_class(store: &Store, class_id: &str) -> Result<()> {
    if store.class(class_id).is_none() {
        return Err(RegisterError::NotFound {
            kind: "class",
            id: class_id.to_string(),
        });
    }
    Ok(())
}

pub fn add_student(store: &mut Store, id: &str, name: &str, class_id: &str) -> Result<Student> {
    let id = id.trim();
    let name = name.trim();
    if id.is_empty() || name.is_empty() || class_id.is_empty() {
        return Err(RegisterError::invalid("id, name and classId are required"));
    }
    require_class(store, class_id)?;
    let mut students = store.students();
    if students.iter().any(|s| s.id == id) {
        return Err(RegisterError::DuplicateIdentifier { id: id.to_string() });
    }
    let student = Student {
        id: id.to_string(),
        name: name.to_string(),
        class_id: class_id.to_string(),
    };
    students.push(student.clone());
    store.save_students(students)?;
    Ok(student)
}

/// Renames or reassigns a student. Existing attendance rows keep the class
/// they were marked under.
pub fn update_student(
    store: &mut Store,
    id: &str,
    name: Option<&str>,
    class_id: Option<&str>,
) -> Result<Student> {
    if let Some(c) = class_id {
        require_class(store, c)?;
    }
    let mut students = store.students();
    let Some(slot) = students.iter_mut().find(|s| s.id == id) else {
        return Err(RegisterError::NotFound {
            kind: "student",
            id: id.to_string(),
        });
    };
    if let Some(n) = name {
        let n = n.trim();
        if n.is_empty() {
            return Err(RegisterError::invalid("name must not be empty"));
        }
        slot.name = n.to_string();
    }
    if let Some(c) = class_id {
        slot.class_id = c.to_string();
    }
    let updated = slot.clone();
    store.save_students(students)?;
    Ok(updated)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Later rows replace earlier rows and existing students with the same id,
    /// keeping the position of the first occurrence.
    Replace,
    /// Rows whose id is already taken are rejected; the rest are added.
    SkipExisting,
}

impl CollisionPolicy {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
            None | Some("replace") => Ok(CollisionPolicy::Replace),
            Some("skip_existing") => Ok(CollisionPolicy::SkipExisting),
            Some(other) => Err(RegisterError::invalid(format!(
                "collisionPolicy must be one of: replace, skip_existing (got {other})"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollisionPolicy::Replace => "replace",
            CollisionPolicy::SkipExisting => "skip_existing",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub added: usize,
    pub replaced: usize,
    pub rejected: Vec<String>,
    pub skipped: usize,
}

/// Adds imported identities to `class_id` and persists the roster in one write.
pub fn import_students(
    store: &mut Store,
    class_id: &str,
    identities: Vec<ImportedIdentity>,
    skipped: usize,
    policy: CollisionPolicy,
) -> Result<ImportOutcome> {
    require_class(store, class_id)?;
    let mut students = store.students();
    let mut outcome = ImportOutcome {
        skipped,
        ..ImportOutcome::default()
    };
    for identity in identities {
        let incoming = Student {
            id: identity.id,
            name: identity.name,
            class_id: class_id.to_string(),
        };
        match students.iter().position(|s| s.id == incoming.id) {
            Some(pos) if policy == CollisionPolicy::Replace => {
                students[pos] = incoming;
                outcome.replaced += 1;
            }
            Some(_) => {
                let err = RegisterError::DuplicateIdentifier {
                    id: incoming.id.clone(),
                };
                warn!(error = %err, "import row rejected");
                outcome.rejected.push(incoming.id);
            }
            None => {
                students.push(incoming);
                outcome.added += 1;
            }
        }
    }

    store.save_students(students)?;
    info!(
        class_id,
        added = outcome.added,
        replaced = outcome.replaced,
        rejected = outcome.rejected.len(),
        skipped = outcome.skipped,
        policy = policy.as_str(),
        "students imported"
    );
    Ok(outcome)
}
