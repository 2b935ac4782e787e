use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::Result;
use crate::model::{self, AttendanceRecord, Class, Student};

/// Whole-value key/value persistence. `put_all` is one atomic write.
pub trait KvBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn put_all(&mut self, entries: &[(&str, String)]) -> anyhow::Result<()>;
}

/// Backend for unit tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryKv {
    values: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_raw(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
impl KvBackend for MemoryKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn put_all(&mut self, entries: &[(&str, String)]) -> anyhow::Result<()> {
        for (key, value) in entries {
            self.values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Students,
    Classes,
    Attendance,
    Initialized,
    LastImport,
}

impl Slot {
    pub fn key(self) -> &'static str {
        match self {
            Slot::Students => "students",
            Slot::Classes => "classes",
            Slot::Attendance => "attendance",
            Slot::Initialized => "initialized",
            Slot::LastImport => "last_import",
        }
    }
}

/// A set of whole-collection replacements persisted together.
#[derive(Debug, Default, Clone)]
pub struct Batch {
    students: Option<Vec<Student>>,
    classes: Option<Vec<Class>>,
    attendance: Option<Vec<AttendanceRecord>>,
    last_import: Option<String>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn students(mut self, students: Vec<Student>) -> Self {
        self.students = Some(students);
        self
    }

    pub fn classes(mut self, classes: Vec<Class>) -> Self {
        self.classes = Some(classes);
        self
    }

    pub fn attendance(mut self, attendance: Vec<AttendanceRecord>) -> Self {
        self.attendance = Some(attendance);
        self
    }

    /// Marks the batch as a backup restore stamped at `at`.
    pub fn restored_at(mut self, at: String) -> Self {
        self.last_import = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_none()
            && self.classes.is_none()
            && self.attendance.is_none()
            && self.last_import.is_none()
    }
}

/// Typed repository over the five store slots.
///
/// Every read materialises the whole collection; nothing is cached between
/// calls.
pub struct Store {
    backend: Box<dyn KvBackend>,
}

impl Store {
    pub fn new(backend: impl KvBackend + 'static) -> Self {
        Store {
            backend: Box::new(backend),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Store::new(MemoryKv::new())
    }

    pub fn students(&self) -> Vec<Student> {
        self.read_collection(Slot::Students).unwrap_or_default()
    }

    /// Stored classes, or the seed pair if classes were never saved.
    pub fn classes(&self) -> Vec<Class> {
        match self.read_collection(Slot::Classes) {
            Some(classes) => classes,
            None if self.initialized() => Vec::new(),
            None => model::seed_classes(),
        }
    }

    pub fn attendance(&self) -> Vec<AttendanceRecord> {
        self.read_collection(Slot::Attendance).unwrap_or_default()
    }

    pub fn initialized(&self) -> bool {
        matches!(self.read_raw(Slot::Initialized).as_deref(), Some("true"))
    }

    pub fn last_import(&self) -> Option<String> {
        self.read_raw(Slot::LastImport)
    }

    pub fn class(&self, class_id: &str) -> Option<Class> {
        self.classes().into_iter().find(|c| c.id == class_id)
    }

    pub fn roster(&self, class_id: &str) -> Vec<Student> {
        self.students()
            .into_iter()
            .filter(|s| s.class_id == class_id)
            .collect()
    }

    pub fn save_students(&mut self, students: Vec<Student>) -> Result<()> {
        self.apply(Batch::new().students(students))
    }

    pub fn save_classes(&mut self, classes: Vec<Class>) -> Result<()> {
        self.apply(Batch::new().classes(classes))
    }

    pub fn save_attendance(&mut self, attendance: Vec<AttendanceRecord>) -> Result<()> {
        self.apply(Batch::new().attendance(attendance))
    }

    /// Serialises every part of `batch` first, then writes it in one backend call.
    /// Writing classes or restoring a backup also sets the initialized flag.
    pub fn apply(&mut self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut entries: Vec<(&str, String)> = Vec::new();
        if let Some(students) = &batch.students {
            entries.push((Slot::Students.key(), serde_json::to_string(students)?));
        }
        if let Some(classes) = &batch.classes {
            entries.push((Slot::Classes.key(), serde_json::to_string(classes)?));
        }
        if let Some(attendance) = &batch.attendance {
            entries.push((Slot::Attendance.key(), serde_json::to_string(attendance)?));
        }
        if let Some(at) = &batch.last_import {
            entries.push((Slot::LastImport.key(), at.clone()));
        }
        if batch.classes.is_some() || batch.last_import.is_some() {
            entries.push((Slot::Initialized.key(), "true".to_string()));
        }
        self.backend.put_all(&entries)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn raw_slot(&self, slot: Slot) -> Option<String> {
        self.read_raw(slot)
    }

    fn read_raw(&self, slot: Slot) -> Option<String> {
        match self.backend.get(slot.key()) {
            Ok(v) => v,
            Err(e) => {
                warn!(slot = slot.key(), error = %e, "store read failed; treating as empty");
                None
            }
        }
    }

    fn read_collection<T: DeserializeOwned>(&self, slot: Slot) -> Option<Vec<T>> {
        let raw = self.read_raw(slot)?;
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(slot = slot.key(), error = %e, "stored collection is corrupt; treating as empty");
                Some(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttendanceStatus;

    fn student(id: &str, class_id: &str) -> Student {
        Student {
            id: id.to_string(),
            name: format!("Student {id}"),
            class_id: class_id.to_string(),
        }
    }

    #[test]
    fn fresh_store_reports_seed_classes() {
        let store = Store::in_memory();
        let classes = store.classes();
        assert_eq!(classes.len(), 2);
        assert!(!store.initialized());
        assert!(store.students().is_empty());
        assert!(store.attendance().is_empty());
    }

    #[test]
    fn saving_empty_classes_suppresses_seed() {
        let mut store = Store::in_memory();
        store.save_classes(Vec::new()).expect("save");
        assert!(store.initialized());
        assert!(store.classes().is_empty());
    }

    #[test]
    fn initialized_flag_without_classes_slot_reads_empty() {
        let mut kv = MemoryKv::new();
        kv.set_raw("initialized", "true");
        let store = Store::new(kv);
        assert!(store.classes().is_empty());
    }

    #[test]
    fn corrupt_slot_reads_as_empty() {
        let mut kv = MemoryKv::new();
        kv.set_raw("students", "{not json");
        kv.set_raw("attendance", "[{\"id\":1}]");
        let store = Store::new(kv);
        assert!(store.students().is_empty());
        assert!(store.attendance().is_empty());
    }

    #[test]
    fn corrupt_classes_slot_does_not_reseed() {
        let mut kv = MemoryKv::new();
        kv.set_raw("classes", "garbage");
        let store = Store::new(kv);
        assert!(store.classes().is_empty());
    }

    #[test]
    fn batch_writes_all_parts() {
        let mut store = Store::in_memory();
        let record = AttendanceRecord {
            id: "r1".into(),
            student_id: "1".into(),
            class_id: "c1".into(),
            status: AttendanceStatus::Present,
            date: "2024-05-01".into(),
        };
        store
            .apply(
                Batch::new()
                    .students(vec![student("1", "c1")])
                    .attendance(vec![record.clone()]),
            )
            .expect("apply");
        assert_eq!(store.students(), vec![student("1", "c1")]);
        assert_eq!(store.attendance(), vec![record]);
        // Classes untouched, so the seed rule still applies.
        assert!(!store.initialized());
        assert_eq!(store.roster("c1").len(), 1);
    }

    #[test]
    fn restore_stamps_last_import() {
        let mut store = Store::in_memory();
        store
            .apply(Batch::new().restored_at("2024-05-01T10:00:00.000Z".into()))
            .expect("apply");
        assert!(store.initialized());
        assert_eq!(store.last_import().as_deref(), Some("2024-05-01T10:00:00.000Z"));
    }
}
