use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

use crate::error::{RegisterError, Result};
use crate::model::{AttendanceRecord, Class, Student};
use crate::store::{Batch, Store};

pub const BACKUP_VERSION: &str = "3.2";

const STUDENTS_KEY: &str = "students";
const CLASSES_KEY: &str = "classes";
const ATTENDANCE_KEY: &str = "attendance";

/// The on-disk backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullBackup {
    pub students: Vec<Student>,
    pub classes: Vec<Class>,
    pub attendance: Vec<AttendanceRecord>,
    pub export_date: String,
    pub version: String,
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn export_snapshot(store: &Store) -> FullBackup {
    FullBackup {
        students: store.students(),
        classes: store.classes(),
        attendance: store.attendance(),
        export_date: now_timestamp(),
        version: BACKUP_VERSION.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// `None` when the key was absent and the collection left as it was.
    pub students: Option<usize>,
    pub classes: Option<usize>,
    pub attendance: Option<usize>,
    pub restored_at: String,
}

fn as_document(doc: &Value) -> Result<&Map<String, Value>> {
    doc.as_object()
        .ok_or_else(|| RegisterError::MalformedBackup("expected a JSON object".to_string()))
}

fn decode_key<T: DeserializeOwned>(doc: &Map<String, Value>, key: &str) -> Result<Option<Vec<T>>> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Vec::<T>::deserialize(v)
            .map(Some)
            .map_err(|e| RegisterError::MalformedBackup(format!("{key}: {e}"))),
    }
}

/// Replaces each collection present in `doc`; absent keys leave their
/// collection untouched. All present keys are decoded before anything is
/// written, and the write is a single store call.
pub fn import_snapshot(store: &mut Store, doc: &Value, strict: bool) -> Result<ImportSummary> {
    let obj = as_document(doc)?;
    if strict {
        let missing: Vec<&str> = [STUDENTS_KEY, CLASSES_KEY, ATTENDANCE_KEY]
            .into_iter()
            .filter(|k| obj.get(*k).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(RegisterError::MalformedBackup(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
    }

    let students: Option<Vec<Student>> = decode_key(obj, STUDENTS_KEY)?;
    let classes: Option<Vec<Class>> = decode_key(obj, CLASSES_KEY)?;
    let attendance: Option<Vec<AttendanceRecord>> = decode_key(obj, ATTENDANCE_KEY)?;

    let restored_at = now_timestamp();
    let summary = ImportSummary {
        students: students.as_ref().map(Vec::len),
        classes: classes.as_ref().map(Vec::len),
        attendance: attendance.as_ref().map(Vec::len),
        restored_at: restored_at.clone(),
    };

    let mut batch = Batch::new().restored_at(restored_at);
    if let Some(v) = students {
        batch = batch.students(v);
    }
    match classes {
        Some(v) => batch = batch.classes(v),
        // The restore sets the initialized flag, which would hide the seed.
        None if !store.initialized() => batch = batch.classes(store.classes()),
        None => {}
    }
    if let Some(v) = attendance {
        batch = batch.attendance(v);
    }
    store.apply(batch)?;

    info!(
        students = ?summary.students,
        classes = ?summary.classes,
        attendance = ?summary.attendance,
        "backup restored"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPreview {
    pub students: Option<usize>,
    pub classes: Option<usize>,
    pub attendance: Option<usize>,
    pub export_date: Option<String>,
    pub version: Option<String>,
}

/// What an import of `doc` would replace. Nothing is written.
pub fn preview(doc: &Value) -> Result<BackupPreview> {
    let obj = as_document(doc)?;
    let count = |key: &str| -> Result<Option<usize>> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.len())),
            Some(_) => Err(RegisterError::MalformedBackup(format!("{key}: expected an array"))),
        }
    };
    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
    Ok(BackupPreview {
        students: count(STUDENTS_KEY)?,
        classes: count(CLASSES_KEY)?,
        attendance: count(ATTENDANCE_KEY)?,
        export_date: text("exportDate"),
        version: text("version"),
    })
}

pub fn write_backup_file(backup: &FullBackup, out_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let text = serde_json::to_string_pretty(backup).context("failed to serialize backup")?;
    std::fs::write(out_path, text)
        .with_context(|| format!("failed to write backup {}", out_path.to_string_lossy()))?;
    Ok(())
}

pub fn read_backup_file(in_path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(in_path).map_err(|source| RegisterError::Io {
        path: in_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| RegisterError::MalformedBackup(e.to_string()))
}
