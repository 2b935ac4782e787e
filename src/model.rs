use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const WEEK_DAYS: [&str; 7] = [
    "الأحد",
    "الاثنين",
    "الثلاثاء",
    "الأربعاء",
    "الخميس",
    "الجمعة",
    "السبت",
];

pub const DEFAULT_START_TIME: &str = "08:00";
pub const DEFAULT_END_TIME: &str = "12:00";

/// Sunday through Thursday.
pub fn default_days() -> Vec<String> {
    WEEK_DAYS.iter().take(5).map(|d| d.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    PeKit,
    Justified,
    Absent,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::PeKit,
        AttendanceStatus::Justified,
        AttendanceStatus::Absent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::PeKit => "pe_kit",
            AttendanceStatus::Justified => "justified",
            AttendanceStatus::Absent => "absent",
        }
    }

    /// Single-letter register notation.
    pub fn letter(self) -> char {
        match self {
            AttendanceStatus::Present => 'ح',
            AttendanceStatus::PeKit => 'أ',
            AttendanceStatus::Justified => 'ب',
            AttendanceStatus::Absent => 'ج',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "حاضر (ح)",
            AttendanceStatus::PeKit => "بدون بدلة (أ)",
            AttendanceStatus::Justified => "مبرر (ب)",
            AttendanceStatus::Absent => "غياب (ج)",
        }
    }

    /// Counted towards the presence rate.
    pub fn is_physically_present(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::PeKit)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "pe_kit" => Ok(AttendanceStatus::PeKit),
            "justified" => Ok(AttendanceStatus::Justified),
            "absent" => Ok(AttendanceStatus::Absent),
            other => Err(format!(
                "status must be one of: present, pe_kit, justified, absent (got {other:?})"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub class_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub school_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default)]
    pub teacher_name: String,
    #[serde(default = "default_start")]
    pub start_time: String,
    #[serde(default = "default_end")]
    pub end_time: String,
    #[serde(default)]
    pub days: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub student_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub class_id: String,
    pub status: AttendanceStatus,
    pub date: String,
}

fn default_start() -> String {
    DEFAULT_START_TIME.to_string()
}

fn default_end() -> String {
    DEFAULT_END_TIME.to_string()
}

/// The classes a fresh store reports before anything has ever been saved.
pub fn seed_classes() -> Vec<Class> {
    let seed = |id: &str, name: &str, start: &str, end: &str| Class {
        id: id.to_string(),
        name: name.to_string(),
        school_name: "مدرسة النجاح الابتدائية".to_string(),
        province: None,
        teacher_name: "..........................".to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        days: default_days(),
    };
    vec![
        seed("c1", "القسم الأول", "08:00", "12:00"),
        seed("c2", "القسم الثاني", "13:00", "17:00"),
    ]
}

// Spreadsheet exports routinely carry numeric ids; they compare equal to their
// decimal string form everywhere else.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_wire_names_are_snake_case() {
        let v = serde_json::to_value(AttendanceStatus::PeKit).expect("serialize");
        assert_eq!(v, json!("pe_kit"));
        let back: AttendanceStatus = serde_json::from_value(json!("justified")).expect("parse");
        assert_eq!(back, AttendanceStatus::Justified);
        assert!(serde_json::from_value::<AttendanceStatus>(json!("late")).is_err());
    }

    #[test]
    fn numeric_ids_are_normalised_to_strings() {
        let s: Student =
            serde_json::from_value(json!({ "id": 123456, "name": "Ali", "classId": "c1" }))
                .expect("parse student");
        assert_eq!(s.id, "123456");
    }

    #[test]
    fn class_province_is_optional_on_the_wire() {
        let c: Class = serde_json::from_value(json!({
            "id": "c9",
            "name": "4A",
            "schoolName": "School",
            "teacherName": "T",
            "startTime": "08:00",
            "endTime": "12:00",
            "days": ["الأحد"]
        }))
        .expect("parse class");
        assert_eq!(c.province, None);
        let out = serde_json::to_value(&c).expect("serialize");
        assert!(out.get("province").is_none());
        assert_eq!(out["schoolName"], json!("School"));
    }

    #[test]
    fn seed_has_two_classes() {
        let seed = seed_classes();
        assert_eq!(seed.len(), 2);
        assert_eq!(seed[0].id, "c1");
        assert_eq!(seed[1].start_time, "13:00");
        assert_eq!(seed[0].days.len(), 5);
    }
}
