//! Read-only projections that combine the three collections for display.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::aggregate::{
    self, matches_class_and_search, DaySeries, StatusCounts, ALL_CLASSES,
};
use crate::model::{AttendanceRecord, AttendanceStatus, Class, Student};

pub const PLACEHOLDER: &str = "..........................";
pub const ALL_CLASSES_NAME: &str = "جميع الأقسام";
pub const DASHBOARD_DAYS: usize = 7;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub today: String,
    pub total_students: usize,
    pub total_classes: usize,
    pub today_counts: StatusCounts,
    pub trend: Vec<DaySeries>,
}

pub fn dashboard(
    students: &[Student],
    classes: &[Class],
    records: &[AttendanceRecord],
    today: NaiveDate,
) -> Dashboard {
    let today_str = today.format("%Y-%m-%d").to_string();
    let today_counts = aggregate::summary_counts(records.iter().filter(|r| r.date == today_str));
    Dashboard {
        today: today_str,
        total_students: students.len(),
        total_classes: classes.len(),
        today_counts,
        trend: aggregate::last_n_days_series(records, DASHBOARD_DAYS, today),
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub class_id: String,
    pub search: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl HistoryFilter {
    pub fn class_id(&self) -> &str {
        if self.class_id.is_empty() {
            ALL_CLASSES
        } else {
            &self.class_id
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistory {
    pub student: Student,
    pub class_name: String,
    pub school_name: String,
    pub teacher_name: String,
    pub records: Vec<AttendanceRecord>,
    pub counts: StatusCounts,
    pub presence_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub summary: StatusCounts,
    pub record_count: usize,
    pub students: Vec<StudentHistory>,
    /// Sorted unique dates of the filtered records.
    pub dates: Vec<String>,
}

/// Filters on the student's current class, not the class recorded on the row.
/// Rows whose student no longer exists are dropped.
pub fn history(
    students: &[Student],
    classes: &[Class],
    records: &[AttendanceRecord],
    filter: &HistoryFilter,
) -> History {
    let class_id = filter.class_id();
    let by_id: HashMap<&str, &Student> = students.iter().map(|s| (s.id.as_str(), s)).collect();

    let filtered: Vec<&AttendanceRecord> =
        aggregate::filter_by_date_range(records, filter.start.as_deref(), filter.end.as_deref())
            .into_iter()
            .filter(|r| {
                by_id
                    .get(r.student_id.as_str())
                    .is_some_and(|s| matches_class_and_search(s, class_id, &filter.search))
            })
            .collect();

    let summary = aggregate::summary_counts(filtered.iter().copied());
    let mut groups = aggregate::group_by_student(filtered.iter().copied());

    let mut dates: Vec<String> = filtered.iter().map(|r| r.date.clone()).collect();
    dates.sort();
    dates.dedup();

    let class_by_id: HashMap<&str, &Class> = classes.iter().map(|c| (c.id.as_str(), c)).collect();
    let shown: Vec<&Student> = students
        .iter()
        .filter(|s| matches_class_and_search(s, class_id, &filter.search))
        .filter(|s| groups.contains_key(&s.id) || !filter.search.is_empty())
        .collect();
    let rows = shown
        .into_iter()
        .map(|s| {
            let records: Vec<AttendanceRecord> = groups
                .remove(&s.id)
                .unwrap_or_default()
                .into_iter()
                .cloned()
                .collect();
            let counts = aggregate::summary_counts(&records);
            let class = class_by_id.get(s.class_id.as_str());
            StudentHistory {
                class_name: class
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| "قسم غير معروف".to_string()),
                school_name: class.map(|c| c.school_name.clone()).unwrap_or_default(),
                teacher_name: class
                    .map(|c| non_blank_or_placeholder(&c.teacher_name))
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
                presence_rate: aggregate::round_whole(aggregate::presence_rate(&records)),
                counts,
                records,
                student: s.clone(),
            }
        })
        .collect();

    History {
        summary,
        record_count: filtered.len(),
        students: rows,
        dates,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSlice {
    pub status: AttendanceStatus,
    pub label: &'static str,
    pub value: usize,
    /// Share of all records in scope, 0 when there are none.
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub class_id: String,
    pub class_name: String,
    pub teacher_name: String,
    pub counts: StatusCounts,
    pub slices: Vec<StatusSlice>,
    pub total: usize,
    pub physically_present: usize,
    pub presence_rate: f64,
}

pub fn class_summary(classes: &[Class], records: &[AttendanceRecord], class_id: &str) -> ClassSummary {
    let counts = aggregate::summary_counts(aggregate::records_for_class(records, class_id));
    let class = classes.iter().find(|c| c.id == class_id);
    let (class_name, teacher_name) = if class_id == ALL_CLASSES {
        (ALL_CLASSES_NAME.to_string(), PLACEHOLDER.to_string())
    } else {
        (
            class.map(|c| c.name.clone()).unwrap_or_default(),
            class
                .map(|c| non_blank_or_placeholder(&c.teacher_name))
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        )
    };
    let total = counts.total();
    ClassSummary {
        class_id: class_id.to_string(),
        class_name,
        teacher_name,
        slices: AttendanceStatus::ALL
            .iter()
            .map(|s| StatusSlice {
                status: *s,
                label: s.label(),
                value: counts.get(*s),
                percent: share_percent(counts.get(*s), total),
            })
            .collect(),
        total,
        physically_present: counts.physically_present(),
        presence_rate: aggregate::round_tenth(counts.presence_rate()),
        counts,
    }
}

fn share_percent(value: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    aggregate::round_tenth(value as f64 / total as f64 * 100.0)
}

pub fn non_blank_or_placeholder(s: &str) -> String {
    if s.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        s.to_string()
    }
}
