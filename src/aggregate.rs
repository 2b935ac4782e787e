use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{AttendanceRecord, AttendanceStatus, Student, WEEK_DAYS};

/// Matches every class in class filters.
pub const ALL_CLASSES: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub present: usize,
    pub pe_kit: usize,
    pub justified: usize,
    pub absent: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::PeKit => self.pe_kit += 1,
            AttendanceStatus::Justified => self.justified += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
    }

    pub fn get(&self, status: AttendanceStatus) -> usize {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::PeKit => self.pe_kit,
            AttendanceStatus::Justified => self.justified,
            AttendanceStatus::Absent => self.absent,
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.pe_kit + self.justified + self.absent
    }

    pub fn physically_present(&self) -> usize {
        AttendanceStatus::ALL
            .iter()
            .filter(|s| s.is_physically_present())
            .map(|s| self.get(*s))
            .sum()
    }

    /// Percentage of physically present records; 0 when there are none.
    pub fn presence_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.physically_present() as f64 / total as f64 * 100.0
    }
}

pub fn filter_by_date_range<'a>(
    records: &'a [AttendanceRecord],
    start: Option<&str>,
    end: Option<&str>,
) -> Vec<&'a AttendanceRecord> {
    records
        .iter()
        .filter(|r| in_range(&r.date, start, end))
        .collect()
}

/// Inclusive bounds; empty or missing bounds are unconstrained.
pub fn in_range(date: &str, start: Option<&str>, end: Option<&str>) -> bool {
    if let Some(s) = start.filter(|s| !s.is_empty()) {
        if date < s {
            return false;
        }
    }
    if let Some(e) = end.filter(|e| !e.is_empty()) {
        if date > e {
            return false;
        }
    }
    true
}

pub fn matches_class_and_search(student: &Student, class_id: &str, term: &str) -> bool {
    let class_ok = class_id == ALL_CLASSES || student.class_id == class_id;
    let search_ok = term.is_empty() || student.name.contains(term) || student.id.contains(term);
    class_ok && search_ok
}

pub fn filter_by_class_and_search<'a>(
    students: &'a [Student],
    class_id: &str,
    term: &str,
) -> Vec<&'a Student> {
    students
        .iter()
        .filter(|s| matches_class_and_search(s, class_id, term))
        .collect()
}

/// Report scope by the class recorded on each row.
pub fn records_for_class<'a>(
    records: &'a [AttendanceRecord],
    class_id: &str,
) -> Vec<&'a AttendanceRecord> {
    records
        .iter()
        .filter(|r| class_id == ALL_CLASSES || r.class_id == class_id)
        .collect()
}

/// Most recent first within each student.
pub fn group_by_student<'a, I>(records: I) -> BTreeMap<String, Vec<&'a AttendanceRecord>>
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut groups: BTreeMap<String, Vec<&'a AttendanceRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.student_id.clone()).or_default().push(r);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| b.date.cmp(&a.date));
    }
    groups
}

pub fn summary_counts<'a, I>(records: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut counts = StatusCounts::default();
    for r in records {
        counts.add(r.status);
    }
    counts
}

pub fn presence_rate<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    summary_counts(records).presence_rate()
}

/// Nearest whole percent, used beside individual students.
pub fn round_whole(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// One decimal, used on report headers.
pub fn round_tenth(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySeries {
    pub date: String,
    pub weekday: &'static str,
    pub counts: StatusCounts,
}

/// `n` consecutive days ending at `reference`, oldest first. Days without
/// records are present with zero counts.
pub fn last_n_days_series(
    records: &[AttendanceRecord],
    n: usize,
    reference: NaiveDate,
) -> Vec<DaySeries> {
    let mut by_date: BTreeMap<&str, StatusCounts> = BTreeMap::new();
    for r in records {
        by_date.entry(r.date.as_str()).or_default().add(r.status);
    }
    (0..n)
        .rev()
        .map(|back| {
            let day = reference - Duration::days(back as i64);
            let date = day.format("%Y-%m-%d").to_string();
            let counts = by_date.get(date.as_str()).copied().unwrap_or_default();
            DaySeries {
                weekday: WEEK_DAYS[day.weekday().num_days_from_sunday() as usize],
                date,
                counts,
            }
        })
        .collect()
}
