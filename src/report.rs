//! Printable register: the filtered ledger laid out as pages of students
//! against date columns.

use serde::Serialize;

use crate::aggregate::ALL_CLASSES;
use crate::import::csv_quote;
use crate::model::{AttendanceRecord, AttendanceStatus, Class, Student};
use crate::views::{self, non_blank_or_placeholder, HistoryFilter, ALL_CLASSES_NAME, PLACEHOLDER};

pub const PAGE_SIZE: usize = 45;
pub const REGISTER_TITLE: &str = "سجل المناداة";
pub const NAME_COLUMN: &str = "الاسم واللقب";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterHeader {
    pub province: String,
    pub school_name: String,
    pub teacher_name: String,
    pub class_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterColumn {
    pub date: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRow {
    pub student_id: String,
    pub name: String,
    /// One status letter per column, empty where the student has no record.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPage {
    pub number: usize,
    pub page_count: usize,
    pub label: String,
    pub rows: Vec<RegisterRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub letter: char,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Register {
    pub title: &'static str,
    pub header: RegisterHeader,
    pub columns: Vec<RegisterColumn>,
    pub legend: Vec<LegendEntry>,
    pub pages: Vec<RegisterPage>,
}

/// `2024-05-09` -> `09/05`.
pub fn day_month_label(date: &str) -> String {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() == 3 {
        format!("{}/{}", parts[2], parts[1])
    } else {
        date.to_string()
    }
}

fn header_for(classes: &[Class], class_id: &str) -> RegisterHeader {
    let class = if class_id == ALL_CLASSES {
        None
    } else {
        classes.iter().find(|c| c.id == class_id)
    };
    match class {
        Some(c) => RegisterHeader {
            province: c
                .province
                .as_deref()
                .map(non_blank_or_placeholder)
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            school_name: non_blank_or_placeholder(&c.school_name),
            teacher_name: non_blank_or_placeholder(&c.teacher_name),
            class_name: c.name.clone(),
        },
        None => RegisterHeader {
            province: PLACEHOLDER.to_string(),
            school_name: PLACEHOLDER.to_string(),
            teacher_name: PLACEHOLDER.to_string(),
            class_name: ALL_CLASSES_NAME.to_string(),
        },
    }
}

/// Students and columns come from the same selection as the history view.
pub fn build_register(
    students: &[Student],
    classes: &[Class],
    records: &[AttendanceRecord],
    filter: &HistoryFilter,
) -> Register {
    let history = views::history(students, classes, records, filter);
    let columns: Vec<RegisterColumn> = history
        .dates
        .iter()
        .map(|d| RegisterColumn {
            date: d.clone(),
            label: day_month_label(d),
        })
        .collect();

    let rows: Vec<RegisterRow> = history
        .students
        .iter()
        .map(|entry| RegisterRow {
            student_id: entry.student.id.clone(),
            name: entry.student.name.clone(),
            cells: columns
                .iter()
                .map(|col| {
                    entry
                        .records
                        .iter()
                        .find(|r| r.date == col.date)
                        .map(|r| r.status.letter().to_string())
                        .unwrap_or_default()
                })
                .collect(),
        })
        .collect();

    let page_count = rows.len().div_ceil(PAGE_SIZE);
    let pages = rows
        .chunks(PAGE_SIZE)
        .enumerate()
        .map(|(i, chunk)| RegisterPage {
            number: i + 1,
            page_count,
            label: format!("صفحة {} من {}", i + 1, page_count),
            rows: chunk.to_vec(),
        })
        .collect();

    Register {
        title: REGISTER_TITLE,
        header: header_for(classes, filter.class_id()),
        columns,
        legend: AttendanceStatus::ALL
            .iter()
            .map(|s| LegendEntry {
                letter: s.letter(),
                label: s.label(),
            })
            .collect(),
        pages,
    }
}

/// One header line, then one line per student across every page.
pub fn register_csv(register: &Register) -> String {
    let mut out = String::new();
    let mut header = vec![csv_quote(NAME_COLUMN)];
    header.extend(register.columns.iter().map(|c| csv_quote(&c.label)));
    out.push_str(&header.join(","));
    out.push('\n');
    for row in register.pages.iter().flat_map(|p| p.rows.iter()) {
        let mut line = vec![csv_quote(&row.name)];
        line.extend(row.cells.iter().map(|c| csv_quote(c)));
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}
