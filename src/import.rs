use serde_json::Value;
use std::collections::BTreeMap;

/// Identifier columns, highest priority first.
pub const ID_COLUMNS: [&str; 4] = ["رقم التعريف", "ID", "رقم التسجيل", "id"];
pub const SURNAME_COLUMN: &str = "اللقب";
pub const GIVEN_NAME_COLUMN: &str = "الاسم";
/// Single full-name columns, highest priority first.
pub const NAME_COLUMNS: [&str; 4] = ["الاسم الكامل", "الاسم", "Name", "name"];

pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedIdentity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRows {
    pub identities: Vec<ImportedIdentity>,
    pub skipped: usize,
}

fn first_present<'a>(row: &'a Row, columns: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .filter_map(|c| row.get(*c))
        .map(|v| v.as_str())
        .find(|v| !v.trim().is_empty())
}

/// The identity a spreadsheet row describes, or `None` when it lacks a usable
/// id or name.
pub fn resolve_row(row: &Row) -> Option<ImportedIdentity> {
    let id = first_present(row, &ID_COLUMNS)?.trim().to_string();

    let surname = row.get(SURNAME_COLUMN).map(|s| s.trim()).unwrap_or("");
    let given = row.get(GIVEN_NAME_COLUMN).map(|s| s.trim()).unwrap_or("");
    let name = if !surname.is_empty() && !given.is_empty() {
        format!("{} {}", surname, given)
    } else {
        first_present(row, &NAME_COLUMNS)?.trim().to_string()
    };

    if id.is_empty() || name.is_empty() {
        return None;
    }
    Some(ImportedIdentity { id, name })
}

pub fn resolve_rows(rows: &[Row]) -> ResolvedRows {
    let mut out = ResolvedRows::default();
    for row in rows {
        match resolve_row(row) {
            Some(identity) => out.identities.push(identity),
            None => out.skipped += 1,
        }
    }
    out
}

/// Converts JSON row objects into string rows. Numbers are kept in their
/// decimal form; nulls and nested values are dropped.
pub fn rows_from_json(values: &[Value]) -> Vec<Row> {
    values
        .iter()
        .filter_map(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| {
                    let text = match v {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        _ => return None,
                    };
                    Some((k.trim().to_string(), text))
                })
                .collect()
        })
        .collect()
}

pub fn parse_csv_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '"' {
            if in_quotes && i + 1 < chars.len() && chars[i + 1] == '"' {
                buf.push('"');
                i += 2;
                continue;
            }
            in_quotes = !in_quotes;
            i += 1;
            continue;
        }
        if ch == ',' && !in_quotes {
            out.push(buf);
            buf = String::new();
            i += 1;
            continue;
        }
        buf.push(ch);
        i += 1;
    }
    out.push(buf);
    out
}

/// First non-blank line is the header. A leading BOM is ignored.
pub fn rows_from_csv(text: &str) -> Vec<Row> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let header: Vec<String> = parse_csv_record(header_line)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    lines
        .map(|line| {
            header
                .iter()
                .cloned()
                .zip(parse_csv_record(line))
                .filter(|(k, _)| !k.is_empty())
                .collect()
        })
        .collect()
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
