use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::RegisterError;
use crate::ipc::helpers::{opt_str, required_id, required_str, respond, store, store_mut, to_value, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use crate::model::AttendanceStatus;

fn parse_status(raw: &str) -> Result<AttendanceStatus, HandlerErr> {
    raw.parse::<AttendanceStatus>().map_err(HandlerErr::bad_params)
}

/// `params.marks` as `{ studentId: status }`; missing means no marks yet.
fn parse_marks(params: &Value) -> Result<BTreeMap<String, AttendanceStatus>, HandlerErr> {
    let obj = match params.get("marks") {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(obj)) => obj,
        Some(_) => return Err(HandlerErr::bad_params("marks must be an object")),
    };
    let mut marks = BTreeMap::new();
    for (student_id, raw) in obj {
        let Some(raw) = raw.as_str() else {
            return Err(HandlerErr::bad_params(format!(
                "status for student {} must be a string",
                student_id
            )));
        };
        marks.insert(student_id.trim().to_string(), parse_status(raw)?);
    }
    Ok(marks)
}

fn handle_day_open(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = required_id(&req.params, "classId")?;
    let date = required_str(&req.params, "date")?;
    let marks = ledger::day_marks(store(state)?, &class_id, date)?;
    let committed = marks.iter().any(|m| m.status.is_some());
    let rows: Vec<Value> = marks
        .iter()
        .map(|m| {
            json!({
                "studentId": m.student.id,
                "name": m.student.name,
                "status": m.status,
            })
        })
        .collect();
    Ok(json!({
        "classId": class_id,
        "date": date,
        "committed": committed,
        "rows": rows,
    }))
}

fn handle_commit_day(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = required_id(&req.params, "classId")?;
    let date = required_str(&req.params, "date")?;
    let marks = parse_marks(&req.params)?;
    let records = ledger::commit_day(store_mut(state)?, &class_id, date, &marks)?;
    Ok(json!({
        "count": records.len(),
        "records": to_value(&records)?,
    }))
}

fn handle_fill_unmarked(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = required_id(&req.params, "classId")?;
    let status = match opt_str(&req.params, "status") {
        Some(raw) => parse_status(raw)?,
        None => AttendanceStatus::Present,
    };
    let mut marks = parse_marks(&req.params)?;
    let store = store(state)?;
    if store.class(&class_id).is_none() {
        return Err(RegisterError::NotFound {
            kind: "class",
            id: class_id,
        }
        .into());
    }
    let filled = ledger::fill_unmarked(&mut marks, &store.roster(&class_id), status);
    Ok(json!({
        "filled": filled,
        "marks": to_value(&marks)?,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "attendance.dayOpen" => handle_day_open(state, req),
        "attendance.commitDay" => handle_commit_day(state, req),
        "attendance.fillUnmarked" => handle_fill_unmarked(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
