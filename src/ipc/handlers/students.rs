use serde_json::{json, Value};
use std::path::PathBuf;

use crate::aggregate::ALL_CLASSES;
use crate::cascade;
use crate::error::RegisterError;
use crate::import::{self, Row};
use crate::ipc::helpers::{
    opt_id, opt_str, required_id, respond, store, store_mut, to_value, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, CollisionPolicy};

fn handle_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = opt_id(&req.params, "classId")
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| ALL_CLASSES.to_string());
    let search = opt_str(&req.params, "search").unwrap_or("");
    let students = roster::list_students(store(state)?, &class_id, search);
    Ok(json!({ "students": to_value(&students)? }))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = required_id(&req.params, "id")?;
    let name = opt_str(&req.params, "name").unwrap_or("");
    let class_id = required_id(&req.params, "classId")?;
    let student = roster::add_student(store_mut(state)?, &id, name, &class_id)?;
    Ok(json!({ "student": to_value(&student)? }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = required_id(&req.params, "studentId")?;
    let name = opt_str(&req.params, "name");
    let class_id = opt_id(&req.params, "classId");
    let student =
        roster::update_student(store_mut(state)?, &id, name, class_id.as_deref())?;
    Ok(json!({ "student": to_value(&student)? }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = required_id(&req.params, "studentId")?;
    let token = opt_id(&req.params, "confirmCode");
    let confirmation = state.confirmation.clone();
    let outcome =
        cascade::delete_student(store_mut(state)?, &confirmation, token.as_deref(), &id)?;
    to_value(&outcome)
}

fn import_rows(state: &mut AppState, req: &Request, rows: Vec<Row>) -> Result<Value, HandlerErr> {
    let class_id = required_id(&req.params, "classId")?;
    let policy = CollisionPolicy::parse(opt_str(&req.params, "collisionPolicy"))?;
    let resolved = import::resolve_rows(&rows);
    let outcome = roster::import_students(
        store_mut(state)?,
        &class_id,
        resolved.identities,
        resolved.skipped,
        policy,
    )?;
    let mut result = to_value(&outcome)?;
    result["collisionPolicy"] = json!(policy.as_str());
    Ok(result)
}

fn handle_import_rows(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let Some(values) = req.params.get("rows").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing params.rows"));
    };
    let rows = import::rows_from_json(values);
    import_rows(state, req, rows)
}

fn handle_import_csv(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let text = match (opt_str(&req.params, "csv"), opt_str(&req.params, "path")) {
        (Some(csv), _) => csv.to_string(),
        (None, Some(path)) => {
            std::fs::read_to_string(path).map_err(|source| RegisterError::Io {
                path: PathBuf::from(path),
                source,
            })?
        }
        (None, None) => return Err(HandlerErr::bad_params("missing params.csv or params.path")),
    };
    let rows = import::rows_from_csv(&text);
    import_rows(state, req, rows)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_list(state, req),
        "students.create" => handle_create(state, req),
        "students.update" => handle_update(state, req),
        "students.delete" => handle_delete(state, req),
        "students.importRows" => handle_import_rows(state, req),
        "students.importCsv" => handle_import_csv(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
