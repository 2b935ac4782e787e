use serde_json::{json, Value};

use crate::cascade;
use crate::ipc::helpers::{
    opt_id, opt_str, required_id, required_str, respond, store, store_mut, to_value, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, ClassDraft};

fn draft_from_params(params: &Value) -> Result<ClassDraft, HandlerErr> {
    let days = match params.get("days") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|d| {
                    d.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| HandlerErr::bad_params("days must be a list of strings"))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(_) => return Err(HandlerErr::bad_params("days must be a list of strings")),
    };
    Ok(ClassDraft {
        name: required_str(params, "name")?.to_string(),
        school_name: required_str(params, "schoolName")?.to_string(),
        province: opt_str(params, "province").map(str::to_string),
        teacher_name: opt_str(params, "teacherName").unwrap_or("").to_string(),
        start_time: opt_str(params, "startTime").map(str::to_string),
        end_time: opt_str(params, "endTime").map(str::to_string),
        days,
    })
}

fn handle_list(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let store = store(state)?;
    Ok(json!({ "classes": to_value(&roster::list_classes(store))? }))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let draft = draft_from_params(&req.params)?;
    let class = roster::create_class(store_mut(state)?, draft)?;
    Ok(json!({ "class": to_value(&class)? }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = required_id(&req.params, "classId")?;
    let draft = draft_from_params(&req.params)?;
    let class = roster::update_class(store_mut(state)?, &class_id, draft)?;
    Ok(json!({ "class": to_value(&class)? }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = required_id(&req.params, "classId")?;
    let token = opt_id(&req.params, "confirmCode");
    let confirmation = state.confirmation.clone();
    let outcome =
        cascade::delete_class(store_mut(state)?, &confirmation, token.as_deref(), &class_id)?;
    to_value(&outcome)
}

fn handle_clear_roster(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = required_id(&req.params, "classId")?;
    let token = opt_id(&req.params, "confirmCode");
    let confirmation = state.confirmation.clone();
    let outcome =
        cascade::clear_class_roster(store_mut(state)?, &confirmation, token.as_deref(), &class_id)?;
    to_value(&outcome)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "classes.list" => handle_list(state, req),
        "classes.create" => handle_create(state, req),
        "classes.update" => handle_update(state, req),
        "classes.delete" => handle_delete(state, req),
        "classes.clearRoster" => handle_clear_roster(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
