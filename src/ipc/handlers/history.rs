use chrono::Local;
use serde_json::Value;

use crate::ipc::helpers::{opt_id, opt_str, respond, store, to_value, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use crate::views::{self, HistoryFilter};

/// Shared by the history query and the register reports.
pub fn filter_from_params(params: &Value) -> HistoryFilter {
    HistoryFilter {
        class_id: opt_id(params, "classId").unwrap_or_default(),
        search: opt_str(params, "search").unwrap_or("").to_string(),
        start: opt_str(params, "start").map(str::to_string),
        end: opt_str(params, "end").map(str::to_string),
    }
}

fn handle_query(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = store(state)?;
    let filter = filter_from_params(&req.params);
    let history = views::history(
        &store.students(),
        &store.classes(),
        &store.attendance(),
        &filter,
    );
    to_value(&history)
}

fn handle_dashboard(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let today = match opt_str(&req.params, "today") {
        Some(raw) => ledger::parse_day(raw)?,
        None => Local::now().date_naive(),
    };
    let store = store(state)?;
    let dashboard = views::dashboard(
        &store.students(),
        &store.classes(),
        &store.attendance(),
        today,
    );
    to_value(&dashboard)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "history.query" => handle_query(state, req),
        "dashboard.summary" => handle_dashboard(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
