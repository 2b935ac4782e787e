use anyhow::Context;
use serde_json::{json, Value};
use std::path::Path;

use crate::aggregate::ALL_CLASSES;
use crate::error::RegisterError;
use crate::ipc::handlers::history::filter_from_params;
use crate::ipc::helpers::{opt_id, opt_str, respond, store, to_value, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::report::{self, Register};
use crate::views;

fn handle_class_summary(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = opt_id(&req.params, "classId")
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| ALL_CLASSES.to_string());
    let store = store(state)?;
    let classes = store.classes();
    if class_id != ALL_CLASSES && !classes.iter().any(|c| c.id == class_id) {
        return Err(RegisterError::NotFound {
            kind: "class",
            id: class_id,
        }
        .into());
    }
    to_value(&views::class_summary(&classes, &store.attendance(), &class_id))
}

fn build(state: &AppState, req: &Request) -> Result<Register, HandlerErr> {
    let store = store(state)?;
    Ok(report::build_register(
        &store.students(),
        &store.classes(),
        &store.attendance(),
        &filter_from_params(&req.params),
    ))
}

fn handle_register(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    to_value(&build(state, req)?)
}

fn handle_register_csv(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let register = build(state, req)?;
    let csv = report::register_csv(&register);
    let rows: usize = register.pages.iter().map(|p| p.rows.len()).sum();
    match opt_str(&req.params, "outPath") {
        Some(out) => {
            let out_path = Path::new(out);
            write_text(out_path, &csv).map_err(|e| HandlerErr::io_failed(e, out_path))?;
            Ok(json!({ "path": out, "rows": rows }))
        }
        None => Ok(json!({ "csv": csv, "rows": rows })),
    }
}

fn write_text(out_path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(out_path, text)
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "reports.classSummary" => handle_class_summary(state, req),
        "reports.register" => handle_register(state, req),
        "reports.registerCsv" => handle_register_csv(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
