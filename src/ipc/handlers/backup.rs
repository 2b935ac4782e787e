use serde_json::{json, Value};
use std::path::PathBuf;

use crate::backup;
use crate::bundle;
use crate::error::RegisterError;
use crate::ipc::helpers::{opt_bool, opt_str, respond, store, store_mut, to_value, HandlerErr};
use crate::ipc::types::{AppState, Request};

fn path_param(params: &Value, key: &str) -> Option<PathBuf> {
    opt_str(params, key)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// The backup document from `params.document`, or read from `params.path`.
fn document_param(params: &Value) -> Result<Value, HandlerErr> {
    if let Some(doc) = params.get("document").filter(|v| !v.is_null()) {
        return Ok(doc.clone());
    }
    let Some(path) = path_param(params, "path") else {
        return Err(HandlerErr::bad_params("missing params.path or params.document"));
    };
    Ok(backup::read_backup_file(&path)?)
}

fn handle_export(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let snapshot = backup::export_snapshot(store(state)?);
    let Some(out) = path_param(&req.params, "outPath") else {
        return Ok(json!({ "backup": to_value(&snapshot)? }));
    };
    backup::write_backup_file(&snapshot, &out).map_err(|e| HandlerErr::io_failed(e, &out))?;
    Ok(json!({
        "path": out.to_string_lossy(),
        "students": snapshot.students.len(),
        "classes": snapshot.classes.len(),
        "attendance": snapshot.attendance.len(),
        "exportDate": snapshot.export_date,
    }))
}

fn handle_import(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let doc = document_param(&req.params)?;
    let strict = opt_bool(&req.params, "strict");
    let summary = backup::import_snapshot(store_mut(state)?, &doc, strict)?;
    to_value(&summary)
}

fn handle_preview(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let doc = document_param(&req.params)?;
    let mut result = to_value(&backup::preview(&doc)?)?;
    result["lastImport"] = json!(state.store.as_ref().and_then(|s| s.last_import()));
    Ok(result)
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let Some(out) = path_param(&req.params, "outPath") else {
        return Err(HandlerErr::bad_params("missing params.outPath"));
    };
    let snapshot = backup::export_snapshot(store(state)?);
    let payload = serde_json::to_vec_pretty(&snapshot).map_err(RegisterError::from)?;
    let export = bundle::export_bundle(&payload, &out, &snapshot.export_date)
        .map_err(|e| HandlerErr::io_failed(e, &out))?;
    Ok(json!({
        "path": out.to_string_lossy(),
        "bundleFormat": export.bundle_format,
        "entryCount": export.entry_count,
        "sha256": export.sha256,
    }))
}

fn handle_import_bundle(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let Some(in_path) = path_param(&req.params, "inPath") else {
        return Err(HandlerErr::bad_params("missing params.inPath"));
    };
    let payload = bundle::read_bundle(&in_path).map_err(|e| HandlerErr {
        code: "malformed_backup",
        message: format!("{e:#}"),
        details: Some(json!({ "path": in_path.to_string_lossy() })),
    })?;
    let doc: Value = serde_json::from_slice(&payload.bytes)
        .map_err(|e| RegisterError::MalformedBackup(e.to_string()))?;
    let strict = opt_bool(&req.params, "strict");
    let summary = backup::import_snapshot(store_mut(state)?, &doc, strict)?;
    let mut result = to_value(&summary)?;
    result["bundleFormatDetected"] = json!(payload.bundle_format_detected);
    Ok(result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "backup.export" => handle_export(state, req),
        "backup.import" => handle_import(state, req),
        "backup.preview" => handle_preview(state, req),
        "backup.exportBundle" => handle_export_bundle(state, req),
        "backup.importBundle" => handle_import_bundle(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
