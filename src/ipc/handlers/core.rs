use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

use crate::ipc::helpers::{required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};

fn handle_health(state: &AppState) -> Value {
    let store = state.store.as_ref();
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.display().to_string()),
        "initialized": store.map(|s| s.initialized()),
        "lastImport": store.and_then(|s| s.last_import()),
    })
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let path = PathBuf::from(required_str(&req.params, "path")?);
    state.open_workspace(&path).map_err(|e| HandlerErr {
        code: "db_open_failed",
        message: format!("{e:#}"),
        details: Some(json!({ "path": path.display().to_string() })),
    })?;
    info!(workspace = %path.display(), "workspace selected");
    Ok(json!({ "workspacePath": path.display().to_string() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "health" => Ok(handle_health(state)),
        "workspace.select" => handle_workspace_select(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
