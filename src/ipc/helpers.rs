use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::RegisterError;
pub use crate::ipc::error::HandlerErr;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::store::Store;

pub fn respond(req: &Request, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => {
            warn!(method = %req.method, code = e.code, message = %e.message, "request refused");
            e.response(&req.id)
        }
    }
}

pub fn to_value<T: Serialize>(value: &T) -> Result<Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| RegisterError::from(e).into())
}

pub fn store(state: &AppState) -> Result<&Store, HandlerErr> {
    state.store.as_ref().ok_or_else(HandlerErr::no_workspace)
}

pub fn store_mut(state: &mut AppState) -> Result<&mut Store, HandlerErr> {
    state.store.as_mut().ok_or_else(HandlerErr::no_workspace)
}

/// Strings, or numbers in their decimal form.
pub fn opt_id(params: &Value, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn required_id(params: &Value, key: &str) -> Result<String, HandlerErr> {
    opt_id(params, key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing params.{}", key)))
}

pub fn opt_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, HandlerErr> {
    opt_str(params, key).ok_or_else(|| HandlerErr::bad_params(format!("missing params.{}", key)))
}

pub fn opt_bool(params: &Value, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}
