use serde_json::{json, Value};
use std::path::Path;

use crate::error::RegisterError;

pub fn ok(id: &str, result: Value) -> Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(id: &str, code: &str, message: impl Into<String>, details: Option<Value>) -> Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Reply to a line that did not parse as a request, so there is no id.
pub fn bad_json(message: impl Into<String>) -> Value {
    json!({
        "ok": false,
        "error": { "code": "bad_json", "message": message.into() },
    })
}

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn no_workspace() -> Self {
        HandlerErr {
            code: "no_workspace",
            message: "select a workspace first".to_string(),
            details: None,
        }
    }

    pub fn io_failed(e: anyhow::Error, path: &Path) -> Self {
        HandlerErr {
            code: "io_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "path": path.display().to_string() })),
        }
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<RegisterError> for HandlerErr {
    fn from(e: RegisterError) -> Self {
        HandlerErr {
            code: e.code(),
            details: e.details(),
            message: e.to_string(),
        }
    }
}
