use std::env;
use std::path::PathBuf;

pub const DEFAULT_CONFIRM_CODE: &str = "6723";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub workspace: Option<PathBuf>,
    pub confirm_code: String,
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            workspace: None,
            confirm_code: DEFAULT_CONFIRM_CODE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();
        Settings {
            workspace: non_empty("ROLLCALL_WORKSPACE").map(PathBuf::from),
            confirm_code: non_empty("ROLLCALL_CONFIRM_CODE").unwrap_or(defaults.confirm_code),
            log_filter: non_empty("ROLLCALL_LOG").unwrap_or(defaults.log_filter),
            log_json: parse_bool(lookup("ROLLCALL_LOG_JSON").as_deref(), defaults.log_json),
        }
    }
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    raw.and_then(|v| match v.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" | "off" | "OFF" => Some(false),
        _ => None,
    })
    .unwrap_or(default)
}
