use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cascade::Confirmation;
use crate::config::Settings;
use crate::db::SqliteKv;
use crate::store::Store;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Store>,
    pub confirmation: Confirmation,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        AppState {
            workspace: None,
            store: None,
            confirmation: Confirmation::new(settings.confirm_code),
        }
    }

    /// Switches to the register stored under `path`, creating it if needed.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let kv = SqliteKv::open(path)?;
        self.store = Some(Store::new(kv));
        self.workspace = Some(path.to_path_buf());
        Ok(())
    }
}
