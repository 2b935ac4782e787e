use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::store::KvBackend;

pub const DB_FILE: &str = "rollcall.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    // One row per store slot; values are whole JSON documents.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = open_db(workspace)
            .with_context(|| format!("failed to open workspace {}", workspace.to_string_lossy()))?;
        Ok(SqliteKv { conn })
    }
}

impl KvBackend for SqliteKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()?;
        Ok(value)
    }

    fn put_all(&mut self, entries: &[(&str, String)]) -> anyhow::Result<()> {
        let tx = self.conn.transaction()?;
        let now = chrono::Utc::now().to_rfc3339();
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv(key, value, updated_at)
                 VALUES(?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                (key, value, &now),
            )
            .with_context(|| format!("failed to write slot {key}"))?;
        }
        tx.commit().context("failed to commit store write")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn values_survive_reopen() {
        let workspace = temp_dir("rollcall-db-reopen");
        {
            let mut kv = SqliteKv::open(&workspace).expect("open");
            kv.put_all(&[("students", "[]".to_string()), ("initialized", "true".to_string())])
                .expect("write");
            kv.put_all(&[("students", "[1]".to_string())]).expect("overwrite");
        }
        let kv = SqliteKv::open(&workspace).expect("reopen");
        assert_eq!(kv.get("students").expect("get").as_deref(), Some("[1]"));
        assert_eq!(kv.get("initialized").expect("get").as_deref(), Some("true"));
        assert_eq!(kv.get("attendance").expect("get"), None);
        let _ = std::fs::remove_dir_all(workspace);
    }
}
