mod aggregate;
mod backup;
mod bundle;
mod cascade;
mod config;
mod db;
mod error;
mod import;
mod ipc;
mod ledger;
mod model;
mod report;
mod roster;
mod store;
mod views;

use std::io::{self, BufRead, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(settings: &config::Settings) {
    let filter = EnvFilter::try_new(&settings.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    // stdout carries the protocol.
    let builder = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter);
    if settings.log_json {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }
}

fn main() {
    let settings = config::Settings::from_env();
    init_tracing(&settings);

    let mut state = ipc::AppState::new(settings.clone());
    if let Some(path) = &settings.workspace {
        match state.open_workspace(path) {
            Ok(()) => info!(workspace = %path.display(), "workspace opened"),
            Err(e) => {
                let message = format!("{e:#}");
                warn!(workspace = %path.display(), error = %message, "failed to open workspace");
            }
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let _ = writeln!(stdout, "{}", ipc::bad_json(e.to_string()));
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
