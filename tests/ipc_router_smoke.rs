use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
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

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rollcalld");
    let mut child = Command::new(exe)
        .env_remove("ROLLCALL_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rollcalld");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

const STORE_METHODS: [&str; 24] = [
    "classes.list",
    "classes.create",
    "classes.update",
    "classes.delete",
    "classes.clearRoster",
    "students.list",
    "students.create",
    "students.update",
    "students.delete",
    "students.importRows",
    "students.importCsv",
    "attendance.dayOpen",
    "attendance.commitDay",
    "attendance.fillUnmarked",
    "history.query",
    "dashboard.summary",
    "reports.classSummary",
    "reports.register",
    "reports.registerCsv",
    "backup.export",
    "backup.import",
    "backup.preview",
    "backup.exportBundle",
    "backup.importBundle",
];

fn code_of(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn every_method_is_routed_and_needs_a_workspace() {
    let workspace = temp_dir("rollcall-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // Before a workspace is selected, store-backed methods refuse cleanly.
    for (i, method) in STORE_METHODS.iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &format!("pre-{i}"), method, json!({}));
        let code = code_of(&resp);
        assert_ne!(code, Some("not_implemented"), "{} is not routed", method);
        assert!(
            matches!(code, Some("no_workspace") | Some("bad_params")),
            "{} answered {}",
            method,
            resp
        );
    }

    let health = request(&mut stdin, &mut reader, "h", "health", json!({}));
    assert_eq!(health["ok"].as_bool(), Some(true));
    assert!(health["result"]["workspacePath"].is_null());

    let selected = request(
        &mut stdin,
        &mut reader,
        "w",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["ok"].as_bool(), Some(true));
    assert!(workspace.join("rollcall.sqlite3").is_file());

    let unknown = request(&mut stdin, &mut reader, "u", "grades.compute", json!({}));
    assert_eq!(code_of(&unknown), Some("not_implemented"));

    // Malformed lines get an id-less error and the loop keeps going.
    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush garbage");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json response");
    let bad: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(code_of(&bad), Some("bad_json"));

    let listed = request(&mut stdin, &mut reader, "l", "classes.list", json!({}));
    assert_eq!(listed["ok"].as_bool(), Some(true));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn workspace_survives_restart() {
    let workspace = temp_dir("rollcall-router-restart");
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        request(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let created = request(
            &mut stdin,
            &mut reader,
            "2",
            "students.create",
            json!({ "id": "42", "name": "Persisted", "classId": "c2" }),
        );
        assert_eq!(created["ok"].as_bool(), Some(true));
        drop(stdin);
        let _ = child.wait();
    }

    let exe = env!("CARGO_BIN_EXE_rollcalld");
    let mut child = Command::new(exe)
        .env("ROLLCALL_WORKSPACE", &workspace)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rollcalld");
    let mut stdin = child.stdin.take().expect("child stdin");
    let mut reader = BufReader::new(child.stdout.take().expect("child stdout"));
    let listed = request(&mut stdin, &mut reader, "3", "students.list", json!({ "classId": "c2" }));
    assert_eq!(listed["result"]["students"][0]["name"], "Persisted");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
