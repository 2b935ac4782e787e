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

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_default()
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn spreadsheet_rows_resolve_columns_and_collisions() {
    let workspace = temp_dir("rollcall-import-rows");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let rows = json!([
        { "رقم التعريف": 1001, "اللقب": "بن علي", "الاسم": "أحمد" },
        { "ID": "1002", "الاسم الكامل": "سارة قاسم" },
        { "رقم التسجيل": "1003", "Name": "Omar" },
        { "id": " ", "name": "No id" },
        { "ID": "1004" }
    ]);
    let outcome = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.importRows",
        json!({ "classId": "c1", "rows": rows }),
    );
    assert_eq!(outcome["added"].as_u64(), Some(3));
    assert_eq!(outcome["skipped"].as_u64(), Some(2));
    assert_eq!(outcome["collisionPolicy"], "replace");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "classId": "c1" }),
    );
    let students = listed["students"].as_array().expect("students");
    assert_eq!(students.len(), 3);
    assert_eq!(students[0]["id"], "1001");
    assert_eq!(students[0]["name"], "بن علي أحمد");

    let skipped = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.importRows",
        json!({
            "classId": "c2",
            "collisionPolicy": "skip_existing",
            "rows": [{ "ID": "1001", "Name": "Someone else" }, { "ID": "2001", "Name": "Lina" }]
        }),
    );
    assert_eq!(skipped["added"].as_u64(), Some(1));
    assert_eq!(skipped["rejected"], json!(["1001"]));

    let replaced = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.importRows",
        json!({ "classId": "c2", "rows": [{ "ID": "1001", "Name": "Moved" }] }),
    );
    assert_eq!(replaced["replaced"].as_u64(), Some(1));
    let c2 = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.list",
        json!({ "classId": "c2", "search": "Mov" }),
    );
    assert_eq!(c2["students"][0]["id"], "1001");

    let duplicate = request(
        &mut stdin,
        &mut reader,
        "7",
        "students.create",
        json!({ "id": "2001", "name": "Again", "classId": "c1" }),
    );
    assert_eq!(error_code(&duplicate), "duplicate_id");

    let bad_policy = request(
        &mut stdin,
        &mut reader,
        "8",
        "students.importRows",
        json!({ "classId": "c1", "collisionPolicy": "merge", "rows": [] }),
    );
    assert_eq!(error_code(&bad_policy), "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn csv_import_then_register_export() {
    let workspace = temp_dir("rollcall-import-csv");
    let out_dir = temp_dir("rollcall-register-out");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let csv_path = out_dir.join("roster.csv");
    std::fs::write(&csv_path, "\u{feff}ID,Name\n1,Ali\n2,\"Sara, K\"\n").expect("write csv");
    let outcome = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.importCsv",
        json!({ "classId": "c1", "path": csv_path.to_string_lossy() }),
    );
    assert_eq!(outcome["added"].as_u64(), Some(2));

    let inline = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.importCsv",
        json!({ "classId": "c1", "csv": "id,name\n3,Omar\n" }),
    );
    assert_eq!(inline["added"].as_u64(), Some(1));

    for (i, date) in ["2024-05-02", "2024-05-01"].iter().enumerate() {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("commit-{i}"),
            "attendance.commitDay",
            json!({
                "classId": "c1",
                "date": date,
                "marks": { "1": "present", "2": "pe_kit", "3": "absent" }
            }),
        );
    }

    let register = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "reports.register",
        json!({ "classId": "c1" }),
    );
    let labels: Vec<&str> = register["columns"]
        .as_array()
        .expect("columns")
        .iter()
        .filter_map(|c| c["label"].as_str())
        .collect();
    assert_eq!(labels, vec!["01/05", "02/05"]);
    assert_eq!(register["pages"].as_array().map(|p| p.len()), Some(1));
    assert_eq!(register["pages"][0]["rows"][1]["cells"], json!(["أ", "أ"]));
    assert_eq!(register["header"]["className"], "القسم الأول");

    let out = out_dir.join("register.csv");
    let written = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "reports.registerCsv",
        json!({ "classId": "c1", "outPath": out.to_string_lossy() }),
    );
    assert_eq!(written["rows"].as_u64(), Some(3));
    let text = std::fs::read_to_string(&out).expect("read register csv");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[2], "\"Sara, K\",أ,أ");
    assert_eq!(lines[3], "Omar,ج,ج");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(out_dir);
}
