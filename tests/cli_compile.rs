use predicates::prelude::*;
use serde_json::Value;

#[test]
fn compile_reads_stdin_and_prints_requests() -> anyhow::Result<()> {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docpatch");
    let output = cmd
        .args(["compile", "--input", "-", "--start", "1"])
        .write_stdin("# Title\n\nSome **bold** text")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["length"], 21);
    let requests = value["requests"].as_array().expect("requests array");
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0]["insertText"]["location"]["index"], 1);
    assert_eq!(requests[0]["insertText"]["text"], "Title\n\nSome bold text");
    assert_eq!(requests[1]["updateTextStyle"]["range"]["startIndex"], 1);
    assert_eq!(requests[1]["updateTextStyle"]["range"]["endIndex"], 6);
    assert_eq!(requests[2]["updateTextStyle"]["range"]["startIndex"], 13);
    assert_eq!(requests[2]["updateTextStyle"]["range"]["endIndex"], 17);
    Ok(())
}

#[test]
fn compile_reads_file_input_at_offset() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let input = temp.path().join("value.md");
    std::fs::write(&input, "[site](https://example.com)\n")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docpatch");
    let output = cmd
        .args(["compile", "--start", "40", "--input"])
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["length"], 4);
    assert_eq!(
        value["requests"][1]["updateTextStyle"]["textStyle"]["link"]["url"],
        "https://example.com"
    );
    assert_eq!(value["requests"][1]["updateTextStyle"]["fields"], "link");
    assert_eq!(value["requests"][1]["updateTextStyle"]["range"]["startIndex"], 40);
    Ok(())
}

#[test]
fn compile_of_blank_input_is_empty() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docpatch");
    cmd.args(["compile", "--input", "-"])
        .write_stdin("\n\n\n")
        .assert()
        .success()
        .stdout("{\"requests\":[],\"length\":0}\n");
}

#[test]
fn missing_input_file_reports_path() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docpatch");
    cmd.args(["compile", "--input", "/nonexistent/value.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read input: /nonexistent/value.md"));
}

#[test]
fn docpatch_log_debug_emits_debug_line_to_stderr() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docpatch");
    cmd.env("DOCPATCH_LOG", "debug")
        .args(["compile", "--input", "-"])
        .write_stdin("x")
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
