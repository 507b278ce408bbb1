use assert_cmd::Command;
use predicates::prelude::*;

fn transcriptor() -> Command {
    Command::cargo_bin("transcriptor").unwrap()
}

#[test]
fn test_help_lists_commands() {
    transcriptor()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("layers"));
}

#[test]
fn test_layers_in_priority_order() {
    let output = transcriptor().arg("layers").assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();

    let bridge = text.find("page-bridge").unwrap();
    let data = text.find("page-data").unwrap();
    let panel = text.find("rendered-panel").unwrap();
    assert!(bridge < data && data < panel);
}

#[test]
fn test_extract_rejects_non_youtube_input() {
    transcriptor()
        .args(["extract", "https://example.com/watch?v=dQw4w9WgXcQ", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid video identifier"));
}

#[test]
fn test_extract_rejects_unknown_format() {
    transcriptor()
        .args(["extract", "dQw4w9WgXcQ", "--format", "docx"])
        .assert()
        .failure();
}
