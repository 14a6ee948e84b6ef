//! Integration tests for the `gp` CLI.
//!
//! Each test works in a temp directory with its own settings file, runs `gp`
//! as a subprocess and checks stdout, stderr and the plan file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use insta::assert_snapshot;

/// Path to the built `gp` binary.
fn gp_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gp"))
}

/// Run `gp` in `dir` with a private settings file, returning (stdout, stderr, success).
fn run_gp(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let settings = dir.join("settings.toml");
    let output = Command::new(gp_bin())
        .arg("--settings")
        .arg(&settings)
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run gp");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `gp` expecting success, return stdout.
fn run_gp_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_gp(dir, args);
    if !success {
        panic!(
            "gp {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// A plan with a two-level list on its first board.
fn create_packing_plan(dir: &Path) {
    run_gp_ok(dir, &["new", "trip.plan", "--board", "Packing", "--board", "Route"]);
    assert_eq!(
        run_gp_ok(dir, &["add", "trip.plan", "checkbox", "Pack", "--at", "0", "0"]).trim(),
        "0"
    );
    assert_eq!(
        run_gp_ok(dir, &["add", "trip.plan", "checkbox", "Tent", "--at", "1", "2"]).trim(),
        "1"
    );
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[test]
fn test_new_creates_plan_with_boards() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_gp_ok(tmp.path(), &["new", "a.plan", "--board", "Home", "--board", "Work"]);
    assert!(out.starts_with("Created "));
    assert!(tmp.path().join("a.plan").exists());

    let out = run_gp_ok(tmp.path(), &["boards", "a.plan"]);
    assert_snapshot!(out, @r"
    * 0 Home  0 cards, 0/0 done
      1 Work  0 cards, 0/0 done
    ");
}

#[test]
fn test_new_refuses_existing_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(tmp.path().join("a.plan"), "mine").unwrap();
    let (_, stderr, success) = run_gp(tmp.path(), &["new", "a.plan"]);
    assert!(!success);
    assert!(stderr.starts_with("error: "));
    assert!(stderr.contains("already exists"));
    assert_eq!(fs::read_to_string(tmp.path().join("a.plan")).unwrap(), "mine");
}

#[test]
fn test_show_numbers_nested_list() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());

    let out = run_gp_ok(tmp.path(), &["show", "trip.plan"]);
    assert_snapshot!(out, @r"
    == Packing ==
    1. [ ] Pack #0
      1.1. [ ] Tent #1

    == Route ==
    (empty)
    ");
}

#[test]
fn test_show_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());

    let out = run_gp_ok(tmp.path(), &["show", "trip.plan", "--board", "0", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let cards = parsed.as_array().unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0]["label"], "1.");
    assert_eq!(cards[1]["label"], "1.1.");
    assert_eq!(cards[1]["col"], 1);
    assert_eq!(cards[1]["row"], 2);
    assert_eq!(cards[1]["kind"], "Checkbox");
}

#[test]
fn test_show_missing_plan_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_gp(tmp.path(), &["show", "nope.plan"]);
    assert!(!success);
    assert!(stderr.contains("error: could not read"));
}

#[test]
fn test_show_unknown_board_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());
    let (_, stderr, success) = run_gp(tmp.path(), &["show", "trip.plan", "--board", "9"]);
    assert!(!success);
    assert!(stderr.contains("board 9 does not exist"));
}

#[test]
fn test_recent_lists_opened_plans() {
    let tmp = tempfile::TempDir::new().unwrap();
    assert_eq!(run_gp_ok(tmp.path(), &["recent"]).trim(), "No recent plans.");

    create_packing_plan(tmp.path());
    run_gp_ok(tmp.path(), &["new", "other.plan"]);
    run_gp_ok(tmp.path(), &["boards", "trip.plan"]);

    let out = run_gp_ok(tmp.path(), &["recent"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("trip.plan"));
    assert!(lines[1].ends_with("other.plan"));

    let json = run_gp_ok(tmp.path(), &["recent", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed[0]["exists"], true);
}

// ---------------------------------------------------------------------------
// Write command tests
// ---------------------------------------------------------------------------

#[test]
fn test_check_completes_parent_through_children() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());

    run_gp_ok(tmp.path(), &["check", "trip.plan", "1"]);
    let out = run_gp_ok(tmp.path(), &["boards", "trip.plan"]);
    assert!(out.contains("Packing  2 cards, 2/2 done"));

    run_gp_ok(tmp.path(), &["check", "trip.plan", "1", "--undo"]);
    let out = run_gp_ok(tmp.path(), &["boards", "trip.plan"]);
    assert!(out.contains("Packing  2 cards, 0/2 done"));
}

#[test]
fn test_check_rejects_notes() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());
    let id = run_gp_ok(tmp.path(), &["add", "trip.plan", "note", "Bring snacks", "--at", "20", "0"]);
    let (_, stderr, success) = run_gp(tmp.path(), &["check", "trip.plan", id.trim()]);
    assert!(!success);
    assert!(stderr.contains("has no completion"));
}

#[test]
fn test_add_to_other_board() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());
    run_gp_ok(
        tmp.path(),
        &["add", "trip.plan", "note", "Take the coast road", "--board", "1", "--at", "0", "0"],
    );

    let out = run_gp_ok(tmp.path(), &["show", "trip.plan", "--board", "1"]);
    assert_snapshot!(out, @r"
    == Route ==
    - Take the coast road #2
    ");

    // The plan still opens on its first board.
    let out = run_gp_ok(tmp.path(), &["boards", "trip.plan"]);
    assert!(out.starts_with("* 0 Packing"));
}

#[test]
fn test_add_unknown_kind_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());
    let (_, stderr, success) = run_gp(tmp.path(), &["add", "trip.plan", "sticker", "x"]);
    assert!(!success);
    assert!(stderr.contains("unknown card kind: sticker"));
}

#[test]
fn test_mv_outdents_card() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());

    run_gp_ok(tmp.path(), &["mv", "trip.plan", "1", "0", "2"]);
    let out = run_gp_ok(tmp.path(), &["show", "trip.plan", "--board", "0"]);
    assert_snapshot!(out, @r"
    == Packing ==
    1. [ ] Pack #0
    2. [ ] Tent #1
    ");
}

#[test]
fn test_rm_deletes_and_frees_ids() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());

    let out = run_gp_ok(tmp.path(), &["rm", "trip.plan", "0"]);
    assert_eq!(out.trim(), "Deleted 1 card(s)");

    // A lone checkbox is unnumbered.
    let out = run_gp_ok(tmp.path(), &["show", "trip.plan", "--board", "0"]);
    assert!(out.contains("[ ] Tent #1"));
    assert!(!out.contains("Pack #0"));

    let id = run_gp_ok(tmp.path(), &["add", "trip.plan", "checkbox", "Stove", "--at", "0", "8"]);
    assert_eq!(id.trim(), "0");

    let (_, stderr, success) = run_gp(tmp.path(), &["rm", "trip.plan", "42"]);
    assert!(!success);
    assert!(stderr.contains("card not found: 42"));
}

#[test]
fn test_plan_file_is_json_with_tasks() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_packing_plan(tmp.path());
    let text = fs::read_to_string(tmp.path().join("trip.plan")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["BoardCount"], 2);
    assert_eq!(doc["BoardNames"][1], "Route");
    assert_eq!(doc["Tasks"].as_array().unwrap().len(), 2);
    assert_eq!(doc["Tasks"][0]["TaskType"], "Checkbox");
    assert_eq!(doc["Tasks"][0]["Description"], "Pack");
}
