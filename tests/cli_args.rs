//! Integration tests for CLI argument handling
//!
//! Runs the binary to check help output, argument errors and configuration
//! errors that stop a command before any request is made.

use std::process::Command;

use tempfile::TempDir;

use riftload::data::MatchRecord;

/// Helper to run the CLI with given args and a clean environment
fn run_cli(args: &[&str], workdir: &TempDir) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_riftload"))
        .args(args)
        .current_dir(workdir.path())
        .env_remove("RIOT_API_KEY")
        .env_remove("REGION")
        .env_remove("RIFTLOAD_CACHE_DIR")
        .env_remove("RIFTLOAD_OUTPUT_DIR")
        .env_remove("RIFTLOAD_WEBHOOK_SECRET")
        .output()
        .expect("Failed to execute riftload")
}

#[test]
fn test_help_flag_exits_successfully() {
    let workdir = TempDir::new().unwrap();
    let output = run_cli(&["--help"], &workdir);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("riftload"), "Help should mention riftload");
    assert!(stdout.contains("collect"), "Help should list the collect command");
    assert!(stdout.contains("cache"), "Help should list the cache command");
    assert!(stdout.contains("watch"), "Help should list the watch command");
    assert!(stdout.contains("stats"), "Help should list the stats command");
}

#[test]
fn test_invalid_riot_id_prints_error_and_exits() {
    let workdir = TempDir::new().unwrap();
    let output = run_cli(&["collect", "NoTagHere"], &workdir);
    assert!(!output.status.success(), "Expected invalid Riot ID to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid Riot ID"),
        "Should print error message about the Riot ID: {}",
        stderr
    );
}

#[test]
fn test_missing_api_key_is_reported() {
    let workdir = TempDir::new().unwrap();
    let output = run_cli(&["match", "TR1_1"], &workdir);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("RIOT_API_KEY"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_region_is_reported() {
    let workdir = TempDir::new().unwrap();
    let output = run_cli(&["--region", "mars1", "cache", "cleanup"], &workdir);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown region"), "stderr: {}", stderr);
}

#[test]
fn test_cache_cleanup_runs_without_api_key() {
    let workdir = TempDir::new().unwrap();
    let cache_dir = workdir.path().join("cache");
    let output = run_cli(
        &["--cache-dir", cache_dir.to_str().unwrap(), "cache", "cleanup"],
        &workdir,
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Removed 0 expired cache entries"));
    assert!(cache_dir.is_dir());
}

#[test]
fn test_stats_reads_warehouse_without_api_key() {
    let workdir = TempDir::new().unwrap();
    let output_dir = workdir.path().join("warehouse");
    std::fs::create_dir_all(&output_dir).unwrap();
    let payload = serde_json::from_str(include_str!("fixtures/match_tr1.json")).unwrap();
    let row = MatchRecord::from_api(&payload).unwrap().to_row().unwrap();
    std::fs::write(output_dir.join("matches.ndjson"), format!("{}\n", row)).unwrap();

    let output = run_cli(
        &["--output-dir", output_dir.to_str().unwrap(), "stats", "holyphoenix"],
        &workdir,
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 games, 1 wins"), "stdout: {}", stdout);
    assert!(stdout.contains("Ahri"), "stdout: {}", stdout);
    assert!(stdout.contains("TR1_1587340154"), "stdout: {}", stdout);
}

#[test]
fn test_stats_for_unknown_player() {
    let workdir = TempDir::new().unwrap();
    let output = run_cli(&["stats", "Nobody"], &workdir);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No loaded matches for Nobody"));
}
