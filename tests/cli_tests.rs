use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cmd() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("ctxwindow").unwrap();
    cmd.env_remove("CTXWINDOW_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// Helper: write a conversation file and return the tempdir handle and path.
fn write_conversation(json: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("conversation.json");
    std::fs::write(&path, json).unwrap();
    (dir, path)
}

/// A gpt-4 conversation: a 7-token system prompt and three 106-token turns
/// (109 each when charged alone with priming).
fn long_conversation() -> String {
    let turn = "x".repeat(400);
    format!(
        r#"{{"model":"gpt-4","messages":[
            {{"role":"system","content":"Be concise."}},
            {{"role":"user","content":"first {turn}"}},
            {{"role":"assistant","content":"second {turn}"}},
            {{"role":"user","content":"third {turn}"}}
        ]}}"#
    )
}

// -----------------------------------------------------------------------
// General CLI tests
// -----------------------------------------------------------------------

#[test]
fn help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("prune"))
        .stdout(predicate::str::contains("remaining"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("count"))
        .stdout(predicate::str::contains("models"));
}

// -----------------------------------------------------------------------
// Init command tests
// -----------------------------------------------------------------------

#[test]
fn init_creates_config() {
    let dir = tempdir().unwrap();
    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config"));

    let content = std::fs::read_to_string(dir.path().join("ctxwindow.toml")).unwrap();
    assert!(content.contains("response_reserve = 1000"));
}

#[test]
fn init_errors_on_existing_without_force() {
    let dir = tempdir().unwrap();
    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap()])
        .assert()
        .success();

    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cmd()
        .args(["init", "--root", dir.path().to_str().unwrap(), "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overwrote config"));
}

// -----------------------------------------------------------------------
// Prune command tests
// -----------------------------------------------------------------------

#[test]
fn prune_within_budget_keeps_everything() {
    let (dir, path) = write_conversation(
        r#"[{"role":"system","content":"Be concise."},{"role":"user","content":"Hello"}]"#,
    );
    let output = cmd()
        .current_dir(dir.path())
        .args(["prune", path.to_str().unwrap(), "--stdout", "--quiet"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["model"], "gpt-4o-mini");
    assert_eq!(parsed["messages"].as_array().unwrap().len(), 2);
}

#[test]
fn prune_with_max_tokens_drops_oldest_turns() {
    let (dir, path) = write_conversation(&long_conversation());
    // system 7 + priming 3 + newest turn 109 = 119 fits; the next turn makes 228.
    let output = cmd()
        .current_dir(dir.path())
        .args([
            "prune",
            path.to_str().unwrap(),
            "--max-tokens",
            "150",
            "--stdout",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let messages = parsed["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert!(messages[1]["content"].as_str().unwrap().starts_with("third"));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("kept 2 of 4 messages"));
}

#[test]
fn prune_explain_prints_plan() {
    let (dir, path) = write_conversation(&long_conversation());
    cmd()
        .current_dir(dir.path())
        .args([
            "prune",
            path.to_str().unwrap(),
            "--max-tokens",
            "150",
            "--stdout",
            "--explain",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("\"dropped\""))
        .stderr(predicate::str::contains("\"effective_limit\": 150"));
}

#[test]
fn prune_markdown_to_file() {
    let (dir, path) = write_conversation(&long_conversation());
    let out_path = dir.path().join("out").join("pruned.md");
    cmd()
        .current_dir(dir.path())
        .args([
            "prune",
            path.to_str().unwrap(),
            "--format",
            "markdown",
            "--out",
            out_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let content = std::fs::read_to_string(&out_path).unwrap();
    assert!(content.contains("## system"));
    assert!(content.contains("> model: `gpt-4`"));
}

#[test]
fn prune_reserve_larger_than_window_fails() {
    let (dir, path) = write_conversation(&long_conversation());
    cmd()
        .current_dir(dir.path())
        .args(["prune", path.to_str().unwrap(), "--reserve", "9000", "--stdout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid token budget"));
}

#[test]
fn prune_missing_conversation_errors() {
    cmd()
        .args(["prune", "/tmp/nonexistent_conversation.json", "--stdout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading conversation"));
}

#[test]
fn prune_malformed_conversation_errors() {
    let (dir, path) = write_conversation(r#"{"messages": 5}"#);
    cmd()
        .current_dir(dir.path())
        .args(["prune", path.to_str().unwrap(), "--stdout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse conversation"));
}

#[test]
fn prune_uses_config_reserve() {
    let (dir, path) = write_conversation(&long_conversation());
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "response_reserve = 8100\n").unwrap();
    // gpt-4: 8192 - 8100 = 92 tokens, enough for the system prompt only.
    let output = cmd()
        .current_dir(dir.path())
        .args([
            "--config",
            config.to_str().unwrap(),
            "prune",
            path.to_str().unwrap(),
            "--stdout",
            "--quiet",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["messages"].as_array().unwrap().len(), 1);
}

// -----------------------------------------------------------------------
// Remaining / check command tests
// -----------------------------------------------------------------------

#[test]
fn remaining_prints_token_headroom() {
    let (dir, path) = write_conversation(r#"[{"role":"user","content":"abcd"}]"#);
    // 8192 - (1 + 4 + 3) - 1000
    cmd()
        .current_dir(dir.path())
        .args(["remaining", path.to_str().unwrap(), "--model", "gpt-4", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::diff("7184\n"));
}

#[test]
fn remaining_unknown_model_uses_default_window() {
    let (dir, path) = write_conversation("[]");
    cmd()
        .current_dir(dir.path())
        .args(["remaining", path.to_str().unwrap(), "--model", "mystery", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::diff("3093\n"));
}

#[test]
fn check_reports_fits_and_exceeds() {
    let (dir, path) = write_conversation(r#"{"model":"gpt-4","messages":[]}"#);
    cmd()
        .current_dir(dir.path())
        .args(["check", path.to_str().unwrap(), "--text", "hello", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::diff("fits\n"));

    let big = "x".repeat(40_000);
    cmd()
        .current_dir(dir.path())
        .args(["check", path.to_str().unwrap(), "--text", &big, "-q"])
        .assert()
        .success()
        .stdout(predicate::str::diff("exceeds\n"));

    cmd()
        .current_dir(dir.path())
        .args(["check", path.to_str().unwrap(), "--text", &big, "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("would exceed"));
}

#[test]
fn check_requires_candidate() {
    let (dir, path) = write_conversation("[]");
    cmd()
        .current_dir(dir.path())
        .args(["check", path.to_str().unwrap()])
        .assert()
        .failure();
}

// -----------------------------------------------------------------------
// Count / models command tests
// -----------------------------------------------------------------------

#[test]
fn count_text_prints_tokens() {
    cmd()
        .args(["count", "--text", "0123456789", "--model", "gpt-4", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));
}

#[test]
fn count_conversation_json() {
    let (dir, path) = write_conversation(
        r#"[{"role":"system","content":"abcd"},{"role":"user","content":"abcdefgh"}]"#,
    );
    let output = cmd()
        .current_dir(dir.path())
        .args(["count", path.to_str().unwrap(), "--model", "gemini-1.5-pro", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["total_tokens"], 14);
    assert_eq!(parsed["estimator"], "gemini");
    assert_eq!(parsed["messages"][1]["role"], "user");
}

#[test]
fn models_lists_registry() {
    cmd()
        .args(["models", "--color", "never"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gpt-4o-mini"))
        .stdout(predicate::str::contains("gemini-1.5-pro"))
        .stdout(predicate::str::contains("1000000"));
}

#[test]
fn models_filter_by_provider_json() {
    let output = cmd()
        .args(["models", "--provider", "gemini", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let models = parsed.as_array().unwrap();
    assert_eq!(models.len(), 4);
    assert!(models.iter().all(|m| m["provider"] == "gemini"));
}

#[test]
fn models_include_configured_entries() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("ctxwindow.toml");
    std::fs::write(
        &config,
        r#"
[[models]]
id = "local-llm"
name = "Local LLM"
provider = "openai"
context_window = 32000
"#,
    )
    .unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["models", "--provider", "openai", "--color", "never"])
        .assert()
        .success()
        .stdout(predicate::str::contains("local-llm"))
        .stdout(predicate::str::contains("32000"));
}

#[test]
fn models_unknown_provider_errors() {
    cmd()
        .args(["models", "--provider", "anthropic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider"));
}
