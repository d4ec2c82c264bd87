use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn agent_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("support-agent");
    path
}

fn setup_test_env(extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("agent.toml");
    let config_content = format!(
        r#"[llm]
provider = "disabled"

[server]
bind = "127.0.0.1:0"
{extra}"#
    );
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

fn run_agent(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = agent_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run support-agent binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_catalog_lists_reference_categories() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, stderr, ok) = run_agent(&config, &["catalog"]);
    assert!(ok, "catalog failed: {stderr}");
    assert!(stdout.contains("technical_expert (3 articles)"));
    assert!(stdout.contains("frustrated_user (3 articles)"));
    assert!(stdout.contains("business_exec (3 articles)"));
    assert!(stdout.contains("[8] Pricing & Plans"));
}

#[test]
fn test_search_in_category() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, stderr, ok) = run_agent(
        &config,
        &["search", "what are your pricing plans", "--category", "business_exec"],
    );
    assert!(ok, "search failed: {stderr}");
    assert!(stdout.starts_with("1. [0.4"), "{stdout}");
    assert!(stdout.contains("business_exec / Pricing & Plans"));
    assert!(!stdout.contains("2. "));
}

#[test]
fn test_search_deterministic() {
    let (_tmp, config) = setup_test_env("");
    let (a, _, _) = run_agent(&config, &["search", "enterprise pricing"]);
    let (b, _, _) = run_agent(&config, &["search", "enterprise pricing"]);
    assert_eq!(a, b);
    assert!(a.contains("1. [0.406] business_exec / Pricing & Plans"), "{a}");
    assert!(a.contains("2. [0.134] technical_expert / Rate Limits"), "{a}");
}

#[test]
fn test_search_context_finds_followup() {
    let (_tmp, config) = setup_test_env("");
    let (bare, _, ok) = run_agent(&config, &["search", "how much", "--category", "business_exec"]);
    assert!(ok);
    assert!(bare.contains("No results."));

    let (with_context, _, ok) = run_agent(
        &config,
        &[
            "search",
            "how much",
            "--category",
            "business_exec",
            "--context",
            "enterprise pricing",
        ],
    );
    assert!(ok);
    assert!(with_context.contains("Pricing & Plans"), "{with_context}");
}

#[test]
fn test_search_keyword_mode() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, _, ok) = run_agent(&config, &["search", "I want a refund", "--keyword"]);
    assert!(ok);
    assert!(stdout.contains("1. frustrated_user / Refund Policy"), "{stdout}");
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, _, ok) = run_agent(&config, &["search", "  "]);
    assert!(ok);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_unknown_category_finds_nothing() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, stderr, ok) = run_agent(&config, &["search", "pricing", "--category", "nope"]);
    assert!(ok, "{stderr}");
    assert!(stdout.contains("No results."), "{stdout}");
}

#[test]
fn test_custom_catalog_file() {
    let (tmp, config) = setup_test_env("\n[catalog]\npath = \"kb.toml\"\n");
    fs::write(
        tmp.path().join("kb.toml"),
        r#"
[[categories]]
name = "billing"

[[categories.articles]]
id = 1
title = "Invoices"
content = "Invoices are emailed on the first of every month."
keywords = ["invoice", "billing"]

[[categories.articles]]
id = 2
title = "Payment Methods"
content = "We accept credit cards and bank transfers."
keywords = ["card", "payment"]
"#,
    )
    .unwrap();

    let (stdout, stderr, ok) = run_agent(&config, &["catalog"]);
    assert!(ok, "{stderr}");
    assert!(stdout.contains("billing (2 articles)"));
    assert!(!stdout.contains("technical_expert"));

    let (stdout, _, ok) = run_agent(&config, &["search", "when are invoices emailed"]);
    assert!(ok);
    assert!(stdout.contains("billing / Invoices"), "{stdout}");
}

#[test]
fn test_invalid_catalog_reports_field() {
    let (tmp, config) = setup_test_env("\n[catalog]\npath = \"kb.json\"\n");
    fs::write(
        tmp.path().join("kb.json"),
        r#"{"categories": [{"name": "billing", "articles": [{"id": 1, "content": "x"}]}]}"#,
    )
    .unwrap();
    let (_, stderr, ok) = run_agent(&config, &["catalog"]);
    assert!(!ok);
    assert!(stderr.contains("missing required field 'title'"), "{stderr}");
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config) = setup_test_env("\n[retrieval]\nrelevance_floor = 1.5\n");
    let (_, stderr, ok) = run_agent(&config, &["catalog"]);
    assert!(!ok);
    assert!(stderr.contains("relevance_floor"));
}

#[test]
fn test_chat_reads_lines_until_eof() {
    let (_tmp, config) = setup_test_env("");
    let mut child = Command::new(agent_binary())
        .arg("--config")
        .arg(&config)
        .args(["chat", "--session", "cli-test"])
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"what are your pricing plans\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Session cli-test"), "{stdout}");
    assert!(stdout.contains("[unknown 0.00 neutral/medium]"), "{stdout}");
    assert!(stdout.contains("ESCALATE: System error: "), "{stdout}");
}
