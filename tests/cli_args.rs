//! Integration tests for the hscontent binary
//!
//! Only commands that never touch the network are exercised here: help,
//! argument errors, cache maintenance, offline vocabulary and result recording.

use std::process::Command;

use tempfile::TempDir;

/// Helper to run the CLI against a fresh cache directory and capture output
fn run_cli(cache_dir: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_hscontent"))
        .arg("--cache-dir")
        .arg(cache_dir.path())
        .args(args)
        .env_remove("WORDS_API_KEY")
        .env_remove("NASA_API_KEY")
        .env_remove("KHAN_ACADEMY_API_KEY")
        .output()
        .expect("Failed to execute hscontent")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = Command::new(env!("CARGO_BIN_EXE_hscontent"))
        .arg("--help")
        .output()
        .expect("Failed to execute hscontent");
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hscontent"), "Help should mention hscontent");
    assert!(stdout.contains("search"), "Help should list the search command");
    assert!(stdout.contains("cache"), "Help should list the cache command");
}

#[test]
fn test_invalid_provider_prints_error_and_exits() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["search", "youtube", "fractions"]);
    assert!(!output.status.success(), "Expected invalid provider to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid provider"),
        "Should print error message about invalid provider: {}",
        stderr
    );
}

#[test]
fn test_zero_timeout_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["--timeout-secs", "0", "cache", "stats"]);
    assert!(!output.status.success());
}

#[test]
fn test_cache_stats_on_empty_cache() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["cache", "stats"]);
    assert!(output.status.success());

    let stats = stdout_json(&output);
    let stats = stats.as_array().expect("stats should be a list");
    assert_eq!(stats.len(), 5);
    for entry in stats {
        assert_eq!(entry["file_count"], 0);
    }
}

#[test]
fn test_word_without_key_uses_builtin_dictionary() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["word", "happy"]);
    assert!(output.status.success());

    let entry = stdout_json(&output);
    assert_eq!(entry["word"], "happy");
    assert_eq!(
        entry["senses"][0]["definition"],
        "feeling or showing pleasure or contentment"
    );
}

#[test]
fn test_word_of_day_is_cached_then_cleared() {
    let dir = TempDir::new().unwrap();

    let first = run_cli(&dir, &["word-of-day"]);
    let second = run_cli(&dir, &["word-of-day"]);
    assert!(first.status.success());
    assert_eq!(stdout_json(&first), stdout_json(&second));
    assert!(dir.path().join("wordsapi").join("word_of_day.json").exists());

    let cleared = run_cli(&dir, &["cache", "clear", "--provider", "words"]);
    assert!(cleared.status.success());
    assert_eq!(stdout_json(&cleared)[0]["removed"], 1);

    let stats = stdout_json(&run_cli(&dir, &["cache", "stats", "--provider", "wordsapi"]));
    assert_eq!(stats[0]["file_count"], 0);
}

#[test]
fn test_prune_with_huge_limit_keeps_everything() {
    let dir = TempDir::new().unwrap();
    assert!(run_cli(&dir, &["word-of-day"]).status.success());

    let output = run_cli(&dir, &["cache", "prune", "--max-mb", &u64::MAX.to_string()]);
    assert!(
        output.status.success(),
        "prune should not overflow: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let pruned = stdout_json(&output);
    let pruned = pruned.as_array().expect("prune should report every provider");
    assert_eq!(pruned.len(), 5);
    for entry in pruned {
        assert_eq!(entry["removed"], 0);
    }
    assert!(dir.path().join("wordsapi").join("word_of_day.json").exists());
}

#[test]
fn test_vocabulary_lesson_offline() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&dir, &["lesson", "vocabulary", "fast", "--grade", "2"]);
    assert!(output.status.success());

    let draft = stdout_json(&output);
    assert_eq!(draft["title"], "Vocabulary: Fast");
    assert_eq!(draft["estimated_minutes"], 15);
    assert_eq!(draft["xp_value"], 10);
}

#[test]
fn test_record_result_appends_to_log() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("activity.jsonl");
    let log_arg = log.to_string_lossy().to_string();

    let output = run_cli(
        &dir,
        &[
            "record-result", "--user", "ada", "--title", "Fractions", "--xp", "15", "--score", "92",
            "--log", &log_arg,
        ],
    );
    assert!(output.status.success());

    let result = stdout_json(&output);
    assert_eq!(result["outcome"], "completed");
    assert_eq!(result["xp_awarded"], 15);
    let lines = std::fs::read_to_string(&log).unwrap();
    assert_eq!(lines.lines().count(), 2);
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use hscontent::cli::{parse_provider_arg, Cli, Command};
    use hscontent::config::ContentConfig;
    use hscontent::content::ProviderId;

    #[test]
    fn test_parse_provider_arg_accepts_every_id() {
        for provider in ProviderId::ALL {
            assert_eq!(parse_provider_arg(provider.id()).unwrap(), provider);
        }
    }

    #[test]
    fn test_cli_record_result() {
        let cli = Cli::parse_from([
            "hscontent", "record-result", "--user", "ada", "--title", "Mars", "--xp", "20", "--score",
            "79.5",
        ]);
        match cli.command {
            Command::RecordResult { score, log, .. } => {
                assert_eq!(score, 79.5);
                assert!(log.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_default_config_timeout() {
        let cli = Cli::parse_from(["hscontent", "--cache-dir", "/tmp/x", "word-of-day"]);
        let config = ContentConfig::from_cli(&cli).unwrap();
        assert_eq!(config.timeout.as_secs(), 10);
    }
}
