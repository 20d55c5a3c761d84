//! Configuration loaded from files on disk
use std::fs;

use clap::Parser;
use kvlang_language_server::config::{Args, Config};
use kvlang_language_server::validation::rules;
use kvlang_language_server::{LanguageId, LintEngine, TextDocumentItem};

fn args(extra: &[&str]) -> Args {
    Args::parse_from(std::iter::once("kvls").chain(extra.iter().copied()))
}

#[test]
fn test_explicit_config_file_is_loaded() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[lint]\nmax_line_length = 40\ndisabled = [\"KvLang105\"]\n\n[syntax]\nenabled = false\n",
    )
    .expect("write config");

    let config = Config::from_args(args(&["--config", path.to_str().unwrap()]))
        .expect("config should load");
    assert_eq!(config.config_file.as_deref(), Some(path.as_path()));
    assert_eq!(config.max_line_length, 40);
    assert_eq!(config.disabled_rules, vec![rules::FINAL_NEWLINE_MISSING]);
    assert!(!config.syntax_check);
}

#[test]
fn test_cli_overrides_config_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[lint]\nmax_line_length = 40\n").expect("write config");

    let config = Config::from_args(args(&[
        "--config",
        path.to_str().unwrap(),
        "--max-line-length",
        "90",
    ]))
    .expect("config should load");
    assert_eq!(config.max_line_length, 90);
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("absent.toml");
    assert!(Config::from_args(args(&["--config", path.to_str().unwrap()])).is_err());
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[lint\nmax_line_length = ").expect("write config");
    assert!(Config::from_args(args(&["--config", path.to_str().unwrap()])).is_err());
}

#[test]
fn test_engine_follows_config() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[lint]\nmax_line_length = 10\ndisabled = [\"KvLang102\"]\n[syntax]\nenabled = false\n",
    )
    .expect("write config");
    let config = Config::from_args(args(&["--config", path.to_str().unwrap()]))
        .expect("config should load");

    let engine = LintEngine::from_config(&config);
    assert!(!engine.parser().is_available());

    let document = TextDocumentItem::new("file:///a.kv", LanguageId::Kv, "<Root>:   \n<Broken\n");
    let diagnostics = engine.lint(&document);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "Line too long (10,10)");
}
