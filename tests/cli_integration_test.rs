mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::test_helpers::create_content_dir;

fn run_cli(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_validate-docs"))
        .args(args)
        .current_dir(dir)
        .env_remove("GITHUB_ACTIONS")
        .env_remove("RUST_LOG")
        .env_remove("VALIDATE_DOCS_CI")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_cli_help_output() {
    let temp_dir = create_content_dir(&[]);
    let output = run_cli(temp_dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("--index"));
    assert!(stdout.contains("--concurrency"));
    assert!(stdout.contains("--threshold"));
    assert!(stdout.contains("--list-extensions"));
}

#[test]
fn test_cli_list_extensions() {
    let temp_dir = create_content_dir(&[]);
    let output = run_cli(temp_dir.path(), &["--list-extensions"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        names,
        vec![
            "heading-levels",
            "missing-title",
            "trailing-whitespace",
            "unresolved-attribute"
        ]
    );
}

#[test]
fn test_cli_clean_tree_exits_zero() {
    let temp_dir = create_content_dir(&[
        ("index.adoc", "= Guide\n\ninclude::intro[]\n"),
        ("intro.adoc", "= Intro\n\n== Start\n"),
    ]);
    let output = run_cli(temp_dir.path(), &[]);

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_cli_issues_exit_one() {
    let temp_dir = create_content_dir(&[
        ("index.adoc", "= Guide\n\ninclude::intro[]\ninclude::include/legal[]\n"),
        ("intro.adoc", "no title\n"),
        ("include/legal.adoc", "no title either\n"),
    ]);
    let output = run_cli(temp_dir.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("[ERRORS] for file intro.adoc"));
    assert!(stdout.contains("TITLE\tdocument has no title"));
    assert!(!stdout.contains("legal"));
}

#[test]
fn test_cli_ci_annotations() {
    let temp_dir = create_content_dir(&[
        ("index.adoc", "= Guide\n\ninclude::intro[]\n"),
        ("intro.adoc", "no title\n"),
    ]);
    let output = run_cli(temp_dir.path(), &["--ci"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "::warning file=intro.adoc::document has no title\n");
}

#[test]
fn test_cli_selected_files() {
    let temp_dir = create_content_dir(&[("a.adoc", "= A\n"), ("b.adoc", "trailing \n")]);
    let output = run_cli(
        temp_dir.path(),
        &["--file", "a.adoc", "--file", "b.adoc", "-e", "trailing-whitespace"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout,
        "[ERRORS] for file b.adoc\nWHITESPACE\tline 1 has trailing whitespace\n"
    );
}

#[test]
fn test_cli_content_directory() {
    let temp_dir = create_content_dir(&[("docs/index.adoc", "= Guide\n")]);
    let output = run_cli(temp_dir.path(), &["--content", "docs"]);

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_cli_missing_index_is_startup_error() {
    let temp_dir = create_content_dir(&[]);
    let output = run_cli(temp_dir.path(), &[]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("index.adoc"));
}

#[test]
fn test_cli_invalid_configuration_exits_two() {
    let temp_dir = create_content_dir(&[("index.adoc", "= Guide\n")]);

    let output = run_cli(temp_dir.path(), &["--concurrency", "0"]);
    assert_eq!(output.status.code(), Some(2));

    let output = run_cli(temp_dir.path(), &["--extension", "spellcheck"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("spellcheck"));
}

#[test]
fn test_cli_config_file() {
    let temp_dir = create_content_dir(&[
        ("index.adoc", "= Guide\n\ninclude::intro[]\n"),
        ("intro.adoc", "no title\n"),
        ("validate-docs.toml", "[extensions]\nenabled = [\"heading-levels\"]\n"),
    ]);
    let output = run_cli(temp_dir.path(), &[]);

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_cli_index_conflicts_with_file() {
    let temp_dir = create_content_dir(&[]);
    let output = run_cli(temp_dir.path(), &["--index", "index.adoc", "--file", "a.adoc"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("cannot be used with"));
}
