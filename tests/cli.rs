use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_renders_file_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.md");
    fs::write(&input, "## Hello World!\n\n- Item one\n- **Bold** text").unwrap();

    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.arg(&input);

    cmd.assert().success().stdout(
        "<h2>Hello World!</h2>\n<ul>\n<li>Item one</li>\n<li><strong>Bold</strong> text</li>\n</ul>\n",
    );
}

#[test]
fn test_reads_stdin() {
    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.write_stdin("*hi*");

    cmd.assert().success().stdout("<p><em>hi</em></p>\n");
}

#[test]
fn test_safe_mode_is_default() {
    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.write_stdin("<script>alert(1)</script>\n\ntext");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<script").not())
        .stdout(predicate::str::contains("<p>text</p>"));
}

#[test]
fn test_unsafe_flag_keeps_html() {
    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.arg("--unsafe").write_stdin("<div>raw</div>");

    cmd.assert().success().stdout("<div>raw</div>\n");
}

#[test]
fn test_wrap_and_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.html");

    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.arg("--wrap").arg("-o").arg(&output).write_stdin("Hi");

    cmd.assert().success().stdout(predicate::str::is_empty());
    let html = fs::read_to_string(&output).unwrap();
    assert_eq!(html, "<div class=\"markdown-output\"><p>Hi</p>\n</div>\n");
}

#[test]
fn test_wrap_skips_blank_input() {
    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.arg("--wrap").write_stdin("   \n");

    cmd.assert().success().stdout("");
}

#[test]
fn test_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("mdwidget.toml");
    fs::write(
        &config,
        "[render]\nsafe_mode = false\n\n[widget]\ncontainer_class = \"notes\"\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.arg("--config")
        .arg(&config)
        .arg("--wrap")
        .write_stdin("<b>x</b> <span>y</span>");

    cmd.assert()
        .success()
        .stdout("<div class=\"notes\"><p><b>x</b> <span>y</span></p>\n</div>\n");
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("broken.toml");
    fs::write(&config, "[render\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.arg("--config").arg(&config).write_stdin("x");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("loading config"));
}

#[test]
fn test_math_options_json() {
    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.arg("--math-options");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("{\"delimiters\":[{\"left\":\"$$\""))
        .stdout(predicate::str::contains("\"throwOnError\":false"));
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = cargo_bin_cmd!("mdwidget");
    cmd.arg("/nonexistent/input.md");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("reading /nonexistent/input.md"));
}
