use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gemfall"))
        .args(args)
        .output()
        .expect("failed to launch gemfall binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout is utf-8")
}

#[test]
fn session_prints_grid_and_statistics() {
    let output = run(&[
        "--columns",
        "5",
        "--rows",
        "4",
        "--seed",
        "7",
        "--actions",
        "30",
        "--animation-frames",
        "2",
    ]);
    assert!(output.status.success(), "session failed: {output:?}");

    let text = stdout(&output);
    assert!(text.starts_with("gemfall 5x4 seed 7 (30 actions"));
    let grid_lines: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with("  "))
        .collect();
    assert_eq!(grid_lines.len(), 4);
    assert!(grid_lines.iter().all(|line| line.trim().len() == 5));
    assert!(text.contains("swaps: "));
    assert!(text.contains("longest cascade: "));
}

#[test]
fn exported_layout_reloads_verbatim() {
    let first = run(&["--seed", "3", "--actions", "10", "--export-layout"]);
    assert!(first.status.success(), "session failed: {first:?}");
    let first_text = stdout(&first);
    let exported = first_text
        .lines()
        .last()
        .expect("layout string printed")
        .to_owned();
    assert!(exported.starts_with("grid:v1:8x8:"));

    let second = run(&["--layout", &exported, "--actions", "0", "--export-layout"]);
    assert!(second.status.success(), "reload failed: {second:?}");
    let second_text = stdout(&second);

    assert_eq!(second_text.lines().last(), Some(exported.as_str()));
}

#[test]
fn malformed_layout_is_reported() {
    let output = run(&["--layout", "maze:v1:3x3:e30"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to decode --layout"));
}

#[test]
fn oversized_grid_is_refused_before_allocation() {
    let output = run(&["--columns", "4294967295", "--rows", "4294967295"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid grid configuration"));
    assert!(stderr.contains("exceeds the limit"));
}
