use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "spell-arena"])
        .status()
        .expect("failed to invoke cargo check for spell-arena CLI binary");

    assert!(status.success(), "cargo check --bin spell-arena should succeed");
}

#[test]
fn short_run_prints_its_statistics() {
    let output = Command::new(env!("CARGO_BIN_EXE_spell-arena"))
        .args(["--seed", "7", "--seconds", "2"])
        .output()
        .expect("binary runs");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bosses defeated 0"));
    assert!(stdout.contains("elapsed"));
}

#[test]
fn missing_config_file_fails_the_run() {
    let missing = std::env::temp_dir().join(format!(
        "spell-arena-absent-{}.toml",
        std::process::id()
    ));
    let output = Command::new(env!("CARGO_BIN_EXE_spell-arena"))
        .arg("--config")
        .arg(&missing)
        .output()
        .expect("binary runs");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read configuration"));
}
