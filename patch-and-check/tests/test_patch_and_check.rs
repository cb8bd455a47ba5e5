//! Tests for the `patch-and-check` executable. These need patch(1) on the
//! PATH; when it is unavailable the tests are skipped.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

fn has_patch_tool() -> bool {
    std::process::Command::new("patch")
        .arg("--version")
        .output()
        .is_ok()
}

fn write_script(path: &Path, contents: &str) -> eyre::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, contents)?;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

fn run_patch_and_check(args: &[&str]) -> eyre::Result<Output> {
    let output = assert_cmd::Command::cargo_bin("patch-and-check")?
        .args(args)
        .output()?;
    Ok(output)
}

struct Scenario {
    _dir: tempfile::TempDir,
    work: PathBuf,
    uppercase_hello: PathBuf,
    uppercase_world: PathBuf,
}

/// A working copy containing `hello.txt` and two patches which uppercase its
/// two lines, one line each, in order.
fn make_scenario() -> eyre::Result<Scenario> {
    let dir = tempfile::tempdir()?;
    let work = dir.path().join("work");
    fs::create_dir_all(&work)?;
    fs::write(work.join("hello.txt"), "hello\nworld\n")?;

    let uppercase_hello = dir.path().join("01-uppercase-hello.patch");
    fs::write(
        &uppercase_hello,
        "--- a/hello.txt\n\
         +++ b/hello.txt\n\
         @@ -1,2 +1,2 @@\n\
         -hello\n\
         +HELLO\n\
         \x20world\n",
    )?;

    let uppercase_world = dir.path().join("02-uppercase-world.patch");
    fs::write(
        &uppercase_world,
        "--- a/hello.txt\n\
         +++ b/hello.txt\n\
         @@ -1,2 +1,2 @@\n\
         \x20HELLO\n\
         -world\n\
         +WORLD\n",
    )?;

    Ok(Scenario {
        _dir: dir,
        work,
        uppercase_hello,
        uppercase_world,
    })
}

#[test]
fn test_patches_apply_in_order() -> eyre::Result<()> {
    if !has_patch_tool() {
        return Ok(());
    }
    let scenario = make_scenario()?;
    let args = vec![
        "--working-copy".to_owned(),
        scenario.work.display().to_string(),
        "--check".to_owned(),
        "internal:none".to_owned(),
        scenario.uppercase_hello.display().to_string(),
        scenario.uppercase_world.display().to_string(),
    ];
    let output = run_patch_and_check(&args.iter().map(String::as_str).collect::<Vec<_>>())?;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        fs::read_to_string(scenario.work.join("hello.txt"))?,
        "HELLO\nWORLD\n"
    );
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    assert!(stdout.contains("applied cleanly"), "{stdout}");
    Ok(())
}

#[test]
fn test_failing_patch_aborts_run() -> eyre::Result<()> {
    if !has_patch_tool() {
        return Ok(());
    }
    let scenario = make_scenario()?;
    // Applying the second patch first fails: its context line expects the
    // first patch to have been applied already.
    let args = vec![
        "--working-copy".to_owned(),
        scenario.work.display().to_string(),
        "--check".to_owned(),
        "internal:none".to_owned(),
        scenario.uppercase_world.display().to_string(),
        scenario.uppercase_hello.display().to_string(),
    ];
    let output = run_patch_and_check(&args.iter().map(String::as_str).collect::<Vec<_>>())?;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    assert!(stderr.contains("patching failed"), "{stderr}");
    Ok(())
}

#[test]
fn test_failing_check_stops_before_next_patch() -> eyre::Result<()> {
    if !has_patch_tool() {
        return Ok(());
    }
    let scenario = make_scenario()?;
    let check = scenario._dir.path().join("check.sh");
    write_script(&check, "#!/bin/sh\nexit 1\n")?;
    let args = vec![
        "--working-copy".to_owned(),
        scenario.work.display().to_string(),
        "--check".to_owned(),
        check.display().to_string(),
        scenario.uppercase_hello.display().to_string(),
        scenario.uppercase_world.display().to_string(),
    ];
    let output = run_patch_and_check(&args.iter().map(String::as_str).collect::<Vec<_>>())?;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    assert!(stderr.contains("check failed after applying patch"), "{stderr}");
    // The first patch was applied and then the run stopped: the second
    // patch's change must not be present.
    assert_eq!(
        fs::read_to_string(scenario.work.join("hello.txt"))?,
        "HELLO\nworld\n"
    );
    Ok(())
}

#[test]
fn test_missing_patch_is_an_error() -> eyre::Result<()> {
    let scenario = make_scenario()?;
    let args = vec![
        "--working-copy".to_owned(),
        scenario.work.display().to_string(),
        "--check".to_owned(),
        "internal:none".to_owned(),
        scenario
            ._dir
            .path()
            .join("no-such.patch")
            .display()
            .to_string(),
    ];
    let output = run_patch_and_check(&args.iter().map(String::as_str).collect::<Vec<_>>())?;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    assert!(stderr.contains("does not exist"), "{stderr}");
    Ok(())
}

#[test]
fn test_help_exits_zero() -> eyre::Result<()> {
    let output = run_patch_and_check(&["--help"])?;
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    assert!(stdout.contains("--strip"), "{stdout}");
    assert!(stdout.contains("--archive"), "{stdout}");
    Ok(())
}
