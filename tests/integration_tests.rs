use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::File;
use std::io::Write;
use tempfile::TempDir;

const CACHE_FILE: &str = ".smally.db";

fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = File::create(&path).unwrap();
    f.write_all(bytes).unwrap();
    path
}

fn fake_png(dir: &TempDir, name: &str) -> std::path::PathBuf {
    write_file(dir, name, b"\x89PNG\r\n\x1a\n\0\0\0\0")
}

fn fake_jpeg(dir: &TempDir, name: &str) -> std::path::PathBuf {
    write_file(dir, name, &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0, 0])
}

fn smally() -> Command {
    Command::cargo_bin("smally").unwrap()
}

#[test]
fn test_cli_help() {
    smally().arg("--help").assert().success();
}

#[test]
fn test_version_flag() {
    smally()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smally"));
}

#[test]
fn test_missing_pathname_fails() {
    smally().assert().failure();
}

#[test]
fn test_unsupported_type_exits_2() {
    let dir = TempDir::new().unwrap();
    let txt = write_file(&dir, "notes.txt", b"just some text");
    smally().arg(&txt).assert().code(2);
}

#[test]
fn test_nonexistent_path_exits_2() {
    smally().arg("/no/such/path.jpg").assert().code(2);
}

#[test]
fn test_type_not_matching_enabled_mode_exits_1() {
    let dir = TempDir::new().unwrap();
    let png = fake_png(&dir, "a.png");
    // only the jpeg mode is enabled, so a PNG target does not match
    smally().arg("-j").arg(&png).assert().code(1);

    let jpg = fake_jpeg(&dir, "a.jpg");
    smally().args(["-p", "-g"]).arg(&jpg).assert().code(1);
}

#[test]
fn test_empty_directory_succeeds() {
    let dir = TempDir::new().unwrap();
    smally().arg(dir.path()).assert().success();
}

#[test]
fn test_directory_with_only_foreign_files_succeeds() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "a.txt", b"text");
    write_file(&dir, "b.rs", b"fn main() {}");
    // foreign types are counted as skipped, never as failures
    smally().arg(dir.path()).assert().success();
}

#[test]
fn test_directory_with_ineligible_image_succeeds() {
    let dir = TempDir::new().unwrap();
    fake_png(&dir, "a.png");
    smally().arg("-j").arg(dir.path()).assert().success();
}

#[test]
fn test_batch_creates_cache_store() {
    let dir = TempDir::new().unwrap();
    fake_png(&dir, "a.png");
    // the worker probes the cache before invoking any tool, so the store
    // exists even though compressing the garbage stream fails
    smally().arg(dir.path()).assert().success();
    assert!(dir.path().join(CACHE_FILE).exists());
}

#[test]
fn test_no_cache_leaves_no_store_behind() {
    let dir = TempDir::new().unwrap();
    fake_png(&dir, "a.png");
    smally().arg("--no-cache").arg(dir.path()).assert().success();
    assert!(!dir.path().join(CACHE_FILE).exists());
}

#[test]
fn test_cache_store_itself_is_never_a_target() {
    let dir = TempDir::new().unwrap();
    // a pre-existing store must not be classified or compressed
    write_file(&dir, CACHE_FILE, b"SQLite format 3\0");
    smally().arg(dir.path()).assert().success();
}

#[test]
fn test_recursive_flag_descends() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    let mut f = File::create(sub.join("a.txt")).unwrap();
    f.write_all(b"text").unwrap();

    smally().arg("-r").arg(dir.path()).assert().success();
    smally().arg(dir.path()).assert().success();
}

#[test]
fn test_parallel_flag_accepts_large_values() {
    let dir = TempDir::new().unwrap();
    smally().args(["-P", "9999"]).arg(dir.path()).assert().success();
}

#[test]
fn test_quiet_directory_run_prints_nothing() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "a.txt", b"text");
    smally()
        .arg("-q")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
