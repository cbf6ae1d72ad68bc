//! End-to-end tests of the kspec binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn kspec(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kspec"))
        .args(args)
        .output()
        .expect("Failed to run kspec")
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

/// Simulate a small data set into `dir`.
fn simulate(dir: &Path, assemblies: usize) {
    let n = assemblies.to_string();
    let out = kspec(&[
        "simulate",
        "-o",
        path_str(dir),
        "--genome-kmers",
        "3000",
        "--assemblies",
        &n,
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn test_asm_plot_from_simulated_tables() {
    let dir = TempDir::new().unwrap();
    simulate(dir.path(), 2);
    let plot = dir.path().join("asm.spectra.png");
    let dump = dir.path().join("hist.tsv");

    let out = kspec(&[
        "asm",
        "-r",
        path_str(&dir.path().join("reads.ktab")),
        "-a",
        path_str(&dir.path().join("asm1.ktab")),
        "-a",
        path_str(&dir.path().join("asm2.ktab")),
        "-o",
        path_str(&plot),
        "-s",
        "line,stack",
        "-z",
        "--dump",
        path_str(&dump),
        "--stats",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let png = fs::read(&plot).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

    let tsv = fs::read_to_string(&dump).unwrap();
    assert!(tsv.starts_with("category\tmultiplicity\tcount\n"));
    assert!(tsv.contains("reads+asm1+asm2\t"));

    // Unique report: one line per assembly partition
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(!stdout.trim().is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("distinct k-mers"));
}

#[test]
fn test_cn_plot_svg() {
    let dir = TempDir::new().unwrap();
    simulate(dir.path(), 1);
    let plot = dir.path().join("cn.out");

    let out = kspec(&[
        "cn",
        "-r",
        path_str(&dir.path().join("reads.ktab")),
        "-a",
        path_str(&dir.path().join("asm1.ktab")),
        "-o",
        path_str(&plot),
        "--format",
        "svg",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let svg = fs::read_to_string(&plot).unwrap();
    assert!(svg.contains("<svg"));
}

#[test]
fn test_convert_and_info() {
    let dir = TempDir::new().unwrap();
    let dump = dir.path().join("dump.txt");
    fs::write(&dump, "GGG\t3\nAAA\t1\nCCC\t5\n").unwrap();
    let table = dir.path().join("t.ktab");

    let out = kspec(&["convert", "-i", path_str(&dump), "-o", path_str(&table)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = kspec(&["info", path_str(&table)]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("format\tbinary\nk\t3\nentries\t3\ntotal_count\t9\n"));
}

#[test]
fn test_errors_exit_nonzero() {
    let dir = TempDir::new().unwrap();
    let reads = dir.path().join("reads.txt");
    let asm = dir.path().join("asm.txt");
    fs::write(&reads, "AAA\t4\n").unwrap();
    fs::write(&asm, "AAAA\t1\n").unwrap();
    let plot = dir.path().join("plot.png");

    let out = kspec(&["asm", "-r", path_str(&reads), "-a", path_str(&asm), "-o", path_str(&plot)]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Error: K-mer length"), "{stderr}");
    assert!(!plot.exists());

    let out = kspec(&[
        "asm",
        "-r",
        path_str(&reads),
        "-a",
        path_str(&reads),
        "-o",
        path_str(&plot),
        "--x-rel",
        "0",
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error: Invalid scale"));

    let missing = dir.path().join("missing.ktab");
    let out = kspec(&["info", path_str(&missing)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error: Cannot read"));
}
