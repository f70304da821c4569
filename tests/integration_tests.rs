use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::str::{contains, diff};

fn armlet() -> Command {
    Command::cargo_bin("armlet").unwrap()
}

fn expected(source: &Path) -> Option<String> {
    let stem = source.file_stem()?.to_str()?;
    let path = PathBuf::from(format!("tests/expected/{stem}.out"));
    std::fs::read_to_string(path)
        .ok()
        .map(|text| text.replace("\r\n", "\n"))
}

#[test]
fn runs_without_arguments() {
    armlet().assert().success().stdout(contains("armlet"));
}

#[test]
fn every_sample_assembles_and_runs() {
    let mut seen = 0;
    for entry in glob::glob("tests/files/*.s").unwrap() {
        let source = entry.unwrap();
        seen += 1;

        armlet()
            .arg("check")
            .arg(&source)
            .assert()
            .success()
            .stderr(contains("no errors found"));

        let run = armlet().arg("run").arg(&source).arg("--minimal").assert().success();
        if let Some(dump) = expected(&source) {
            run.stdout(diff(dump));
        }
    }
    assert!(seen >= 4, "sample programs missing");
}

#[test]
fn assembles_to_file_then_emulates() {
    let binary = Path::new(env!("CARGO_TARGET_TMPDIR")).join("factorial.bin");
    armlet()
        .arg("assemble")
        .arg("tests/files/factorial.s")
        .arg(&binary)
        .assert()
        .success()
        .stderr(contains("Saved"));

    let bytes = std::fs::read(&binary).unwrap();
    assert_eq!(bytes.len(), 36);
    assert_eq!(&bytes[..4], &[0x01, 0x00, 0xa0, 0xe3]);

    armlet()
        .arg("emulate")
        .arg(&binary)
        .arg("--minimal")
        .assert()
        .success()
        .stdout(diff(expected(Path::new("factorial.s")).unwrap()));

    armlet()
        .arg("disassemble")
        .arg(&binary)
        .assert()
        .success()
        .stdout(contains("0x00000008: e0020190  mul r2, r0, r1"))
        .stdout(contains("bne .-24"))
        .stdout(contains("str r0, [r3, #256]"));
}

#[test]
fn faults_are_reported_but_not_fatal() {
    armlet()
        .arg("run")
        .arg("tests/files/literals.s")
        .arg("--minimal")
        .assert()
        .success()
        .stderr(contains(
            "Error: Out of bounds memory access at address 0x00010000",
        ))
        .stdout(contains("0x0000fffc: 0x34120000"));
}

#[test]
fn memory_walk_results() {
    armlet()
        .arg("run")
        .arg("tests/files/memory.s")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(contains("$7  :          8 (0x00000008)"))
        .stdout(contains("0x00000200: 0x03000000"))
        .stdout(contains("0x00000208: 0x01000000"));
}

#[test]
fn shift_results() {
    armlet()
        .arg("run")
        .arg("tests/files/shifts.s")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(contains("$2  : -268435456 (0xf0000000)"))
        .stdout(contains("$4  :       3900 (0x00000f3c)"))
        .stdout(contains("$6  :          0 (0x00000000)"))
        .stdout(contains("CPSR: 1073741824 (0x40000000)"));
}

#[test]
fn trace_lists_pipeline_slots() {
    armlet()
        .env("ARMLET_TRACE", "1")
        .arg("run")
        .arg("tests/files/shifts.s")
        .arg("--minimal")
        .assert()
        .success()
        .stderr(contains("0x00000000: e3a000f0 mov r0, #240"))
        .stderr(contains("(flushed)"));
}

#[test]
fn invalid_sources_fail() {
    let cases = [
        ("undefined_label", "undefined label"),
        ("immediate", "cannot be encoded"),
        ("duplicate_label", "Duplicate label"),
        ("mnemonic", "unknown mnemonic"),
    ];
    for (name, message) in cases {
        armlet()
            .arg("check")
            .arg(format!("tests/files/invalid/{name}.s"))
            .assert()
            .failure()
            .stderr(contains(message));
    }
}

#[test]
fn rejects_oversized_binary() {
    let binary = Path::new(env!("CARGO_TARGET_TMPDIR")).join("oversized.bin");
    std::fs::write(&binary, vec![0u8; (1 << 16) + 4]).unwrap();
    armlet()
        .arg("emulate")
        .arg(&binary)
        .assert()
        .failure()
        .stderr(contains("does not fit in emulated memory"));
}

#[test]
fn missing_input_fails() {
    armlet()
        .arg("emulate")
        .arg("tests/files/does_not_exist.bin")
        .assert()
        .failure();
    armlet().arg("assemble").arg("tests/files/factorial.s").assert().failure();
}
