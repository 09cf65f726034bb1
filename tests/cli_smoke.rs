mod common;

use common::SyntheticDicom;
use std::io::Write;
use std::process::{Command, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_dicom-render");

fn fixture(name: &str, file: &SyntheticDicom) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("dicom-render-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, file.build()).unwrap();
    path
}

#[test]
fn version_info_reads_no_input() {
    let out = Command::new(BIN)
        .arg("-v")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["protocol_version"], 1);
    assert!(v["pipeline"].as_str().unwrap().starts_with("dicom-render-v"));
}

#[test]
fn json_from_path() {
    let path = fixture("json.dcm", &SyntheticDicom::gradient(4, 4));
    let out = Command::new(BIN).arg(&path).output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["rows"], 4);
    assert_eq!(v["windowedPixelData"].as_array().unwrap().len(), 16);
    assert!(out.stderr.is_empty());
}

#[cfg(feature = "jpeg")]
#[test]
fn jpeg_from_stdin() {
    let mut child = Command::new(BIN)
        .arg("--output=jpeg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(&SyntheticDicom::gradient(8, 8).build())
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(&out.stdout[..2], &[0xFF, 0xD8]);
}

#[test]
fn perf_dump_goes_to_stderr() {
    let path = fixture("perf.dcm", &SyntheticDicom::gradient(2, 2));
    let out = Command::new(BIN).arg("--perf").arg(&path).output().unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(v["_perf"].as_str().unwrap().contains("render-complete"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("total-runtime"));
}

#[test]
fn failures_exit_nonzero_with_empty_stdout() {
    let out = Command::new(BIN)
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());

    let path = fixture("garbage.dcm", &SyntheticDicom::gradient(2, 2));
    std::fs::write(&path, b"not dicom at all").unwrap();
    let out = Command::new(BIN).arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());

    let out = Command::new(BIN).args(["--quality", "0"]).arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
}
