use predicates::prelude::*;

use crate::common::{cmd_bin, BIN};

#[test]
fn cli_generates_man_page() {
  let out = cmd_bin(BIN).args(["--gen-man"]).output().unwrap();
  assert!(out.status.success());
  let s = String::from_utf8_lossy(&out.stdout);
  // clap_mangen emits a roff manpage starting with .TH and mentions the binary name
  assert!(s.contains(".TH") || s.contains(".Nm"));
  assert!(s.contains("upgrade-bench"));
}

#[test]
fn errors_when_no_command() {
  cmd_bin(BIN).assert().failure().stderr(predicate::str::contains("No command given"));
}

#[test]
fn rejects_zero_retry_attempts() {
  cmd_bin(BIN)
    .args(["validate", "--retry-attempts", "0"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--retry-attempts must be at least 1"));
}
