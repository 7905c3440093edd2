// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// The `idbus` binary with logging silenced unless a test opts in
pub fn idbus() -> Command {
    let mut cmd = Command::cargo_bin("idbus").expect("idbus binary");
    cmd.env_remove("IDBUS_LOG");
    cmd
}

/// Write `content` to a config file inside a fresh temp directory.
/// Keep the returned TempDir alive for as long as the path is used.
pub fn write_config(content: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let path = temp.path().join("idbus.toml");
    fs::write(&path, content).expect("Failed to write config");
    (temp, path)
}

/// Stdout of a successful run as a String
pub fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf-8 stdout")
}
