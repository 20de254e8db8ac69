// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Shared harness for end-to-end CLI tests: run the compiled remapadm
//! binary against a stub server, with the stub's credentials injected
//! through the environment.

// Not every test file uses every helper.
#![allow(dead_code)]

use atlassian_stub_server::StubServer;
use std::io::Write as _;

pub struct CliOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub async fn remapadm(server: &StubServer, args: &[&str]) -> CliOutput {
    remapadm_with_token(server, "stub-token", args).await
}

pub async fn remapadm_with_token(server: &StubServer, token: &str, args: &[&str]) -> CliOutput {
    let base_url = server.base_url().to_string();
    let token = token.to_string();
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();

    // The binary is synchronous from the test's point of view; run it
    // off the runtime so the stub keeps serving while it works.
    tokio::task::spawn_blocking(move || {
        let output = assert_cmd::Command::cargo_bin("remapadm")
            .expect("remapadm binary exists")
            .args(&args)
            .env("REMAPADM_BASE_URL", &base_url)
            .env("REMAPADM_EMAIL", "svc@example.com")
            .env("REMAPADM_API_TOKEN", &token)
            .env_remove("REMAPADM_CONCURRENCY")
            .env_remove("RUST_LOG")
            .output()
            .expect("remapadm runs");
        CliOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    })
    .await
    .expect("cli task joins")
}

/// Write a mapping CSV to a temp file that lives as long as the handle.
pub fn mapping_csv(rows: &[(&str, &str)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp csv");
    writeln!(file, "old,new").expect("write header");
    for (old, new) in rows {
        writeln!(file, "{old},{new}").expect("write row");
    }
    file.flush().expect("flush csv");
    file
}

/// Path of a temp file as a &str argument.
pub fn path_arg(file: &tempfile::NamedTempFile) -> &str {
    file.path().to_str().expect("utf-8 temp path")
}
