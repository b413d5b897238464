//! Stamps the binary with a version string for `--version` and the user agent.
//!
//! Order: an explicit `CREDWATCH_BUILD_VERSION`, then `git describe`, then the
//! package version.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=CREDWATCH_BUILD_VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");

    let version = env::var("CREDWATCH_BUILD_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(describe)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=CREDWATCH_VERSION={version}");
}

fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    let described = described.strip_prefix('v').unwrap_or(described);
    (!described.is_empty()).then(|| described.to_string())
}
