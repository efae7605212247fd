//! Build script shared by the GeoAttend binaries
//!
//! Exposes build identification to the startup log line:
//! - `GIT_HASH`: short commit hash, or `unknown` outside a checkout
//! - `BUILD_TIMESTAMP`: local time with offset, second precision
//! - `BUILD_PROFILE`: cargo profile (debug/release)
//!
//! No `rerun-if-changed` directives, so every build refreshes the values.

use std::process::Command;

fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn emit(name: &str, value: &str) {
    println!("cargo:rustc-env={}={}", name, value);
}

fn main() {
    emit("GIT_HASH", &git_hash().unwrap_or_else(|| "unknown".to_string()));
    emit(
        "BUILD_TIMESTAMP",
        &chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
    );
    emit(
        "BUILD_PROFILE",
        &std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string()),
    );
}
