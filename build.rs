use std::process::Command;

const VERSION_ENV: &str = "REMINDERS_DASHBOARD_VERSION";

/// Strips a leading `v` from tags like `v1.2.0`.
fn clean_version(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let version = match raw.strip_prefix('v') {
        Some(rest) if rest.starts_with(|ch: char| ch.is_ascii_digit()) => rest,
        _ => raw,
    };
    (!version.is_empty()).then(|| version.to_string())
}

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    clean_version(&String::from_utf8_lossy(&output.stdout))
}

fn main() {
    println!("cargo:rerun-if-env-changed={VERSION_ENV}");
    println!("cargo:rerun-if-changed=.git/HEAD");

    let version = std::env::var(VERSION_ENV)
        .ok()
        .and_then(|raw| clean_version(&raw))
        .or_else(git_describe)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    println!("cargo:rustc-env=REMINDERS_DASHBOARD_BUILD_VERSION={version}");
}
