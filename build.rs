// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=REARCAM_VERSION");

    // Packaged builds pin the version explicitly
    let version = std::env::var("REARCAM_VERSION").unwrap_or_else(|_| git_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// "0.1.0" on an exact tag, "0.1.0-dirty-abcdef1" past it, the short hash
/// without tags and the crate version outside a checkout.
fn git_version() -> String {
    let describe = git(&["describe", "--tags", "--always", "--match", "v*"]);
    let hash = git(&["rev-parse", "--short", "HEAD"]);

    match (describe, hash) {
        (Some(describe), Some(hash)) => {
            let describe = describe.strip_prefix('v').unwrap_or(&describe).to_string();
            let parts: Vec<&str> = describe.rsplitn(3, '-').collect();
            if parts.len() == 3 {
                format!("{}-dirty-{}", parts[2], hash)
            } else if describe == hash {
                hash
            } else {
                format!("{}-{}", describe, hash)
            }
        }
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
