// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    // Re-run build script if git HEAD changes
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=QRCAM_VERSION");

    // Packagers can pin the version string
    let version = match std::env::var("QRCAM_VERSION") {
        Ok(v) => v,
        Err(_) => describe_version(),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// "0.1.0" on an exact tag, "0.1.0-3-gabc1234" after it, crate version without git
fn describe_version() -> String {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--match", "v*"])
        .output();

    let described = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => String::new(),
    };

    if described.is_empty() {
        return std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string());
    }

    described
        .strip_prefix('v')
        .unwrap_or(&described)
        .to_string()
}
