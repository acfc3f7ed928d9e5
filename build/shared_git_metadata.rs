use std::process::Command;

/// Trimmed stdout of a git command, empty when git is unavailable or fails.
fn git(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default()
}

/// Expose `GIT_COMMIT` and `RELEASE_VERSION` to the crate being built.
pub fn emit_git_metadata() {
    for path in [
        "build.rs",
        "../build/shared_git_metadata.rs",
        "../.git/HEAD",
        "../.git/refs",
        "../.git/packed-refs",
    ] {
        println!("cargo:rerun-if-changed={path}");
    }

    println!("cargo:rustc-env=GIT_COMMIT={}", git(&["rev-list", "-1", "HEAD"]));
    // Only set when HEAD is tagged.
    println!("cargo:rustc-env=RELEASE_VERSION={}", git(&["tag", "--points-at", "HEAD"]));
}
