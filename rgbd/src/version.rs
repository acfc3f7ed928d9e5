/// WritingApp stored in the Info element of every recording.
pub const WRITING_APP: &str = concat!("librgbd-", env!("CARGO_PKG_VERSION"));

/// MuxingApp stored alongside [`WRITING_APP`].
pub const MUXING_APP: &str = concat!("rgbd-", env!("CARGO_PKG_VERSION"));

pub fn print_cli_version_banner(tool_name: &str, version: &str, release: &str, commit: &str) {
    println!("{tool_name}");
    println!("Library:     {WRITING_APP}");
    println!("License: GNU AGPL v3 (AGPL-3.0-only)");
    println!();

    println!("\tVersion:     {version}");
    if !release.is_empty() {
        println!("\tGit tag:     {release}");
    }
    if !commit.is_empty() {
        println!("\tGit commit:  {commit}");
    }
}
