//! Terminal output helpers.
//!
//! Thin styling layer over stdout/stderr. Build progress and hash
//! reporting go through these so every command speaks with one voice.

use std::path::Path;

use crossterm::style::Stylize;
use trb_schema::Sha256Digest;

/// Plain informational line.
pub fn info(msg: &str) {
    println!("  {msg}");
}

/// Success line with a green check.
pub fn success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Warning line with a yellow marker.
pub fn warning(msg: &str) {
    println!("  {} {}", "!".yellow(), msg);
}

/// Error line with a red cross, on stderr.
pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// One artifact line of a hash report.
pub fn hash(path: &Path, digest: &Sha256Digest) {
    let name = path
        .file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy();
    println!(
        "  {}: {}",
        name.to_string().cyan(),
        digest.as_str().dark_grey()
    );
}

/// One row of the version listing.
pub fn version_row(version: &str, latest: bool) {
    if latest {
        println!("  {} {}", version.cyan(), "(latest)".dark_grey());
    } else {
        println!("  {version}");
    }
}
