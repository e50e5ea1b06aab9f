//! Workspace file discovery.
//!
//! Walks the workspace root collecting VBScript/ASP sources, skipping hidden
//! and build directories. Reading goes through the configured encoding first
//! and falls back to lossy UTF-8, so no file ever fails to decode.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tracing::debug;
use walkdir::WalkDir;

/// Suffixes recognized as VBScript/ASP sources (matched case-insensitively).
pub const SOURCE_SUFFIXES: [&str; 3] = ["vbs", "asp", "inc"];

/// Directory names excluded from scanning, besides dot-directories.
pub const EXCLUDED_DIRS: [&str; 4] = ["node_modules", "Backup", "bin", "obj"];

/// Whether a file name has a recognized source suffix.
pub fn is_target_file(name: &str) -> bool {
    let Some((_, suffix)) = name.rsplit_once('.') else {
        return false;
    };
    SOURCE_SUFFIXES
        .iter()
        .any(|s| suffix.eq_ignore_ascii_case(s))
}

/// Whether a directory should be skipped during the scan.
pub fn should_skip_directory(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_DIRS.contains(&name)
}

/// Collect every source file under `root`, honoring the exclusion rules.
/// Unreadable directory entries are skipped silently; per-file read errors
/// are the caller's to handle.
pub fn collect_source_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !should_skip_directory(&name)
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_target_file(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Read a source file, decoding with `encoding` when configured and it
/// decodes cleanly, otherwise UTF-8 with replacement characters.
pub fn read_source_file(path: &Path, encoding: Option<&'static Encoding>) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(decode_source(&bytes, encoding, path))
}

fn decode_source(bytes: &[u8], encoding: Option<&'static Encoding>, path: &Path) -> String {
    if let Some(encoding) = encoding {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return text.into_owned();
        }
        debug!(
            path = %path.display(),
            encoding = encoding.name(),
            "configured encoding failed, falling back to UTF-8"
        );
    }
    let text = String::from_utf8_lossy(bytes);
    if text.contains('\u{FFFD}') {
        debug!(path = %path.display(), "replaced undecodable bytes");
    }
    text.into_owned()
}
