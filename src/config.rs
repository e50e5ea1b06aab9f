//! Server configuration and command-line interface.

use std::path::PathBuf;

use clap::Parser;
use encoding_rs::Encoding;
use thiserror::Error;

/// vbscript-lsp: Language server for VBScript and Classic ASP
#[derive(Parser, Debug)]
#[command(name = "vbscript-lsp")]
#[command(version)]
#[command(about = "Language server for VBScript and Classic ASP sources")]
pub struct Cli {
    /// Workspace root directory; defaults to the client's rootUri
    #[arg(long)]
    pub workspace_root: Option<PathBuf>,

    /// Source encoding tried before UTF-8 (e.g. shift_jis, windows-31j)
    #[arg(long)]
    pub encoding: Option<String>,
}

impl Cli {
    /// Parse CLI arguments from the environment
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

/// Error type for configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The workspace root is missing or not a directory.
    #[error("workspace root does not exist: {}", .0.display())]
    WorkspaceRootMissing(PathBuf),

    /// The encoding label is not a known WHATWG encoding name.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
}

/// Resolved server settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub workspace_root: PathBuf,
    /// Alternative source encoding, tried before the UTF-8 lossy fallback.
    pub encoding: Option<&'static Encoding>,
    /// Scan logs a warning when more files than this are found.
    pub file_warn_threshold: usize,
}

impl ServerConfig {
    /// Validate and build the configuration. The workspace root must exist;
    /// the encoding label, when given, must name a known encoding.
    pub fn new(
        workspace_root: PathBuf,
        encoding_label: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if !workspace_root.is_dir() {
            return Err(ConfigError::WorkspaceRootMissing(workspace_root));
        }
        let encoding = match encoding_label {
            Some(label) => Some(
                Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            workspace_root,
            encoding,
            file_warn_threshold: 1000,
        })
    }

    /// Configuration for tests: no filesystem validation.
    pub fn for_tests(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            encoding: None,
            file_warn_threshold: 1000,
        }
    }
}
