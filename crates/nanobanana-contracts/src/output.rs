use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::error::{GenerateError, Result};
use crate::mime::extension_from_mime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath {
    pub path: PathBuf,
    /// Set when a user-supplied path had its extension replaced to match the image.
    pub adjusted: bool,
}

/// Chooses where the generated image goes.
///
/// Without a requested path the name is `image_YYYYMMDD_HHMMSS` plus the
/// extension for `mime`. A requested path keeps its name but its extension is
/// replaced (or added) when it does not match `mime`, compared case-insensitively.
pub fn resolve_output_path<Tz: TimeZone>(
    requested: Option<&Path>,
    mime: &str,
    now: &DateTime<Tz>,
) -> OutputPath
where
    Tz::Offset: std::fmt::Display,
{
    let ext = extension_from_mime(mime);
    let Some(requested) = requested.filter(|path| !path.as_os_str().is_empty()) else {
        return OutputPath {
            path: PathBuf::from(format!("image_{}{ext}", now.format("%Y%m%d_%H%M%S"))),
            adjusted: false,
        };
    };

    let current = requested
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| format!(".{}", value.to_ascii_lowercase()))
        .unwrap_or_default();
    if current == ext {
        return OutputPath {
            path: requested.to_path_buf(),
            adjusted: false,
        };
    }
    OutputPath {
        path: requested.with_extension(ext.trim_start_matches('.')),
        adjusted: true,
    }
}

/// Writes the image in one call; no partial-write recovery.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|err| {
        GenerateError::local_io(
            format!("failed to write output file {}", path.display()),
            err,
        )
    })
}
