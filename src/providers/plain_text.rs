use super::queue::{ChunkSource, ChunkStep};
use crate::provider::ProviderResult;
use crate::status::StatusCode;
use std::io::ErrorKind;
use std::path::Path;

/// Reads a UTF-8 text file and yields one text chunk per paragraph.
///
/// Paragraphs are separated by blank lines. Invalid UTF-8 is replaced rather
/// than rejected, and a leading byte order mark is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSource;

impl ChunkSource for PlainTextSource {
    fn load(&self, path: &Path) -> ProviderResult<Vec<ChunkStep>> {
        let bytes = std::fs::read(path).map_err(|e| {
            log::debug!("reading '{}' failed: {e}", path.display());
            io_status(e.kind())
        })?;

        let decoded = String::from_utf8_lossy(&bytes);
        let text = decoded.strip_prefix('\u{FEFF}').unwrap_or(&decoded);
        Ok(paragraphs(text).into_iter().map(ChunkStep::Text).collect())
    }
}

pub(crate) fn io_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::STG_E_FILENOTFOUND,
        ErrorKind::PermissionDenied => StatusCode::E_ACCESSDENIED,
        _ => StatusCode::E_FAIL,
    }
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }

    out
}
