use super::plain_text::io_status;
use super::queue::{ChunkQueueProvider, ChunkSource, ChunkStep};
use crate::provider::{ClassFactory, Provider, ProviderResult};
use crate::status::StatusCode;
use lopdf::Document;
use std::path::Path;

// ── PdfSource ─────────────────────────────────────────────────────────────────

/// Yields one text chunk per PDF page, using lopdf's text extraction.
///
/// An encrypted document yields `FILTER_E_PASSWORD` as its first chunk. A
/// page whose content cannot be decoded yields `FILTER_E_ACCESS` and ends the
/// document there; pages before it are still delivered.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfSource;

impl ChunkSource for PdfSource {
    fn load(&self, path: &Path) -> ProviderResult<Vec<ChunkStep>> {
        if let Err(e) = std::fs::metadata(path) {
            return Err(io_status(e.kind()));
        }

        let document = Document::load(path).map_err(|e| {
            log::debug!("lopdf rejected '{}': {e}", path.display());
            StatusCode::FILTER_E_UNKNOWNFORMAT
        })?;

        Ok(page_steps(&document))
    }
}

fn page_steps(document: &Document) -> Vec<ChunkStep> {
    if document.is_encrypted() {
        return vec![ChunkStep::Status(StatusCode::FILTER_E_PASSWORD)];
    }

    let mut steps = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => {
                let text = text.trim_end();
                if !text.is_empty() {
                    steps.push(ChunkStep::text(text));
                }
            }
            Err(e) => {
                log::debug!("page {page_number}: {e}");
                steps.push(ChunkStep::Status(StatusCode::FILTER_E_ACCESS));
                break;
            }
        }
    }

    steps
}

// ── PdfClass ──────────────────────────────────────────────────────────────────

/// Class object creating [`PdfSource`] providers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfClass;

impl ClassFactory for PdfClass {
    fn create_instance(&self) -> ProviderResult<Box<dyn Provider>> {
        Ok(Box::new(ChunkQueueProvider::new(PdfSource)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn non_pdf_is_unknown_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a pdf").unwrap();
        assert_eq!(
            PdfSource.load(file.path()),
            Err(StatusCode::FILTER_E_UNKNOWNFORMAT)
        );
    }

    #[test]
    fn missing_pdf_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            PdfSource.load(&dir.path().join("absent.pdf")),
            Err(StatusCode::STG_E_FILENOTFOUND)
        );
    }

    /// To run: place a text PDF at `tests/fixtures/sample.pdf` and run with
    /// `--include-ignored`.
    #[test]
    #[ignore]
    fn fixture_pdf_yields_page_text() {
        let steps = PdfSource
            .load(Path::new("tests/fixtures/sample.pdf"))
            .expect("place tests/fixtures/sample.pdf to run this test");
        assert!(steps.iter().any(|s| matches!(s, ChunkStep::Text(t) if !t.is_empty())));
    }
}
