use crate::provider::{DocumentLoader, InitFlags, OpenMode, Provider, TextFilter};
use crate::sink::TextSink;
use crate::status::{
    classify_chunk, classify_text, ChunkDisposition, StatusCode, TextDisposition,
};
use crate::{FilterError, FilterFlags, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default capacity of the text buffer handed to providers, in UTF-16 units.
pub const TEXT_BUFFER_UNITS: usize = 1024;

pub(crate) const END_OF_TEXT_MARKER: &str = "\n<end of text>\n";
pub(crate) const END_OF_CHUNK_MARKER: &str = "\n<end of chunk>\n";
const CHUNK_SEPARATOR: &str = "\n";

const TRACE_TARGET: &str = "filterbridge::trace";

// ── CancelFlag ────────────────────────────────────────────────────────────────

/// Cooperative cancellation, checked before every chunk and text request.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── ExtractionSummary ─────────────────────────────────────────────────────────

/// Counters for one completed pass.
///
/// A pass that ended on a suppressed fault reports the same way as one that
/// reached the end of the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// UTF-16 units appended across all text blocks.
    pub text_units: usize,
    /// Text chunks read to completion.
    pub text_chunks: usize,
    /// Chunks skipped because their embedding or link was unavailable.
    pub skipped_chunks: usize,
}

// ── ExtractionEngine ──────────────────────────────────────────────────────────

/// Drives one provider through a complete chunk-streaming pass.
///
/// The pass goes `Unbound → Bound → Streaming → Done | Failed`:
///
/// 1. both facets are obtained from the provider;
/// 2. the document is loaded read-only and the filter initialized;
/// 3. chunks are enumerated until `FILTER_E_END_OF_CHUNKS` or a fault,
///    with every text block appended to the sink in provider order.
///
/// Facets are dropped, and so released, on every exit path.
#[derive(Debug, Clone)]
pub struct ExtractionEngine {
    flags: FilterFlags,
    buffer_units: usize,
    cancel: Option<CancelFlag>,
}

impl ExtractionEngine {
    pub fn new(flags: &FilterFlags) -> Self {
        Self {
            flags: *flags,
            buffer_units: TEXT_BUFFER_UNITS,
            cancel: None,
        }
    }

    /// Use a text buffer of `units` UTF-16 units (at least one).
    pub fn with_buffer_units(mut self, units: usize) -> Self {
        self.buffer_units = units.max(1);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run one pass of `provider` over the document at `path`.
    pub fn run<S: TextSink + ?Sized>(
        &self,
        provider: &dyn Provider,
        path: &Path,
        sink: &mut S,
    ) -> Result<ExtractionSummary> {
        let mut loader = provider
            .document_loader()
            .ok_or(FilterError::MissingDocumentLoader)?;
        let mut filter = provider
            .text_filter()
            .ok_or(FilterError::MissingTextFilter)?;

        self.bind(loader.as_mut(), filter.as_mut(), path)?;
        let summary = self.stream(filter.as_mut(), sink)?;

        log::debug!(
            "extracted {} units from {} text chunks of '{}' ({} skipped)",
            summary.text_units,
            summary.text_chunks,
            path.display(),
            summary.skipped_chunks
        );
        Ok(summary)
    }

    /// Load the document and initialize the filter with zero scope and flags.
    fn bind(
        &self,
        loader: &mut (dyn DocumentLoader + '_),
        filter: &mut (dyn TextFilter + '_),
        path: &Path,
    ) -> Result<()> {
        loader
            .load(path, OpenMode::ReadOnly)
            .map_err(|status| FilterError::LoadFailed {
                path: path.to_path_buf(),
                status,
            })?;

        // The attribute flags tell which properties to skip; text only needs none of them.
        let _attributes = filter
            .init(InitFlags::default())
            .map_err(FilterError::InitFailed)?;

        Ok(())
    }

    fn stream<S: TextSink + ?Sized>(
        &self,
        filter: &mut (dyn TextFilter + '_),
        sink: &mut S,
    ) -> Result<ExtractionSummary> {
        let mut summary = ExtractionSummary::default();
        let mut buffer = vec![0u16; self.buffer_units];

        loop {
            if self.is_cancelled() {
                return Err(FilterError::Cancelled);
            }
            if self.flags.emit_debug_trace {
                trace_chunk_constants();
            }

            let step = filter.next_chunk();
            match classify_chunk(&step) {
                ChunkDisposition::Text => {
                    summary.text_units += self.read_chunk_text(filter, &mut buffer, sink)?;
                    summary.text_chunks += 1;
                }
                ChunkDisposition::NonText => {}
                ChunkDisposition::Skip(reason) => {
                    log::debug!("skipping unreadable chunk: {reason:?}");
                    summary.skipped_chunks += 1;
                }
                ChunkDisposition::End => break,
                ChunkDisposition::Fatal(fault) => {
                    if self.flags.suppress_error_if_text_found && summary.text_units > 0 {
                        log::warn!(
                            "ignoring '{fault}' after {} units of text were extracted",
                            summary.text_units
                        );
                        break;
                    }
                    return Err(FilterError::Stream(fault));
                }
            }
        }

        Ok(summary)
    }

    /// Read every text block of the current chunk, returning the units appended.
    fn read_chunk_text<S: TextSink + ?Sized>(
        &self,
        filter: &mut (dyn TextFilter + '_),
        buffer: &mut [u16],
        sink: &mut S,
    ) -> Result<usize> {
        let markers = self.flags.emit_text_end_markers;
        let mut decoder = Utf16Decoder::default();
        let mut units = 0;

        loop {
            if self.is_cancelled() {
                return Err(FilterError::Cancelled);
            }
            if self.flags.emit_debug_trace {
                trace_text_constants();
            }

            let step = filter.next_text(buffer);
            match classify_text(&step) {
                TextDisposition::Block(0) => {
                    // A provider that succeeds without text would be asked forever.
                    log::warn!("text retrieval returned an empty block, ending chunk");
                    break;
                }
                TextDisposition::Block(len) => {
                    let len = len.min(buffer.len());
                    let text = decoder.decode(&buffer[..len]);
                    if !text.is_empty() {
                        sink.append(&text)?;
                    }
                    units += len;
                    if markers {
                        sink.append(END_OF_TEXT_MARKER)?;
                    }
                }
                TextDisposition::EndOfChunk => break,
                TextDisposition::Fault(status) => {
                    log::warn!("text retrieval ended early: {status}");
                    break;
                }
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            sink.append(&tail)?;
        }
        if markers {
            sink.append(END_OF_CHUNK_MARKER)?;
        }
        sink.append(CHUNK_SEPARATOR)?;

        Ok(units)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

// ── UTF-16 decoding across block boundaries ──────────────────────────────────

/// Decodes consecutive blocks of one chunk, holding back a high surrogate
/// that ends a block until its partner arrives.
///
/// The held-back unit is emitted with the next block, so with markers on it
/// lands after the end-of-text marker of the block it was read in.
#[derive(Debug, Default)]
struct Utf16Decoder {
    pending: Option<u16>,
}

impl Utf16Decoder {
    fn decode(&mut self, block: &[u16]) -> String {
        let mut units: Vec<u16> = Vec::with_capacity(block.len() + 1);
        units.extend(self.pending.take());
        units.extend_from_slice(block);

        if units.last().is_some_and(|&u| is_high_surrogate(u)) {
            self.pending = units.pop();
        }

        String::from_utf16_lossy(&units)
    }

    /// Flush a dangling high surrogate as U+FFFD.
    fn finish(&mut self) -> String {
        match self.pending.take() {
            Some(_) => char::REPLACEMENT_CHARACTER.to_string(),
            None => String::new(),
        }
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

// ── Debug trace ───────────────────────────────────────────────────────────────

fn trace_chunk_constants() {
    for status in [
        StatusCode::FILTER_E_END_OF_CHUNKS,
        StatusCode::FILTER_E_EMBEDDING_UNAVAILABLE,
        StatusCode::FILTER_E_LINK_UNAVAILABLE,
        StatusCode::FILTER_E_PASSWORD,
        StatusCode::FILTER_E_ACCESS,
    ] {
        log::debug!(target: TRACE_TARGET, "next chunk, watching {status}");
    }
}

fn trace_text_constants() {
    for status in [StatusCode::FILTER_E_NO_MORE_TEXT, StatusCode::FILTER_E_NO_TEXT] {
        log::debug!(target: TRACE_TARGET, "next text, watching {status}");
    }
}
