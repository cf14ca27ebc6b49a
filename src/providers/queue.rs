//! A provider built from a pre-computed list of chunks.
//!
//! [`ChunkQueue`] implements the enumeration half of the protocol over a list
//! of [`ChunkStep`]s. [`ChunkQueueProvider`] wraps it into a full provider for
//! any [`ChunkSource`] that can turn a document into such a list.

use crate::provider::{
    AttributeFlags, BreakType, ChunkDescriptor, ChunkKind, DocumentLoader, InitFlags, OpenMode,
    Provider, ProviderResult, TextFilter,
};
use crate::status::StatusCode;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

// ── ChunkStep ─────────────────────────────────────────────────────────────────

/// One step of a chunk enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStep {
    /// A text chunk with this content.
    Text(String),
    /// A text chunk whose retrieval fails with `status` once `text` was delivered.
    BrokenText { text: String, status: StatusCode },
    /// A value (property) chunk.
    Value,
    /// `next_chunk` fails with this status.
    Status(StatusCode),
}

impl ChunkStep {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn broken_text(text: impl Into<String>, status: StatusCode) -> Self {
        Self::BrokenText {
            text: text.into(),
            status,
        }
    }
}

// ── ChunkQueue ────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct TextCursor {
    units: Vec<u16>,
    pos: usize,
    fault: Option<StatusCode>,
}

impl TextCursor {
    fn new(text: &str, fault: Option<StatusCode>) -> Self {
        Self {
            units: text.encode_utf16().collect(),
            pos: 0,
            fault,
        }
    }
}

/// Serves a list of steps through `next_chunk` / `next_text`.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    steps: VecDeque<ChunkStep>,
    current: Option<TextCursor>,
    next_id: u32,
}

impl ChunkQueue {
    pub fn new(steps: impl IntoIterator<Item = ChunkStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            current: None,
            next_id: 1,
        }
    }

    /// Advance to the next step. Once the list is exhausted every call returns
    /// `FILTER_E_END_OF_CHUNKS`.
    pub fn next_chunk(&mut self) -> ProviderResult<ChunkDescriptor> {
        self.current = None;

        let kind = match self.steps.pop_front() {
            None => return Err(StatusCode::FILTER_E_END_OF_CHUNKS),
            Some(ChunkStep::Status(status)) => return Err(status),
            Some(ChunkStep::Value) => ChunkKind::Value,
            Some(ChunkStep::Text(text)) => {
                self.current = Some(TextCursor::new(&text, None));
                ChunkKind::Text
            }
            Some(ChunkStep::BrokenText { text, status }) => {
                self.current = Some(TextCursor::new(&text, Some(status)));
                ChunkKind::Text
            }
        };

        let id = self.next_id;
        self.next_id += 1;
        Ok(ChunkDescriptor {
            id,
            kind,
            break_type: BreakType::EndOfParagraph,
        })
    }

    /// Copy as much of the current chunk's remaining text as fits in `buffer`.
    pub fn next_text(&mut self, buffer: &mut [u16]) -> ProviderResult<usize> {
        let cursor = self.current.as_mut().ok_or(StatusCode::FILTER_E_NO_TEXT)?;

        let remaining = cursor.units.len() - cursor.pos;
        if remaining == 0 {
            return Err(cursor.fault.unwrap_or(StatusCode::FILTER_E_NO_MORE_TEXT));
        }

        let len = remaining.min(buffer.len());
        buffer[..len].copy_from_slice(&cursor.units[cursor.pos..cursor.pos + len]);
        cursor.pos += len;
        Ok(len)
    }
}

// ── ChunkQueueProvider ────────────────────────────────────────────────────────

/// Turns a document on disk into chunk steps.
pub trait ChunkSource {
    fn load(&self, path: &Path) -> ProviderResult<Vec<ChunkStep>>;
}

/// A provider whose loader asks a [`ChunkSource`] for the document's steps and
/// whose filter replays them.
pub struct ChunkQueueProvider<S> {
    source: S,
    loaded: RefCell<Option<Vec<ChunkStep>>>,
    queue: RefCell<ChunkQueue>,
}

impl<S: ChunkSource> ChunkQueueProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            loaded: RefCell::new(None),
            queue: RefCell::new(ChunkQueue::default()),
        }
    }
}

impl<S: ChunkSource> Provider for ChunkQueueProvider<S> {
    fn document_loader(&self) -> Option<Box<dyn DocumentLoader + '_>> {
        Some(Box::new(QueueFacet { provider: self }))
    }

    fn text_filter(&self) -> Option<Box<dyn TextFilter + '_>> {
        Some(Box::new(QueueFacet { provider: self }))
    }
}

struct QueueFacet<'a, S> {
    provider: &'a ChunkQueueProvider<S>,
}

impl<S: ChunkSource> DocumentLoader for QueueFacet<'_, S> {
    fn load(&mut self, path: &Path, _mode: OpenMode) -> ProviderResult<()> {
        let steps = self.provider.source.load(path)?;
        *self.provider.loaded.borrow_mut() = Some(steps);
        Ok(())
    }
}

impl<S: ChunkSource> TextFilter for QueueFacet<'_, S> {
    fn init(&mut self, _flags: InitFlags) -> ProviderResult<AttributeFlags> {
        let steps = self
            .provider
            .loaded
            .borrow()
            .clone()
            .ok_or(StatusCode::E_UNEXPECTED)?;
        *self.provider.queue.borrow_mut() = ChunkQueue::new(steps);
        Ok(AttributeFlags::default())
    }

    fn next_chunk(&mut self) -> ProviderResult<ChunkDescriptor> {
        self.provider.queue.borrow_mut().next_chunk()
    }

    fn next_text(&mut self, buffer: &mut [u16]) -> ProviderResult<usize> {
        self.provider.queue.borrow_mut().next_text(buffer)
    }
}
