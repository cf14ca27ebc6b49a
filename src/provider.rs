//! The provider side of the chunk-streaming protocol.
//!
//! A provider is one loaded filter plugin. It exposes two facets: a
//! [`DocumentLoader`] that binds it to a file and a [`TextFilter`] that
//! enumerates chunks and hands out their text. Facets borrow the provider and
//! are released by dropping them.

use crate::status::StatusCode;
use std::path::Path;

/// Result type used on the provider boundary: failures are raw status codes.
pub type ProviderResult<T> = std::result::Result<T, StatusCode>;

// ── Chunks ────────────────────────────────────────────────────────────────────

/// Payload of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// The chunk carries text, read through [`TextFilter::next_text`].
    Text,
    /// The chunk carries a property value. Not read by this crate.
    Value,
}

/// How a chunk relates to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakType {
    #[default]
    NoBreak,
    EndOfWord,
    EndOfSentence,
    EndOfParagraph,
    EndOfChapter,
}

/// Descriptor returned by one enumeration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub id: u32,
    pub kind: ChunkKind,
    pub break_type: BreakType,
}

// ── Binding parameters ────────────────────────────────────────────────────────

/// Access mode requested when binding a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    ReadOnly,
}

/// Scope and flags passed to [`TextFilter::init`]. The extractor always
/// passes the zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitFlags {
    pub flags: u32,
    pub attribute_count: u32,
}

/// Attribute flags handed back by [`TextFilter::init`] (the "properties to
/// skip" indicator). The extractor does not use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeFlags(pub u32);

// ── Facets ────────────────────────────────────────────────────────────────────

/// Binds a provider to a document on disk.
pub trait DocumentLoader {
    fn load(&mut self, path: &Path, mode: OpenMode) -> ProviderResult<()>;
}

/// The enumeration and text-retrieval facet of a provider.
pub trait TextFilter {
    /// Prepare the filter for the bound document.
    fn init(&mut self, flags: InitFlags) -> ProviderResult<AttributeFlags>;

    /// Advance to the next chunk.
    ///
    /// `Err(FILTER_E_END_OF_CHUNKS)` signals the normal end of the document.
    fn next_chunk(&mut self) -> ProviderResult<ChunkDescriptor>;

    /// Copy the next block of the current chunk's text into `buffer`,
    /// returning the number of UTF-16 units written (at most `buffer.len()`).
    ///
    /// `Err(FILTER_E_NO_MORE_TEXT)` signals that the chunk is exhausted.
    fn next_text(&mut self, buffer: &mut [u16]) -> ProviderResult<usize>;
}

/// One loaded provider instance.
pub trait Provider {
    /// The document-loader facet, if the provider has one.
    fn document_loader(&self) -> Option<Box<dyn DocumentLoader + '_>>;

    /// The text-filter facet, if the provider has one.
    fn text_filter(&self) -> Option<Box<dyn TextFilter + '_>>;
}

// ── Factories ─────────────────────────────────────────────────────────────────

/// A class object that can create provider instances.
pub trait ClassFactory {
    fn create_instance(&self) -> ProviderResult<Box<dyn Provider>>;
}

/// What a moniker resolved to.
pub enum Resolved {
    /// A ready provider.
    Instance(Box<dyn Provider>),
    /// A class object that still has to create the provider.
    ClassFactory(Box<dyn ClassFactory>),
}

/// Resolves provider monikers such as `clsid:f07f3920-7b8c-11cf-9be8-00aa004b9986`.
pub trait ProviderFactory {
    fn resolve(&self, moniker: &str) -> ProviderResult<Resolved>;

    /// Whether `moniker` would resolve. The default resolves it and drops
    /// the result; factories with a fixed table should answer from it.
    fn knows(&self, moniker: &str) -> bool {
        self.resolve(moniker).is_ok()
    }
}
