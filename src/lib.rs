//! # filterbridge
//!
//! A Rust library that drives chunk-streaming document text filters (the
//! plugin family that pulls plain text out of word processor files,
//! spreadsheets, PDFs and so on) and collects their output.
//!
//! ## What this crate does
//!
//! 1. **Scope the interop subsystem**: [`InteropScope`] initializes the
//!    platform subsystem for the current thread and tears it down on drop.
//! 2. **Acquire a provider**: a moniker such as
//!    `clsid:f07f3920-7b8c-11cf-9be8-00aa004b9986` is resolved through a
//!    [`ProviderFactory`] into a [`FilterSession`].
//! 3. **Stream the document**: the session binds the provider to a file and
//!    walks its chunks, appending every text block to a [`TextSink`].
//! 4. **Classify failures**: provider status codes become skips, a clean end,
//!    or a [`FilterError`], optionally suppressed once text was produced.
//!
//! ## Quick example
//!
//! ```no_run
//! use filterbridge::{BuiltinProviders, FilterFlags, InteropScope, NoopSubsystem, ThreadingModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scope = InteropScope::enter(NoopSubsystem, ThreadingModel::Apartment)?;
//! let mut session = scope.acquire(&BuiltinProviders::new(), "filterbridge:text")?;
//!
//! let mut text = String::new();
//! let summary = session.extract("notes.txt", &mut text, &FilterFlags::default())?;
//! println!("{} units of text", summary.text_units);
//!
//! session.release();
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use thiserror::Error;

pub mod config;
mod extraction_engine;
pub mod preparator;
pub mod provider;
pub mod providers;
mod reg_query;
pub mod registry;
mod session;
mod sink;
pub mod status;
mod subsystem;

pub use extraction_engine::{CancelFlag, ExtractionEngine, ExtractionSummary};
pub use preparator::DocumentPreparator;
pub use provider::{Provider, ProviderFactory, Resolved};
pub use providers::BuiltinProviders;
pub use reg_query::RegQueryRegistry;
pub use registry::{ClassRegistry, HandlerResolver, MemoryRegistry};
pub use session::FilterSession;
pub use sink::{IoSink, TextSink};
pub use status::{StatusCode, StreamFault};
pub use subsystem::{InteropScope, NoopSubsystem, Subsystem, ThreadingModel};

// ── Configuration ────────────────────────────────────────────────────────────

/// Policy flags for one extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterFlags {
    /// Append `"\n<end of text>\n"` after every retrieved text block and
    /// `"\n<end of chunk>\n"` after every text chunk.
    pub emit_text_end_markers: bool,

    /// Log the status constants in play before every chunk and text
    /// retrieval (debug level, target `filterbridge::trace`).
    pub emit_debug_trace: bool,

    /// Finish successfully instead of failing on a stream fault when at least
    /// one unit of text was already appended.
    pub suppress_error_if_text_found: bool,
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Broad category of a [`FilterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resolving a moniker to a provider failed.
    Acquisition,
    /// Binding the provider to a document failed.
    Binding,
    /// The chunk stream ended with a fault.
    Stream,
    /// Subsystem or session lifecycle misuse.
    Lifecycle,
    /// Mapping a document to a provider moniker failed.
    Resolution,
    /// Writing to the output sink failed.
    Output,
    /// Loading configuration failed.
    Configuration,
    /// The pass was cancelled before a provider request.
    Cancelled,
}

/// Every error that this crate can produce.
#[derive(Error, Debug)]
pub enum FilterError {
    /// A filesystem or sink I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The configuration could not be loaded or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// The interop subsystem refused to initialize on this thread.
    #[error("Interop subsystem initialization failed: {0}")]
    SubsystemInit(StatusCode),

    /// The moniker does not resolve to any registered provider.
    #[error("Can't find provider moniker '{moniker}': {status}")]
    ProviderNotFound { moniker: String, status: StatusCode },

    /// The moniker resolved to a class factory that could not create an instance.
    #[error("Can't create provider instance for '{moniker}': {status}")]
    InstantiationFailed { moniker: String, status: StatusCode },

    /// The session was used after release.
    #[error("Filter session is not initialized")]
    NotInitialized,

    /// The provider has no document-loader facet.
    #[error("Provider does not expose a document loader")]
    MissingDocumentLoader,

    /// The provider has no text-filter facet.
    #[error("Provider does not expose a text filter")]
    MissingTextFilter,

    /// The provider could not bind to the document.
    #[error("Loading '{}' failed: {status}", .path.display())]
    LoadFailed { path: PathBuf, status: StatusCode },

    /// The text filter rejected initialization.
    #[error("Initializing text filter failed: {0}")]
    InitFailed(StatusCode),

    /// The chunk stream stopped with a fault that was not suppressed.
    #[error("Text extraction failed: {0}")]
    Stream(StreamFault),

    /// The pass was cancelled before a provider request.
    #[error("Text extraction was cancelled")]
    Cancelled,

    /// The document path has no file extension to resolve a provider from.
    #[error("Can't detect file extension: {}", .0.display())]
    NoExtension(PathBuf),

    /// The extension is not known to the class registry.
    #[error("Unknown file extension: {0}")]
    UnknownExtension(String),

    /// The document class has no class id.
    #[error("CLSID of extension class {0} not found")]
    ClassIdNotFound(String),

    /// The document class has no persistent handler.
    #[error("PersistentHandler of extension class {0} not found")]
    PersistentHandlerNotFound(String),

    /// The persistent handler has no text filter registered.
    #[error("Filter class of persistent handler not found for extension {0}")]
    FilterClassNotFound(String),

    /// The class registry could not be read.
    #[error("Reading class registry failed: {0}")]
    RegistryUnavailable(String),
}

impl FilterError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IoError(_) => ErrorKind::Output,
            Self::Config(_) => ErrorKind::Configuration,
            Self::SubsystemInit(_) | Self::NotInitialized => ErrorKind::Lifecycle,
            Self::ProviderNotFound { .. } | Self::InstantiationFailed { .. } => {
                ErrorKind::Acquisition
            }
            Self::MissingDocumentLoader
            | Self::MissingTextFilter
            | Self::LoadFailed { .. }
            | Self::InitFailed(_) => ErrorKind::Binding,
            Self::Stream(_) => ErrorKind::Stream,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::NoExtension(_)
            | Self::UnknownExtension(_)
            | Self::ClassIdNotFound(_)
            | Self::PersistentHandlerNotFound(_)
            | Self::FilterClassNotFound(_)
            | Self::RegistryUnavailable(_) => ErrorKind::Resolution,
        }
    }

    /// The stream fault, when this error is one.
    pub fn stream_fault(&self) -> Option<StreamFault> {
        match self {
            Self::Stream(fault) => Some(*fault),
            _ => None,
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, FilterError>;
