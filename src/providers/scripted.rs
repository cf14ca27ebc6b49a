//! Providers that replay a fixed script.
//!
//! Useful for exercising hosts without a real filter plugin: the script
//! decides which chunks appear, which statuses are returned and whether
//! facets exist at all. A [`ScriptProbe`] records what the host did with the
//! provider.

use super::queue::ChunkQueue;
use crate::provider::{
    AttributeFlags, ChunkDescriptor, ClassFactory, DocumentLoader, InitFlags, OpenMode, Provider,
    ProviderFactory, ProviderResult, Resolved, TextFilter,
};
use crate::status::StatusCode;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub use super::queue::ChunkStep;

// ── ScriptProbe ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ProbeState {
    live_facets: Cell<usize>,
    facets_opened: Cell<usize>,
    chunk_requests: Cell<usize>,
    provider_releases: Cell<usize>,
    loaded_paths: RefCell<Vec<PathBuf>>,
}

/// Shared record of what happened to one or more scripted providers.
#[derive(Debug, Clone, Default)]
pub struct ScriptProbe(Rc<ProbeState>);

impl ScriptProbe {
    /// Facets handed out and not yet dropped.
    pub fn live_facets(&self) -> usize {
        self.0.live_facets.get()
    }

    /// Facets handed out in total.
    pub fn facets_opened(&self) -> usize {
        self.0.facets_opened.get()
    }

    /// Calls to `next_chunk`.
    pub fn chunk_requests(&self) -> usize {
        self.0.chunk_requests.get()
    }

    /// Providers dropped.
    pub fn provider_releases(&self) -> usize {
        self.0.provider_releases.get()
    }

    /// Paths passed to `load`, in call order.
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.0.loaded_paths.borrow().clone()
    }

    fn bump(cell: &Cell<usize>) {
        cell.set(cell.get() + 1);
    }
}

// ── ScriptedProvider ──────────────────────────────────────────────────────────

/// A provider that serves the same script on every pass.
pub struct ScriptedProvider {
    script: Vec<ChunkStep>,
    queue: RefCell<ChunkQueue>,
    has_loader: bool,
    has_filter: bool,
    load_status: Option<StatusCode>,
    init_status: Option<StatusCode>,
    probe: ScriptProbe,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ChunkStep>) -> Self {
        Self {
            script,
            queue: RefCell::new(ChunkQueue::default()),
            has_loader: true,
            has_filter: true,
            load_status: None,
            init_status: None,
            probe: ScriptProbe::default(),
        }
    }

    pub fn with_probe(mut self, probe: ScriptProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn without_document_loader(mut self) -> Self {
        self.has_loader = false;
        self
    }

    pub fn without_text_filter(mut self) -> Self {
        self.has_filter = false;
        self
    }

    /// Make `load` fail with `status`.
    pub fn failing_load(mut self, status: StatusCode) -> Self {
        self.load_status = Some(status);
        self
    }

    /// Make `init` fail with `status`.
    pub fn failing_init(mut self, status: StatusCode) -> Self {
        self.init_status = Some(status);
        self
    }

    fn open_facet(&self) -> ScriptedFacet<'_> {
        ScriptProbe::bump(&self.probe.0.facets_opened);
        ScriptProbe::bump(&self.probe.0.live_facets);
        ScriptedFacet { provider: self }
    }
}

impl Provider for ScriptedProvider {
    fn document_loader(&self) -> Option<Box<dyn DocumentLoader + '_>> {
        if !self.has_loader {
            return None;
        }
        Some(Box::new(self.open_facet()))
    }

    fn text_filter(&self) -> Option<Box<dyn TextFilter + '_>> {
        if !self.has_filter {
            return None;
        }
        Some(Box::new(self.open_facet()))
    }
}

impl Drop for ScriptedProvider {
    fn drop(&mut self) {
        ScriptProbe::bump(&self.probe.0.provider_releases);
    }
}

struct ScriptedFacet<'a> {
    provider: &'a ScriptedProvider,
}

impl DocumentLoader for ScriptedFacet<'_> {
    fn load(&mut self, path: &Path, _mode: OpenMode) -> ProviderResult<()> {
        self.provider
            .probe
            .0
            .loaded_paths
            .borrow_mut()
            .push(path.to_path_buf());
        match self.provider.load_status {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }
}

impl TextFilter for ScriptedFacet<'_> {
    fn init(&mut self, _flags: InitFlags) -> ProviderResult<AttributeFlags> {
        if let Some(status) = self.provider.init_status {
            return Err(status);
        }
        *self.provider.queue.borrow_mut() = ChunkQueue::new(self.provider.script.clone());
        Ok(AttributeFlags::default())
    }

    fn next_chunk(&mut self) -> ProviderResult<ChunkDescriptor> {
        ScriptProbe::bump(&self.provider.probe.0.chunk_requests);
        self.provider.queue.borrow_mut().next_chunk()
    }

    fn next_text(&mut self, buffer: &mut [u16]) -> ProviderResult<usize> {
        self.provider.queue.borrow_mut().next_text(buffer)
    }
}

impl Drop for ScriptedFacet<'_> {
    fn drop(&mut self) {
        let live = &self.provider.probe.0.live_facets;
        live.set(live.get() - 1);
    }
}

// ── ScriptedFactory ───────────────────────────────────────────────────────────

type MakeProvider = Rc<dyn Fn() -> ScriptedProvider>;

enum Entry {
    Instance(MakeProvider),
    Class(MakeProvider),
    FailingClass(StatusCode),
}

/// A factory resolving monikers to scripted providers.
///
/// Unknown monikers fail with `MK_E_SYNTAX`.
#[derive(Default)]
pub struct ScriptedFactory {
    entries: HashMap<String, Entry>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `moniker` directly to a provider built by `make`.
    pub fn with_instance<F>(mut self, moniker: &str, make: F) -> Self
    where
        F: Fn() -> ScriptedProvider + 'static,
    {
        self.entries
            .insert(moniker.to_owned(), Entry::Instance(Rc::new(make)));
        self
    }

    /// Resolve `moniker` to a class factory that builds providers with `make`.
    pub fn with_class<F>(mut self, moniker: &str, make: F) -> Self
    where
        F: Fn() -> ScriptedProvider + 'static,
    {
        self.entries
            .insert(moniker.to_owned(), Entry::Class(Rc::new(make)));
        self
    }

    /// Resolve `moniker` to a class factory whose `create_instance` fails.
    pub fn with_failing_class(mut self, moniker: &str, status: StatusCode) -> Self {
        self.entries
            .insert(moniker.to_owned(), Entry::FailingClass(status));
        self
    }
}

impl ProviderFactory for ScriptedFactory {
    fn resolve(&self, moniker: &str) -> ProviderResult<Resolved> {
        let entry = self.entries.get(moniker).ok_or(StatusCode::MK_E_SYNTAX)?;
        let resolved = match entry {
            Entry::Instance(make) => Resolved::Instance(Box::new(make())),
            Entry::Class(make) => Resolved::ClassFactory(Box::new(ScriptedClass {
                make: Some(make.clone()),
                status: StatusCode::S_OK,
            })),
            Entry::FailingClass(status) => Resolved::ClassFactory(Box::new(ScriptedClass {
                make: None,
                status: *status,
            })),
        };
        Ok(resolved)
    }

    fn knows(&self, moniker: &str) -> bool {
        self.entries.contains_key(moniker)
    }
}

struct ScriptedClass {
    make: Option<MakeProvider>,
    status: StatusCode,
}

impl ClassFactory for ScriptedClass {
    fn create_instance(&self) -> ProviderResult<Box<dyn Provider>> {
        match &self.make {
            Some(make) => Ok(Box::new(make())),
            None => Err(self.status),
        }
    }
}
