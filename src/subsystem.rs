use crate::provider::ProviderFactory;
use crate::session::FilterSession;
use crate::status::StatusCode;
use crate::{FilterError, Result};
use serde::Deserialize;
use std::marker::PhantomData;

/// Threading model requested when the interop subsystem is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreadingModel {
    /// Single-threaded apartment (`0x2`). Providers are only called from the
    /// thread that created them.
    #[default]
    Apartment,
    /// Multithreaded apartment (`0x0`).
    Multithreaded,
}

impl ThreadingModel {
    /// The raw flag value handed to the platform.
    pub fn flag(self) -> u32 {
        match self {
            Self::Apartment => 0x2,
            Self::Multithreaded => 0x0,
        }
    }
}

/// The process/thread-wide interop subsystem providers live in.
pub trait Subsystem {
    /// Initialize the subsystem for the calling thread.
    ///
    /// `S_FALSE` (already initialized) is a success and must still be paired
    /// with [`Subsystem::uninitialize`].
    fn initialize(&self, model: ThreadingModel) -> std::result::Result<(), StatusCode>;

    fn uninitialize(&self);
}

/// A subsystem with nothing to set up, for providers that run in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSubsystem;

impl Subsystem for NoopSubsystem {
    fn initialize(&self, _model: ThreadingModel) -> std::result::Result<(), StatusCode> {
        Ok(())
    }

    fn uninitialize(&self) {}
}

// ── InteropScope ──────────────────────────────────────────────────────────────

/// The interop subsystem, initialized for the current thread.
///
/// Sessions are acquired through the scope, so no provider is touched before
/// initialization. Dropping the scope uninitializes the subsystem; drop every
/// session first. The scope is neither `Send` nor `Sync` because the
/// initialization belongs to the thread that performed it.
pub struct InteropScope {
    subsystem: Box<dyn Subsystem>,
    model: ThreadingModel,
    _thread_bound: PhantomData<*const ()>,
}

impl InteropScope {
    /// Initialize `subsystem` on the calling thread.
    pub fn enter<S: Subsystem + 'static>(subsystem: S, model: ThreadingModel) -> Result<Self> {
        subsystem
            .initialize(model)
            .map_err(FilterError::SubsystemInit)?;
        log::debug!("interop subsystem initialized ({model:?})");

        Ok(Self {
            subsystem: Box::new(subsystem),
            model,
            _thread_bound: PhantomData,
        })
    }

    pub fn model(&self) -> ThreadingModel {
        self.model
    }

    /// Resolve `moniker` through `factory` into a new session.
    pub fn acquire(&self, factory: &dyn ProviderFactory, moniker: &str) -> Result<FilterSession> {
        FilterSession::acquire(self, factory, moniker)
    }
}

impl Drop for InteropScope {
    fn drop(&mut self) {
        self.subsystem.uninitialize();
        log::debug!("interop subsystem uninitialized");
    }
}
