use crate::extraction_engine::{CancelFlag, ExtractionEngine, ExtractionSummary, TEXT_BUFFER_UNITS};
use crate::provider::{Provider, ProviderFactory, Resolved};
use crate::sink::TextSink;
use crate::subsystem::InteropScope;
use crate::{FilterError, FilterFlags, Result};
use std::fmt;
use std::path::Path;

// ── FilterSession ─────────────────────────────────────────────────────────────

/// One acquired provider, owned by the caller until [`release`].
///
/// Extraction borrows the session mutably, so a second pass cannot start
/// while one is running.
///
/// [`release`]: FilterSession::release
pub struct FilterSession {
    moniker: String,
    provider: Option<Box<dyn Provider>>,
    buffer_units: usize,
}

impl FilterSession {
    /// Resolve `moniker` into a provider.
    ///
    /// When the moniker names a class object rather than an instance, the
    /// instance is created from it here; callers never see the difference.
    pub fn acquire(
        _scope: &InteropScope,
        factory: &dyn ProviderFactory,
        moniker: &str,
    ) -> Result<Self> {
        let resolved = factory
            .resolve(moniker)
            .map_err(|status| FilterError::ProviderNotFound {
                moniker: moniker.to_owned(),
                status,
            })?;

        let provider = match resolved {
            Resolved::Instance(provider) => provider,
            Resolved::ClassFactory(class) => {
                log::debug!("'{moniker}' resolved to a class factory, creating instance");
                class
                    .create_instance()
                    .map_err(|status| FilterError::InstantiationFailed {
                        moniker: moniker.to_owned(),
                        status,
                    })?
            }
        };

        log::debug!("acquired provider '{moniker}'");
        Ok(Self::from_provider(moniker, provider))
    }

    /// Wrap an already created provider.
    pub fn from_provider(moniker: &str, provider: Box<dyn Provider>) -> Self {
        Self {
            moniker: moniker.to_owned(),
            provider: Some(provider),
            buffer_units: TEXT_BUFFER_UNITS,
        }
    }

    /// The moniker this session was acquired from.
    pub fn moniker(&self) -> &str {
        &self.moniker
    }

    /// `true` until the session is released.
    pub fn is_open(&self) -> bool {
        self.provider.is_some()
    }

    /// Size of the text buffer handed to the provider, in UTF-16 units.
    pub fn set_buffer_units(&mut self, units: usize) {
        self.buffer_units = units.max(1);
    }

    /// Extract the text of the document at `path` into `sink`.
    pub fn extract<P, S>(&mut self, path: P, sink: &mut S, flags: &FilterFlags) -> Result<ExtractionSummary>
    where
        P: AsRef<Path>,
        S: TextSink + ?Sized,
    {
        self.run(path.as_ref(), sink, flags, None)
    }

    /// Like [`extract`](Self::extract), checking `cancel` before every provider request.
    pub fn extract_cancellable<P, S>(
        &mut self,
        path: P,
        sink: &mut S,
        flags: &FilterFlags,
        cancel: &CancelFlag,
    ) -> Result<ExtractionSummary>
    where
        P: AsRef<Path>,
        S: TextSink + ?Sized,
    {
        self.run(path.as_ref(), sink, flags, Some(cancel))
    }

    fn run<S: TextSink + ?Sized>(
        &mut self,
        path: &Path,
        sink: &mut S,
        flags: &FilterFlags,
        cancel: Option<&CancelFlag>,
    ) -> Result<ExtractionSummary> {
        let provider = self.provider.as_deref().ok_or(FilterError::NotInitialized)?;

        let mut engine = ExtractionEngine::new(flags).with_buffer_units(self.buffer_units);
        if let Some(cancel) = cancel {
            engine = engine.with_cancel_flag(cancel.clone());
        }
        engine.run(provider, path, sink)
    }

    /// Release the provider.
    ///
    /// Returns `false`, and does nothing else, when the session was already
    /// released.
    pub fn release(&mut self) -> bool {
        match self.provider.take() {
            Some(provider) => {
                drop(provider);
                log::debug!("released provider '{}'", self.moniker);
                true
            }
            None => {
                log::warn!("provider '{}' released twice", self.moniker);
                false
            }
        }
    }
}

impl Drop for FilterSession {
    fn drop(&mut self) {
        if self.provider.take().is_some() {
            log::debug!("released provider '{}' on drop", self.moniker);
        }
    }
}

impl fmt::Debug for FilterSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSession")
            .field("moniker", &self.moniker)
            .field("open", &self.is_open())
            .field("buffer_units", &self.buffer_units)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::{ChunkStep, ScriptProbe, ScriptedFactory, ScriptedProvider};
    use crate::status::StatusCode;
    use crate::{ErrorKind, NoopSubsystem, ThreadingModel};

    fn scope() -> InteropScope {
        InteropScope::enter(NoopSubsystem, ThreadingModel::Apartment).unwrap()
    }

    #[test]
    fn acquire_instance() {
        let factory = ScriptedFactory::new().with_instance("x:direct", || {
            ScriptedProvider::new(vec![ChunkStep::text("hi")])
        });
        let session = scope().acquire(&factory, "x:direct").unwrap();
        assert!(session.is_open());
        assert_eq!(session.moniker(), "x:direct");
    }

    #[test]
    fn acquire_through_class_factory() {
        let factory = ScriptedFactory::new().with_class("x:class", || {
            ScriptedProvider::new(vec![ChunkStep::text("hi")])
        });
        let scope = scope();
        let mut session = scope.acquire(&factory, "x:class").unwrap();

        let mut out = String::new();
        session.extract("doc", &mut out, &FilterFlags::default()).unwrap();
        assert_eq!(out, "hi\n");
    }

    #[test]
    fn unknown_moniker_is_not_found() {
        let err = scope()
            .acquire(&ScriptedFactory::new(), "x:missing")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Acquisition);
        assert!(matches!(
            err,
            FilterError::ProviderNotFound { ref moniker, status: StatusCode::MK_E_SYNTAX }
                if moniker == "x:missing"
        ));
    }

    #[test]
    fn failing_class_factory_is_instantiation_failure() {
        let factory =
            ScriptedFactory::new().with_failing_class("x:broken", StatusCode::REGDB_E_CLASSNOTREG);
        let err = scope().acquire(&factory, "x:broken").unwrap_err();
        assert!(matches!(
            err,
            FilterError::InstantiationFailed { status: StatusCode::REGDB_E_CLASSNOTREG, .. }
        ));
    }

    #[test]
    fn double_release_releases_once() {
        let probe = ScriptProbe::default();
        let provider = ScriptedProvider::new(vec![]).with_probe(probe.clone());
        let mut session = FilterSession::from_provider("x:probe", Box::new(provider));

        assert!(session.release());
        assert!(!session.release());
        assert!(!session.is_open());
        assert_eq!(probe.provider_releases(), 1);

        drop(session);
        assert_eq!(probe.provider_releases(), 1);
    }

    #[test]
    fn drop_releases_open_session() {
        let probe = ScriptProbe::default();
        let provider = ScriptedProvider::new(vec![]).with_probe(probe.clone());
        drop(FilterSession::from_provider("x:probe", Box::new(provider)));
        assert_eq!(probe.provider_releases(), 1);
    }

    #[test]
    fn extract_after_release_fails() {
        let provider = ScriptedProvider::new(vec![ChunkStep::text("late")]);
        let mut session = FilterSession::from_provider("x:late", Box::new(provider));
        session.release();

        let mut out = String::new();
        let err = session
            .extract("doc", &mut out, &FilterFlags::default())
            .unwrap_err();
        assert!(matches!(err, FilterError::NotInitialized));
        assert!(out.is_empty());
    }

    #[test]
    fn session_serves_several_passes() {
        let provider = ScriptedProvider::new(vec![ChunkStep::text("again")]);
        let mut session = FilterSession::from_provider("x:again", Box::new(provider));

        for _ in 0..2 {
            let mut out = String::new();
            session.extract("doc", &mut out, &FilterFlags::default()).unwrap();
            assert_eq!(out, "again\n");
        }
    }
}
