//! Text extraction for many documents through one interop scope.
//!
//! [`DocumentPreparator`] picks a provider from the document's extension,
//! keeps the acquired sessions around for later documents of the same kind,
//! and releases all of them before the scope is left.

use crate::config::BridgeConfig;
use crate::provider::ProviderFactory;
use crate::registry::{ClassRegistry, HandlerResolver};
use crate::session::FilterSession;
use crate::subsystem::InteropScope;
use crate::{FilterError, FilterFlags, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Extracts document text, choosing and caching providers per extension.
///
/// A moniker comes from the handler overrides first, then from the class
/// registry. Sessions are shared between extensions that resolve to the same
/// moniker.
pub struct DocumentPreparator {
    // Field order is drop order: sessions go before the scope.
    sessions: Vec<FilterSession>,
    by_extension: HashMap<String, usize>,
    by_moniker: HashMap<String, usize>,
    factory: Box<dyn ProviderFactory>,
    registry: Box<dyn ClassRegistry>,
    overrides: HashMap<String, String>,
    flags: FilterFlags,
    buffer_units: Option<usize>,
    scope: Option<InteropScope>,
}

impl DocumentPreparator {
    pub fn new<F, R>(scope: InteropScope, factory: F, registry: R) -> Self
    where
        F: ProviderFactory + 'static,
        R: ClassRegistry + 'static,
    {
        Self {
            sessions: Vec::new(),
            by_extension: HashMap::new(),
            by_moniker: HashMap::new(),
            factory: Box::new(factory),
            registry: Box::new(registry),
            overrides: HashMap::new(),
            flags: FilterFlags::default(),
            buffer_units: None,
            scope: Some(scope),
        }
    }

    /// Take flags, buffer size and handler overrides from `config`.
    pub fn with_config(mut self, config: &BridgeConfig) -> Self {
        self.flags = config.filter_flags();
        self.buffer_units = Some(config.extraction.text_buffer_units);
        for (ext, moniker) in &config.handlers {
            self = self.with_handler(ext, moniker);
        }
        self
    }

    pub fn with_flags(mut self, flags: FilterFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Use `moniker` for `extension` without asking the registry.
    pub fn with_handler(mut self, extension: &str, moniker: &str) -> Self {
        self.overrides
            .insert(normalize_extension(extension), moniker.to_owned());
        self
    }

    /// Extract the text of the document at `path`.
    pub fn prepare(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| FilterError::NoExtension(path.to_path_buf()))?;

        let index = match self.by_extension.get(&ext) {
            Some(&index) => index,
            None => {
                let index = self.session_for(&ext)?;
                self.by_extension.insert(ext, index);
                index
            }
        };

        let mut text = String::new();
        self.sessions[index].extract(path, &mut text, &self.flags)?;
        Ok(text)
    }

    fn session_for(&mut self, ext: &str) -> Result<usize> {
        let moniker = match self.overrides.get(ext) {
            Some(moniker) => moniker.clone(),
            None => HandlerResolver::new(self.registry.as_ref()).filter_moniker(ext)?,
        };

        if let Some(&index) = self.by_moniker.get(&moniker) {
            log::debug!(".{ext} shares provider '{moniker}'");
            return Ok(index);
        }

        let scope = self.scope.as_ref().ok_or(FilterError::NotInitialized)?;
        let mut session = scope.acquire(self.factory.as_ref(), &moniker)?;
        if let Some(units) = self.buffer_units {
            session.set_buffer_units(units);
        }

        log::info!("using provider '{moniker}' for .{ext}");
        self.sessions.push(session);
        let index = self.sessions.len() - 1;
        self.by_moniker.insert(moniker, index);
        Ok(index)
    }

    /// Extensions this preparator can handle.
    ///
    /// These are the overrides and the registry's extensions, kept only when
    /// the factory knows the moniker they resolve to.
    pub fn supported_extensions(&self) -> Result<Vec<String>> {
        let mut extensions = BTreeSet::new();
        for (ext, moniker) in &self.overrides {
            if self.factory.knows(moniker) {
                extensions.insert(ext.clone());
            }
        }

        let resolver = HandlerResolver::new(self.registry.as_ref());
        match resolver.supported_extensions() {
            Ok(found) => {
                for ext in found.iter().map(|e| normalize_extension(e)) {
                    if extensions.contains(&ext) || self.overrides.contains_key(&ext) {
                        continue;
                    }
                    match resolver.filter_moniker(&ext) {
                        Ok(moniker) if self.factory.knows(&moniker) => {
                            extensions.insert(ext);
                        }
                        Ok(moniker) => log::debug!(".{ext}: no provider for '{moniker}'"),
                        Err(e) => log::debug!(".{ext}: {e}"),
                    }
                }
            }
            Err(e) if self.overrides.is_empty() => return Err(e),
            Err(e) => log::debug!("registry not consulted: {e}"),
        }

        Ok(extensions.into_iter().collect())
    }

    /// Number of distinct providers acquired so far.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Release every session, then leave the interop scope.
    ///
    /// Later calls to [`prepare`](Self::prepare) fail; a resolvable extension
    /// fails with [`FilterError::NotInitialized`].
    pub fn close(&mut self) {
        self.by_extension.clear();
        self.by_moniker.clear();
        for mut session in self.sessions.drain(..) {
            session.release();
        }
        if self.scope.take().is_some() {
            log::debug!("document preparator closed");
        }
    }
}

impl Drop for DocumentPreparator {
    fn drop(&mut self) {
        self.close();
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}
