//! Mapping file extensions to filter monikers.
//!
//! The platform records which filter handles an extension in its class
//! registry. The lookup goes through the extension's persistent handler:
//!
//! ```text
//! Classes\.<ext>\PersistentHandler                      (default) = {handler}
//!   or, when absent:
//! Classes\.<ext>                                        (default) = <class>
//! Classes\<class>\CLSID                                 (default) = {clsid}
//! Classes\CLSID\{clsid}\PersistentHandler               (default) = {handler}
//!
//! Classes\CLSID\{handler}\PersistentAddinsRegistered\{89BCB740-6119-101A-BCB7-00DD010655AF}
//!                                                       (default) = {filter}
//! ```
//!
//! The filter class id becomes the moniker `clsid:<filter>` without braces.

use crate::{FilterError, Result};
use std::collections::BTreeMap;

/// Root of the class registry.
pub const CLASSES_ROOT: &str = r"HKEY_LOCAL_MACHINE\Software\Classes";

/// Interface id under which text filters are registered as persistent add-ins.
pub const FILTER_ADDIN_KEY: &str = "{89BCB740-6119-101A-BCB7-00DD010655AF}";

/// Read access to a hierarchical key/value registry.
pub trait ClassRegistry {
    /// The default value of `key`, if the key exists and has one.
    fn default_value(&self, key: &str) -> Option<String>;

    /// Names of the direct subkeys of `key`, or `None` if `key` can't be read.
    fn subkeys(&self, key: &str) -> Option<Vec<String>>;
}

// ── MemoryRegistry ────────────────────────────────────────────────────────────

/// An in-memory [`ClassRegistry`].
///
/// Keys are full paths separated by `\`; comparisons ignore ASCII case like
/// the platform registry does.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    values: BTreeMap<String, Option<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `key` (and its parents) with `value` as the default value.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.create_key(key);
        self.values.insert(normalize(key), Some(value.to_owned()));
    }

    /// Create `key` and its parents without a default value.
    pub fn create_key(&mut self, key: &str) {
        let mut path = String::new();
        for part in key.split('\\').filter(|p| !p.is_empty()) {
            if !path.is_empty() {
                path.push('\\');
            }
            path.push_str(part);
            self.values.entry(normalize(&path)).or_insert(None);
        }
    }

    /// Register `extension` so that it resolves directly to `filter_clsid`
    /// through a persistent handler `handler_clsid`.
    pub fn register_filter(&mut self, extension: &str, handler_clsid: &str, filter_clsid: &str) {
        let ext = extension.trim_start_matches('.');
        self.insert(
            &format!(r"{CLASSES_ROOT}\.{ext}\PersistentHandler"),
            handler_clsid,
        );
        self.insert(
            &format!(
                r"{CLASSES_ROOT}\CLSID\{handler_clsid}\PersistentAddinsRegistered\{FILTER_ADDIN_KEY}"
            ),
            filter_clsid,
        );
    }
}

impl ClassRegistry for MemoryRegistry {
    fn default_value(&self, key: &str) -> Option<String> {
        self.values.get(&normalize(key)).cloned().flatten()
    }

    fn subkeys(&self, key: &str) -> Option<Vec<String>> {
        let key = normalize(key);
        if !self.values.contains_key(&key) {
            return None;
        }

        let prefix = format!("{key}\\");
        let children = self
            .values
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('\\'))
            .map(str::to_owned)
            .collect();
        Some(children)
    }
}

fn normalize(key: &str) -> String {
    key.trim_matches('\\').to_ascii_lowercase()
}

// ── HandlerResolver ───────────────────────────────────────────────────────────

/// Resolves file extensions to filter monikers through a [`ClassRegistry`].
pub struct HandlerResolver<'a> {
    registry: &'a dyn ClassRegistry,
}

impl<'a> HandlerResolver<'a> {
    pub fn new(registry: &'a dyn ClassRegistry) -> Self {
        Self { registry }
    }

    /// The filter moniker for `extension` (with or without the leading dot).
    pub fn filter_moniker(&self, extension: &str) -> Result<String> {
        let ext = extension.trim_start_matches('.');
        let handler = self.persistent_handler(ext)?;

        let key = format!(
            r"{CLASSES_ROOT}\CLSID\{handler}\PersistentAddinsRegistered\{FILTER_ADDIN_KEY}"
        );
        let filter = self
            .registry
            .default_value(&key)
            .ok_or_else(|| FilterError::FilterClassNotFound(ext.to_owned()))?;

        let moniker = format!("clsid:{}", strip_braces(&filter));
        log::debug!("filter moniker for .{ext} is {moniker}");
        Ok(moniker)
    }

    /// Extensions (without the dot) that have a persistent handler.
    pub fn supported_extensions(&self) -> Result<Vec<String>> {
        let children = self
            .registry
            .subkeys(CLASSES_ROOT)
            .ok_or_else(|| FilterError::RegistryUnavailable(CLASSES_ROOT.to_owned()))?;

        let extensions = children
            .iter()
            .filter_map(|child| child.strip_prefix('.'))
            .filter(|ext| {
                self.registry
                    .default_value(&format!(r"{CLASSES_ROOT}\.{ext}\PersistentHandler"))
                    .is_some()
            })
            .map(str::to_owned)
            .collect();
        Ok(extensions)
    }

    fn persistent_handler(&self, ext: &str) -> Result<String> {
        let direct = format!(r"{CLASSES_ROOT}\.{ext}\PersistentHandler");
        if let Some(handler) = self.registry.default_value(&direct) {
            return Ok(handler);
        }

        // No handler on the extension itself: go through its document class.
        let class = self
            .registry
            .default_value(&format!(r"{CLASSES_ROOT}\.{ext}"))
            .ok_or_else(|| FilterError::UnknownExtension(ext.to_owned()))?;

        let clsid = self
            .registry
            .default_value(&format!(r"{CLASSES_ROOT}\{class}\CLSID"))
            .ok_or_else(|| FilterError::ClassIdNotFound(class.clone()))?;

        self.registry
            .default_value(&format!(r"{CLASSES_ROOT}\CLSID\{clsid}\PersistentHandler"))
            .ok_or(FilterError::PersistentHandlerNotFound(class))
    }
}

fn strip_braces(guid: &str) -> &str {
    let guid = guid.trim();
    guid.strip_prefix('{')
        .and_then(|g| g.strip_suffix('}'))
        .unwrap_or(guid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const HANDLER: &str = "{5E941D80-BF96-11CD-B579-08002B30BFEB}";
    const FILTER: &str = "{C7310720-AC80-11D1-8DF3-00C04FB6EF4F}";

    fn registry() -> MemoryRegistry {
        let mut registry = MemoryRegistry::new();
        registry.register_filter("txt", HANDLER, FILTER);

        // .doc goes through its document class.
        registry.insert(&format!(r"{CLASSES_ROOT}\.doc"), "Word.Document.8");
        registry.insert(
            &format!(r"{CLASSES_ROOT}\Word.Document.8\CLSID"),
            "{00020906-0000-0000-C000-000000000046}",
        );
        registry.insert(
            &format!(r"{CLASSES_ROOT}\CLSID\{{00020906-0000-0000-C000-000000000046}}\PersistentHandler"),
            HANDLER,
        );

        registry.insert(&format!(r"{CLASSES_ROOT}\.orphan"), "Orphan.Class");
        registry.create_key(&format!(r"{CLASSES_ROOT}\.nohandler"));
        registry
    }

    #[test]
    fn direct_persistent_handler() {
        let registry = registry();
        let moniker = HandlerResolver::new(&registry).filter_moniker(".txt").unwrap();
        assert_eq!(moniker, "clsid:C7310720-AC80-11D1-8DF3-00C04FB6EF4F");
    }

    #[test]
    fn handler_through_document_class() {
        let registry = registry();
        let moniker = HandlerResolver::new(&registry).filter_moniker("doc").unwrap();
        assert_eq!(moniker, "clsid:C7310720-AC80-11D1-8DF3-00C04FB6EF4F");
    }

    #[test]
    fn lookup_failures_name_the_missing_link() {
        let registry = registry();
        let resolver = HandlerResolver::new(&registry);

        assert!(matches!(
            resolver.filter_moniker("xyz"),
            Err(FilterError::UnknownExtension(ext)) if ext == "xyz"
        ));
        assert!(matches!(
            resolver.filter_moniker("orphan"),
            Err(FilterError::ClassIdNotFound(class)) if class == "Orphan.Class"
        ));
        let err = resolver.filter_moniker("nohandler").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn missing_filter_addin() {
        let mut registry = MemoryRegistry::new();
        registry.insert(&format!(r"{CLASSES_ROOT}\.htm\PersistentHandler"), HANDLER);
        assert!(matches!(
            HandlerResolver::new(&registry).filter_moniker("htm"),
            Err(FilterError::FilterClassNotFound(ext)) if ext == "htm"
        ));
    }

    #[test]
    fn supported_extensions_need_a_handler() {
        let registry = registry();
        let mut extensions = HandlerResolver::new(&registry).supported_extensions().unwrap();
        extensions.sort();
        assert_eq!(extensions, vec!["txt"]);
    }

    #[test]
    fn empty_registry_is_unavailable() {
        let registry = MemoryRegistry::new();
        assert!(matches!(
            HandlerResolver::new(&registry).supported_extensions(),
            Err(FilterError::RegistryUnavailable(_))
        ));
    }

    #[test]
    fn keys_ignore_case() {
        let mut registry = MemoryRegistry::new();
        registry.insert(r"HKEY_LOCAL_MACHINE\Software\Classes\.PDF", "AcroExch.Document");
        assert_eq!(
            registry.default_value(r"hkey_local_machine\software\classes\.pdf"),
            Some("AcroExch.Document".to_string())
        );
    }
}
