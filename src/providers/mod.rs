//! Providers shipped with the crate.
//!
//! Real filter plugins are resolved by the host's factory. These in-process
//! providers cover plain text and PDF so the bridge works without one, and
//! [`scripted`] replays fixed chunk sequences for testing hosts.

mod pdf;
mod plain_text;
pub mod queue;
pub mod scripted;

pub use pdf::{PdfClass, PdfSource};
pub use plain_text::PlainTextSource;
pub use queue::{ChunkQueue, ChunkQueueProvider, ChunkSource, ChunkStep};

use crate::provider::{ProviderFactory, ProviderResult, Resolved};
use crate::status::StatusCode;

/// Moniker of the built-in plain text provider.
pub const TEXT_MONIKER: &str = "filterbridge:text";

/// Moniker of the built-in PDF provider.
pub const PDF_MONIKER: &str = "filterbridge:pdf";

/// Resolves the built-in monikers.
///
/// [`TEXT_MONIKER`] resolves straight to an instance, [`PDF_MONIKER`] to a
/// class object. Anything else fails with `MK_E_SYNTAX`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinProviders;

impl BuiltinProviders {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderFactory for BuiltinProviders {
    fn resolve(&self, moniker: &str) -> ProviderResult<Resolved> {
        match moniker {
            TEXT_MONIKER => Ok(Resolved::Instance(Box::new(ChunkQueueProvider::new(
                PlainTextSource,
            )))),
            PDF_MONIKER => Ok(Resolved::ClassFactory(Box::new(PdfClass))),
            _ => Err(StatusCode::MK_E_SYNTAX),
        }
    }

    fn knows(&self, moniker: &str) -> bool {
        matches!(moniker, TEXT_MONIKER | PDF_MONIKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_monikers_resolve() {
        let factory = BuiltinProviders::new();
        assert!(matches!(factory.resolve(TEXT_MONIKER), Ok(Resolved::Instance(_))));
        assert!(matches!(factory.resolve(PDF_MONIKER), Ok(Resolved::ClassFactory(_))));
        assert!(matches!(
            factory.resolve("clsid:00000000-0000-0000-0000-000000000000"),
            Err(StatusCode::MK_E_SYNTAX)
        ));
    }

    #[test]
    fn builtin_monikers_are_known() {
        let factory = BuiltinProviders::new();
        assert!(factory.knows(TEXT_MONIKER));
        assert!(factory.knows(PDF_MONIKER));
        assert!(!factory.knows("clsid:C7310720-AC80-11D1-8DF3-00C04FB6EF4F"));
    }
}
