// Integration tests for filterbridge.
//
// These tests drive the public API with scripted providers and the built-in
// plain text provider, so no platform filter plugins are needed. Tests that
// require real PDF files would live in a `tests/fixtures/` directory and are
// marked `#[ignore]` so the CI passes even without those files.

use filterbridge::config::{load_defaults, Loader};
use filterbridge::providers::scripted::{ChunkStep, ScriptProbe, ScriptedFactory, ScriptedProvider};
use filterbridge::providers::{PDF_MONIKER, TEXT_MONIKER};
use filterbridge::{
    BuiltinProviders, DocumentPreparator, ErrorKind, FilterError, FilterFlags, InteropScope,
    MemoryRegistry, NoopSubsystem, StatusCode, StreamFault, ThreadingModel,
};
use std::io::Write;

fn scope() -> InteropScope {
    InteropScope::enter(NoopSubsystem, ThreadingModel::Apartment).unwrap()
}

fn scripted(moniker: &str, script: Vec<ChunkStep>) -> ScriptedFactory {
    ScriptedFactory::new().with_instance(moniker, move || ScriptedProvider::new(script.clone()))
}

// ── Chunk streaming through a session ─────────────────────────────────────────

#[test]
fn two_text_chunks_are_joined_by_newlines() {
    let factory = scripted(
        "x:hello",
        vec![ChunkStep::text("Hello "), ChunkStep::text("World")],
    );
    let scope = scope();
    let mut session = scope.acquire(&factory, "x:hello").unwrap();

    let mut out = String::new();
    let summary = session
        .extract("greeting.doc", &mut out, &FilterFlags::default())
        .unwrap();

    assert_eq!(out, "Hello \nWorld\n");
    assert_eq!(summary.text_chunks, 2);
    assert_eq!(summary.text_units, 11);
    assert!(session.release());
}

#[test]
fn password_protected_document_fails_without_text() {
    let factory = scripted(
        "x:locked",
        vec![ChunkStep::Status(StatusCode::FILTER_E_PASSWORD)],
    );
    let scope = scope();
    let mut session = scope.acquire(&factory, "x:locked").unwrap();

    let mut out = String::new();
    let err = session
        .extract("locked.doc", &mut out, &FilterFlags::default())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Stream);
    assert_eq!(err.stream_fault(), Some(StreamFault::PasswordProtected));
    assert!(out.is_empty());
}

#[test]
fn access_failure_after_text_is_suppressed() {
    let factory = scripted(
        "x:partial",
        vec![
            ChunkStep::text("A"),
            ChunkStep::Status(StatusCode::FILTER_E_ACCESS),
        ],
    );
    let scope = scope();
    let mut session = scope.acquire(&factory, "x:partial").unwrap();
    let flags = FilterFlags {
        suppress_error_if_text_found: true,
        ..FilterFlags::default()
    };

    let mut out = String::new();
    session.extract("partial.doc", &mut out, &flags).unwrap();
    assert_eq!(out, "A\n");

    // Without the policy the same stream fails, keeping the text appended so far.
    let mut out = String::new();
    let err = session
        .extract("partial.doc", &mut out, &FilterFlags::default())
        .unwrap_err();
    assert_eq!(err.stream_fault(), Some(StreamFault::AccessDenied));
    assert_eq!(out, "A\n");
}

#[test]
fn markers_follow_blocks_and_chunks() {
    let factory = scripted("x:markers", vec![ChunkStep::text("Hi")]);
    let scope = scope();
    let mut session = scope.acquire(&factory, "x:markers").unwrap();
    let flags = FilterFlags {
        emit_text_end_markers: true,
        ..FilterFlags::default()
    };

    let mut out = String::new();
    session.extract("doc", &mut out, &flags).unwrap();
    assert_eq!(out, "Hi\n<end of text>\n\n<end of chunk>\n\n");
}

#[test]
fn released_session_releases_provider_once() {
    let probe = ScriptProbe::default();
    let factory = ScriptedFactory::new().with_class("x:probe", {
        let probe = probe.clone();
        move || ScriptedProvider::new(vec![ChunkStep::text("t")]).with_probe(probe.clone())
    });
    let scope = scope();
    let mut session = scope.acquire(&factory, "x:probe").unwrap();

    let mut out = String::new();
    session.extract("doc", &mut out, &FilterFlags::default()).unwrap();
    assert_eq!(probe.live_facets(), 0);

    assert!(session.release());
    assert!(!session.release());
    assert_eq!(probe.provider_releases(), 1);
}

#[test]
fn unknown_moniker_is_an_acquisition_error() {
    let err = scope()
        .acquire(&BuiltinProviders::new(), "clsid:00000000-0000-0000-0000-000000000000")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Acquisition);
}

// ── Built-in providers ────────────────────────────────────────────────────────

#[test]
fn plain_text_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "First paragraph\nstill first\n\nSecond paragraph\n").unwrap();
    drop(file);

    let scope = scope();
    let mut session = scope.acquire(&BuiltinProviders::new(), TEXT_MONIKER).unwrap();
    let mut out = String::new();
    session.extract(&path, &mut out, &FilterFlags::default()).unwrap();

    assert_eq!(out, "First paragraph\nstill first\nSecond paragraph\n");
}

#[test]
fn missing_document_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let scope = scope();
    let mut session = scope.acquire(&BuiltinProviders::new(), TEXT_MONIKER).unwrap();

    let mut out = String::new();
    let err = session
        .extract(dir.path().join("absent.txt"), &mut out, &FilterFlags::default())
        .unwrap_err();
    assert!(matches!(
        err,
        FilterError::LoadFailed { status: StatusCode::STG_E_FILENOTFOUND, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Binding);
}

#[test]
fn preparator_uses_configured_handlers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("README.md");
    std::fs::write(&path, "# Title\n\nBody").unwrap();

    let config = load_defaults().unwrap();
    let mut preparator = DocumentPreparator::new(scope(), BuiltinProviders::new(), MemoryRegistry::new())
        .with_config(&config);

    assert_eq!(preparator.prepare(&path).unwrap(), "# Title\nBody\n");
    assert!(matches!(
        preparator.prepare(dir.path().join("photo.jpg")),
        Err(FilterError::UnknownExtension(_))
    ));

    let extensions = preparator.supported_extensions().unwrap();
    assert!(extensions.contains(&"md".to_string()));
    assert!(extensions.contains(&"pdf".to_string()));
    preparator.close();
}

#[test]
fn non_pdf_bytes_fail_to_load_as_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.pdf");
    std::fs::write(&path, b"not a pdf").unwrap();

    let scope = scope();
    let mut session = scope.acquire(&BuiltinProviders::new(), PDF_MONIKER).unwrap();
    let mut out = String::new();
    let err = session
        .extract(&path, &mut out, &FilterFlags::default())
        .unwrap_err();
    assert!(matches!(
        err,
        FilterError::LoadFailed { status: StatusCode::FILTER_E_UNKNOWNFORMAT, .. }
    ));
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[test]
fn default_config_is_permissive() {
    let config = load_defaults().unwrap();
    assert_eq!(config.filter_flags(), FilterFlags::default());
    assert_eq!(config.extraction.text_buffer_units, 1024);
    assert_eq!(config.interop.threading_model, ThreadingModel::Apartment);
}

#[test]
fn overrides_reach_filter_flags() {
    let config = Loader::new()
        .set_override("extraction.emit_text_end_markers", true)
        .unwrap()
        .build()
        .unwrap();
    assert!(config.filter_flags().emit_text_end_markers);
    assert!(!config.filter_flags().suppress_error_if_text_found);
}

// ── FilterError display ───────────────────────────────────────────────────────

#[test]
fn error_display_is_non_empty() {
    let errors: &[FilterError] = &[
        FilterError::SubsystemInit(StatusCode::RPC_E_CHANGED_MODE),
        FilterError::ProviderNotFound {
            moniker: "clsid:x".into(),
            status: StatusCode::MK_E_SYNTAX,
        },
        FilterError::NotInitialized,
        FilterError::MissingDocumentLoader,
        FilterError::MissingTextFilter,
        FilterError::InitFailed(StatusCode::E_FAIL),
        FilterError::Stream(StreamFault::Unknown(StatusCode(0x8000_FFFF))),
        FilterError::Cancelled,
        FilterError::UnknownExtension("xyz".into()),
    ];
    for e in errors {
        assert!(!e.to_string().is_empty(), "empty display for {e:?}");
    }
}

// ── Fixture-based tests (ignored without real PDFs) ───────────────────────────

/// To run: place a text PDF at `tests/fixtures/sample.pdf` and run with
/// `--include-ignored`.
#[test]
#[ignore]
fn fixture_pdf_roundtrip() {
    let scope = scope();
    let mut session = scope.acquire(&BuiltinProviders::new(), PDF_MONIKER).unwrap();

    let mut out = String::new();
    let summary = session
        .extract("tests/fixtures/sample.pdf", &mut out, &FilterFlags::default())
        .expect("place tests/fixtures/sample.pdf to run this test");
    assert!(summary.text_chunks > 0);
    assert!(!out.trim().is_empty());
}
