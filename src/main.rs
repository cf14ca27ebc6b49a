//! CLI tool for extracting plain text from documents through text filters.
//!
//! Text goes to stdout, progress and errors to stderr. Set `RUST_LOG` for
//! more detail.

use clap::Parser;
use filterbridge::config::{BridgeConfig, Loader};
use filterbridge::{
    BuiltinProviders, DocumentPreparator, InteropScope, IoSink, NoopSubsystem, Result,
};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(
    name = "filterbridge",
    version,
    about = "Extract plain text from documents through chunk-streaming text filters"
)]
struct Cli {
    /// Documents to extract text from
    #[arg(value_name = "FILE", required_unless_present = "list_extensions")]
    paths: Vec<PathBuf>,

    /// Configuration file layered over the built-in defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use this provider moniker for every document instead of resolving by extension
    #[arg(long)]
    moniker: Option<String>,

    /// Append <end of text> and <end of chunk> markers
    #[arg(long)]
    markers: bool,

    /// Log the status codes in play before every provider call
    #[arg(long)]
    trace: bool,

    /// Succeed for documents that failed after producing some text
    #[arg(long)]
    suppress_partial_errors: bool,

    /// List the extensions that can be handled and exit
    #[arg(long)]
    list_extensions: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.trace {
        "warn,filterbridge::trace=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&cli) {
        Ok(0) => {}
        Ok(_) => process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut loader = Loader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    if cli.markers {
        loader = loader.set_override("extraction.emit_text_end_markers", true)?;
    }
    if cli.trace {
        loader = loader.set_override("extraction.emit_debug_trace", true)?;
    }
    if cli.suppress_partial_errors {
        loader = loader.set_override("extraction.suppress_error_if_text_found", true)?;
    }
    Ok(loader.build()?)
}

/// Returns the number of documents that failed.
fn run(cli: &Cli) -> Result<usize> {
    let config = load_config(cli)?;
    let scope = InteropScope::enter(NoopSubsystem, config.interop.threading_model)?;

    if let Some(moniker) = &cli.moniker {
        return run_with_moniker(&scope, moniker, &cli.paths, &config);
    }

    let mut preparator =
        DocumentPreparator::new(scope, BuiltinProviders::new(), class_registry()).with_config(&config);

    if cli.list_extensions {
        for ext in preparator.supported_extensions()? {
            println!(".{}", ext);
        }
        return Ok(0);
    }

    let mut failed = 0;
    for path in &cli.paths {
        eprintln!("📄 {}", path.display());
        match preparator.prepare(path) {
            Ok(text) => print!("{}", text),
            Err(e) => {
                eprintln!("   ❌ {}", e);
                failed += 1;
            }
        }
    }

    report(cli.paths.len(), failed);
    preparator.close();
    Ok(failed)
}

fn run_with_moniker(
    scope: &InteropScope,
    moniker: &str,
    paths: &[PathBuf],
    config: &BridgeConfig,
) -> Result<usize> {
    let flags = config.filter_flags();
    let mut session = scope.acquire(&BuiltinProviders::new(), moniker)?;
    session.set_buffer_units(config.extraction.text_buffer_units);

    let stdout = io::stdout();
    let mut sink = IoSink::new(stdout.lock());
    let mut failed = 0;

    for path in paths {
        eprintln!("📄 {}", path.display());
        if let Err(e) = session.extract(path, &mut sink, &flags) {
            eprintln!("   ❌ {}", e);
            failed += 1;
        }
    }
    drop(sink.into_inner()?);

    report(paths.len(), failed);
    session.release();
    Ok(failed)
}

fn report(total: usize, failed: usize) {
    eprintln!("\n📊 Summary:");
    eprintln!("   • {} document(s) extracted", total - failed);
    if failed > 0 {
        eprintln!("   • {} document(s) failed", failed);
    }
}

#[cfg(windows)]
fn class_registry() -> filterbridge::RegQueryRegistry {
    filterbridge::RegQueryRegistry::new()
}

// Without a platform registry only the configured handlers apply.
#[cfg(not(windows))]
fn class_registry() -> filterbridge::MemoryRegistry {
    filterbridge::MemoryRegistry::new()
}
