//! Turns command-line flags into a running worker.

use crate::Cli;
use kiln_config::{load_config, WorkerConfig};
use kiln_worker::{Engine, JavacCompiler, Layout, ProcessBackend, Toolchain, UrlFetcher};
use std::path::Path;

/// Loads the configuration named by `--config`, or the defaults.
pub fn load(config: Option<&Path>) -> Result<WorkerConfig, Box<dyn std::error::Error>> {
    match config {
        Some(path) => Ok(load_config(path)?),
        None => Ok(WorkerConfig::default()),
    }
}

/// Builds the engine with the process-backed compilers.
pub fn build_engine(config: &WorkerConfig, root: Option<&Path>) -> Engine {
    let layout = Layout::initialize(config, root);
    log::info!(
        "scratch root {}, entry point {}",
        layout.paths.root.display(),
        layout.entry_point
    );
    let toolchain = Toolchain {
        source: Box::new(JavacCompiler::new(
            config.source.javac.clone(),
            config.source.args.clone(),
        )),
        backend: Box::new(ProcessBackend::new(config.backend.command.clone())),
    };
    Engine::new(layout, toolchain, Box::new(UrlFetcher))
}

/// Serves stdin until end of input.
pub fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(cli.config.as_deref())?;
    let engine = build_engine(&config, cli.root.as_deref());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let engine = runtime.block_on(kiln_worker::serve(
        engine,
        tokio::io::BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    ))?;
    log::info!(
        "input closed; {} cached artifacts discarded",
        engine.caches().entry_count()
    );
    Ok(())
}
