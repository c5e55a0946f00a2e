use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "second_opinion=info,second_opinion_core=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Log to stderr. Used by the commands that don't take over the terminal.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Log to a file so output doesn't tear through the terminal UI. Returns the
/// file path.
pub fn init_file() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("second-opinion");
    fs::create_dir_all(&dir)?;
    let path = dir.join("second-opinion.log");
    let file = File::options().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(path)
}
