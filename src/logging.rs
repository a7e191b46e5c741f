use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Result;
use env_logger::{Builder, Env, Target};

pub const LOG_FILE: &str = "lexiread.log";

/// Route the `log` macros to a file under `dir`. The terminal belongs to the
/// UI, so nothing is written to stderr. `RUST_LOG` overrides the `info` default.
pub fn init(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()?;
    Ok(path)
}
