// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data directory ownership: lock, logging, configuration, executor wiring

use crate::error::TideError;
use crate::workers;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tide_core::{EngineConfig, SystemClock};
use tide_engine::{ChainExecutor, ExecutorDeps};
use tide_storage::FsSubstrate;
use tracing_appender::non_blocking::WorkerGuard;

const LOCK_FILE: &str = "tide.lock";
const LOG_FILE: &str = "tide.log";
const CONFIG_FILE: &str = "tide.toml";

/// An opened, exclusively locked data directory
pub struct Host {
    data_dir: PathBuf,
    config: EngineConfig,
    // Held for the lifetime of the process
    _lock: File,
    _log: WorkerGuard,
}

impl Host {
    pub fn open(data_dir: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => dirs::data_local_dir()
                .ok_or_else(TideError::no_data_dir)?
                .join("tide"),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating {}", data_dir.display()))?;

        let lock = acquire_lock(&data_dir)?;
        let log = setup_logging(&data_dir)?;

        let config = match config_path {
            Some(path) if !path.exists() => {
                return Err(TideError::config_not_found(path).into());
            }
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::load(&data_dir.join(CONFIG_FILE))?,
        };
        tracing::info!(data_dir = %data_dir.display(), "host opened");

        Ok(Self {
            data_dir,
            config,
            _lock: lock,
            _log: log,
        })
    }

    /// Executor over this data directory with the built-in workers
    pub fn executor(&self) -> Result<ChainExecutor<SystemClock>> {
        let substrate = Arc::new(FsSubstrate::open(&self.data_dir)?);
        let executor = ChainExecutor::open(ExecutorDeps {
            substrate,
            workers: Arc::new(workers::registry()),
            clock: SystemClock,
            config: self.config.clone(),
        })?;
        for corruption in executor.recovered_corruption() {
            eprintln!("warning: repaired {corruption}");
        }
        Ok(executor)
    }
}

fn acquire_lock(data_dir: &Path) -> Result<File> {
    let path = data_dir.join(LOCK_FILE);
    let mut file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    file.try_lock_exclusive()
        .map_err(|_| TideError::lock_held(data_dir))?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

fn setup_logging(data_dir: &Path) -> Result<WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(data_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}
