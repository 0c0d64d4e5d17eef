// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! One-time engine startup.
//!
//! [`bootstrap`] resolves the platform, loads the packaged (or installed)
//! native libraries, initialises the engine and registers the resulting
//! [`Context`] for the rest of the process. The first call does the work;
//! later calls return the same context, or the same error if startup failed.

use crate::{
    context::{Context, EngineConfig},
    engine::VipsEngine,
    error::{Error, Result},
    loader::{LoadOutcome, NativeLoader},
    locator::{ArtifactLocator, DirSource, EmbeddedSource, ResourceSource},
    manifest::LibraryManifest,
    platform,
    stager::ArtifactStager,
};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};
use tracing::{debug, info, instrument};

/// Environment variable naming the packaged resource directory.
pub const RESOURCES_ENV: &str = "VIPS_RUNTIME_RESOURCES";

/// Startup options. Only the options given to the first [`bootstrap_with`]
/// call are used.
pub struct BootstrapOptions {
    source: Box<dyn ResourceSource>,
    staging_dir: Option<PathBuf>,
    system_fallback: bool,
    config: EngineConfig,
    argv0: String,
}

impl Default for BootstrapOptions {
    /// Resources from `$VIPS_RUNTIME_RESOURCES`, or the `native` directory
    /// next to the current executable.
    fn default() -> Self {
        Self::from_env()
    }
}

impl BootstrapOptions {
    pub fn new(source: impl ResourceSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            staging_dir: None,
            system_fallback: true,
            config: EngineConfig::default(),
            argv0: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    pub fn from_env() -> Self {
        if let Some(root) = std::env::var_os(RESOURCES_ENV) {
            return Self::new(DirSource::new(root));
        }
        match std::env::current_exe() {
            Ok(exe) => match exe.parent() {
                Some(dir) => Self::new(DirSource::new(dir.join("native"))),
                None => Self::new(EmbeddedSource::new()),
            },
            Err(_) => Self::new(EmbeddedSource::new()),
        }
    }

    /// Directory for staged artifacts; the system temp directory by default.
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Allow an unpackaged engine to be loaded from the host library path.
    pub fn system_fallback(mut self, enabled: bool) -> Self {
        self.system_fallback = enabled;
        self
    }

    /// Configuration applied right after initialisation.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Program name passed to the engine's initialisation.
    pub fn argv0(mut self, argv0: impl Into<String>) -> Self {
        self.argv0 = argv0.into();
        self
    }
}

/// Process lifecycle of the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Unloaded,
    Loading,
    Bootstrapped,
    /// Startup failed; the engine is unusable for this process.
    Failed,
    ShutDown,
}

struct Started {
    context: Context,
    outcome: LoadOutcome,
}

static LOADING: AtomicBool = AtomicBool::new(false);
static ENGINE: OnceLock<std::result::Result<Started, Arc<Error>>> = OnceLock::new();

/// Starts the engine with [`BootstrapOptions::default`].
pub fn bootstrap() -> Result<Context> {
    bootstrap_with(BootstrapOptions::default())
}

/// Starts the engine once for the whole process.
///
/// Concurrent callers block until the first call finishes. A second call is
/// a no-op returning the registered context. A failed startup is never
/// retried: every call returns [`Error::Bootstrap`] wrapping the original
/// failure. After [`Context::shutdown`] this returns [`Error::ShutDown`].
pub fn bootstrap_with(options: BootstrapOptions) -> Result<Context> {
    let mut first = false;
    let started = ENGINE.get_or_init(|| {
        first = true;
        LOADING.store(true, Ordering::Release);
        let started = start(options).map_err(Arc::new);
        LOADING.store(false, Ordering::Release);
        started
    });
    if !first {
        debug!("engine already bootstrapped, options ignored");
    }
    match started {
        Ok(started) if started.context.is_shut_down() => Err(Error::ShutDown),
        Ok(started) => Ok(started.context.clone()),
        Err(e) => Err(Error::Bootstrap(e.clone())),
    }
}

#[instrument(skip_all)]
fn start(options: BootstrapOptions) -> Result<Started> {
    let platform = platform::resolve();
    let manifest = LibraryManifest::for_os(platform.os());
    let stager = match options.staging_dir {
        Some(dir) => ArtifactStager::with_dir(dir),
        None => ArtifactStager::new(),
    };
    let mut loader = NativeLoader::new(ArtifactLocator::from_boxed(options.source), stager)
        .system_fallback(options.system_fallback);

    let loaded = loader.load_all(platform, &manifest)?;
    let outcome = loaded.outcome.clone();
    let engine = VipsEngine::init(loaded, &options.argv0)?;
    let context = Context::new(engine);
    if !options.config.is_empty() {
        context.configure(&options.config)?;
    }
    info!(
        %platform,
        version = %context.version()?,
        from_package = outcome.loaded_from_package(),
        "engine bootstrapped"
    );
    Ok(Started { context, outcome })
}

/// The registered context, once bootstrapped and until shutdown.
pub fn context() -> Option<Context> {
    match ENGINE.get() {
        Some(Ok(started)) if !started.context.is_shut_down() => Some(started.context.clone()),
        _ => None,
    }
}

/// How the registered engine was loaded.
pub fn load_outcome() -> Option<LoadOutcome> {
    match ENGINE.get() {
        Some(Ok(started)) => Some(started.outcome.clone()),
        _ => None,
    }
}

pub fn state() -> State {
    match ENGINE.get() {
        Some(Ok(started)) if started.context.is_shut_down() => State::ShutDown,
        Some(Ok(_)) => State::Bootstrapped,
        Some(Err(_)) => State::Failed,
        None if LOADING.load(Ordering::Acquire) => State::Loading,
        None => State::Unloaded,
    }
}

/// Shuts down the registered engine, if any.
pub fn shutdown() {
    if let Some(Ok(started)) = ENGINE.get() {
        started.context.shutdown();
    }
}
