// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    engine::{Engine, ImageInfo, Version},
    error::{Error, Result},
};
use core::fmt;
use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{debug, info, trace};

/// Global engine tuning. Unset knobs are left as they are.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub leak_reporting: Option<bool>,
    /// Worker threads per pipeline; 0 uses the host's parallelism.
    pub concurrency: Option<usize>,
    pub max_cache_count: Option<usize>,
    pub max_cache_memory: Option<usize>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leak_reporting(mut self, enabled: bool) -> Self {
        self.leak_reporting = Some(enabled);
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn max_cache_count(mut self, max: usize) -> Self {
        self.max_cache_count = Some(max);
        self
    }

    pub fn max_cache_memory(mut self, bytes: usize) -> Self {
        self.max_cache_memory = Some(bytes);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Snapshot of the engine's operation cache.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CacheState {
    /// Operations currently cached.
    pub size: usize,
    pub max_count: usize,
    /// Tracked memory bound in bytes.
    pub max_memory: usize,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Cache size: {} operations, Max cache: {}, Max cache mem: {} bytes",
            self.size, self.max_count, self.max_memory
        )
    }
}

struct Inner {
    engine: Box<dyn Engine>,
    shut_down: AtomicBool,
}

/// Handle to the initialised native engine.
///
/// Cloning is cheap and every clone refers to the same engine. All
/// configuration and cache operations are process-wide: they affect every
/// thread, and the engine synchronises them internally.
///
/// Threads that are not created by the engine must call
/// [`Context::thread_teardown`] (or hold a [`ThreadGuard`]) before they exit
/// if they ever called into the engine; otherwise their per-thread native
/// state leaks for the rest of the process.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Wraps an engine that has already been initialised.
    pub fn new(engine: impl Engine + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine: Box::new(engine),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    fn engine(&self) -> Result<&dyn Engine> {
        if self.is_shut_down() {
            return Err(Error::ShutDown);
        }
        Ok(&*self.inner.engine)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Enables or disables native leak reporting at shutdown.
    pub fn set_leak_reporting(&self, enabled: bool) -> Result<()> {
        self.engine()?.set_leak(enabled);
        Ok(())
    }

    /// Sets the worker thread count for engine pipelines; 0 restores the
    /// host default.
    pub fn set_concurrency(&self, concurrency: usize) -> Result<()> {
        self.engine()?.set_concurrency(concurrency);
        Ok(())
    }

    pub fn concurrency(&self) -> Result<usize> {
        Ok(self.engine()?.concurrency())
    }

    /// Bounds the number of cached operations.
    pub fn set_max_cache_count(&self, max: usize) -> Result<()> {
        self.engine()?.set_max_cache(max);
        Ok(())
    }

    pub fn max_cache_count(&self) -> Result<usize> {
        Ok(self.engine()?.max_cache())
    }

    /// Bounds tracked cache memory, independently of the count bound.
    pub fn set_max_cache_memory(&self, bytes: usize) -> Result<()> {
        self.engine()?.set_max_cache_mem(bytes);
        Ok(())
    }

    pub fn max_cache_memory(&self) -> Result<usize> {
        Ok(self.engine()?.max_cache_mem())
    }

    /// Number of operations currently cached.
    pub fn cache_size(&self) -> Result<usize> {
        Ok(self.engine()?.cache_size())
    }

    /// Evicts every cached operation, for all threads.
    ///
    /// An operation already running on another thread may still add an
    /// entry after this returns.
    pub fn drop_all_cached(&self) -> Result<()> {
        self.engine()?.cache_drop_all();
        debug!("dropped all cached operations");
        Ok(())
    }

    /// Releases native state allocated on the calling thread.
    ///
    /// Safe to call when nothing was allocated and safe to repeat. Must be
    /// called on the thread that owns the state.
    pub fn thread_teardown(&self) -> Result<()> {
        self.engine()?.thread_shutdown();
        trace!("thread teardown");
        Ok(())
    }

    /// Returns a guard that tears the current thread down when dropped.
    pub fn thread_guard(&self) -> ThreadGuard {
        ThreadGuard {
            context: self.clone(),
            _not_send: PhantomData,
        }
    }

    /// Runs `f`, then tears the current thread down, including when `f`
    /// panics.
    pub fn thread_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.thread_guard();
        f()
    }

    /// Drops all cached operations after an engine failure so abandoned
    /// partial results do not pile up.
    ///
    /// Does not retry anything and does not tear down the calling thread.
    pub fn recover_after_failure(&self) -> Result<()> {
        self.drop_all_cached()?;
        debug!("recovered after engine failure");
        Ok(())
    }

    /// Applies every knob set in `config`.
    pub fn configure(&self, config: &EngineConfig) -> Result<()> {
        let engine = self.engine()?;
        if let Some(enabled) = config.leak_reporting {
            engine.set_leak(enabled);
        }
        if let Some(concurrency) = config.concurrency {
            engine.set_concurrency(concurrency);
        }
        if let Some(max) = config.max_cache_count {
            engine.set_max_cache(max);
        }
        if let Some(bytes) = config.max_cache_memory {
            engine.set_max_cache_mem(bytes);
        }
        debug!(?config, "engine configured");
        Ok(())
    }

    /// Current cache size and bounds, for diagnostics.
    pub fn memory_info(&self) -> Result<CacheState> {
        let engine = self.engine()?;
        Ok(CacheState {
            size: engine.cache_size(),
            max_count: engine.max_cache(),
            max_memory: engine.max_cache_mem(),
        })
    }

    pub fn version(&self) -> Result<Version> {
        Ok(self.engine()?.version())
    }

    /// Identifies the format of `data` and reads its header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Operation`] with the engine's message when the
    /// engine cannot read `data`. Callers should follow such a failure with
    /// [`Context::recover_after_failure`].
    pub fn probe(&self, data: &[u8]) -> Result<ImageInfo> {
        self.engine()?.probe(data)
    }

    /// Shuts the engine down for the whole process.
    ///
    /// Also releases the calling thread's state. Only the first call has an
    /// effect; afterwards every operation returns [`Error::ShutDown`].
    pub fn shutdown(&self) {
        if self
            .inner
            .shut_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.inner.engine.shutdown();
            info!("engine shut down");
        }
    }
}

/// Tears down the owning thread's native state when dropped.
///
/// Not `Send`: the state belongs to the thread that created the guard.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let ctx = vips_runtime::bootstrap()?;
/// let worker = {
///     let ctx = ctx.clone();
///     std::thread::spawn(move || {
///         let _guard = ctx.thread_guard();
///         ctx.probe(b"not an image").is_err()
///     })
/// };
/// assert!(worker.join().unwrap());
/// # Ok(())
/// # }
/// ```
pub struct ThreadGuard {
    context: Context,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        // nothing to release once the engine is gone
        let _ = self.context.thread_teardown();
    }
}
