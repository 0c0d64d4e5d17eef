// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # vips-runtime
//!
//! Loads the libvips image processing engine into the process and manages
//! its lifecycle: process-wide startup, tuning, operation cache eviction and
//! per-thread teardown.
//!
//! ## Startup
//!
//! Native artifacts are looked up in a resource package laid out as
//! `{os}-{arch}/{file}` (for example `linux-x86_64/libvips.so`), with a root
//! level `{file}` accepted for older packages. Each artifact is copied to a
//! temporary file and loaded in dependency order before the engine itself.
//! When a dependency is missing from the package the libraries installed on
//! the host are used instead.
//!
//! ## Example
//!
//! ```no_run
//! use vips_runtime::EngineConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = vips_runtime::bootstrap()?;
//! ctx.configure(&EngineConfig::new().concurrency(4).max_cache_count(100))?;
//!
//! let pool: Vec<_> = (0..4)
//!     .map(|_| {
//!         let ctx = ctx.clone();
//!         std::thread::spawn(move || {
//!             ctx.thread_scope(|| match ctx.probe(b"\x89PNG...") {
//!                 Ok(info) => println!("{}x{}", info.width, info.height),
//!                 Err(_) => ctx.recover_after_failure().unwrap(),
//!             })
//!         })
//!     })
//!     .collect();
//! for worker in pool {
//!     worker.join().unwrap();
//! }
//! println!("{}", ctx.memory_info()?);
//! ctx.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Threads
//!
//! The engine allocates native state for every thread that calls into it.
//! Threads the engine did not create, such as thread pool workers, must call
//! [`Context::thread_teardown`] before exiting, or use
//! [`Context::thread_scope`] / [`ThreadGuard`]. The main thread's state is
//! released by [`Context::shutdown`].
//!
//! ## Safety
//!
//! All `unsafe` FFI calls live in the `vips-sys` crate and [`engine`]; the
//! rest of the crate is safe code.

pub mod bootstrap;
pub mod context;
pub mod engine;
pub mod enums;
pub mod error;
pub mod loader;
pub mod locator;
pub mod manifest;
pub mod platform;
pub mod stager;

pub use bootstrap::{
    bootstrap, bootstrap_with, context, load_outcome, shutdown, state, BootstrapOptions, State,
};
pub use context::{CacheState, Context, EngineConfig, ThreadGuard};
pub use engine::{Engine, ImageInfo, Version, VipsEngine};
pub use error::{Error, Result};
pub use loader::{DependencySource, EngineOrigin, LoadOutcome, NativeLoader};
pub use platform::{Os, PlatformId};
