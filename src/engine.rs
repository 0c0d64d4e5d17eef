// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! The native engine surface driven by [`Context`](crate::Context).

use crate::{
    enums::{Coding, Interpretation},
    error::{Error, Result},
    loader::{EngineOrigin, Loaded},
};
use libc::{c_char, c_int, c_void};
use std::{
    ffi::{CStr, CString},
    ptr::NonNull,
};
use tracing::{debug, trace, warn};
use vips_sys::{Vips, VipsImage};

pub use vips_sys::Version;

/// Facts about an encoded image, read through the engine's loaders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    /// Name of the engine loader that accepted the buffer, e.g. `jpegload_buffer`.
    pub loader: String,
    pub width: u32,
    pub height: u32,
    pub bands: u32,
    pub interpretation: Interpretation,
    pub coding: Coding,
}

/// Process-wide native engine operations.
///
/// Implementations forward to a single shared native instance. Cache and
/// configuration calls are global and synchronised by the engine itself;
/// [`Engine::thread_shutdown`] only affects the calling thread.
pub trait Engine: Send + Sync {
    fn set_leak(&self, enabled: bool);

    fn concurrency(&self) -> usize;
    fn set_concurrency(&self, concurrency: usize);

    fn max_cache(&self) -> usize;
    fn set_max_cache(&self, max: usize);

    fn max_cache_mem(&self) -> usize;
    fn set_max_cache_mem(&self, bytes: usize);

    fn cache_size(&self) -> usize;
    fn cache_drop_all(&self);

    fn thread_shutdown(&self);
    fn shutdown(&self);

    fn version(&self) -> Version;

    /// Opens `data` with the engine's buffer loaders and reads its header.
    fn probe(&self, data: &[u8]) -> Result<ImageInfo>;
}

/// [`Engine`] backed by a dynamically loaded libvips.
pub struct VipsEngine {
    lib: Vips,
    version: Version,
    // Dependencies stay open for as long as the engine is alive.
    _dependencies: Vec<libloading::Library>,
}

fn clamp_int(value: usize) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

fn non_negative(value: c_int) -> usize {
    usize::try_from(value).unwrap_or(0)
}

impl VipsEngine {
    /// Resolves the engine symbols from loaded libraries and runs the
    /// one-time native initialisation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Link`] when a required symbol is missing and
    /// [`Error::EngineInit`] when `vips_init` reports failure.
    pub fn init(loaded: Loaded<libloading::Library>, argv0: &str) -> Result<Self> {
        let Loaded {
            outcome,
            engine,
            dependencies,
        } = loaded;
        let lib = unsafe { Vips::from_library(engine) }.map_err(|source| Error::Link {
            path: match &outcome.engine {
                EngineOrigin::Packaged(staged) => staged.temp_path().to_path_buf(),
                EngineOrigin::System(name) => name.into(),
            },
            source,
        })?;

        let argv0 = CString::new(argv0).unwrap_or_default();
        if unsafe { lib.vips_init(argv0.as_ptr()) } != 0 {
            let message = unsafe { take_error(&lib) };
            return Err(Error::EngineInit { message });
        }
        let version = vips_sys::version(&lib);
        debug!(%version, "vips_init complete");
        Ok(Self {
            lib,
            version,
            _dependencies: dependencies,
        })
    }
}

/// Reads and clears the engine's error buffer.
///
/// # Safety
///
/// `lib` must be an initialised libvips.
unsafe fn take_error(lib: &Vips) -> String {
    let buffer = lib.vips_error_buffer();
    let message = if buffer.is_null() {
        String::new()
    } else {
        CStr::from_ptr(buffer).to_string_lossy().trim_end().to_string()
    };
    lib.vips_error_clear();
    if message.is_empty() {
        "unknown engine error".to_string()
    } else {
        message
    }
}

/// A native image reference released on every exit path.
struct ImageRef<'a> {
    lib: &'a Vips,
    image: NonNull<VipsImage>,
}

impl ImageRef<'_> {
    fn as_ptr(&self) -> *const VipsImage {
        self.image.as_ptr()
    }
}

impl Drop for ImageRef<'_> {
    fn drop(&mut self) {
        if !unsafe { self.lib.g_object_unref(self.image.as_ptr().cast::<c_void>()) } {
            warn!("g_object_unref unavailable, image reference leaked");
        }
    }
}

impl Engine for VipsEngine {
    fn set_leak(&self, enabled: bool) {
        unsafe { self.lib.vips_leak_set(c_int::from(enabled)) }
    }

    fn concurrency(&self) -> usize {
        non_negative(unsafe { self.lib.vips_concurrency_get() })
    }

    fn set_concurrency(&self, concurrency: usize) {
        unsafe { self.lib.vips_concurrency_set(clamp_int(concurrency)) }
    }

    fn max_cache(&self) -> usize {
        non_negative(unsafe { self.lib.vips_cache_get_max() })
    }

    fn set_max_cache(&self, max: usize) {
        unsafe { self.lib.vips_cache_set_max(clamp_int(max)) }
    }

    fn max_cache_mem(&self) -> usize {
        unsafe { self.lib.vips_cache_get_max_mem() }
    }

    fn set_max_cache_mem(&self, bytes: usize) {
        unsafe { self.lib.vips_cache_set_max_mem(bytes) }
    }

    fn cache_size(&self) -> usize {
        non_negative(unsafe { self.lib.vips_cache_get_size() })
    }

    fn cache_drop_all(&self) {
        unsafe { self.lib.vips_cache_drop_all() }
    }

    fn thread_shutdown(&self) {
        unsafe { self.lib.vips_thread_shutdown() }
    }

    fn shutdown(&self) {
        unsafe { self.lib.vips_shutdown() }
    }

    fn version(&self) -> Version {
        self.version
    }

    fn probe(&self, data: &[u8]) -> Result<ImageInfo> {
        let lib = &self.lib;
        let loader = unsafe { lib.vips_foreign_find_load_buffer(data.as_ptr().cast(), data.len()) };
        if loader.is_null() {
            return Err(Error::Operation {
                message: unsafe { take_error(lib) },
            });
        }
        let loader = unsafe { CStr::from_ptr(loader) }
            .to_string_lossy()
            .into_owned();

        let empty: *const c_char = c"".as_ptr();
        let image =
            unsafe { lib.vips_image_new_from_buffer(data.as_ptr().cast(), data.len(), empty) };
        let image = match NonNull::new(image) {
            Some(image) => ImageRef { lib, image },
            None => {
                return Err(Error::Operation {
                    message: unsafe { take_error(lib) },
                })
            }
        };

        let interpretation = unsafe { lib.vips_image_get_interpretation(image.as_ptr()) };
        let coding = unsafe { lib.vips_image_get_coding(image.as_ptr()) };
        let info = ImageInfo {
            loader,
            width: non_negative(unsafe { lib.vips_image_get_width(image.as_ptr()) }) as u32,
            height: non_negative(unsafe { lib.vips_image_get_height(image.as_ptr()) }) as u32,
            bands: non_negative(unsafe { lib.vips_image_get_bands(image.as_ptr()) }) as u32,
            interpretation: Interpretation::try_from(interpretation)
                .unwrap_or(Interpretation::Error),
            coding: Coding::try_from(coding).unwrap_or(Coding::Error),
        };
        trace!(?info, "probed image");
        Ok(info)
    }
}
