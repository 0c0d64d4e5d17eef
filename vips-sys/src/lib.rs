// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Low-level dynamic bindings for libvips.
//!
//! The library is opened at runtime through [`libloading`] rather than linked
//! at build time, so the same binary can run against a packaged copy of
//! libvips or the one installed on the host. Every required symbol is
//! resolved when [`Vips`] is constructed; a missing symbol fails
//! construction instead of failing later at call time.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_void, size_t};
use std::ffi::OsStr;

pub type gboolean = c_int;

/// Opaque `VipsImage`.
#[repr(C)]
pub struct VipsImage {
    _private: [u8; 0],
}

/// `vips_version()` flag selecting the major version number.
pub const VIPS_VERSION_MAJOR: c_int = 0;
/// `vips_version()` flag selecting the minor version number.
pub const VIPS_VERSION_MINOR: c_int = 1;
/// `vips_version()` flag selecting the micro version number.
pub const VIPS_VERSION_MICRO: c_int = 2;

pub struct Vips {
    __library: ::libloading::Library,
    pub vips_init: unsafe extern "C" fn(argv0: *const c_char) -> c_int,
    pub vips_shutdown: unsafe extern "C" fn(),
    pub vips_thread_shutdown: unsafe extern "C" fn(),
    pub vips_leak_set: unsafe extern "C" fn(leak: gboolean),
    pub vips_concurrency_set: unsafe extern "C" fn(concurrency: c_int),
    pub vips_concurrency_get: unsafe extern "C" fn() -> c_int,
    pub vips_cache_set_max: unsafe extern "C" fn(max: c_int),
    pub vips_cache_get_max: unsafe extern "C" fn() -> c_int,
    pub vips_cache_set_max_mem: unsafe extern "C" fn(max_mem: size_t),
    pub vips_cache_get_max_mem: unsafe extern "C" fn() -> size_t,
    pub vips_cache_get_size: unsafe extern "C" fn() -> c_int,
    pub vips_cache_drop_all: unsafe extern "C" fn(),
    pub vips_error_buffer: unsafe extern "C" fn() -> *const c_char,
    pub vips_error_clear: unsafe extern "C" fn(),
    pub vips_version: unsafe extern "C" fn(flag: c_int) -> c_int,
    pub vips_foreign_find_load_buffer:
        unsafe extern "C" fn(data: *const c_void, size: size_t) -> *const c_char,
    pub vips_image_new_from_buffer: unsafe extern "C" fn(
        buf: *const c_void,
        len: size_t,
        option_string: *const c_char,
        ...
    ) -> *mut VipsImage,
    pub vips_image_get_width: unsafe extern "C" fn(image: *const VipsImage) -> c_int,
    pub vips_image_get_height: unsafe extern "C" fn(image: *const VipsImage) -> c_int,
    pub vips_image_get_bands: unsafe extern "C" fn(image: *const VipsImage) -> c_int,
    pub vips_image_get_interpretation: unsafe extern "C" fn(image: *const VipsImage) -> c_int,
    pub vips_image_get_coding: unsafe extern "C" fn(image: *const VipsImage) -> c_int,
    pub g_object_unref: Result<unsafe extern "C" fn(object: *mut c_void), ::libloading::Error>,
}

impl Vips {
    /// Opens the library at `path` and resolves every symbol.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialisers. The caller must ensure the
    /// file at `path` is a libvips build whose exported symbols have the
    /// signatures declared here.
    pub unsafe fn new<P>(path: P) -> Result<Self, ::libloading::Error>
    where
        P: AsRef<OsStr>,
    {
        let library = ::libloading::Library::new(path)?;
        Self::from_library(library)
    }

    /// Resolves every symbol from an already opened library.
    ///
    /// # Safety
    ///
    /// See [`Vips::new`].
    pub unsafe fn from_library<L>(library: L) -> Result<Self, ::libloading::Error>
    where
        L: Into<::libloading::Library>,
    {
        let __library = library.into();
        let vips_init = __library.get(b"vips_init\0").map(|sym| *sym)?;
        let vips_shutdown = __library.get(b"vips_shutdown\0").map(|sym| *sym)?;
        let vips_thread_shutdown = __library.get(b"vips_thread_shutdown\0").map(|sym| *sym)?;
        let vips_leak_set = __library.get(b"vips_leak_set\0").map(|sym| *sym)?;
        let vips_concurrency_set = __library.get(b"vips_concurrency_set\0").map(|sym| *sym)?;
        let vips_concurrency_get = __library.get(b"vips_concurrency_get\0").map(|sym| *sym)?;
        let vips_cache_set_max = __library.get(b"vips_cache_set_max\0").map(|sym| *sym)?;
        let vips_cache_get_max = __library.get(b"vips_cache_get_max\0").map(|sym| *sym)?;
        let vips_cache_set_max_mem = __library.get(b"vips_cache_set_max_mem\0").map(|sym| *sym)?;
        let vips_cache_get_max_mem = __library.get(b"vips_cache_get_max_mem\0").map(|sym| *sym)?;
        let vips_cache_get_size = __library.get(b"vips_cache_get_size\0").map(|sym| *sym)?;
        let vips_cache_drop_all = __library.get(b"vips_cache_drop_all\0").map(|sym| *sym)?;
        let vips_error_buffer = __library.get(b"vips_error_buffer\0").map(|sym| *sym)?;
        let vips_error_clear = __library.get(b"vips_error_clear\0").map(|sym| *sym)?;
        let vips_version = __library.get(b"vips_version\0").map(|sym| *sym)?;
        let vips_foreign_find_load_buffer = __library
            .get(b"vips_foreign_find_load_buffer\0")
            .map(|sym| *sym)?;
        let vips_image_new_from_buffer = __library
            .get(b"vips_image_new_from_buffer\0")
            .map(|sym| *sym)?;
        let vips_image_get_width = __library.get(b"vips_image_get_width\0").map(|sym| *sym)?;
        let vips_image_get_height = __library.get(b"vips_image_get_height\0").map(|sym| *sym)?;
        let vips_image_get_bands = __library.get(b"vips_image_get_bands\0").map(|sym| *sym)?;
        let vips_image_get_interpretation = __library
            .get(b"vips_image_get_interpretation\0")
            .map(|sym| *sym)?;
        let vips_image_get_coding = __library.get(b"vips_image_get_coding\0").map(|sym| *sym)?;
        // GObject is a dependency of libvips; on Windows its exports are not
        // visible through the libvips module handle.
        let g_object_unref = __library.get(b"g_object_unref\0").map(|sym| *sym);
        Ok(Vips {
            __library,
            vips_init,
            vips_shutdown,
            vips_thread_shutdown,
            vips_leak_set,
            vips_concurrency_set,
            vips_concurrency_get,
            vips_cache_set_max,
            vips_cache_get_max,
            vips_cache_set_max_mem,
            vips_cache_get_max_mem,
            vips_cache_get_size,
            vips_cache_drop_all,
            vips_error_buffer,
            vips_error_clear,
            vips_version,
            vips_foreign_find_load_buffer,
            vips_image_new_from_buffer,
            vips_image_get_width,
            vips_image_get_height,
            vips_image_get_bands,
            vips_image_get_interpretation,
            vips_image_get_coding,
            g_object_unref,
        })
    }

    pub unsafe fn vips_init(&self, argv0: *const c_char) -> c_int {
        (self.vips_init)(argv0)
    }

    pub unsafe fn vips_shutdown(&self) {
        (self.vips_shutdown)()
    }

    pub unsafe fn vips_thread_shutdown(&self) {
        (self.vips_thread_shutdown)()
    }

    pub unsafe fn vips_leak_set(&self, leak: gboolean) {
        (self.vips_leak_set)(leak)
    }

    pub unsafe fn vips_concurrency_set(&self, concurrency: c_int) {
        (self.vips_concurrency_set)(concurrency)
    }

    pub unsafe fn vips_concurrency_get(&self) -> c_int {
        (self.vips_concurrency_get)()
    }

    pub unsafe fn vips_cache_set_max(&self, max: c_int) {
        (self.vips_cache_set_max)(max)
    }

    pub unsafe fn vips_cache_get_max(&self) -> c_int {
        (self.vips_cache_get_max)()
    }

    pub unsafe fn vips_cache_set_max_mem(&self, max_mem: size_t) {
        (self.vips_cache_set_max_mem)(max_mem)
    }

    pub unsafe fn vips_cache_get_max_mem(&self) -> size_t {
        (self.vips_cache_get_max_mem)()
    }

    pub unsafe fn vips_cache_get_size(&self) -> c_int {
        (self.vips_cache_get_size)()
    }

    pub unsafe fn vips_cache_drop_all(&self) {
        (self.vips_cache_drop_all)()
    }

    pub unsafe fn vips_error_buffer(&self) -> *const c_char {
        (self.vips_error_buffer)()
    }

    pub unsafe fn vips_error_clear(&self) {
        (self.vips_error_clear)()
    }

    pub unsafe fn vips_version(&self, flag: c_int) -> c_int {
        (self.vips_version)(flag)
    }

    pub unsafe fn vips_foreign_find_load_buffer(
        &self,
        data: *const c_void,
        size: size_t,
    ) -> *const c_char {
        (self.vips_foreign_find_load_buffer)(data, size)
    }

    /// Calls `vips_image_new_from_buffer` with no optional arguments.
    ///
    /// The returned image may read lazily from `buf`; the buffer must stay
    /// alive until the image is released.
    pub unsafe fn vips_image_new_from_buffer(
        &self,
        buf: *const c_void,
        len: size_t,
        option_string: *const c_char,
    ) -> *mut VipsImage {
        (self.vips_image_new_from_buffer)(buf, len, option_string, std::ptr::null::<c_char>())
    }

    pub unsafe fn vips_image_get_width(&self, image: *const VipsImage) -> c_int {
        (self.vips_image_get_width)(image)
    }

    pub unsafe fn vips_image_get_height(&self, image: *const VipsImage) -> c_int {
        (self.vips_image_get_height)(image)
    }

    pub unsafe fn vips_image_get_bands(&self, image: *const VipsImage) -> c_int {
        (self.vips_image_get_bands)(image)
    }

    pub unsafe fn vips_image_get_interpretation(&self, image: *const VipsImage) -> c_int {
        (self.vips_image_get_interpretation)(image)
    }

    pub unsafe fn vips_image_get_coding(&self, image: *const VipsImage) -> c_int {
        (self.vips_image_get_coding)(image)
    }

    /// Returns false when `g_object_unref` could not be resolved and the
    /// object was not released.
    pub unsafe fn g_object_unref(&self, object: *mut c_void) -> bool {
        match self.g_object_unref {
            Ok(unref) => {
                unref(object);
                true
            }
            Err(_) => false,
        }
    }
}

/// Engine version as reported by `vips_version()`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Reads the engine version from a loaded library.
pub fn version(lib: &Vips) -> Version {
    unsafe {
        Version {
            major: lib.vips_version(VIPS_VERSION_MAJOR),
            minor: lib.vips_version(VIPS_VERSION_MINOR),
            patch: lib.vips_version(VIPS_VERSION_MICRO),
        }
    }
}
