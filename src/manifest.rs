// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Native library manifests.
//!
//! A manifest lists the libraries that must be loaded before the engine, in
//! load order. A library always comes after every library it depends on.

use crate::platform::Os;

/// Codec and compression libraries bundled for Linux packages.
const POSIX_DEPENDENCIES: &[&str] = &[
    "aom",
    "heif",
    "exif",
    "png16",
    "spng",
    "gif",
    "jpeg",
    "turbojpeg",
    "webp",
    "webpmux",
    "webpdemux",
    "imagequant",
    "lcms2",
];

/// The official Windows release of libvips ships every dependency except the
/// colour quantisation library.
const WINDOWS_DEPENDENCIES: &[&str] = &["libimagequant"];

/// Ordered set of native libraries for one OS family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibraryManifest {
    dependencies: Vec<String>,
    engine: String,
    system_engine: String,
}

impl LibraryManifest {
    pub fn new<I, S>(dependencies: I, engine: &str, system_engine: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            engine: engine.to_string(),
            system_engine: system_engine.to_string(),
        }
    }

    /// The built-in manifest for `os`.
    pub fn for_os(os: Os) -> Self {
        match os {
            Os::Windows => Self::new(
                WINDOWS_DEPENDENCIES.iter().copied(),
                "libvips-42",
                "libvips-42.dll",
            ),
            Os::Darwin => Self::new(POSIX_DEPENDENCIES.iter().copied(), "vips", "libvips.42.dylib"),
            Os::Linux | Os::Unknown => {
                Self::new(POSIX_DEPENDENCIES.iter().copied(), "vips", "libvips.so.42")
            }
        }
    }

    /// Logical names of the engine's dependencies, in load order.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Logical name of the engine library.
    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// File name the host loader uses to find an installed engine.
    pub fn system_engine(&self) -> &str {
        &self.system_engine
    }
}

/// Maps a logical library name to the file name the platform loader expects.
///
/// Follows the usual conventions: `lib{name}.so` on Linux and other Unix
/// systems, `lib{name}.dylib` on macOS and `{name}.dll` on Windows.
pub fn library_file_name(os: Os, name: &str) -> String {
    match os {
        Os::Windows => format!("{name}.dll"),
        Os::Darwin => format!("lib{name}.dylib"),
        Os::Linux | Os::Unknown => format!("lib{name}.so"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(library_file_name(Os::Linux, "vips"), "libvips.so");
        assert_eq!(library_file_name(Os::Darwin, "vips"), "libvips.dylib");
        assert_eq!(library_file_name(Os::Windows, "libimagequant"), "libimagequant.dll");
        assert_eq!(library_file_name(Os::Unknown, "heif"), "libheif.so");
    }

    #[test]
    fn posix_order() {
        let manifest = LibraryManifest::for_os(Os::Linux);
        let deps = manifest.dependencies();
        let position = |name: &str| deps.iter().position(|d| d == name).unwrap();

        // libheif links against libaom, libwebpmux/demux against libwebp
        assert!(position("aom") < position("heif"));
        assert!(position("webp") < position("webpmux"));
        assert!(position("webp") < position("webpdemux"));
        assert_eq!(manifest.engine(), "vips");
        assert!(!deps.iter().any(|d| d == manifest.engine()));
    }

    #[test]
    fn windows_manifest() {
        let manifest = LibraryManifest::for_os(Os::Windows);
        assert_eq!(manifest.dependencies(), ["libimagequant".to_string()]);
        assert_eq!(manifest.engine(), "libvips-42");
        assert_eq!(manifest.system_engine(), "libvips-42.dll");
    }
}
