// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Lookup of packaged native artifacts.
//!
//! Artifacts are addressed by `/`-separated resource paths. Current packages
//! place them under a platform directory (`linux-x86_64/libvips.so`); older
//! packages placed them at the root (`libvips.so`). [`ArtifactLocator`]
//! tries both, platform directory first.

use crate::{error::Result, manifest::library_file_name, platform::PlatformId};
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, Cursor, Read},
    path::PathBuf,
};
use tracing::debug;

/// A store of packaged resources.
pub trait ResourceSource: Send + Sync {
    /// Opens the resource at `path`, or returns `None` when it does not exist.
    fn open(&self, path: &str) -> io::Result<Option<Box<dyn Read + Send + '_>>>;
}

/// Resources laid out below a directory on the filesystem.
#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl ResourceSource for DirSource {
    fn open(&self, path: &str) -> io::Result<Option<Box<dyn Read + Send + '_>>> {
        let mut full = self.root.clone();
        full.extend(path.split('/').filter(|part| !part.is_empty()));
        match fs::metadata(&full) {
            Ok(meta) if meta.is_file() => {
                let file = File::open(&full)?;
                Ok(Some(Box::new(file) as Box<dyn Read + Send>))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Resources compiled into the binary, typically with `include_bytes!`.
#[derive(Clone, Debug, Default)]
pub struct EmbeddedSource {
    entries: HashMap<String, &'static [u8]>,
}

impl EmbeddedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, bytes: &'static [u8]) -> Self {
        self.entries.insert(path.to_string(), bytes);
        self
    }
}

impl ResourceSource for EmbeddedSource {
    fn open(&self, path: &str) -> io::Result<Option<Box<dyn Read + Send + '_>>> {
        Ok(self
            .entries
            .get(path)
            .map(|bytes| Box::new(Cursor::new(*bytes)) as Box<dyn Read + Send>))
    }
}

/// An open packaged artifact.
pub struct ResourceHandle<'a> {
    path: String,
    file_name: String,
    reader: Box<dyn Read + Send + 'a>,
}

impl<'a> ResourceHandle<'a> {
    pub fn new(path: String, file_name: String, reader: Box<dyn Read + Send + 'a>) -> Self {
        Self {
            path,
            file_name,
            reader,
        }
    }

    /// Resource path the artifact was found at.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Loader file name of the artifact, e.g. `libvips.so`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn reader(&mut self) -> &mut (dyn Read + Send + 'a) {
        &mut *self.reader
    }
}

impl std::fmt::Debug for ResourceHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("path", &self.path)
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

/// Finds packaged artifacts for a platform.
pub struct ArtifactLocator {
    source: Box<dyn ResourceSource>,
}

impl ArtifactLocator {
    pub fn new(source: impl ResourceSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    pub fn from_boxed(source: Box<dyn ResourceSource>) -> Self {
        Self { source }
    }

    /// Resource paths tried for `name`, in order of preference.
    pub fn candidates(platform: &PlatformId, name: &str) -> [String; 2] {
        let file_name = library_file_name(platform.os(), name);
        [format!("{platform}/{file_name}"), file_name]
    }

    /// Locates the artifact for `name`.
    ///
    /// The platform-qualified path wins over the legacy root path. Absence
    /// is `Ok(None)`; only read errors other than "not found" are errors.
    pub fn locate(&self, platform: &PlatformId, name: &str) -> Result<Option<ResourceHandle<'_>>> {
        let file_name = library_file_name(platform.os(), name);
        for path in Self::candidates(platform, name) {
            if let Some(reader) = self.source.open(&path)? {
                debug!(name, path = %path, "located native artifact");
                return Ok(Some(ResourceHandle::new(path, file_name, reader)));
            }
        }
        Ok(None)
    }
}
