// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Loading native artifacts into the process.
//!
//! [`NativeLoader`] walks a [`LibraryManifest`] in order, staging and linking
//! each dependency, then links the engine library itself. Libraries are kept
//! open for the life of the loader, which for the bootstrapped engine is the
//! life of the process.

use crate::{
    error::{Error, Result},
    locator::ArtifactLocator,
    manifest::{library_file_name, LibraryManifest},
    platform::PlatformId,
    stager::{ArtifactStager, StagedArtifact},
};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Opens a native library by path or loader file name.
pub trait Linker {
    type Library;

    fn link(&mut self, path: &Path) -> Result<Self::Library>;
}

/// The platform's dynamic loader.
///
/// On Unix libraries are opened with `RTLD_NOW | RTLD_GLOBAL` so that their
/// symbols are visible to libraries opened after them.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemLinker;

impl Linker for SystemLinker {
    type Library = libloading::Library;

    fn link(&mut self, path: &Path) -> Result<Self::Library> {
        let wrap = |source| Error::Link {
            path: path.to_path_buf(),
            source,
        };
        #[cfg(unix)]
        let library = unsafe {
            use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_NOW};
            Library::open(Some(path), RTLD_NOW | RTLD_GLOBAL)
                .map(libloading::Library::from)
                .map_err(wrap)?
        };
        #[cfg(not(unix))]
        let library = unsafe { libloading::Library::new(path).map_err(wrap)? };
        Ok(library)
    }
}

/// Where the engine's dependencies came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DependencySource {
    /// Every manifest dependency was staged from the package and linked.
    Packaged,
    /// Dependencies are expected to be installed on the host.
    System,
}

/// Where the engine library came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineOrigin {
    Packaged(StagedArtifact),
    System(String),
}

/// Result of [`NativeLoader::load_all`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOutcome {
    pub dependencies: DependencySource,
    pub engine: EngineOrigin,
}

impl LoadOutcome {
    pub fn loaded_from_package(&self) -> bool {
        self.dependencies == DependencySource::Packaged
    }
}

/// Libraries opened by [`NativeLoader::load_all`].
pub struct Loaded<L> {
    pub outcome: LoadOutcome,
    pub engine: L,
    pub dependencies: Vec<L>,
}

pub struct NativeLoader<K: Linker = SystemLinker> {
    locator: ArtifactLocator,
    stager: ArtifactStager,
    linker: K,
    system_fallback: bool,
}

impl NativeLoader<SystemLinker> {
    pub fn new(locator: ArtifactLocator, stager: ArtifactStager) -> Self {
        Self::with_linker(locator, stager, SystemLinker)
    }
}

impl<K: Linker> NativeLoader<K> {
    pub fn with_linker(locator: ArtifactLocator, stager: ArtifactStager, linker: K) -> Self {
        Self {
            locator,
            stager,
            linker,
            system_fallback: true,
        }
    }

    /// Whether an engine missing from the package may be opened from the
    /// host's library search path. Enabled by default.
    pub fn system_fallback(mut self, enabled: bool) -> Self {
        self.system_fallback = enabled;
        self
    }

    pub fn linker(&self) -> &K {
        &self.linker
    }

    /// Loads the manifest's dependencies, then the engine.
    ///
    /// A dependency missing from the package switches to host-installed
    /// dependencies instead of failing. On macOS dependencies are never
    /// packaged. Failing to load the engine is fatal.
    #[instrument(skip_all, fields(%platform))]
    pub fn load_all(
        &mut self,
        platform: &PlatformId,
        manifest: &LibraryManifest,
    ) -> Result<Loaded<K::Library>> {
        let mut dependencies = Vec::with_capacity(manifest.dependencies().len());
        let source = if platform.os().is_darwin() {
            DependencySource::System
        } else {
            self.load_dependencies(platform, manifest, &mut dependencies)?
        };
        match source {
            DependencySource::Packaged => info!("native dependencies loaded from package"),
            DependencySource::System => info!("using native dependencies installed on system"),
        }

        let (engine, origin) = self.load_engine(platform, manifest)?;
        info!(engine = manifest.engine(), "native engine library loaded");
        Ok(Loaded {
            outcome: LoadOutcome {
                dependencies: source,
                engine: origin,
            },
            engine,
            dependencies,
        })
    }

    fn load_dependencies(
        &mut self,
        platform: &PlatformId,
        manifest: &LibraryManifest,
        loaded: &mut Vec<K::Library>,
    ) -> Result<DependencySource> {
        for name in manifest.dependencies() {
            match self.stage(platform, name)? {
                Some(staged) => loaded.push(self.linker.link(staged.temp_path())?),
                None => {
                    let [qualified, legacy] = ArtifactLocator::candidates(platform, name);
                    warn!(
                        name = name.as_str(),
                        "could not find {qualified} or {legacy} in package"
                    );
                    return Ok(DependencySource::System);
                }
            }
        }
        Ok(DependencySource::Packaged)
    }

    fn load_engine(
        &mut self,
        platform: &PlatformId,
        manifest: &LibraryManifest,
    ) -> Result<(K::Library, EngineOrigin)> {
        let name = manifest.engine();
        if let Some(staged) = self.stage(platform, name)? {
            let library = self.linker.link(staged.temp_path())?;
            return Ok((library, EngineOrigin::Packaged(staged)));
        }

        let file = library_file_name(platform.os(), name);
        if !self.system_fallback {
            return Err(Error::ArtifactMissing {
                name: name.to_string(),
                file,
            });
        }
        let system = manifest.system_engine();
        debug!(name, system, "engine not packaged, trying host library path");
        match self.linker.link(Path::new(system)) {
            Ok(library) => Ok((library, EngineOrigin::System(system.to_string()))),
            Err(e) => {
                warn!("{e}");
                Err(Error::ArtifactMissing {
                    name: name.to_string(),
                    file,
                })
            }
        }
    }

    fn stage(&self, platform: &PlatformId, name: &str) -> Result<Option<StagedArtifact>> {
        match self.locator.locate(platform, name)? {
            Some(handle) => self.stager.stage(handle).map(Some),
            None => Ok(None),
        }
    }
}
