// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Copies packaged artifacts to real files the platform loader can open.
//!
//! Staged files are never removed while the process runs, since the loader
//! keeps them mapped. On Unix they are removed by an exit hook; failures to
//! remove them are ignored.

use crate::{
    error::{Error, Result},
    locator::ResourceHandle,
};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, Once},
};
use tracing::debug;

/// A packaged artifact copied to the filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedArtifact {
    source_path: String,
    temp_path: PathBuf,
}

impl StagedArtifact {
    /// Resource path the artifact was copied from.
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Absolute path of the temporary copy.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }
}

/// Writes located artifacts into uniquely named temporary files.
#[derive(Clone, Debug)]
pub struct ArtifactStager {
    dir: PathBuf,
}

impl Default for ArtifactStager {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactStager {
    /// Stages into the system temporary directory.
    pub fn new() -> Self {
        Self {
            dir: std::env::temp_dir(),
        }
    }

    /// Stages into `dir`, which must already exist.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies the artifact behind `handle` into a new temporary file.
    ///
    /// Either the whole artifact is written and synced, or the partial file
    /// is removed and an error is returned.
    pub fn stage(&self, mut handle: ResourceHandle<'_>) -> Result<StagedArtifact> {
        let source_path = handle.path().to_string();
        let wrap = |source: io::Error| Error::Stage {
            path: source_path.clone(),
            source,
        };

        let (prefix, suffix) = split_file_name(handle.file_name());
        let mut temp = tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .suffix(suffix)
            .tempfile_in(&self.dir)
            .map_err(wrap)?;
        let copied = io::copy(handle.reader(), temp.as_file_mut()).map_err(wrap)?;
        temp.as_file().sync_all().map_err(wrap)?;

        let (_, temp_path) = temp.keep().map_err(|e| wrap(e.error))?;
        let temp_path = fs::canonicalize(&temp_path).unwrap_or(temp_path);
        register_for_exit_cleanup(&temp_path);

        debug!(
            source = %source_path,
            temp = %temp_path.display(),
            bytes = copied,
            "staged native artifact"
        );
        Ok(StagedArtifact {
            source_path,
            temp_path,
        })
    }
}

/// Splits `libvips.so` into `("libvips", ".so")` so the temporary copy keeps
/// the loader extension.
fn split_file_name(file_name: &str) -> (&str, &str) {
    match file_name.find('.') {
        Some(0) | None => (file_name, ""),
        Some(idx) => file_name.split_at(idx),
    }
}

static STAGED: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

fn register_for_exit_cleanup(path: &Path) {
    STAGED
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push(path.to_path_buf());
    install_exit_hook();
}

#[cfg(unix)]
fn install_exit_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        if unsafe { libc::atexit(remove_staged_artifacts) } != 0 {
            tracing::warn!("unable to register staged artifact cleanup");
        }
    });
}

// Windows keeps loaded DLLs locked until the process is gone, so staged
// copies are left for the temp directory's own cleanup.
#[cfg(not(unix))]
fn install_exit_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| tracing::trace!("staged artifacts are left in the temp directory"));
}

#[cfg(unix)]
extern "C" fn remove_staged_artifacts() {
    let staged = match STAGED.lock() {
        Ok(staged) => staged,
        Err(poisoned) => poisoned.into_inner(),
    };
    // runs after thread-local destructors, so no logging here
    for path in staged.iter() {
        let _ = fs::remove_file(path);
    }
}

/// Paths staged so far in this process.
pub fn staged_paths() -> Vec<PathBuf> {
    STAGED
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::ResourceHandle;
    use std::io::{self, Cursor, Read};

    fn handle(path: &str, file_name: &str, bytes: &'static [u8]) -> ResourceHandle<'static> {
        ResourceHandle::new(
            path.to_string(),
            file_name.to_string(),
            Box::new(Cursor::new(bytes)),
        )
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("truncated archive"))
        }
    }

    #[test]
    fn split_names() {
        assert_eq!(split_file_name("libvips.so"), ("libvips", ".so"));
        assert_eq!(split_file_name("libvips-42.dll"), ("libvips-42", ".dll"));
        assert_eq!(split_file_name("libvips.so.42"), ("libvips", ".so.42"));
        assert_eq!(split_file_name("vips"), ("vips", ""));
        assert_eq!(split_file_name(".hidden"), (".hidden", ""));
    }

    #[test]
    fn stages_full_contents() {
        let dir = tempfile::tempdir().unwrap();
        let stager = ArtifactStager::with_dir(dir.path());

        let staged = stager
            .stage(handle("linux-x86_64/libvips.so", "libvips.so", b"\x7fELF payload"))
            .unwrap();
        assert_eq!(staged.source_path(), "linux-x86_64/libvips.so");
        assert!(staged.temp_path().is_absolute());
        assert_eq!(fs::read(staged.temp_path()).unwrap(), b"\x7fELF payload");

        let name = staged.temp_path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("libvips-"));
        assert!(name.ends_with(".so"));
        assert!(staged_paths().contains(&staged.temp_path().to_path_buf()));
    }

    #[test]
    fn unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let stager = ArtifactStager::with_dir(dir.path());
        let a = stager.stage(handle("libgif.so", "libgif.so", b"a")).unwrap();
        let b = stager.stage(handle("libgif.so", "libgif.so", b"b")).unwrap();
        assert_ne!(a.temp_path(), b.temp_path());
        assert_eq!(fs::read(a.temp_path()).unwrap(), b"a");
        assert_eq!(fs::read(b.temp_path()).unwrap(), b"b");
    }

    #[test]
    fn failed_copy_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let stager = ArtifactStager::with_dir(dir.path());
        let failing = ResourceHandle::new(
            "libjpeg.so".to_string(),
            "libjpeg.so".to_string(),
            Box::new(Failing),
        );

        let err = stager.stage(failing).unwrap_err();
        assert!(matches!(err, Error::Stage { ref path, .. } if path == "libjpeg.so"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let stager = ArtifactStager::with_dir(dir.path().join("absent"));
        let err = stager
            .stage(handle("libpng16.so", "libpng16.so", b"png"))
            .unwrap_err();
        assert!(matches!(err, Error::Stage { .. }));
    }
}
