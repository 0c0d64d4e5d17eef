// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Error types.

use std::{io, path::PathBuf, sync::Arc};

/// Errors raised while loading, starting, or driving the native engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A packaged resource could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A located artifact could not be copied to a temporary file.
    #[error("failed to stage native artifact {path}: {source}")]
    Stage {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The engine library is neither packaged nor resolvable on the host.
    #[error("native artifact {name} ({file}) not found in package or on system")]
    ArtifactMissing { name: String, file: String },

    /// The platform loader rejected a library.
    #[error("failed to load native library {}: {source}", path.display())]
    Link {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// The engine was loaded but its initialisation call reported failure.
    #[error("engine initialization failed: {message}")]
    EngineInit { message: String },

    /// Startup failed earlier in this process and is not retried.
    #[error("engine startup failed: {0}")]
    Bootstrap(Arc<Error>),

    /// A native engine call failed; `message` is the engine's own text.
    #[error("{message}")]
    Operation { message: String },

    /// The engine was shut down and can no longer be used.
    #[error("engine has been shut down")]
    ShutDown,
}

impl Error {
    /// True for failures that happen before the engine is usable.
    pub fn is_startup(&self) -> bool {
        match self {
            Error::Io(_)
            | Error::Stage { .. }
            | Error::ArtifactMissing { .. }
            | Error::Link { .. }
            | Error::EngineInit { .. }
            | Error::Bootstrap(_) => true,
            Error::Operation { .. } | Error::ShutDown => false,
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
