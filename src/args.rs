// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use std::path::PathBuf;
use vips_runtime::EngineConfig;

/// Command-line arguments for the vips-runtime tool.
///
/// Loads the native engine the same way a host application would, reports
/// how it was loaded and the state of the operation cache, and optionally
/// probes image files on a pool of worker threads.
///
/// # Example
///
/// ```bash
/// # Via command line
/// vips-runtime --resources ./native --workers 8 images/*.jpg
///
/// # Via environment variables
/// export VIPS_RUNTIME_RESOURCES=./native
/// export VIPS_MAX_CACHE=0
/// vips-runtime --json
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding packaged native libraries ({os}-{arch}/{file})
    #[arg(long, env = "VIPS_RUNTIME_RESOURCES")]
    pub resources: Option<PathBuf>,

    /// Directory for staged copies of native libraries
    #[arg(long, env = "VIPS_RUNTIME_STAGING")]
    pub staging: Option<PathBuf>,

    /// Do not fall back to a libvips installed on the host
    #[arg(long)]
    pub no_system_fallback: bool,

    /// Engine worker threads per pipeline (0 uses the host default)
    #[arg(long, env = "VIPS_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Maximum number of cached operations
    #[arg(long, env = "VIPS_MAX_CACHE")]
    pub max_cache: Option<usize>,

    /// Maximum tracked cache memory in bytes
    #[arg(long, env = "VIPS_MAX_CACHE_MEM")]
    pub max_cache_mem: Option<usize>,

    /// Report leaked native objects at shutdown
    #[arg(long, env = "VIPS_LEAK")]
    pub leak: bool,

    /// Number of worker threads used to probe files
    #[arg(short, long, env = "WORKERS", default_value = "4")]
    pub workers: usize,

    /// Print the status report as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Image files to probe
    pub files: Vec<PathBuf>,
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            leak_reporting: self.leak.then_some(true),
            concurrency: self.concurrency,
            max_cache_count: self.max_cache,
            max_cache_memory: self.max_cache_mem,
        }
    }
}
