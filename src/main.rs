// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use args::Args;
use clap::Parser;
use serde_json::json;
use std::{error::Error, fs, path::PathBuf, process, thread, time::Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vips_runtime::{
    BootstrapOptions, Context, DependencySource, EngineOrigin, ImageInfo, LoadOutcome,
};

mod args;

const LOG_ENV: &str = "VIPS_RUNTIME_LOG";

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let journald = tracing_journald::layer().ok();

    #[cfg(feature = "tracy")]
    let tracy = {
        tracy_client::Client::start();
        tracing_tracy::TracyLayer::default()
    };
    #[cfg(not(feature = "tracy"))]
    let tracy = tracing_subscriber::layer::Identity::new();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(journald)
        .with(tracy)
        .with(filter)
        .init();
}

fn options(args: &Args) -> BootstrapOptions {
    let mut options = match &args.resources {
        Some(root) => BootstrapOptions::new(vips_runtime::locator::DirSource::new(root)),
        None => BootstrapOptions::from_env(),
    };
    if let Some(dir) = &args.staging {
        options = options.staging_dir(dir);
    }
    options
        .system_fallback(!args.no_system_fallback)
        .config(args.engine_config())
}

type Probe = (PathBuf, Result<ImageInfo, String>);

fn probe_files(ctx: &Context, files: &[PathBuf], workers: usize) -> Vec<Probe> {
    if files.is_empty() {
        return Vec::new();
    }
    let chunk = files.len().div_ceil(workers.max(1));
    thread::scope(|s| {
        let pool: Vec<_> = files
            .chunks(chunk)
            .map(|paths| s.spawn(move || ctx.thread_scope(|| probe_chunk(ctx, paths))))
            .collect();
        pool.into_iter()
            .flat_map(|worker| match worker.join() {
                Ok(probes) => probes,
                Err(_) => {
                    error!("probe worker panicked");
                    Vec::new()
                }
            })
            .collect()
    })
}

fn probe_chunk(ctx: &Context, paths: &[PathBuf]) -> Vec<Probe> {
    paths
        .iter()
        .map(|path| {
            let now = Instant::now();
            let result = match fs::read(path) {
                Ok(data) => ctx.probe(&data).map_err(|e| {
                    if let Err(e) = ctx.recover_after_failure() {
                        warn!("cache cleanup failed: {e}");
                    }
                    e.to_string()
                }),
                Err(e) => Err(e.to_string()),
            };
            match &result {
                Ok(info) => info!(
                    path = %path.display(),
                    loader = %info.loader,
                    elapsed = ?now.elapsed(),
                    "{}x{} {} bands",
                    info.width,
                    info.height,
                    info.bands
                ),
                Err(e) => warn!(path = %path.display(), "{e}"),
            }
            (path.clone(), result)
        })
        .collect()
}

fn origin(outcome: &LoadOutcome) -> (&'static str, String) {
    let deps = match outcome.dependencies {
        DependencySource::Packaged => "package",
        DependencySource::System => "system",
    };
    let engine = match &outcome.engine {
        EngineOrigin::Packaged(staged) => format!(
            "{} (staged at {})",
            staged.source_path(),
            staged.temp_path().display()
        ),
        EngineOrigin::System(name) => format!("{name} (system)"),
    };
    (deps, engine)
}

fn report(ctx: &Context, args: &Args, probes: &[Probe]) -> Result<(), Box<dyn Error>> {
    let platform = vips_runtime::platform::resolve();
    let (deps, engine) = vips_runtime::load_outcome()
        .map(|outcome| origin(&outcome))
        .unwrap_or(("unknown", String::new()));
    let cache = ctx.memory_info()?;
    let version = ctx.version()?;
    let concurrency = ctx.concurrency()?;

    if args.json {
        let files: Vec<_> = probes
            .iter()
            .map(|(path, result)| match result {
                Ok(info) => json!({
                    "path": path,
                    "loader": info.loader,
                    "width": info.width,
                    "height": info.height,
                    "bands": info.bands,
                    "interpretation": info.interpretation.to_string(),
                    "coding": info.coding.to_string(),
                }),
                Err(e) => json!({ "path": path, "error": e }),
            })
            .collect();
        let status = json!({
            "platform": platform.to_string(),
            "dependencies": deps,
            "engine": engine,
            "version": version.to_string(),
            "concurrency": concurrency,
            "cache": {
                "size": cache.size,
                "max_count": cache.max_count,
                "max_memory": cache.max_memory,
            },
            "files": files,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("platform:     {platform}");
        println!("dependencies: {deps}");
        println!("engine:       {engine}");
        println!("version:      {version}");
        println!("concurrency:  {concurrency}");
        println!("{cache}");
        for (path, result) in probes {
            match result {
                Ok(info) => println!(
                    "{}: {} {}x{} {} bands {}",
                    path.display(),
                    info.loader,
                    info.width,
                    info.height,
                    info.bands,
                    info.interpretation
                ),
                Err(e) => println!("{}: error: {e}", path.display()),
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let ctx = match vips_runtime::bootstrap_with(options(&args)) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let probes = probe_files(&ctx, &args.files, args.workers);
    if probes.iter().any(|(_, result)| result.is_err()) {
        ctx.recover_after_failure()?;
    }
    report(&ctx, &args, &probes)?;

    ctx.shutdown();
    Ok(())
}
