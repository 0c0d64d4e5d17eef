// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use serial_test::serial;
use std::{
    error::Error,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};
use vips_runtime::{enums::Interpretation, Context, State};

/// 1x1 RGBA PNG.
const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4,
    0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae,
    0x42, 0x60, 0x82,
];

const CORRUPTED: &[u8] = &[0x00, 0x01, 0x02, 0x03];

fn context() -> Result<Context, Box<dyn Error>> {
    Ok(vips_runtime::bootstrap()?)
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_bootstrap() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    assert_eq!(vips_runtime::state(), State::Bootstrapped);
    let again = vips_runtime::bootstrap()?;
    assert_eq!(ctx.version()?, again.version()?);
    assert!(ctx.version()?.major >= 8);

    let outcome = vips_runtime::load_outcome().ok_or("load outcome not registered")?;
    println!("{outcome:?} {}", ctx.version()?);
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_set_leak() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    ctx.set_leak_reporting(true)?;
    ctx.set_leak_reporting(false)?;
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_concurrency() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    let original = ctx.concurrency()?;
    ctx.set_concurrency(4)?;
    assert_eq!(ctx.concurrency()?, 4);
    ctx.set_concurrency(original)?;
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_cache_settings() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    let original = ctx.memory_info()?;

    ctx.set_max_cache_count(100)?;
    assert_eq!(ctx.max_cache_count()?, 100);
    ctx.set_max_cache_memory(50 * 1024 * 1024)?;
    assert_eq!(ctx.max_cache_memory()?, 50 * 1024 * 1024);

    ctx.set_max_cache_count(original.max_count)?;
    ctx.set_max_cache_memory(original.max_memory)?;
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_drop_all_cached() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    ctx.drop_all_cached()?;
    assert_eq!(ctx.cache_size()?, 0);
    for _ in 0..3 {
        ctx.probe(PIXEL_PNG)?;
    }
    ctx.drop_all_cached()?;
    assert_eq!(ctx.cache_size()?, 0);
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_probe() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    let info = ctx.probe(PIXEL_PNG)?;
    println!("{info:?}");
    assert!(info.loader.starts_with("png"), "{}", info.loader);
    assert_eq!((info.width, info.height, info.bands), (1, 1, 4));
    assert_eq!(info.interpretation, Interpretation::Srgb);
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_thread_teardown() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    for _ in 0..5 {
        ctx.thread_teardown()?;
    }
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_thread_teardown_in_thread_pool() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    let success = AtomicUsize::new(0);
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..10 {
                    if ctx.thread_teardown().is_ok() {
                        success.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });
    assert_eq!(success.load(Ordering::SeqCst), 40);
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_thread_local_cleanup_in_thread_pool() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    let processed = AtomicUsize::new(0);
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                ctx.thread_scope(|| {
                    for _ in 0..5 {
                        if ctx.probe(PIXEL_PNG).is_ok() {
                            processed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            });
        }
    });
    assert_eq!(processed.load(Ordering::SeqCst), 20);
    println!("{}", ctx.memory_info()?);
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_cache_cleanup_after_error() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    for _ in 0..10 {
        match ctx.probe(CORRUPTED) {
            Ok(info) => panic!("corrupted input loaded as {info:?}"),
            Err(e @ vips_runtime::Error::Operation { .. }) => {
                assert!(!e.to_string().is_empty());
                ctx.recover_after_failure()?;
                assert_eq!(ctx.cache_size()?, 0);
            }
            Err(e) => return Err(e.into()),
        }
    }
    ctx.thread_teardown()?;
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires libvips installed on the host (run with --include-ignored)"]
fn test_memory_info() -> Result<(), Box<dyn Error>> {
    let ctx = context()?;
    let info = ctx.memory_info()?;
    let text = info.to_string();
    println!("{text}");
    assert!(text.starts_with("Cache size: "));
    assert!(text.contains(&format!("Max cache: {}", info.max_count)));
    assert!(text.ends_with(" bytes"));
    Ok(())
}
