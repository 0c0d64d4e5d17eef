// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Startup failure handling. The engine registry is process-wide, so this
//! binary holds a single test.

use std::{error::Error, sync::Arc};
use vips_runtime::{locator::EmbeddedSource, BootstrapOptions, State};

#[test]
fn test_failed_bootstrap_is_not_retried() -> Result<(), Box<dyn Error>> {
    let staging = tempfile::tempdir()?;
    assert_eq!(vips_runtime::state(), State::Unloaded);
    assert!(vips_runtime::context().is_none());

    let options = BootstrapOptions::new(EmbeddedSource::new())
        .staging_dir(staging.path())
        .system_fallback(false);
    let first = match vips_runtime::bootstrap_with(options) {
        Err(vips_runtime::Error::Bootstrap(inner)) => inner,
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("an empty package without fallback cannot start"),
    };
    assert!(matches!(
        *first,
        vips_runtime::Error::ArtifactMissing { ref name, .. } if name.contains("vips")
    ));
    assert_eq!(vips_runtime::state(), State::Failed);

    // later options are ignored and the same failure is returned
    let second = match vips_runtime::bootstrap() {
        Err(vips_runtime::Error::Bootstrap(inner)) => inner,
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("startup must not be retried"),
    };
    assert!(Arc::ptr_eq(&first, &second));
    assert!(vips_runtime::Error::Bootstrap(second).is_startup());

    assert_eq!(vips_runtime::state(), State::Failed);
    assert!(vips_runtime::context().is_none());
    assert!(vips_runtime::load_outcome().is_none());
    // nothing to shut down
    vips_runtime::shutdown();
    assert_eq!(vips_runtime::state(), State::Failed);
    Ok(())
}
