use criterion::{criterion_group, criterion_main, Criterion};
use std::fs;
use vips_runtime::{
    locator::{ArtifactLocator, DirSource},
    stager::ArtifactStager,
    PlatformId,
};

fn benchmark_stage(locator: &ArtifactLocator, stager: &ArtifactStager, platform: &PlatformId) {
    let handle = locator.locate(platform, "vips").unwrap().unwrap();
    let staged = stager.stage(handle).unwrap();
    fs::remove_file(staged.temp_path()).unwrap();
}

pub fn benchmark_artifacts(c: &mut Criterion) {
    let platform = PlatformId::from_parts("linux", "x86_64");
    let package = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    fs::create_dir(package.path().join("linux-x86_64")).unwrap();

    let mut group = c.benchmark_group("stage");
    for size in [64 * 1024, 1024 * 1024, 16 * 1024 * 1024].iter() {
        fs::write(
            package.path().join("linux-x86_64/libvips.so"),
            vec![0x7f; *size],
        )
        .unwrap();
        let locator = ArtifactLocator::new(DirSource::new(package.path()));
        let stager = ArtifactStager::with_dir(staging.path());
        group.bench_with_input(format!("{}KiB", size / 1024), &locator, |b, locator| {
            b.iter(|| benchmark_stage(locator, &stager, &platform))
        });
    }
    group.finish();

    let locator = ArtifactLocator::new(DirSource::new(package.path()));
    c.bench_function("locate_missing", |b| {
        b.iter(|| locator.locate(&platform, "heif").unwrap().is_none())
    });
}

criterion_group!(benches, benchmark_artifacts);
criterion_main!(benches);
