use criterion::{black_box, criterion_group, criterion_main, Criterion};
use filetime::FileTime;
use smally::{choose_jpeg, DirCache, MtimeStamp};

fn bench_selection(c: &mut Criterion) {
    c.bench_function("choose_jpeg", |b| {
        b.iter(|| {
            choose_jpeg(
                black_box(1_000_000),
                black_box(950_000),
                black_box(950_001),
                black_box(false),
            )
        })
    });
}

fn bench_cache_probe(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let cache = DirCache::open(dir.path()).unwrap();
    let stamp = MtimeStamp::from(FileTime::from_unix_time(1_700_000_000, 0));
    let probe = cache.probe("photo.png", 500, &stamp).unwrap();
    cache.record(&probe, "photo.png", 480, &stamp).unwrap();

    c.bench_function("cache_probe_fresh", |b| {
        b.iter(|| cache.probe(black_box("photo.png"), black_box(480), &stamp).unwrap())
    });
}

criterion_group!(benches, bench_selection, bench_cache_probe);
criterion_main!(benches);
