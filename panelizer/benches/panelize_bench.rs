use criterion::{black_box, criterion_group, criterion_main, Criterion};
use panelizer::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bench_panelize(c: &mut Criterion) {
    let source = load_board(&fixture_path("simple_board.brd")).unwrap();
    let options = PanelOptions::new(250.0, 200.0);

    c.bench_function("panelize_25x25", |b| {
        b.iter(|| {
            let mut doc = source.clone();
            PanelizerCore::panelize(black_box(&mut doc), black_box(&options))
        });
    });
}

fn bench_parse(c: &mut Criterion) {
    let text = std::fs::read_to_string(fixture_path("simple_board.brd")).unwrap();
    c.bench_function("parse_board", |b| {
        b.iter(|| XmlDocument::parse(black_box(&text)));
    });
}

criterion_group!(benches, bench_panelize, bench_parse);
criterion_main!(benches);
