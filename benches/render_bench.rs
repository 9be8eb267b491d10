use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use chart_mcp::{ChartSpecification, OutputMode, RendererConfig};

fn bench_raster(c: &mut Criterion) {
    let renderer = chart_mcp::new_renderer(RendererConfig::default());
    let specs = [
        (
            "bar",
            json!({
                "type": "bar",
                "data": {
                    "labels": ["Jan", "Feb", "Mar", "Apr", "May", "Jun"],
                    "datasets": [
                        { "label": "a", "data": [12, 19, 3, 5, 2, 3] },
                        { "label": "b", "data": [4, 8, 15, 16, 23, 42] }
                    ]
                }
            }),
        ),
        (
            "line",
            json!({
                "type": "line",
                "data": {
                    "labels": (0..100).collect::<Vec<_>>(),
                    "datasets": [{ "label": "sin", "data": (0..100).map(|i| (f64::from(i) / 10.0).sin()).collect::<Vec<_>>(), "fill": true }]
                }
            }),
        ),
        (
            "pie",
            json!({ "type": "pie", "data": { "labels": ["a", "b", "c"], "datasets": [{ "data": [300, 50, 100] }] } }),
        ),
    ];

    for (name, spec) in specs {
        let parsed = ChartSpecification::from_value(spec.clone()).expect("valid spec");
        c.bench_function(&format!("rasterize_{name}"), |b| {
            b.iter(|| renderer.rasterize(black_box(&parsed)).unwrap())
        });
        c.bench_function(&format!("render_{name}_inline"), |b| {
            b.iter(|| renderer.render(black_box(spec.clone()), OutputMode::Raster, false))
        });
    }
}

fn bench_markup(c: &mut Criterion) {
    let renderer = chart_mcp::new_renderer(RendererConfig::default());
    let spec = json!({ "type": "radar", "data": { "labels": ["a", "b", "c"], "datasets": [{ "data": [1, 2, 3] }] } });
    c.bench_function("render_markup", |b| {
        b.iter(|| renderer.render(black_box(spec.clone()), OutputMode::Markup, false))
    });
}

criterion_group!(benches, bench_raster, bench_markup);
criterion_main!(benches);
