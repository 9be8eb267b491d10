use std::fs;

use chart_mcp::{Artifact, OutputMode, RenderResult, RendererConfig};
use serde_json::json;
use url::Url;

fn config_in(dir: &std::path::Path) -> RendererConfig {
    RendererConfig {
        output_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

fn spec() -> serde_json::Value {
    json!({
        "type": "line",
        "data": { "labels": ["a", "b", "c"], "datasets": [{ "label": "l", "data": [1, 4, 2] }] }
    })
}

#[test]
fn saved_file_matches_inline_render() {
    let tmp = tempfile::tempdir().unwrap();
    let renderer = chart_mcp::new_renderer(config_in(&tmp.path().join("charts")));

    let RenderResult::Success {
        artifact: Artifact::Binary(inline),
        ..
    } = renderer.render(spec(), OutputMode::Raster, false)
    else {
        panic!("inline render failed");
    };

    let result = renderer.render(spec(), OutputMode::Raster, true);
    let Some(Artifact::FileReference(uri)) = result.artifact() else {
        panic!("expected a file reference, got {result:?}");
    };
    assert!(uri.starts_with("file://"), "{uri}");
    assert!(uri.ends_with(".png"), "{uri}");
    assert_eq!(result.message(), format!("Chart saved to {uri}"));

    let path = Url::parse(uri).unwrap().to_file_path().unwrap();
    assert!(path.starts_with(tmp.path().join("charts")));
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("img-"), "{name}");
    assert_eq!(fs::read(&path).unwrap(), inline);
}

#[test]
fn repeated_saves_never_overwrite() {
    let tmp = tempfile::tempdir().unwrap();
    let renderer = chart_mcp::new_renderer(config_in(tmp.path()));

    let uris: Vec<String> = (0..5)
        .map(|_| match renderer.render(spec(), OutputMode::Raster, true) {
            RenderResult::Success {
                artifact: Artifact::FileReference(uri),
                ..
            } => uri,
            other => panic!("save failed: {other:?}"),
        })
        .collect();

    let mut unique = uris.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), uris.len());
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), uris.len());
}

#[test]
fn markup_never_touches_the_filesystem() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("charts");
    let renderer = chart_mcp::new_renderer(config_in(&out));

    let result = renderer.render(spec(), OutputMode::Markup, true);
    assert!(matches!(result.artifact(), Some(Artifact::Markup(_))));
    assert!(!out.exists());
}

#[test]
fn invalid_specs_are_not_persisted() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("charts");
    let renderer = chart_mcp::new_renderer(config_in(&out));

    let result = renderer.render(json!({ "type": "bar", "data": { "datasets": [] } }), OutputMode::Raster, true);
    assert!(!result.is_success());
    assert!(!out.exists());
}

#[test]
fn unwritable_output_dir_is_a_failure_result() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    fs::write(&blocker, b"x").unwrap();
    let renderer = chart_mcp::new_renderer(config_in(&blocker));

    match renderer.render(spec(), OutputMode::Raster, true) {
        RenderResult::Failure { message, .. } => {
            assert!(message.starts_with("Error generating chart: "), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_saves_get_distinct_files() {
    let tmp = tempfile::tempdir().unwrap();
    let service = chart_mcp::ChartService::new(chart_mcp::new_renderer(config_in(tmp.path())));

    let calls = (0..8).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.generate(spec(), OutputMode::Raster, true).await })
    });
    let mut uris = Vec::new();
    for call in calls.collect::<Vec<_>>() {
        match call.await.unwrap().artifact() {
            Some(Artifact::FileReference(uri)) => uris.push(uri.clone()),
            other => panic!("unexpected {other:?}"),
        }
    }
    uris.sort();
    uris.dedup();
    assert_eq!(uris.len(), 8);
}
