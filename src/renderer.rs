//! Chart rendering orchestrator
//!
//! [`ChartRenderer::render`] takes an untrusted configuration, validates it,
//! and produces exactly one artifact: inline PNG bytes, a `file://` reference
//! to a saved PNG, or an HTML snippet. It never returns an error; every
//! failure comes back as [`RenderResult::Failure`].

use std::path::PathBuf;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chart::ChartSpecification;
use crate::markup::{self, DEFAULT_LIBRARY_URL};
use crate::persist;
use crate::rendering::{RenderingEngine, Surface};
use crate::{Error, Result};

/// Prefix of every failure message
pub const FAILURE_PREFIX: &str = "Error generating chart: ";

/// Representation of the rendered chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// PNG image (inline or saved)
    #[default]
    #[serde(alias = "png", alias = "image")]
    Raster,
    /// Self-contained HTML snippet drawn client-side
    #[serde(alias = "html")]
    Markup,
}

/// Renderer configuration
///
/// The drawing surface is always 800x600 and is not configurable.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Directory saved images go into; relative paths resolve against the
    /// working directory at write time
    pub output_dir: PathBuf,
    /// Chart.js bundle loaded by markup snippets when the page lacks one
    pub library_url: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("charts"),
            library_url: DEFAULT_LIBRARY_URL.to_string(),
        }
    }
}

/// The artifact carried by a successful render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// PNG bytes
    Binary(Vec<u8>),
    /// `file://` URI of a saved PNG
    FileReference(String),
    /// HTML snippet
    Markup(String),
}

/// Outcome of one render call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    Success {
        artifact: Artifact,
        message: String,
    },
    Failure {
        /// Bare reason
        error_detail: String,
        /// `"Error generating chart: " + error_detail`
        message: String,
    },
}

impl RenderResult {
    fn success(artifact: Artifact, message: impl Into<String>) -> Self {
        RenderResult::Success {
            artifact,
            message: message.into(),
        }
    }

    /// Failure result for `err`
    pub fn failure(err: &Error) -> Self {
        let detail = err.detail();
        RenderResult::Failure {
            message: format!("{FAILURE_PREFIX}{detail}"),
            error_detail: detail,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderResult::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            RenderResult::Success { message, .. } | RenderResult::Failure { message, .. } => message,
        }
    }

    /// The artifact, if the render succeeded
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            RenderResult::Success { artifact, .. } => Some(artifact),
            RenderResult::Failure { .. } => None,
        }
    }
}

/// Validates configurations and shapes render results around an engine.
///
/// Holds no per-call state; one renderer can serve any number of concurrent
/// calls.
pub struct ChartRenderer<E> {
    engine: E,
    config: RendererConfig,
}

impl<E: RenderingEngine> ChartRenderer<E> {
    pub fn new(engine: E, config: RendererConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Render `raw` in the requested mode. `save_to_file` only applies to
    /// raster output.
    pub fn render(&self, raw: Value, mode: OutputMode, save_to_file: bool) -> RenderResult {
        let result = ChartSpecification::from_value(raw).and_then(|spec| match mode {
            OutputMode::Markup => Ok(self.render_markup(&spec)),
            OutputMode::Raster => self.render_raster(&spec, save_to_file),
        });

        match result {
            Ok(result) => result,
            Err(err) => {
                warn!("chart generation failed: {err}");
                RenderResult::failure(&err)
            }
        }
    }

    fn render_markup(&self, spec: &ChartSpecification) -> RenderResult {
        let id = markup::mount_id();
        let html = markup::render_snippet(spec, &id, &self.config.library_url);
        info!("generated HTML for {} chart ({id})", spec.kind());
        RenderResult::success(Artifact::Markup(html), "HTML chart generated successfully")
    }

    /// Draw on a fresh surface and encode it as PNG
    pub fn rasterize(&self, spec: &ChartSpecification) -> Result<Vec<u8>> {
        let mut surface = Surface::standard();
        self.engine.draw(&mut surface, spec)?;
        surface.encode_png()
    }

    fn render_raster(&self, spec: &ChartSpecification, save_to_file: bool) -> Result<RenderResult> {
        let png = self.rasterize(spec)?;

        if !save_to_file {
            info!("generated {} chart ({} bytes)", spec.kind(), png.len());
            return Ok(RenderResult::success(
                Artifact::Binary(png),
                "Chart generated successfully",
            ));
        }

        let uri = persist::save_png(&self.config.output_dir, &png)?.to_string();
        info!("saved {} chart to {uri}", spec.kind());
        Ok(RenderResult::success(
            Artifact::FileReference(uri.clone()),
            format!("Chart saved to {uri}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and paints nothing
    #[derive(Default)]
    struct RecordingEngine {
        calls: AtomicUsize,
    }

    impl RenderingEngine for RecordingEngine {
        fn draw(&self, _surface: &mut Surface, _spec: &ChartSpecification) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Rejects every chart
    struct FailingEngine;

    impl RenderingEngine for FailingEngine {
        fn draw(&self, _surface: &mut Surface, _spec: &ChartSpecification) -> Result<()> {
            Err(Error::RenderError("point 0 has no x".into()))
        }
    }

    fn renderer<E: RenderingEngine>(engine: E) -> ChartRenderer<E> {
        ChartRenderer::new(engine, RendererConfig::default())
    }

    fn bar() -> Value {
        json!({ "type": "bar", "data": { "labels": ["A", "B"], "datasets": [{ "label": "x", "data": [1, 2] }] } })
    }

    #[test]
    fn invalid_specs_never_reach_the_engine() {
        let r = renderer(RecordingEngine::default());
        let bad = [
            json!(null),
            json!({ "type": "unsupported", "data": { "datasets": [{}] } }),
            json!({ "type": "bar", "data": null }),
            json!({ "type": "bar", "data": { "datasets": {} } }),
            json!({ "type": "bar", "data": { "datasets": [] } }),
        ];
        for spec in bad {
            for mode in [OutputMode::Raster, OutputMode::Markup] {
                for save in [false, true] {
                    assert!(!r.render(spec.clone(), mode, save).is_success());
                }
            }
        }
        assert_eq!(r.engine().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_datasets_failure_shape() {
        let r = renderer(RecordingEngine::default());
        match r.render(json!({ "type": "bar", "data": { "datasets": [] } }), OutputMode::Raster, false) {
            RenderResult::Failure { error_detail, message } => {
                assert!(error_detail.contains("at least one dataset"));
                assert_eq!(message, format!("{FAILURE_PREFIX}{error_detail}"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn raster_inline_returns_png() {
        let r = renderer(RecordingEngine::default());
        let result = r.render(bar(), OutputMode::Raster, false);
        assert_eq!(result.message(), "Chart generated successfully");
        match result.artifact() {
            Some(Artifact::Binary(png)) => assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]),
            other => panic!("expected binary artifact, got {other:?}"),
        }
        assert_eq!(r.engine().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn markup_skips_the_engine() {
        let r = renderer(RecordingEngine::default());
        let result = r.render(bar(), OutputMode::Markup, true);
        assert_eq!(result.message(), "HTML chart generated successfully");
        assert!(matches!(result.artifact(), Some(Artifact::Markup(_))));
        assert_eq!(r.engine().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn engine_errors_become_failures() {
        let r = renderer(FailingEngine);
        match r.render(bar(), OutputMode::Raster, false) {
            RenderResult::Failure { error_detail, message } => {
                assert_eq!(error_detail, "point 0 has no x");
                assert_eq!(message, "Error generating chart: point 0 has no x");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn saved_raster_matches_inline_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RendererConfig {
            output_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };
        let r = ChartRenderer::new(RecordingEngine::default(), config);

        let inline = match r.render(bar(), OutputMode::Raster, false) {
            RenderResult::Success { artifact: Artifact::Binary(b), .. } => b,
            other => panic!("unexpected {other:?}"),
        };
        let result = r.render(bar(), OutputMode::Raster, true);
        let Some(Artifact::FileReference(uri)) = result.artifact() else {
            panic!("expected file reference, got {result:?}");
        };
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with(".png"));
        assert_eq!(result.message(), format!("Chart saved to {uri}"));

        let path = url::Url::parse(uri).unwrap().to_file_path().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), inline);
    }

    #[test]
    fn output_mode_accepts_aliases() {
        let parse = |s: &str| serde_json::from_value::<OutputMode>(json!(s)).unwrap();
        assert_eq!(parse("raster"), OutputMode::Raster);
        assert_eq!(parse("png"), OutputMode::Raster);
        assert_eq!(parse("markup"), OutputMode::Markup);
        assert_eq!(parse("html"), OutputMode::Markup);
        assert!(serde_json::from_value::<OutputMode>(json!("svg")).is_err());
    }
}
