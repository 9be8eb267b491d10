//! Chart MCP
//!
//! Turns Chart.js v4 style chart configurations into PNG images, saved PNG
//! files, or embeddable HTML snippets, and exposes that as a `generateChart`
//! tool over the Model Context Protocol.
//!
//! # Pipeline
//!
//! - [`validate`]: shallow structural check of the untrusted configuration
//! - [`renderer::ChartRenderer`]: routes to markup or raster output and shapes
//!   every outcome into a [`RenderResult`]
//! - [`rendering`]: the [`RenderingEngine`] seam and the built-in plotters
//!   engine, drawing onto a fixed 800x600 surface
//! - [`persist`]: writes PNGs under the configured output directory
//! - [`mcp`]: the stdio tool host
//!
//! # Example
//!
//! ```no_run
//! use chart_mcp::{ChartRenderer, OutputMode, RendererConfig};
//! use serde_json::json;
//!
//! let renderer = ChartRenderer::new(chart_mcp::rendering::engine(), RendererConfig::default());
//! let result = renderer.render(
//!     json!({
//!         "type": "bar",
//!         "data": { "labels": ["A", "B"], "datasets": [{ "label": "x", "data": [1, 2] }] }
//!     }),
//!     OutputMode::Raster,
//!     false,
//! );
//! assert!(result.is_success());
//! ```

pub mod async_api;
pub mod chart;
pub mod error;
pub mod markup;
pub mod mcp;
pub mod persist;
pub mod renderer;
pub mod rendering;
pub mod validate;

pub use async_api::ChartService;
pub use chart::{ChartKind, ChartSpecification};
pub use error::{Error, Result};
pub use renderer::{Artifact, ChartRenderer, OutputMode, RenderResult, RendererConfig};
pub use rendering::{PlottersEngine, RenderingEngine, Surface};
pub use validate::{validate, ValidationOutcome};

/// A renderer backed by the process-wide plotters engine
pub fn new_renderer(config: RendererConfig) -> ChartRenderer<&'static PlottersEngine> {
    ChartRenderer::new(rendering::engine(), config)
}
