use std::sync::Arc;

use log::error;
use serde_json::Value;

use crate::renderer::{ChartRenderer, OutputMode, RenderResult};
use crate::rendering::RenderingEngine;
use crate::Error;

/// An async-friendly handle around a [`ChartRenderer`].
///
/// Rasterizing and writing files are blocking operations, so each call runs on
/// tokio's blocking pool and the caller just awaits the result. Handles are
/// cheap to clone and share one renderer.
pub struct ChartService<E> {
    renderer: Arc<ChartRenderer<E>>,
}

impl<E> Clone for ChartService<E> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
        }
    }
}

impl<E: RenderingEngine + 'static> ChartService<E> {
    pub fn new(renderer: ChartRenderer<E>) -> Self {
        Self {
            renderer: Arc::new(renderer),
        }
    }

    /// The shared renderer
    pub fn renderer(&self) -> &ChartRenderer<E> {
        &self.renderer
    }

    /// Render `raw` off the async executor.
    ///
    /// A panicking or cancelled worker is reported as a failure result rather
    /// than propagated.
    pub async fn generate(&self, raw: Value, mode: OutputMode, save_to_file: bool) -> RenderResult {
        let renderer = Arc::clone(&self.renderer);
        let job = tokio::task::spawn_blocking(move || renderer.render(raw, mode, save_to_file));
        match job.await {
            Ok(result) => result,
            Err(e) => {
                error!("render worker failed: {e}");
                RenderResult::failure(&Error::RenderError(format!("render worker failed: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartSpecification;
    use crate::renderer::{Artifact, RendererConfig};
    use crate::rendering::Surface;
    use serde_json::json;

    struct PanickingEngine;

    impl RenderingEngine for PanickingEngine {
        fn draw(&self, _surface: &mut Surface, _spec: &ChartSpecification) -> crate::Result<()> {
            panic!("engine blew up");
        }
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_renderer() {
        let service = ChartService::new(ChartRenderer::new(
            crate::rendering::engine(),
            RendererConfig::default(),
        ));
        let spec = json!({ "type": "line", "data": { "labels": ["a", "b"], "datasets": [{ "data": [1, 3] }] } });

        let other = service.clone();
        let (a, b) = tokio::join!(
            service.generate(spec.clone(), OutputMode::Raster, false),
            other.generate(spec, OutputMode::Raster, false),
        );
        match (a.artifact(), b.artifact()) {
            (Some(Artifact::Binary(x)), Some(Artifact::Binary(y))) => assert_eq!(x, y),
            other => panic!("expected two images, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn worker_panic_becomes_failure() {
        let service = ChartService::new(ChartRenderer::new(PanickingEngine, RendererConfig::default()));
        let result = service
            .generate(
                json!({ "type": "bar", "data": { "datasets": [{ "data": [1] }] } }),
                OutputMode::Raster,
                false,
            )
            .await;
        assert!(!result.is_success());
        assert!(result.message().starts_with("Error generating chart: render worker failed"));
    }
}
