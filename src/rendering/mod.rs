//! Rendering engine
//!
//! The [`RenderingEngine`] trait is the seam between the orchestrator and
//! whatever actually puts pixels on a [`Surface`]. The built-in
//! [`PlottersEngine`] keeps one drawer per chart kind in a registry that is
//! built once per process by [`engine`].

pub mod cartesian;
pub mod palette;
pub mod radial;
pub mod scale;
pub mod surface;

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};
use plotters::prelude::*;
use serde_json::Value;

use crate::chart::{ChartKind, ChartSpecification};
use crate::{Error, Result};

pub use surface::{Root, Surface, SURFACE_HEIGHT, SURFACE_WIDTH};

/// Something that can draw a chart specification onto a surface.
///
/// Implementations report malformed per-kind data as [`Error::RenderError`];
/// they must not panic on caller input.
pub trait RenderingEngine: Send + Sync {
    /// Draw `spec` onto `surface`
    fn draw(&self, surface: &mut Surface, spec: &ChartSpecification) -> Result<()>;
}

impl<T: RenderingEngine + ?Sized> RenderingEngine for &T {
    fn draw(&self, surface: &mut Surface, spec: &ChartSpecification) -> Result<()> {
        (**self).draw(surface, spec)
    }
}

impl<T: RenderingEngine + ?Sized> RenderingEngine for Arc<T> {
    fn draw(&self, surface: &mut Surface, spec: &ChartSpecification) -> Result<()> {
        (**self).draw(surface, spec)
    }
}

/// Draws one chart kind onto a drawing area
pub type Drawer = fn(&Root<'_>, &ChartSpecification) -> Result<()>;

/// Plotters-backed engine with a per-kind drawer registry
#[derive(Default)]
pub struct PlottersEngine {
    drawers: HashMap<ChartKind, Drawer>,
}

impl PlottersEngine {
    /// An engine with no drawers registered
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine with drawers for every supported kind
    pub fn with_default_drawers() -> Self {
        let mut engine = Self::new();
        engine
            .register(ChartKind::Bar, cartesian::draw_bar)
            .register(ChartKind::Line, cartesian::draw_line)
            .register(ChartKind::Scatter, cartesian::draw_scatter)
            .register(ChartKind::Bubble, cartesian::draw_bubble)
            .register(ChartKind::Pie, radial::draw_pie)
            .register(ChartKind::Doughnut, radial::draw_doughnut)
            .register(ChartKind::PolarArea, radial::draw_polar_area)
            .register(ChartKind::Radar, radial::draw_radar);
        engine
    }

    /// Register (or replace) the drawer for `kind`
    pub fn register(&mut self, kind: ChartKind, drawer: Drawer) -> &mut Self {
        self.drawers.insert(kind, drawer);
        self
    }

    pub fn supports(&self, kind: ChartKind) -> bool {
        self.drawers.contains_key(&kind)
    }
}

impl RenderingEngine for PlottersEngine {
    fn draw(&self, surface: &mut Surface, spec: &ChartSpecification) -> Result<()> {
        let drawer = self.drawers.get(&spec.kind()).ok_or_else(|| {
            Error::RenderError(format!("no renderer registered for chart type {}", spec.kind()))
        })?;

        debug!(
            "drawing {} chart with {} dataset(s) on {}x{} surface",
            spec.kind(),
            spec.datasets().len(),
            surface.width(),
            surface.height()
        );

        let root = surface.drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        // plotters asserts on some degenerate geometry; keep that inside the result
        panic::catch_unwind(AssertUnwindSafe(|| drawer(&root, spec)))
            .map_err(|payload| {
                Error::RenderError(format!(
                    "{} chart could not be drawn: {}",
                    spec.kind(),
                    panic_message(payload.as_ref())
                ))
            })??;
        root.present().map_err(draw_err)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "drawing backend panicked".to_string()
    }
}

/// Font used for titles and axis labels
pub(crate) const FONT_FAMILY: &str = "sans-serif";

static TEXT: OnceLock<bool> = OnceLock::new();

/// Whether the font backend can lay out text on this machine.
///
/// Checked once. Without a usable font, charts are drawn without titles and
/// axis labels instead of failing.
pub(crate) fn text_supported() -> bool {
    *TEXT.get_or_init(|| {
        let laid_out = panic::catch_unwind(|| (FONT_FAMILY, 12).into_font().box_size("0.5").is_ok());
        let usable = matches!(laid_out, Ok(true));
        if !usable {
            warn!("no usable {FONT_FAMILY} font; charts will have no text");
        }
        usable
    })
}

static ENGINE: OnceLock<PlottersEngine> = OnceLock::new();

/// The process-wide engine, built on first use.
///
/// Later calls return the same instance without re-registering anything.
pub fn engine() -> &'static PlottersEngine {
    ENGINE.get_or_init(|| {
        let engine = PlottersEngine::with_default_drawers();
        info!("registered {} chart drawers", engine.drawers.len());
        engine
    })
}

/// Convert a plotters error into a render error
pub(crate) fn draw_err<E: Display>(err: E) -> Error {
    Error::RenderError(err.to_string())
}

/// Numeric dataset/option property, ignoring non-finite and non-numeric values
pub(crate) fn number_option(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}
