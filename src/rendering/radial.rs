//! Pie, doughnut, polar area and radar drawers
//!
//! These kinds have no cartesian grid, so they draw straight onto the root
//! area in pixel coordinates. Angles start at twelve o'clock and run clockwise.

use std::f64::consts::{PI, TAU};

use plotters::prelude::*;
use serde_json::Value;

use super::palette::{color_at, faded, palette};
use super::scale::{axis_range, extent};
use super::surface::Root;
use super::{draw_err, number_option, text_supported, FONT_FAMILY};
use crate::chart::{ChartSpecification, Dataset};
use crate::{Error, Result};

type Point = (i32, i32);

const START: f64 = -PI / 2.0;
const GRID: RGBColor = RGBColor(220, 220, 220);
const PADDING: i32 = 20;

fn arc(center: Point, radius: f64, from: f64, to: f64) -> Vec<Point> {
    let steps = ((to - from).abs() / (PI / 180.0)).ceil().max(1.0) as usize;
    (0..=steps)
        .map(|s| {
            let t = from + (to - from) * s as f64 / steps as f64;
            polar(center, radius, t)
        })
        .collect()
}

fn polar(center: Point, radius: f64, angle: f64) -> Point {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 + (radius * angle.sin()).round() as i32,
    )
}

/// Outline of an annular sector; with `inner == 0` it closes on the centre.
fn sector(center: Point, inner: f64, outer: f64, from: f64, to: f64) -> Vec<Point> {
    let mut points = arc(center, outer, from, to);
    if inner > 0.0 {
        points.extend(arc(center, inner, from, to).into_iter().rev());
    } else {
        points.push(center);
    }
    points
}

fn closed(mut points: Vec<Point>) -> Vec<Point> {
    if let Some(&first) = points.first() {
        points.push(first);
    }
    points
}

fn border_width(ds: &Dataset<'_>, default: u32) -> u32 {
    number_option(ds.get("borderWidth")).map_or(default, |w| w.clamp(0.0, 50.0) as u32)
}

/// Fraction of the radius cut out of the middle: `options.cutout` as a
/// percentage string or a pixel count.
fn cutout_ratio(spec: &ChartSpecification, radius: f64, default: f64) -> f64 {
    let ratio = match spec.option(&["cutout"]) {
        Some(Value::String(s)) => s
            .trim()
            .strip_suffix('%')
            .and_then(|p| p.trim().parse::<f64>().ok())
            .map(|p| p / 100.0),
        Some(v @ Value::Number(_)) => number_option(Some(v)).map(|px| px / radius),
        _ => None,
    };
    ratio.unwrap_or(default).clamp(0.0, 0.95)
}

fn datasets(spec: &ChartSpecification) -> Result<Vec<Dataset<'_>>> {
    spec.datasets()
        .iter()
        .enumerate()
        .map(|(i, raw)| Dataset::from_value(i, raw))
        .collect()
}

/// Centre and usable radius of `area`
fn geometry(area: &Root<'_>) -> (Point, f64) {
    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = (f64::from(w.min(h)) / 2.0 - f64::from(PADDING)).max(1.0);
    (center, radius)
}

/// Run `draw` on the area left after reserving room for the title, if any.
/// The title is dropped when no font is available.
fn with_title<F>(root: &Root<'_>, spec: &ChartSpecification, draw: F) -> Result<()>
where
    F: FnOnce(&Root<'_>) -> Result<()>,
{
    match spec.title().filter(|_| text_supported()) {
        Some(title) => {
            let area = root.titled(&title, (FONT_FAMILY, 24)).map_err(draw_err)?;
            draw(&area)
        }
        None => draw(root),
    }
}

fn draw_rings(area: &Root<'_>, spec: &ChartSpecification, default_cutout: f64) -> Result<()> {
    let (center, radius) = geometry(area);
    let sets = datasets(spec)?;
    let inner_edge = radius * cutout_ratio(spec, radius, default_cutout);
    let thickness = (radius - inner_edge) / sets.len() as f64;

    for (ring, ds) in sets.iter().enumerate() {
        let values = ds.proportion_values()?;
        let total: f64 = values.iter().sum();
        if !total.is_finite() {
            return Err(Error::RenderError(format!(
                "dataset {} values sum to more than can be plotted",
                ds.index()
            )));
        }
        if total <= 0.0 {
            continue;
        }
        let outer = radius - ring as f64 * thickness;
        let inner = outer - thickness;
        let width = border_width(ds, 2);

        let mut angle = START;
        for (i, v) in values.iter().enumerate() {
            if *v <= 0.0 {
                continue;
            }
            let sweep = TAU * v / total;
            let outline = sector(center, inner, outer, angle, angle + sweep);
            let fill = color_at(ds.get("backgroundColor"), i, i);
            area.draw(&Polygon::new(outline.clone(), fill.filled()))
                .map_err(draw_err)?;
            if width > 0 {
                let stroke = match ds.get("borderColor") {
                    Some(c) => color_at(Some(c), i, i),
                    None => RGBAColor(255, 255, 255, 1.0),
                };
                area.draw(&PathElement::new(closed(outline), stroke.stroke_width(width)))
                    .map_err(draw_err)?;
            }
            angle += sweep;
        }
    }
    Ok(())
}

pub fn draw_pie(root: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    with_title(root, spec, |area| draw_rings(area, spec, 0.0))
}

pub fn draw_doughnut(root: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    with_title(root, spec, |area| draw_rings(area, spec, 0.5))
}

pub fn draw_polar_area(root: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    with_title(root, spec, |area| polar_area(area, spec))
}

fn polar_area(area: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    let (center, radius) = geometry(area);
    let sets = datasets(spec)?;
    let all = sets
        .iter()
        .map(|ds| ds.proportion_values())
        .collect::<Result<Vec<_>>>()?;
    let max = all.iter().flatten().copied().fold(0.0_f64, f64::max);

    for level in 1..=5 {
        let r = (radius * f64::from(level) / 5.0).round() as i32;
        area.draw(&Circle::new(center, r, GRID.stroke_width(1)))
            .map_err(draw_err)?;
    }
    if max <= 0.0 {
        return Ok(());
    }

    for (ds, values) in sets.iter().zip(&all) {
        if values.is_empty() {
            continue;
        }
        let sweep = TAU / values.len() as f64;
        for (i, v) in values.iter().enumerate() {
            if *v <= 0.0 {
                continue;
            }
            let from = START + sweep * i as f64;
            let outline = sector(center, 0.0, radius * v / max, from, from + sweep);
            let fill = match ds.get("backgroundColor") {
                Some(c) => color_at(Some(c), i, i),
                None => faded(palette(i), 0.5),
            };
            area.draw(&Polygon::new(outline.clone(), fill.filled()))
                .map_err(draw_err)?;
            let width = border_width(ds, 1);
            if width > 0 {
                area.draw(&PathElement::new(closed(outline), WHITE.stroke_width(width)))
                    .map_err(draw_err)?;
            }
        }
    }
    Ok(())
}

pub fn draw_radar(root: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    with_title(root, spec, |area| radar(area, spec))
}

fn radar(area: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    let (center, radius) = geometry(area);
    let sets = datasets(spec)?;
    let series = sets
        .iter()
        .map(|ds| ds.category_points())
        .collect::<Result<Vec<_>>>()?;

    let spokes = series
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(spec.labels().len()))
        .max()
        .unwrap_or(0);
    if spokes == 0 {
        return Ok(());
    }
    let angle_of = |i: usize| START + TAU * i as f64 / spokes as f64;

    for level in 1..=5 {
        let r = radius * f64::from(level) / 5.0;
        let ring: Vec<Point> = (0..spokes).map(|i| polar(center, r, angle_of(i))).collect();
        area.draw(&PathElement::new(closed(ring), GRID.stroke_width(1)))
            .map_err(draw_err)?;
    }
    for i in 0..spokes {
        area.draw(&PathElement::new(
            vec![center, polar(center, radius, angle_of(i))],
            GRID.stroke_width(1),
        ))
        .map_err(draw_err)?;
    }

    let values = extent(series.iter().flatten().filter_map(|p| p.value()));
    let scale = axis_range(spec, "r", values, false)?;
    let span = scale.end - scale.start;

    for (ds, points) in sets.iter().zip(&series) {
        let vertices: Vec<Point> = points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let v = p.value()?.clamp(scale.start, scale.end);
                Some(polar(center, radius * (v - scale.start) / span, angle_of(i)))
            })
            .collect();
        if vertices.is_empty() {
            continue;
        }
        let line = color_at(ds.get("borderColor"), 0, ds.index());
        let fill = match ds.get("backgroundColor") {
            Some(c) => color_at(Some(c), 0, ds.index()),
            None => faded(palette(ds.index()), 0.2),
        };
        if vertices.len() >= 3 {
            area.draw(&Polygon::new(vertices.clone(), fill.filled()))
                .map_err(draw_err)?;
        }
        let width = border_width(ds, 2);
        if width > 0 {
            area.draw(&PathElement::new(closed(vertices.clone()), line.stroke_width(width)))
                .map_err(draw_err)?;
        }
        for v in vertices {
            area.draw(&Circle::new(v, 3, line.filled())).map_err(draw_err)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polar_starts_at_twelve_oclock() {
        assert_eq!(polar((100, 100), 50.0, START), (100, 50));
        assert_eq!(polar((100, 100), 50.0, 0.0), (150, 100));
    }

    #[test]
    fn pie_sector_closes_on_centre() {
        let pts = sector((0, 0), 0.0, 10.0, 0.0, PI / 2.0);
        assert_eq!(pts.first(), Some(&(10, 0)));
        assert_eq!(pts.last(), Some(&(0, 0)));
    }

    #[test]
    fn doughnut_sector_walks_back_along_inner_arc() {
        let pts = sector((0, 0), 5.0, 10.0, 0.0, PI / 2.0);
        assert_eq!(pts.first(), Some(&(10, 0)));
        assert_eq!(pts.last(), Some(&(5, 0)));
    }
}
