//! Bar, line, scatter and bubble drawers

use std::iter;
use std::ops::Range;

use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use serde_json::Value;

use super::palette::{color_at, faded, palette};
use super::scale::{axis_range, extent};
use super::surface::Root;
use super::{draw_err, number_option, text_supported, FONT_FAMILY};
use crate::chart::{ChartSpecification, DataPoint, Dataset};
use crate::Result;

type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Grid line colour
const GRID: RGBColor = RGBColor(230, 230, 230);

fn build_chart<'a, 'b>(
    root: &'a Root<'b>,
    spec: &ChartSpecification,
    x: Range<f64>,
    y: Range<f64>,
    categories: &[String],
) -> Result<Chart<'a, 'b>> {
    let text = text_supported();
    let mut builder = ChartBuilder::on(root);
    builder.margin(20).x_label_area_size(40).y_label_area_size(50);
    if let Some(title) = spec.title().filter(|_| text) {
        builder.caption(title, (FONT_FAMILY, 24));
    }
    let mut chart = builder
        .build_cartesian_2d(x.clone(), y.clone())
        .map_err(draw_err)?;

    if !text {
        draw_plain_grid(&mut chart, x, y)?;
        return Ok(chart);
    }

    let label_for = |v: &f64| {
        let idx = v.round();
        if idx >= 0.0 && (idx - v).abs() < f64::EPSILON {
            categories.get(idx as usize).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };
    {
        let mut mesh = chart.configure_mesh();
        mesh.light_line_style(GRID).bold_line_style(GRID).y_labels(10);
        if !categories.is_empty() {
            mesh.x_labels(categories.len().min(50)).x_label_formatter(&label_for);
        }
        mesh.draw().map_err(draw_err)?;
    }
    Ok(chart)
}

/// Grid lines and axes without any labels
fn draw_plain_grid(chart: &mut Chart<'_, '_>, x: Range<f64>, y: Range<f64>) -> Result<()> {
    const LINES: u32 = 10;
    let at = |r: &Range<f64>, i: u32| r.start + (r.end - r.start) * f64::from(i) / f64::from(LINES);
    for i in 0..=LINES {
        let (gx, gy) = (at(&x, i), at(&y, i));
        chart
            .draw_series(iter::once(PathElement::new(vec![(gx, y.start), (gx, y.end)], GRID)))
            .map_err(draw_err)?;
        chart
            .draw_series(iter::once(PathElement::new(vec![(x.start, gy), (x.end, gy)], GRID)))
            .map_err(draw_err)?;
    }
    chart
        .draw_series(iter::once(PathElement::new(
            vec![(x.start, y.end), (x.start, y.start), (x.end, y.start)],
            BLACK,
        )))
        .map_err(draw_err)?;
    Ok(())
}

fn collect<'a, F>(spec: &'a ChartSpecification, points: F) -> Result<Vec<(Dataset<'a>, Vec<DataPoint>)>>
where
    F: Fn(&Dataset<'a>) -> Result<Vec<DataPoint>>,
{
    spec.datasets()
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let ds = Dataset::from_value(i, raw)?;
            let pts = points(&ds)?;
            Ok((ds, pts))
        })
        .collect()
}

/// Background colour of item `item` in dataset `ds`, or the faded palette
/// colour for the dataset when none is set.
fn fill_color(ds: &Dataset<'_>, item: usize, alpha: f64) -> RGBAColor {
    match ds.get("backgroundColor") {
        Some(value) => color_at(Some(value), item, ds.index()),
        None => faded(palette(ds.index()), alpha),
    }
}

fn border_color(ds: &Dataset<'_>, item: usize) -> RGBAColor {
    color_at(ds.get("borderColor"), item, ds.index())
}

fn border_width(ds: &Dataset<'_>, default: u32) -> u32 {
    number_option(ds.get("borderWidth")).map_or(default, |w| w.clamp(0.0, 50.0) as u32)
}

fn point_radius(ds: &Dataset<'_>, default: u32) -> u32 {
    number_option(ds.get("pointRadius")).map_or(default, |r| r.clamp(0.0, 50.0) as u32)
}

fn category_count(labels: &[String], series: &[(Dataset<'_>, Vec<DataPoint>)]) -> usize {
    series
        .iter()
        .map(|(_, pts)| pts.len())
        .chain(iter::once(labels.len()))
        .max()
        .unwrap_or(0)
        .max(1)
}

pub fn draw_bar(root: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    let labels = spec.labels();
    let series = collect(spec, |ds| ds.category_points())?;
    let categories = category_count(&labels, &series);

    let values = extent(series.iter().flat_map(|(_, p)| p.iter().filter_map(DataPoint::value)));
    let y = axis_range(spec, "y", values, true)?;
    let mut chart = build_chart(root, spec, 0.0..categories as f64, y.clone(), &labels)?;

    let baseline = 0.0_f64.clamp(y.start, y.end);
    let slot_width = 0.8 / series.len() as f64;
    for (slot, (ds, points)) in series.iter().enumerate() {
        let bars: Vec<(usize, f64, f64)> = points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let v = p.value()?.clamp(y.start, y.end);
                let x0 = i as f64 + 0.1 + slot as f64 * slot_width;
                Some((i, x0, v))
            })
            .collect();

        chart
            .draw_series(bars.iter().map(|&(i, x0, v)| {
                Rectangle::new([(x0, baseline), (x0 + slot_width, v)], fill_color(ds, i, 0.5).filled())
            }))
            .map_err(draw_err)?;

        let width = border_width(ds, 1);
        if width > 0 {
            chart
                .draw_series(bars.iter().map(|&(i, x0, v)| {
                    Rectangle::new(
                        [(x0, baseline), (x0 + slot_width, v)],
                        border_color(ds, i).stroke_width(width),
                    )
                }))
                .map_err(draw_err)?;
        }
    }
    Ok(())
}

/// Split a series at gaps into runs of drawable `(x, y)` points
fn runs(points: &[DataPoint]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (i, p) in points.iter().enumerate() {
        match p.value() {
            Some(v) => current.push((i as f64, v)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn fills_area(ds: &Dataset<'_>) -> bool {
    match ds.get("fill") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.as_str(), "origin" | "start" | "end"),
        _ => false,
    }
}

pub fn draw_line(root: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    let labels = spec.labels();
    let series = collect(spec, |ds| ds.category_points())?;
    let categories = category_count(&labels, &series);

    let values = extent(series.iter().flat_map(|(_, p)| p.iter().filter_map(DataPoint::value)));
    let y = axis_range(spec, "y", values, false)?;
    let x = 0.0..(categories.saturating_sub(1).max(1)) as f64;
    let mut chart = build_chart(root, spec, x, y.clone(), &labels)?;

    let baseline = 0.0_f64.clamp(y.start, y.end);
    for (ds, points) in &series {
        let color = border_color(ds, 0);
        let width = border_width(ds, 2);
        for run in runs(points) {
            if fills_area(ds) {
                chart
                    .draw_series(AreaSeries::new(
                        run.iter().copied(),
                        baseline,
                        fill_color(ds, 0, 0.2).filled(),
                    ))
                    .map_err(draw_err)?;
            }
            if width > 0 {
                chart
                    .draw_series(LineSeries::new(run.iter().copied(), color.stroke_width(width)))
                    .map_err(draw_err)?;
            }
            let radius = point_radius(ds, 3);
            if radius > 0 {
                chart
                    .draw_series(run.iter().map(|&p| Circle::new(p, radius, color.filled())))
                    .map_err(draw_err)?;
            }
        }
    }
    Ok(())
}

fn xy_extents(series: &[(Dataset<'_>, Vec<DataPoint>)]) -> (Option<(f64, f64)>, Option<(f64, f64)>) {
    let coords = || {
        series.iter().flat_map(|(_, pts)| {
            pts.iter().filter_map(|p| match *p {
                DataPoint::Xy { x, y } | DataPoint::Bubble { x, y, .. } => Some((x, y)),
                _ => None,
            })
        })
    };
    (extent(coords().map(|c| c.0)), extent(coords().map(|c| c.1)))
}

pub fn draw_scatter(root: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    let series = collect(spec, |ds| ds.xy_points())?;
    let (xs, ys) = xy_extents(&series);
    let x = axis_range(spec, "x", xs, false)?;
    let y = axis_range(spec, "y", ys, false)?;
    let mut chart = build_chart(root, spec, x, y, &[])?;

    for (ds, points) in &series {
        let radius = point_radius(ds, 4);
        let fill = fill_color(ds, 0, 0.8);
        chart
            .draw_series(points.iter().filter_map(|p| match *p {
                DataPoint::Xy { x, y } => Some(Circle::new((x, y), radius, fill.filled())),
                _ => None,
            }))
            .map_err(draw_err)?;
    }
    Ok(())
}

pub fn draw_bubble(root: &Root<'_>, spec: &ChartSpecification) -> Result<()> {
    let series = collect(spec, |ds| ds.bubble_points())?;
    let (xs, ys) = xy_extents(&series);
    let x = axis_range(spec, "x", xs, false)?;
    let y = axis_range(spec, "y", ys, false)?;
    let mut chart = build_chart(root, spec, x, y, &[])?;

    for (ds, points) in &series {
        let bubbles: Vec<((f64, f64), u32, usize)> = points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| match *p {
                DataPoint::Bubble { x, y, r } => Some(((x, y), r.clamp(0.0, 200.0).round() as u32, i)),
                _ => None,
            })
            .collect();
        chart
            .draw_series(
                bubbles
                    .iter()
                    .map(|&(c, r, i)| Circle::new(c, r, fill_color(ds, i, 0.5).filled())),
            )
            .map_err(draw_err)?;
        let width = border_width(ds, 1);
        if width > 0 {
            chart
                .draw_series(
                    bubbles
                        .iter()
                        .map(|&(c, r, i)| Circle::new(c, r, border_color(ds, i).stroke_width(width))),
                )
                .map_err(draw_err)?;
        }
    }
    Ok(())
}
