//! CSS-ish colour parsing for dataset styling

use plotters::style::RGBAColor;
use serde_json::Value;

/// Default series colours, cycled by dataset (or slice) index
pub const DEFAULT_PALETTE: [(u8, u8, u8); 7] = [
    (54, 162, 235),
    (255, 99, 132),
    (255, 159, 64),
    (255, 205, 86),
    (75, 192, 192),
    (153, 102, 255),
    (201, 203, 207),
];

/// Palette colour for the given index at full opacity
pub fn palette(index: usize) -> RGBAColor {
    let (r, g, b) = DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()];
    RGBAColor(r, g, b, 1.0)
}

/// Parse a colour string: `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()`, or a
/// handful of named colours.
pub fn parse_color(s: &str) -> Option<RGBAColor> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = s.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_args(args);
    }
    named(&lower)
}

fn parse_hex(hex: &str) -> Option<RGBAColor> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
    match hex.len() {
        3 => Some(RGBAColor(nibble(0)?, nibble(1)?, nibble(2)?, 1.0)),
        6 => Some(RGBAColor(byte(0)?, byte(2)?, byte(4)?, 1.0)),
        8 => Some(RGBAColor(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            f64::from(byte(6)?) / 255.0,
        )),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<RGBAColor> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
    match parts.as_slice() {
        [r, g, b] => Some(RGBAColor(channel(r)?, channel(g)?, channel(b)?, 1.0)),
        [r, g, b, a] => {
            let alpha = a.parse::<f64>().ok()?.clamp(0.0, 1.0);
            Some(RGBAColor(channel(r)?, channel(g)?, channel(b)?, alpha))
        }
        _ => None,
    }
}

fn named(name: &str) -> Option<RGBAColor> {
    let (r, g, b) = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        "transparent" => return Some(RGBAColor(0, 0, 0, 0.0)),
        _ => return None,
    };
    Some(RGBAColor(r, g, b, 1.0))
}

/// Resolve a dataset colour property that may be a single string or an
/// array indexed by `item`. Falls back to the palette entry `fallback`.
pub fn color_at(value: Option<&Value>, item: usize, fallback: usize) -> RGBAColor {
    let candidate = match value {
        Some(Value::String(s)) => parse_color(s),
        Some(Value::Array(items)) if !items.is_empty() => items[item % items.len()]
            .as_str()
            .and_then(parse_color),
        _ => None,
    };
    candidate.unwrap_or_else(|| palette(fallback))
}

/// Same colour with its alpha multiplied by `factor`
pub fn faded(color: RGBAColor, factor: f64) -> RGBAColor {
    RGBAColor(color.0, color.1, color.2, color.3 * factor)
}
