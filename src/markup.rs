//! Embeddable HTML output
//!
//! Markup mode never rasterizes anything. The snippet carries the full
//! specification and lets Chart.js draw it in the consumer's browser, loading
//! the library from `library_url` first if the page does not already have it.
//! Whoever embeds the snippet needs network access to that URL.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::chart::ChartSpecification;
use crate::rendering::{SURFACE_HEIGHT, SURFACE_WIDTH};

/// Default client-side Chart.js bundle
pub const DEFAULT_LIBRARY_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js@4/dist/chart.umd.min.js";

/// Milliseconds since the Unix epoch
pub(crate) fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Short random hex token
pub(crate) fn random_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(8);
    token
}

/// A fresh mount-point identifier, `chart-<epoch-ms>-<token>`.
///
/// Uniqueness is best effort; two snippets on one page only clash if both the
/// millisecond and the token collide.
pub fn mount_id() -> String {
    format!("chart-{}-{}", epoch_millis(), random_token())
}

/// Serialize the chart configuration for inclusion inside a `<script>` element
fn script_safe_json(spec: &ChartSpecification) -> String {
    spec.to_json().replace("</", "<\\/")
}

/// Build the snippet for `spec`, mounting the chart on a canvas with id `id`.
pub fn render_snippet(spec: &ChartSpecification, id: &str, library_url: &str) -> String {
    let config = script_safe_json(spec);
    format!(
        r#"<div style="width: {width}px; height: {height}px;">
  <canvas id="{id}" width="{width}" height="{height}"></canvas>
</div>
<script>
(function () {{
  var config = {config};
  function draw() {{
    new window.Chart(document.getElementById("{id}"), config);
  }}
  if (typeof window.Chart === "undefined") {{
    var script = document.createElement("script");
    script.src = "{library_url}";
    script.onload = draw;
    document.head.appendChild(script);
  }} else {{
    draw();
  }}
}})();
</script>
"#,
        width = SURFACE_WIDTH,
        height = SURFACE_HEIGHT,
    )
}
