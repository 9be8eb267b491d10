use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chart_mcp::mcp::server::remediation_hint;
use chart_mcp::mcp::McpServer;
use chart_mcp::{Artifact, ChartService, OutputMode, RenderResult, RendererConfig};
use clap::{Parser, Subcommand};
use log::info;

/// How long shutdown waits on the blocking stdin reader
const STDIN_GRACE: Duration = Duration::from_millis(500);

/// Chart generation over the Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "chart-mcp", version, about)]
struct Cli {
    /// Directory saved PNGs are written to
    #[arg(long, global = true, env = "CHART_MCP_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Chart.js bundle loaded by HTML snippets
    #[arg(long, global = true, env = "CHART_MCP_LIBRARY_URL")]
    library_url: Option<String>,

    /// Log filter (e.g. `debug`, `chart_mcp=trace`); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server on stdin/stdout (default)
    Serve {
        /// Tokio worker threads
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Render one chart configuration file and exit
    Render {
        /// JSON file holding the chart configuration
        config: PathBuf,

        /// `raster` (PNG) or `markup` (HTML)
        #[arg(long, default_value = "raster", value_parser = parse_mode)]
        format: OutputMode,

        /// Write the output here instead of the output directory / stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn parse_mode(s: &str) -> Result<OutputMode, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown format '{s}', expected raster or markup"))
}

fn init_logging(level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    // stdout carries the protocol stream
    builder.target(env_logger::Target::Stderr).init();
}

fn renderer_config(cli: &Cli) -> RendererConfig {
    let mut config = RendererConfig::default();
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(url) = &cli.library_url {
        config.library_url = url.clone();
    }
    config
}

fn serve(config: RendererConfig, workers: Option<usize>) -> anyhow::Result<()> {
    let workers = workers.unwrap_or_else(num_cpus::get).max(1);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    info!(
        "chart-mcp {} serving on stdio ({workers} workers, output dir {})",
        env!("CARGO_PKG_VERSION"),
        config.output_dir.display()
    );

    let served = runtime.block_on(async {
        let service = ChartService::new(chart_mcp::new_renderer(config));
        McpServer::new(service).run_stdio().await
    });
    // a blocked stdin read would otherwise hold the process open after Ctrl-C
    runtime.shutdown_timeout(STDIN_GRACE);
    served?;

    info!("server stopped");
    Ok(())
}

fn render(
    config: RendererConfig,
    path: PathBuf,
    format: OutputMode,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let spec: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let renderer = chart_mcp::new_renderer(config);
    let save_to_file = out.is_none() && format == OutputMode::Raster;

    match renderer.render(spec, format, save_to_file) {
        RenderResult::Success { artifact, message } => {
            info!("{message}");
            match (artifact, out) {
                (Artifact::Binary(png), Some(out)) => fs::write(&out, png)
                    .with_context(|| format!("failed to write {}", out.display()))?,
                (Artifact::Markup(html), Some(out)) => fs::write(&out, html)
                    .with_context(|| format!("failed to write {}", out.display()))?,
                (Artifact::FileReference(uri), _) => println!("{uri}"),
                (Artifact::Markup(html), None) => print!("{html}"),
                (Artifact::Binary(_), None) => bail!("raster output needs --out or a save location"),
            }
            Ok(())
        }
        RenderResult::Failure { message, .. } => bail!("{message}\n\n{}", remediation_hint()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    let config = renderer_config(&cli);

    match cli.command {
        None => serve(config, None),
        Some(Command::Serve { workers }) => serve(config, workers),
        Some(Command::Render {
            config: path,
            format,
            out,
        }) => render(config, path, format, out),
    }
}
