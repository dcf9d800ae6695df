//! ocr-overlay command line
//!
//! Opens pages in Chrome/Chromium and keeps OCR text overlays aligned with their images.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use ocr_overlay::discovery::{self, ScoreMode};
use ocr_overlay::notify::LogNotifier;
use ocr_overlay::overlay::MemorySurface;
use ocr_overlay::{BrowserSession, ConnectionOptions, ElementPath, JsonFilePreferences, LaunchOptions, LiveOverlay,
                  Orchestrator, OverlayConfig, OverlayEngine, PreferenceStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "ocr-overlay")]
#[command(version)]
#[command(about = "OCR text overlays for images on live web pages", long_about = None)]
struct Cli {
    #[command(flatten)]
    browser: BrowserArgs,

    /// OCR backend endpoint receiving raw image bytes
    #[arg(long, value_name = "URL", default_value = ocr_overlay::config::DEFAULT_SERVER_URL, global = true)]
    server_url: String,

    /// Minimum share of the viewport an image must cover
    #[arg(long, value_name = "RATIO", default_value_t = ocr_overlay::discovery::DEFAULT_MIN_AREA_RATIO, global = true)]
    min_area_ratio: f64,

    /// File holding the per-hostname auto mode preference
    #[arg(long, value_name = "PATH", default_value = "ocr-overlay-prefs.json", global = true)]
    prefs: PathBuf,

    /// Language tag set on overlay text
    #[arg(long, default_value = "ja", global = true)]
    lang: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct BrowserArgs {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H', global = true)]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH", global = true)]
    executable_path: Option<PathBuf>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR", global = true)]
    user_data_dir: Option<PathBuf>,

    /// WebSocket endpoint URL for remote browser connection
    #[arg(long, value_name = "URL", global = true)]
    ws_endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Open a page and keep overlays in sync until Ctrl-C
    Watch {
        url: String,

        /// Event polling interval in milliseconds
        #[arg(long, default_value_t = 250)]
        poll_ms: u64,
    },
    /// List image candidates on a page with their scores
    Candidates { url: String },
    /// Run OCR once for one image and print the recognized text
    Ocr {
        url: String,

        /// Element path of the image (default: the primary image)
        #[arg(long)]
        target: Option<String>,

        /// Print the raw OCR result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change auto mode for a hostname
    Auto {
        /// Hostname or page URL
        host: String,

        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        #[arg(long)]
        disable: bool,
    },
}

impl BrowserArgs {
    fn open(&self) -> anyhow::Result<BrowserSession> {
        let session = match &self.ws_endpoint {
            Some(ws) => {
                eprintln!("Connecting to {}", ws);
                BrowserSession::connect(ConnectionOptions::new(ws.clone()))?
            }
            None => {
                let mut options = LaunchOptions::new().headless(!self.headed);
                if let Some(path) = &self.executable_path {
                    options = options.chrome_path(path.clone());
                }
                if let Some(dir) = &self.user_data_dir {
                    options = options.user_data_dir(dir.clone());
                }
                BrowserSession::launch(options)?
            }
        };
        Ok(session)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = OverlayConfig::new()
        .server_url(&cli.server_url)?
        .min_area_ratio(cli.min_area_ratio)?
        .text_lang(cli.lang.clone())
        .preferences_path(cli.prefs.clone());

    match &cli.command {
        Command::Watch { url, poll_ms } => watch(&cli, config.poll_interval(Duration::from_millis(*poll_ms)), url).await,
        Command::Candidates { url } => candidates(&cli, &config, url),
        Command::Ocr { url, target, json } => ocr(&cli, config, url, target.as_deref(), *json).await,
        Command::Auto { host, enable, disable } => auto(&config, host, *enable, *disable),
    }
}

async fn watch(cli: &Cli, config: OverlayConfig, url: &str) -> anyhow::Result<()> {
    let session = cli.browser.open()?;
    session.navigate(url)?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    eprintln!("Watching {} (OCR backend: {})", url, config.server_url);
    eprintln!("Press Ctrl-C to stop");

    let mut live = LiveOverlay::from_config(session.tab()?, config)?;
    live.run(shutdown).await?;
    Ok(())
}

fn candidates(cli: &Cli, config: &OverlayConfig, url: &str) -> anyhow::Result<()> {
    let session = cli.browser.open()?;
    session.navigate(url)?;
    let doc = session.capture()?;

    let viewport_area = doc.viewport().area();
    let primary = discovery::select_primary(&doc, ScoreMode::VisibleArea, config.min_area_ratio);
    let manual = discovery::manual_candidates(&doc, config.min_area_ratio);

    println!("{:<3} {:<50} {:>11} {:>8}  SOURCE", "", "PATH", "RENDERED", "VISIBLE");
    for region in discovery::discover(&doc) {
        let marker = if primary.as_ref() == Some(&region.path) {
            "*"
        } else if manual.contains(&region.path) {
            "+"
        } else {
            ""
        };
        println!(
            "{:<3} {:<50} {:>5.0}x{:<5.0} {:>7.1}%  {}",
            marker,
            region.path,
            region.rendered.width,
            region.rendered.height,
            if viewport_area > 0.0 { region.visible_area * 100.0 / viewport_area } else { 0.0 },
            region.source.as_deref().unwrap_or("-")
        );
    }
    println!();
    println!("* primary image (auto mode)   + eligible for manual OCR");
    Ok(())
}

async fn ocr(cli: &Cli, config: OverlayConfig, url: &str, target: Option<&str>, json: bool) -> anyhow::Result<()> {
    let session = cli.browser.open()?;
    session.navigate(url)?;
    let doc = session.capture()?;

    let target = match target {
        Some(path) => ElementPath::from(path),
        None => discovery::select_primary(&doc, ScoreMode::VisibleArea, config.min_area_ratio)
            .context("No image covers enough of the viewport")?,
    };

    let orchestrator = Orchestrator::from_config(&config)?;
    let notifier = Arc::new(LogNotifier);
    let preferences = Box::new(JsonFilePreferences::open(&config.preferences_path)?);
    let mut engine = OverlayEngine::new(config, MemorySurface::new(), orchestrator, notifier, preferences);

    engine.trigger(&doc, &target)?;
    let attached = engine.settle(&doc).await;
    let Some(session_id) = attached.first() else {
        bail!("OCR failed for {}", target);
    };
    let Some(overlay) = engine.synchronizer().session(*session_id) else {
        bail!("Overlay for {} was not kept", target);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&overlay.result)?);
    } else {
        for block in &overlay.result.blocks {
            println!("{}\n", block.text());
        }
    }
    Ok(())
}

fn auto(config: &OverlayConfig, host: &str, enable: bool, disable: bool) -> anyhow::Result<()> {
    let hostname = url::Url::parse(host)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| host.to_string());

    let mut preferences = JsonFilePreferences::open(&config.preferences_path)?;
    if enable || disable {
        preferences.set_auto_mode(&hostname, enable)?;
    }

    let state = if preferences.auto_mode(&hostname)? { "enabled" } else { "disabled" };
    println!("Auto Mode {} for {}", state, hostname);
    Ok(())
}
