// # oxm-probe - ad delivery probe
//
// Thin driver around oxm-core for checking a delivery server by hand or
// from CI. It loads ads with the real HTTP transport and logs every event.
// All lifecycle logic lives in oxm-core.
//
// ## Configuration
//
// Environment variables only:
//
// - `OXM_CONFIG_FILE`: JSON `AdConfig`; when set, the variables below that
//   describe the placement are ignored
// - `OXM_DOMAIN`: delivery server hostname (required without a file)
// - `OXM_ID_MODE`: `ad_unit` (default) or `ad_group`
// - `OXM_PORTRAIT_ID` / `OXM_LANDSCAPE_ID`: ids per orientation
// - `OXM_ORIENTATION`: `portrait` (default) or `landscape`
// - `OXM_SSL`: `true` to use https
// - `OXM_REFRESH_SECS`: banner refresh interval (default 30)
// - `OXM_FORMAT`: `banner` (default) or `interstitial`
// - `OXM_MAX_CYCLES`: stop after this many completed requests
// - `OXM_TIMEOUT_SECS`: per-request timeout (default 10)
// - `OXM_CONSOLE`: `true` to mirror logs into the debug console and dump
//   it on exit
// - `OXM_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export OXM_DOMAIN=ads.example.com
// export OXM_PORTRAIT_ID=538176
// export OXM_MAX_CYCLES=3
// export OXM_REFRESH_SECS=5
//
// oxm-probe
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::layer::SubscriberExt;

use oxm_core::{
    AdConfig, AdDelegate, AdEvent, BannerController, ConsoleLayer, DebugConsole,
    InterstitialController, Orientation,
};
use oxm_transport_http::HttpTransport;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
/// - 3: Every request failed
#[derive(Debug, Clone, Copy)]
enum ProbeExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
    NoAdsDelivered = 3,
}

impl From<ProbeExitCode> for ExitCode {
    fn from(code: ProbeExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Banner,
    Interstitial,
}

/// Application configuration
struct Config {
    config_file: Option<String>,
    domain: String,
    id_mode: String,
    portrait_id: String,
    landscape_id: String,
    orientation: String,
    ssl: bool,
    refresh_secs: f64,
    format: String,
    max_cycles: Option<usize>,
    timeout_secs: u64,
    console: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            config_file: env::var("OXM_CONFIG_FILE").ok(),
            domain: env::var("OXM_DOMAIN").unwrap_or_default(),
            id_mode: env::var("OXM_ID_MODE").unwrap_or_else(|_| "ad_unit".to_string()),
            portrait_id: env::var("OXM_PORTRAIT_ID").unwrap_or_default(),
            landscape_id: env::var("OXM_LANDSCAPE_ID").unwrap_or_default(),
            orientation: env::var("OXM_ORIENTATION").unwrap_or_else(|_| "portrait".to_string()),
            ssl: env_flag("OXM_SSL")?,
            refresh_secs: match env::var("OXM_REFRESH_SECS") {
                Ok(s) => s
                    .parse()
                    .with_context(|| format!("OXM_REFRESH_SECS is not a number: {}", s))?,
                Err(_) => 30.0,
            },
            format: env::var("OXM_FORMAT").unwrap_or_else(|_| "banner".to_string()),
            max_cycles: match env::var("OXM_MAX_CYCLES") {
                Ok(s) => Some(
                    s.parse()
                        .with_context(|| format!("OXM_MAX_CYCLES is not a count: {}", s))?,
                ),
                Err(_) => None,
            },
            timeout_secs: match env::var("OXM_TIMEOUT_SECS") {
                Ok(s) => s
                    .parse()
                    .with_context(|| format!("OXM_TIMEOUT_SECS is not a number: {}", s))?,
                Err(_) => 10,
            },
            console: env_flag("OXM_CONSOLE")?,
            log_level: env::var("OXM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.config_file.is_none() && self.domain.trim().is_empty() {
            anyhow::bail!(
                "OXM_DOMAIN is required. \
                Set it via: export OXM_DOMAIN=ads.example.com"
            );
        }

        match self.id_mode.as_str() {
            "ad_unit" | "ad_group" => {}
            _ => anyhow::bail!(
                "OXM_ID_MODE '{}' is not supported. Supported modes: ad_unit, ad_group",
                self.id_mode
            ),
        }

        self.format()?;
        self.orientation()?;

        if self.config_file.is_none()
            && self.portrait_id.is_empty()
            && self.landscape_id.is_empty()
        {
            anyhow::bail!("Set OXM_PORTRAIT_ID, OXM_LANDSCAPE_ID or both");
        }

        if self.max_cycles == Some(0) {
            anyhow::bail!("OXM_MAX_CYCLES must be at least 1");
        }

        if !(1..=120).contains(&self.timeout_secs) {
            anyhow::bail!(
                "OXM_TIMEOUT_SECS must be between 1 and 120 seconds. Got: {}",
                self.timeout_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "OXM_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn format(&self) -> Result<Format> {
        match self.format.as_str() {
            "banner" => Ok(Format::Banner),
            "interstitial" => Ok(Format::Interstitial),
            other => anyhow::bail!(
                "OXM_FORMAT '{}' is not supported. Supported formats: banner, interstitial",
                other
            ),
        }
    }

    fn orientation(&self) -> Result<Orientation> {
        match self.orientation.as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::LandscapeLeft),
            other => anyhow::bail!(
                "OXM_ORIENTATION '{}' is not supported. Use portrait or landscape",
                other
            ),
        }
    }

    /// Build the core configuration, from file or from variables
    fn ad_config(&self) -> Result<AdConfig> {
        let config = match &self.config_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read OXM_CONFIG_FILE {}", path))?;
                AdConfig::from_json(&raw)
                    .with_context(|| format!("Invalid ad configuration in {}", path))?
            }
            None => {
                let base = if self.id_mode == "ad_group" {
                    AdConfig::with_ad_groups(&self.domain, &self.portrait_id, &self.landscape_id)
                } else {
                    AdConfig::with_ad_units(&self.domain, &self.portrait_id, &self.landscape_id)
                };
                base.ssl(self.ssl).refresh_interval(self.refresh_secs)
            }
        };

        config.validate()?;
        Ok(config)
    }
}

fn env_flag(name: &str) -> Result<bool> {
    match env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            _ => anyhow::bail!("{} must be true or false. Got: {}", name, v),
        },
        Err(_) => Ok(false),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ProbeExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return ProbeExitCode::ConfigError.into();
    }

    let ad_config = match config.ad_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return ProbeExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let console = DebugConsole::shared();
    if config.console {
        console.enable();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish()
        .with(ConsoleLayer::new(console.clone()));

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ProbeExitCode::ConfigError.into();
    }

    info!("Starting oxm-probe against {}", ad_config.domain);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ProbeExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_probe(&config, ad_config).await {
            Ok(tally) if tally.loaded == 0 && tally.failed > 0 => ProbeExitCode::NoAdsDelivered,
            Ok(_) => ProbeExitCode::CleanShutdown,
            Err(e) => {
                error!("Probe error: {:#}", e);
                ProbeExitCode::RuntimeError
            }
        }
    });

    if config.console {
        println!("{}", console.full_log());
    }

    code.into()
}

/// Outcome counters shared with the delegate
#[derive(Debug, Default)]
struct Tally {
    loaded: usize,
    failed: usize,
}

#[derive(Default)]
struct Counters {
    loaded: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn completed(&self) -> usize {
        self.loaded.load(Ordering::SeqCst) + self.failed.load(Ordering::SeqCst)
    }

    fn tally(&self) -> Tally {
        Tally {
            loaded: self.loaded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

fn logging_delegate(counters: Arc<Counters>) -> AdDelegate {
    AdDelegate::new().on_event(move |event| match event {
        AdEvent::DidLoad => {
            counters.loaded.fetch_add(1, Ordering::SeqCst);
            info!("Ad loaded");
        }
        AdEvent::DidFailToReceiveAd(err) => {
            counters.failed.fetch_add(1, Ordering::SeqCst);
            warn!("No ad: {} (code {})", err, err.code());
        }
        other => info!("Event: {:?}", other),
    })
}

/// Run the probe until the cycle limit or a shutdown signal
async fn run_probe(config: &Config, ad_config: AdConfig) -> Result<Tally> {
    let transport = Arc::new(HttpTransport::with_timeout(Duration::from_secs(
        config.timeout_secs,
    )));
    let counters = Arc::new(Counters::default());
    let orientation = config.orientation()?;

    match config.format()? {
        Format::Banner => {
            let mut banner = BannerController::new(ad_config, transport)?;
            banner.set_delegate(logging_delegate(counters.clone()));
            banner.set_orientation(orientation);
            banner.start_loading()?;

            let shutdown = wait_for_shutdown();
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = banner.pump() => {
                        if config.max_cycles.is_some_and(|max| counters.completed() >= max) {
                            info!("Cycle limit reached");
                            break;
                        }
                    }
                    signal = &mut shutdown => {
                        info!("Received shutdown signal: {}", signal?);
                        break;
                    }
                }
            }

            banner.stop_loading();
        }
        Format::Interstitial => {
            let mut interstitial = InterstitialController::new(ad_config, transport)?;
            interstitial.set_delegate(logging_delegate(counters.clone()));
            interstitial.set_orientation(orientation);

            let cycles = config.max_cycles.unwrap_or(1);
            for _ in 0..cycles {
                interstitial.load_ad()?;
                interstitial.pump().await;

                if let Some(shown) = interstitial.present_loaded_ad() {
                    info!(
                        "Presenting {} creative ({}x{})",
                        shown.creative.kind,
                        shown.creative.width.unwrap_or_default(),
                        shown.creative.height.unwrap_or_default()
                    );
                    interstitial.finish_presentation();
                }
            }
        }
    }

    info!("Shutting down probe");
    Ok(counters.tally())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
