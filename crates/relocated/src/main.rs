// # relocated - change-of-address runner
//
// Thin command-line layer over relocate-core. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime and logging
// 3. Registering providers
// 4. Running one command and printing JSON to stdout
//
// All update, polling and provider logic lives in the library crates.
//
// ## Commands
//
// - `relocated services`: list registered providers
// - `relocated update <request.json>`: update every provider in a move
// - `relocated status <request.json>`: check one earlier update
//
// ## Configuration
//
// ### Browser automation
// - `RELOCATE_CDP_ENDPOINT`: Chrome DevTools endpoint (default http://127.0.0.1:9222)
// - `RELOCATE_HEADLESS`: true/false (default true), checked against the attached browser
// - `RELOCATE_SCREENSHOT_DIR`: where screenshots are written
// - `RELOCATE_SCREENSHOT_URL_PREFIX`: URL prefix returned for screenshots
//
// ### Status polling
// - `RELOCATE_POLL`: poll pending updates after `update` (default false)
// - `RELOCATE_POLL_INTERVAL_SECS`: seconds between polls (1-3600)
// - `RELOCATE_POLL_TIMEOUT_SECS`: give up after this many seconds (optional)
//
// ### Providers
// - `RELOCATE_PROVIDERS_FILE`: JSON catalog of generic api/manual providers
//
// ### Logging
// - `RELOCATE_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export RELOCATE_PROVIDERS_FILE=/etc/relocate/providers.json
// export RELOCATE_POLL=true
//
// relocated update move.json
// ```

use anyhow::{Context, Result};
use relocate_core::{
    MoveUpdateReport, MoveUpdateRequest, PollSnapshot, PollTarget, ProviderConfig,
    RelocateConfig, ServiceCredentials, ServiceRegistry, StatusPoller, UpdateEngine,
};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Command completed
/// - 1: Configuration or usage error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy)]
enum RelocateExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<RelocateExitCode> for ExitCode {
    fn from(code: RelocateExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

const USAGE: &str = "Usage: relocated <services | update <request.json> | status <request.json>>";

#[derive(Debug)]
enum Command {
    Services,
    Update(PathBuf),
    Status(PathBuf),
}

impl Command {
    fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let command = match (args.next().as_deref(), args.next()) {
            (Some("services"), None) => Command::Services,
            (Some("update"), Some(path)) => Command::Update(PathBuf::from(path)),
            (Some("status"), Some(path)) => Command::Status(PathBuf::from(path)),
            _ => anyhow::bail!("{}", USAGE),
        };
        if args.next().is_some() {
            anyhow::bail!("{}", USAGE);
        }
        Ok(command)
    }
}

/// `status` command input
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
    service_id: String,
    #[serde(default)]
    credentials: ServiceCredentials,
    reference: String,
}

/// Application configuration
struct Config {
    relocate: RelocateConfig,
    poll_after_update: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut relocate = RelocateConfig::new();

        if let Ok(endpoint) = env::var("RELOCATE_CDP_ENDPOINT") {
            relocate.automation.cdp_endpoint = endpoint;
        }
        if let Some(headless) = parse_var::<bool>("RELOCATE_HEADLESS")? {
            relocate.automation.headless = headless;
        }
        if let Ok(dir) = env::var("RELOCATE_SCREENSHOT_DIR") {
            relocate.automation.screenshot_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = env::var("RELOCATE_SCREENSHOT_URL_PREFIX") {
            relocate.automation.screenshot_url_prefix = prefix;
        }

        if let Some(interval) = parse_var::<u64>("RELOCATE_POLL_INTERVAL_SECS")? {
            if !(1..=3600).contains(&interval) {
                anyhow::bail!(
                    "RELOCATE_POLL_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                    interval
                );
            }
            relocate.polling.interval_ms = interval * 1000;
        }
        if let Some(timeout) = parse_var::<u64>("RELOCATE_POLL_TIMEOUT_SECS")? {
            if !(1..=86_400).contains(&timeout) {
                anyhow::bail!(
                    "RELOCATE_POLL_TIMEOUT_SECS must be between 1 and 86400 seconds. Got: {}",
                    timeout
                );
            }
            relocate.polling.timeout_secs = Some(timeout);
        }

        if let Ok(path) = env::var("RELOCATE_PROVIDERS_FILE") {
            relocate.providers = load_catalog(&path)?;
        }

        let log_level = env::var("RELOCATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        match log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "RELOCATE_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                log_level
            ),
        }

        relocate.validate()?;

        Ok(Self {
            relocate,
            poll_after_update: parse_var::<bool>("RELOCATE_POLL")?.unwrap_or(false),
            log_level,
        })
    }
}

/// Parse an optional environment variable
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

fn load_catalog(path: &str) -> Result<Vec<ProviderConfig>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read RELOCATE_PROVIDERS_FILE {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid provider catalog in {}", path))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid request in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> ExitCode {
    let command = match Command::from_args(env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return RelocateExitCode::ConfigError.into();
        }
    };

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return RelocateExitCode::ConfigError.into();
        }
    };

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays valid JSON
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RelocateExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RelocateExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let registry = match build_registry(&config.relocate) {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                error!("Provider registration failed: {:#}", e);
                return RelocateExitCode::ConfigError;
            }
        };

        match run(command, &config, registry).await {
            Ok(()) => RelocateExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                RelocateExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Register every built-in provider
fn build_registry(config: &RelocateConfig) -> Result<ServiceRegistry> {
    let registry = ServiceRegistry::new();

    #[cfg(feature = "british-gas")]
    {
        info!("Registering British Gas via {}", config.automation.cdp_endpoint);
        let engine = relocate_browser_cdp::CdpBrowserEngine::new(&config.automation.cdp_endpoint)?;
        relocate_provider_british_gas::register(&registry, Arc::new(engine), &config.automation)?;
    }

    #[cfg(feature = "generic")]
    relocate_provider_generic::register_catalog(&registry, &config.providers)?;

    #[cfg(not(feature = "generic"))]
    if !config.providers.is_empty() {
        warn!(
            "Ignoring {} catalog provider(s): built without the generic feature",
            config.providers.len()
        );
    }

    info!("{} provider(s) available", registry.list_services().len());
    Ok(registry)
}

async fn run(command: Command, config: &Config, registry: Arc<ServiceRegistry>) -> Result<()> {
    match command {
        Command::Services => print_json(&registry.get_available_services()),
        Command::Update(path) => {
            let request: MoveUpdateRequest = read_json(&path)?;
            run_update(config, registry, request).await
        }
        Command::Status(path) => {
            let request: StatusRequest = read_json(&path)?;
            let result = registry
                .check_update_status(&request.service_id, &request.credentials, &request.reference)
                .await?;
            print_json(&result)
        }
    }
}

async fn run_update(
    config: &Config,
    registry: Arc<ServiceRegistry>,
    request: MoveUpdateRequest,
) -> Result<()> {
    let (engine, mut events) = UpdateEngine::new(Arc::clone(&registry), &config.relocate.engine)?;

    let event_log = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    info!(
        "Updating {} service(s) for move {}",
        request.services.len(),
        request.move_id
    );
    let report = engine.update_move(&request).await;
    drop(engine);
    let _ = event_log.await;

    print_json(&report)?;

    if config.poll_after_update {
        let targets = poll_targets(&request, &report);
        if targets.is_empty() {
            info!("Nothing left to poll");
        } else {
            let last = poll_until_done(registry, targets, config).await?;
            print_json(&last)?;
        }
    }
    Ok(())
}

fn poll_targets(request: &MoveUpdateRequest, report: &MoveUpdateReport) -> Vec<PollTarget> {
    report
        .outcomes
        .iter()
        .filter(|outcome| !outcome.status.is_terminal())
        .filter_map(|outcome| {
            let credentials = request.credentials_for(&outcome.service_id)?.clone();
            PollTarget::from_outcome(outcome, credentials)
        })
        .collect()
}

async fn poll_until_done(
    registry: Arc<ServiceRegistry>,
    targets: Vec<PollTarget>,
    config: &Config,
) -> Result<PollSnapshot> {
    info!("Polling {} pending update(s)", targets.len());
    let handle = StatusPoller::start(registry, targets, &config.relocate.polling)?;
    let mut updates = handle.updates();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let last = loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Stopping status poll");
                break handle.cancel().await;
            }
            next = updates.next() => match next {
                Some(snapshot) if snapshot.finished.is_some() => break snapshot,
                Some(snapshot) => {
                    let progress = snapshot.progress();
                    info!(
                        "Poll round {}: {}% done ({} pending, {} failed)",
                        snapshot.round, progress.percentage, progress.pending, progress.failed
                    );
                }
                None => break handle.wait().await,
            },
        }
    };

    if let Some(stop) = last.finished {
        info!("Status poll ended: {:?}", stop);
    }
    Ok(last)
}
