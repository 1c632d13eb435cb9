//! CLI bootstrap - wire settings, logging, runtime and host together.
//!
//! `CliContext` owns everything a run needs: the controller, the host it talks
//! to, the provider registry and the runtime event receiver.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::controller::FrameController;
use crate::discovery::ProviderStore;
use crate::host::{FrameHost, Scenario, SessionContext, SimulatedHost, WireHost};
use crate::runtime::{ChannelRuntime, FrameRuntime, RuntimeEvent};
use crate::settings::{resolve_title, FrameSettings, SettingsManager};
use crate::view::FrameOptions;

use super::args::Args;
use super::output::OutputOptions;
use super::stdio::StdioTransport;

/// The host side of a CLI run.
pub enum HostSession {
    /// Scripted host replaying a scenario
    Simulated {
        host: Arc<SimulatedHost>,
        scenario: Scenario,
    },
    /// Real host on the other end of stdin/stdout
    Stdio {
        host: Arc<WireHost>,
        transport: StdioTransport,
    },
}

/// Context for CLI execution containing all initialized services.
pub struct CliContext {
    /// Runtime abstraction for event emission
    pub runtime: Arc<dyn FrameRuntime>,

    /// Event receiver for output handling, taken by the runner
    pub event_rx: Option<mpsc::UnboundedReceiver<RuntimeEvent>>,

    pub controller: FrameController,

    pub session: HostSession,

    /// Wallet providers announced during the run
    pub providers: Arc<ProviderStore>,

    /// Whether the controller subscribed to `providers`
    pub discovery_enabled: bool,

    pub settings_manager: Arc<SettingsManager>,

    /// Command-line arguments
    pub args: Args,
}

impl CliContext {
    pub fn output_options(&self) -> OutputOptions {
        let stderr = matches!(self.session, HostSession::Stdio { .. });
        OutputOptions {
            json: self.args.json,
            quiet: self.args.quiet,
            stderr,
            color: self.runtime.is_interactive() && !self.args.json && !stderr,
        }
    }

    /// Graceful shutdown - release host listeners, close channels.
    pub async fn shutdown(self) -> Result<()> {
        self.controller.teardown();

        if let HostSession::Stdio { transport, .. } = &self.session {
            transport.stop();
        }

        if let Err(e) = self.runtime.shutdown().await {
            tracing::warn!("Runtime shutdown error: {}", e);
        }

        Ok(())
    }
}

/// Initialize the CLI context.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        // Only warn on errors other than file not found
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("[cli] Failed to load .env file: {}", e);
        }
    }

    let settings_manager = Arc::new(
        SettingsManager::new()
            .await
            .context("Failed to initialize settings manager")?,
    );
    let settings = settings_manager.get().await;

    init_logging(args, &settings)?;

    // Ensure settings file exists (creates template on first run)
    if let Err(e) = settings_manager.ensure_settings_file().await {
        tracing::warn!("Failed to create settings template: {}", e);
    }

    let timeout = Duration::from_secs(
        args.timeout
            .unwrap_or(settings.host.request_timeout_secs),
    );
    let options = FrameOptions {
        title: resolve_title(args.title.as_deref(), &settings),
    };

    if args.verbose {
        eprintln!(
            "[cli] Settings loaded from {}",
            settings_manager.path().display()
        );
        eprintln!("[cli] Title: {}", options.title);
        eprintln!("[cli] Host timeout: {}s", timeout.as_secs());
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel::<RuntimeEvent>();
    let runtime: Arc<dyn FrameRuntime> = Arc::new(ChannelRuntime::new(
        event_tx,
        atty::is(atty::Stream::Stdout),
    ));

    let session = if args.stdio {
        let (host, transport) = StdioTransport::connect(timeout);
        HostSession::Stdio {
            host: Arc::new(host),
            transport,
        }
    } else {
        let scenario = load_scenario(args).await?;
        HostSession::Simulated {
            host: Arc::new(SimulatedHost::from_scenario(&scenario)),
            scenario,
        }
    };

    let host: Arc<dyn FrameHost> = match &session {
        HostSession::Simulated { host, .. } => host.clone(),
        HostSession::Stdio { host, .. } => host.clone(),
    };

    let providers = Arc::new(ProviderStore::new());
    let discovery_enabled = settings.discovery.enabled && !args.no_discovery;
    let controller = if discovery_enabled {
        FrameController::with_providers(host, runtime.clone(), options, providers.clone())
    } else {
        FrameController::new(host, runtime.clone(), options)
    };

    Ok(CliContext {
        runtime,
        event_rx: Some(event_rx),
        controller,
        session,
        providers,
        discovery_enabled,
        settings_manager,
        args: args.clone(),
    })
}

/// Logs go to stderr; stdout is reserved for output and the wire protocol.
fn init_logging(args: &Args, settings: &FrameSettings) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    let directive = format!("framepilot_lib={}", log_level)
        .parse::<tracing_subscriber::filter::Directive>()
        .with_context(|| format!("Invalid log level '{}'", log_level))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

async fn load_scenario(args: &Args) -> Result<Scenario> {
    let Some(path) = args.resolve_scenario()? else {
        tracing::info!("No scenario given, running the default session");
        return Ok(default_scenario());
    };

    match Scenario::load(&path).await {
        Ok(scenario) => Ok(scenario),
        Err(e) => {
            if args.json {
                println!("{}", serde_json::json!({ "type": "error", "error": &e }));
            }
            Err(e).with_context(|| format!("Failed to load scenario {}", path.display()))
        }
    }
}

/// A fresh frame that has not been added yet and whose add is confirmed.
fn default_scenario() -> Scenario {
    Scenario {
        context: Some(SessionContext::with_added(false)),
        confirm_add: true,
        ..Default::default()
    }
}
