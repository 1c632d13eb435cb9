//! CLI execution runner.
//!
//! Drives the controller through a scenario or a live stdio session.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::controller::{FrameController, LoadOutcome};
use crate::discovery::ProviderStore;
use crate::host::{HostEvent, ScenarioStep, SimulatedHost, WireHost};

use super::bootstrap::{CliContext, HostSession};
use super::output::{print_view, run_event_loop, OutputOptions};
use super::stdio::StdioTransport;

/// How long to wait for the discovery listener to catch up before teardown.
const DISCOVERY_SETTLE: Duration = Duration::from_millis(500);

/// Run whichever session `initialize` set up.
pub async fn run(ctx: &mut CliContext) -> Result<()> {
    let options = ctx.output_options();
    let output = spawn_output(ctx, options)?;

    match &mut ctx.session {
        HostSession::Simulated { host, scenario } => {
            let outcome = ctx.controller.load().await;
            tracing::debug!("Load finished: {:?}", outcome);

            if outcome == LoadOutcome::Loaded {
                for provider in &scenario.providers {
                    ctx.providers.announce(provider.clone());
                }
                host.flush();

                for step in &scenario.steps {
                    apply_step(&ctx.controller, host, &ctx.providers, step).await;
                }
                if ctx.discovery_enabled {
                    settle_discovery(&ctx.controller, &ctx.providers).await;
                }
            } else if !options.quiet && !options.json {
                eprintln!("[cli] Not running inside a frame host ({:?})", outcome);
            }
        }
        HostSession::Stdio { host, transport } => {
            // The host may never answer the bootstrap requests
            match load_until(&ctx.controller, session_ended(host, transport)).await {
                Some(outcome) => {
                    tracing::debug!("Load finished: {:?}", outcome);
                    session_ended(host, transport).await;
                }
                None => tracing::info!("Session ended before bootstrap finished"),
            }
        }
    }

    ctx.controller.teardown();
    wait_output(output).await;

    print_view(
        &ctx.controller.view(),
        OutputOptions {
            quiet: false,
            ..options
        },
    )
}

/// Bootstrap the controller unless `stop` resolves first.
async fn load_until(
    controller: &FrameController,
    stop: impl Future<Output = ()>,
) -> Option<LoadOutcome> {
    tokio::select! {
        outcome = controller.load() => Some(outcome),
        _ = stop => None,
    }
}

/// Resolves on Ctrl-C or once the host closes stdin.
async fn session_ended(host: &WireHost, transport: &mut StdioTransport) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, tearing down");
        }
        _ = transport.closed() => {
            tracing::info!("Host disconnected (closed: {})", host.is_closed());
        }
    }
}

fn spawn_output(ctx: &mut CliContext, options: OutputOptions) -> Result<JoinHandle<Result<()>>> {
    let event_rx = ctx
        .event_rx
        .take()
        .ok_or_else(|| anyhow::anyhow!("Event receiver already taken"))?;
    Ok(tokio::spawn(run_event_loop(event_rx, options)))
}

async fn wait_output(output: JoinHandle<Result<()>>) {
    match output.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!("Output handler error: {}", e);
        }
        Err(e) => {
            tracing::warn!("Output handler panicked: {}", e);
        }
    }
}

/// Replay one scenario step, then deliver whatever the host queued.
async fn apply_step(
    controller: &FrameController,
    host: &SimulatedHost,
    providers: &ProviderStore,
    step: &ScenarioStep,
) {
    tracing::debug!("Scenario step: {:?}", step);
    match step {
        ScenarioStep::Event { payload } => {
            dispatch(host, payload);
        }
        ScenarioStep::EnableNotifications => {
            let request = controller.request_enable_notifications().await;
            tracing::info!("Enable notifications: {:?}", request);
        }
        ScenarioStep::CheckNotifications => controller.check_notifications().await,
        ScenarioStep::AddFrame => controller.add_frame().await,
        ScenarioStep::Announce { provider } => {
            providers.announce(provider.clone());
        }
    }
    host.flush();
}

fn dispatch(host: &SimulatedHost, event: &HostEvent) {
    let delivered = host.dispatch(event);
    if delivered == 0 {
        tracing::warn!("No listener for {}", event.kind());
    }
}

/// Wait until every announced provider has been recorded, or give up.
async fn settle_discovery(controller: &FrameController, providers: &Arc<ProviderStore>) {
    let expected = providers.providers().len();
    if expected == 0 {
        return;
    }

    let waited = tokio::time::timeout(DISCOVERY_SETTLE, async {
        while controller.discovered_providers().len() < expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    if waited.is_err() {
        tracing::warn!(
            "Only {}/{} providers recorded before teardown",
            controller.discovered_providers().len(),
            expected
        );
    }
}
