//! Wallet provider discovery.
//!
//! Injected wallets announce themselves (EIP-6963 style) to a registry; the
//! frame subscribes once during bootstrap and records whatever shows up. The
//! listener owns no state the rest of the controller depends on, it is an
//! observation point only.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::runtime::{FrameRuntime, RuntimeEvent};

/// Capacity of the announcement channel; slow subscribers see `Lagged`.
const ANNOUNCE_CAPACITY: usize = 32;

/// Provider metadata as announced by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub uuid: Uuid,
    pub name: String,
    /// Data URI of the wallet icon
    pub icon: String,
    /// Reverse-DNS identifier, e.g. `io.metamask`
    pub rdns: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDetail {
    pub info: ProviderInfo,
}

/// Registry the frame subscribes to.
pub trait ProviderRegistry: Send + Sync + 'static {
    /// Each message is the full provider list after an announcement.
    fn subscribe(&self) -> broadcast::Receiver<Vec<ProviderDetail>>;
}

/// In-process provider registry.
pub struct ProviderStore {
    providers: RwLock<Vec<ProviderDetail>>,
    tx: broadcast::Sender<Vec<ProviderDetail>>,
}

impl ProviderStore {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(ANNOUNCE_CAPACITY);
        Self {
            providers: RwLock::new(Vec::new()),
            tx,
        }
    }

    /// Record a provider announcement.
    ///
    /// Re-announcing a known uuid is ignored. Returns whether the provider was new.
    pub fn announce(&self, detail: ProviderDetail) -> bool {
        let snapshot = {
            let mut providers = self.providers.write();
            if providers.iter().any(|p| p.info.uuid == detail.info.uuid) {
                tracing::debug!("Ignoring duplicate announcement from {}", detail.info.rdns);
                return false;
            }
            providers.push(detail);
            providers.clone()
        };

        // No subscribers yet is fine; they get the list on their next announcement
        let _ = self.tx.send(snapshot);
        true
    }

    pub fn providers(&self) -> Vec<ProviderDetail> {
        self.providers.read().clone()
    }
}

impl Default for ProviderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry for ProviderStore {
    fn subscribe(&self) -> broadcast::Receiver<Vec<ProviderDetail>> {
        self.tx.subscribe()
    }
}

/// A provider seen by the listener.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredProvider {
    pub detail: ProviderDetail,
    pub discovered_at: DateTime<Utc>,
}

/// Background subscription to a provider registry.
pub struct ProviderDiscoveryListener {
    seen: Arc<RwLock<Vec<DiscoveredProvider>>>,
    task: JoinHandle<()>,
}

impl ProviderDiscoveryListener {
    /// Subscribe to `registry` and start recording announcements.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(registry: &dyn ProviderRegistry, runtime: Arc<dyn FrameRuntime>) -> Self {
        let mut rx = registry.subscribe();
        let seen: Arc<RwLock<Vec<DiscoveredProvider>>> = Arc::new(RwLock::new(Vec::new()));
        let sink = seen.clone();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(providers) => {
                        record(&sink, &providers);
                        if let Err(e) = runtime.emit(RuntimeEvent::ProvidersDiscovered { providers })
                        {
                            tracing::debug!("Failed to emit provider discovery: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Provider discovery lagged, skipped {} announcements", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("Provider registry closed");
                        break;
                    }
                }
            }
        });

        tracing::debug!("Provider discovery listener started");
        Self { seen, task }
    }

    /// Providers recorded so far, oldest first.
    pub fn seen(&self) -> Vec<DiscoveredProvider> {
        self.seen.read().clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for ProviderDiscoveryListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn record(seen: &RwLock<Vec<DiscoveredProvider>>, providers: &[ProviderDetail]) {
    let mut seen = seen.write();
    for detail in providers {
        tracing::info!(
            "Provider details: {} ({}) uuid={}",
            detail.info.name,
            detail.info.rdns,
            detail.info.uuid
        );
        if seen.iter().any(|s| s.detail.info.uuid == detail.info.uuid) {
            continue;
        }
        seen.push(DiscoveredProvider {
            detail: detail.clone(),
            discovered_at: Utc::now(),
        });
    }
}
