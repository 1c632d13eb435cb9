//! Frame lifecycle and notification controller.
//!
//! `FrameController` owns all per-session state (context, added flag,
//! notification status, last add result) and is the only writer of it. The
//! host is injected as an `Arc<dyn FrameHost>`; presentation goes out through
//! an `Arc<dyn FrameRuntime>`.
//!
//! # Bootstrap
//!
//! `load()` runs at most once per controller:
//!
//! ```text
//! context ─┬─ (not added) add_frame ──────────────────────────┐
//!          └─ register listeners → status query → ready → discovery
//! ```
//!
//! The add request is issued first but not awaited before the listeners go
//! in, so a `frameAdded` confirmation is never missed and a slow prompt never
//! holds back `ready`.
//!
//! # Teardown
//!
//! `teardown()` (also run on drop) releases every listener the controller
//! registered and stops provider discovery. Host callbacks hold only a weak
//! reference, so events arriving afterwards are ignored.

mod add_frame;
mod state;
mod subscriptions;

#[cfg(test)]
mod integration_tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

pub use add_frame::{
    classify_add_frame_failure, FRAME_ADDED_DESCRIPTION, FRAME_ADDED_TITLE,
    FRAME_ADD_FAILED_TITLE, UNCLASSIFIED_FAILURE,
};
pub use state::{
    BootstrapPhase, FrameState, NotificationStatus, NOTIFICATIONS_DISABLED_TITLE,
    NOTIFICATIONS_ENABLED_TITLE,
};
pub use subscriptions::ListenerTable;

use crate::discovery::{DiscoveredProvider, ProviderDiscoveryListener, ProviderRegistry};
use crate::host::{
    FrameHost, HostEvent, HostEventKind, HostListener, ReadyOptions, SessionContext,
};
use crate::runtime::{FrameRuntime, RuntimeEvent};
use crate::view::{self, FrameOptions, FrameView};

/// How a call to `load()` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Full bootstrap ran
    Loaded,
    /// The host had no context; nothing was registered
    NoContext,
    /// A previous call already started the bootstrap
    AlreadyStarted,
    /// The controller was torn down before bootstrap finished
    TornDown,
}

/// Result of the enable-notifications affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnableRequest {
    /// The host was asked; the status changes when it confirms
    Requested,
    /// Notifications are already on, the host was not called
    AlreadyEnabled,
    Failed,
}

pub struct FrameController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    host: Arc<dyn FrameHost>,
    runtime: Arc<dyn FrameRuntime>,
    providers: Option<Arc<dyn ProviderRegistry>>,
    options: FrameOptions,
    phase: Mutex<BootstrapPhase>,
    state: RwLock<FrameState>,
    listeners: ListenerTable,
    discovery: Mutex<Option<ProviderDiscoveryListener>>,
    torn_down: AtomicBool,
}

impl FrameController {
    /// Controller without provider discovery.
    pub fn new(
        host: Arc<dyn FrameHost>,
        runtime: Arc<dyn FrameRuntime>,
        options: FrameOptions,
    ) -> Self {
        Self::build(host, runtime, options, None)
    }

    /// Controller that subscribes to `providers` during bootstrap.
    pub fn with_providers(
        host: Arc<dyn FrameHost>,
        runtime: Arc<dyn FrameRuntime>,
        options: FrameOptions,
        providers: Arc<dyn ProviderRegistry>,
    ) -> Self {
        Self::build(host, runtime, options, Some(providers))
    }

    fn build(
        host: Arc<dyn FrameHost>,
        runtime: Arc<dyn FrameRuntime>,
        options: FrameOptions,
        providers: Option<Arc<dyn ProviderRegistry>>,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                host,
                runtime,
                providers,
                options,
                phase: Mutex::new(BootstrapPhase::NotStarted),
                state: RwLock::new(FrameState::default()),
                listeners: ListenerTable::new(),
                discovery: Mutex::new(None),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    /// Run the host handshake. Only the first call does anything.
    pub async fn load(&self) -> LoadOutcome {
        {
            let mut phase = self.inner.phase.lock();
            if *phase != BootstrapPhase::NotStarted {
                tracing::debug!("Frame bootstrap already started ({:?})", *phase);
                return LoadOutcome::AlreadyStarted;
            }
            *phase = BootstrapPhase::InProgress;
        }

        tracing::info!("Calling load");
        let outcome = if self.inner.is_torn_down() {
            LoadOutcome::TornDown
        } else {
            self.inner.bootstrap().await
        };

        *self.inner.phase.lock() = BootstrapPhase::Done;
        tracing::info!("Frame bootstrap finished: {:?}", outcome);
        outcome
    }

    /// Ask the host to add this frame. Failures are reported, never returned.
    pub async fn add_frame(&self) {
        if self.inner.is_torn_down() {
            return;
        }
        self.inner.add_frame().await;
    }

    /// Refresh the notification status from the host.
    pub async fn check_notifications(&self) {
        if self.inner.is_torn_down() {
            return;
        }
        self.inner.check_notifications().await;
    }

    /// The enable-notifications button.
    ///
    /// Does not change the status itself; that waits for the host's
    /// `notificationsEnabled` event.
    pub async fn request_enable_notifications(&self) -> EnableRequest {
        if self.notification_status() == NotificationStatus::Enabled {
            tracing::debug!("Notifications already enabled, not asking the host");
            return EnableRequest::AlreadyEnabled;
        }
        if self.inner.is_torn_down() {
            return EnableRequest::Failed;
        }

        match self.inner.host.enable_notifications().await {
            Ok(()) => EnableRequest::Requested,
            Err(e) => {
                tracing::warn!("Failed to request notifications: {}", e);
                EnableRequest::Failed
            }
        }
    }

    /// Release every host listener and stop discovery. Idempotent.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    pub fn state(&self) -> FrameState {
        self.inner.state.read().clone()
    }

    pub fn context(&self) -> Option<SessionContext> {
        self.inner.state.read().context.clone()
    }

    pub fn added(&self) -> bool {
        self.inner.state.read().added
    }

    pub fn notification_status(&self) -> NotificationStatus {
        self.inner.state.read().notification_status
    }

    pub fn add_frame_result(&self) -> String {
        self.inner.state.read().add_frame_result.clone()
    }

    pub fn phase(&self) -> BootstrapPhase {
        *self.inner.phase.lock()
    }

    /// True once bootstrap has been initiated.
    pub fn is_loaded(&self) -> bool {
        self.phase() != BootstrapPhase::NotStarted
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.is_torn_down()
    }

    /// Number of host listeners currently held.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn discovered_providers(&self) -> Vec<DiscoveredProvider> {
        self.inner
            .discovery
            .lock()
            .as_ref()
            .map(|d| d.seen())
            .unwrap_or_default()
    }

    pub fn options(&self) -> &FrameOptions {
        &self.inner.options
    }

    pub fn view(&self) -> FrameView {
        let phase = self.phase();
        let state = self.inner.state.read();
        view::render(&self.inner.options, phase, &state)
    }
}

impl Drop for FrameController {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl ControllerInner {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn emit(&self, event: RuntimeEvent) {
        if let Err(e) = self.runtime.emit(event) {
            tracing::debug!("Dropped runtime event: {}", e);
        }
    }

    /// Apply a state transition and emit its effects, unless torn down.
    fn update<F>(&self, transition: F)
    where
        F: FnOnce(&mut FrameState) -> Vec<RuntimeEvent>,
    {
        if self.is_torn_down() {
            tracing::debug!("Ignoring state update on torn down controller");
            return;
        }
        let effects = {
            let mut state = self.state.write();
            transition(&mut state)
        };
        for effect in effects {
            self.emit(effect);
        }
    }

    async fn bootstrap(self: &Arc<Self>) -> LoadOutcome {
        let context = match self.host.context().await {
            Ok(Some(context)) => context,
            Ok(None) => {
                tracing::info!("No frame context; not running inside a host");
                return LoadOutcome::NoContext;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch frame context: {}", e);
                return LoadOutcome::NoContext;
            }
        };
        if self.is_torn_down() {
            return LoadOutcome::TornDown;
        }

        let needs_add = !context.client.added;
        self.update(|state| state.capture_context(context));

        let add = async {
            if needs_add {
                tracing::info!("Frame not added yet, prompting user");
                self.add_frame().await;
            }
        };
        let rest = async {
            self.register_listeners();
            self.check_notifications().await;
            if self.is_torn_down() {
                return LoadOutcome::TornDown;
            }

            tracing::info!("Calling ready");
            match self.host.ready(ReadyOptions::default()).await {
                Ok(()) => self.emit(RuntimeEvent::Ready),
                Err(e) => tracing::warn!("Failed to signal ready: {}", e),
            }

            self.start_discovery();
            if self.is_torn_down() {
                LoadOutcome::TornDown
            } else {
                LoadOutcome::Loaded
            }
        };

        // `join` polls the add request first, then the rest on the same task
        let ((), outcome) = futures::future::join(add, rest).await;
        outcome
    }

    fn register_listeners(self: &Arc<Self>) {
        for kind in HostEventKind::ALL {
            let weak: Weak<Self> = Arc::downgrade(self);
            let listener: HostListener = Arc::new(move |event: &HostEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.update(|state| state.apply_event(event));
                }
            });
            self.listeners.register(self.host.as_ref(), kind, listener);
        }
        tracing::debug!("Registered {} host listeners", self.listeners.len());
    }

    async fn add_frame(&self) {
        let result = self.host.add_frame().await;
        if self.is_torn_down() {
            tracing::debug!("Add frame finished after teardown, ignoring");
            return;
        }

        let (message, toast) = add_frame::add_frame_outcome(&result);
        self.state.write().add_frame_result = message;
        self.emit(RuntimeEvent::Toast(toast));
    }

    async fn check_notifications(&self) {
        let result = self.host.get_notification_status().await;
        self.update(|state| state.apply_status_query(result.as_ref().copied()));
    }

    fn start_discovery(&self) {
        let Some(providers) = self.providers.as_ref() else {
            return;
        };
        let mut slot = self.discovery.lock();
        if self.is_torn_down() || slot.is_some() {
            return;
        }
        *slot = Some(ProviderDiscoveryListener::start(
            providers.as_ref(),
            self.runtime.clone(),
        ));
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let released = self.listeners.release_all(self.host.as_ref());
        if let Some(discovery) = self.discovery.lock().take() {
            discovery.stop();
        }

        tracing::info!("Frame controller torn down, released {} listeners", released);
        self.emit(RuntimeEvent::TornDown);
    }
}
