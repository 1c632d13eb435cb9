//! Scripted in-process host.
//!
//! `SimulatedHost` answers every action from a configurable outcome, records
//! each call in order, and lets the caller push events at will. Confirmation
//! events (`frameAdded` after a successful add, `notificationsEnabled` after an
//! enable request) are queued rather than delivered inline, mirroring a real
//! host where the user answers a prompt some time later; `flush()` delivers them.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use super::listeners::ListenerRegistry;
use super::{
    AddFrameError, FrameHost, HostError, HostEvent, HostEventKind, HostListener,
    HostNotificationStatus, ListenerId, NotificationDetails, ReadyOptions, SessionContext,
};
use crate::discovery::ProviderDetail;
use crate::error::{FrameError, Result};

/// How the simulated host answers `add_frame`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddFrameOutcome {
    #[default]
    Added,
    RejectedByUser {
        message: String,
    },
    InvalidDomainManifest {
        message: String,
    },
    /// Unclassified host failure
    Failed {
        message: String,
    },
}

/// How the simulated host answers `get_notification_status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatusOutcome {
    Enabled,
    #[default]
    Disabled,
    Failed {
        message: String,
    },
}

/// Host actions in the order the simulated host received them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Context,
    Ready(ReadyOptions),
    AddFrame,
    EnableNotifications,
    GetNotificationStatus,
    On(HostEventKind),
    Off(ListenerId),
    RemoveAllListeners,
}

/// A scripted session: what the host answers and what happens after load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// `None` simulates running outside a frame host
    pub context: Option<SessionContext>,
    pub add_frame: AddFrameOutcome,
    pub notification_status: StatusOutcome,
    /// Queue `frameAdded` after each successful add
    pub confirm_add: bool,
    /// Queue `notificationsEnabled` with these details after each enable request
    pub enable_confirmation: Option<NotificationDetails>,
    /// Wallet providers announced during bootstrap
    pub providers: Vec<ProviderDetail>,
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Load a JSON scenario file.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&contents)
            .map_err(|e| FrameError::Scenario(format!("{}: {}", path.display(), e)))
    }
}

/// One action replayed after bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Host pushes an event
    Event { payload: HostEvent },
    /// User presses the enable-notifications button
    EnableNotifications,
    CheckNotifications,
    AddFrame,
    /// A wallet provider announces itself
    Announce { provider: ProviderDetail },
}

pub struct SimulatedHost {
    context: RwLock<Option<SessionContext>>,
    add_frame_outcome: RwLock<AddFrameOutcome>,
    status_outcome: RwLock<StatusOutcome>,
    confirm_add: RwLock<bool>,
    enable_confirmation: RwLock<Option<NotificationDetails>>,
    /// Holds `context()` until notified, when set
    context_gate: RwLock<Option<Arc<Notify>>>,
    listeners: ListenerRegistry,
    deferred: Mutex<Vec<HostEvent>>,
    calls: Mutex<Vec<HostCall>>,
}

impl SimulatedHost {
    pub fn new(context: Option<SessionContext>) -> Self {
        Self {
            context: RwLock::new(context),
            add_frame_outcome: RwLock::new(AddFrameOutcome::default()),
            status_outcome: RwLock::new(StatusOutcome::default()),
            confirm_add: RwLock::new(false),
            enable_confirmation: RwLock::new(None),
            context_gate: RwLock::new(None),
            listeners: ListenerRegistry::new(),
            deferred: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_scenario(scenario: &Scenario) -> Self {
        let host = Self::new(scenario.context.clone());
        host.set_add_frame_outcome(scenario.add_frame.clone());
        host.set_status_outcome(scenario.notification_status.clone());
        host.set_confirm_add(scenario.confirm_add);
        host.set_enable_confirmation(scenario.enable_confirmation.clone());
        host
    }

    pub fn set_context(&self, context: Option<SessionContext>) {
        *self.context.write() = context;
    }

    pub fn set_add_frame_outcome(&self, outcome: AddFrameOutcome) {
        *self.add_frame_outcome.write() = outcome;
    }

    pub fn set_status_outcome(&self, outcome: StatusOutcome) {
        *self.status_outcome.write() = outcome;
    }

    pub fn set_confirm_add(&self, confirm: bool) {
        *self.confirm_add.write() = confirm;
    }

    pub fn set_enable_confirmation(&self, details: Option<NotificationDetails>) {
        *self.enable_confirmation.write() = details;
    }

    /// Make `context()` wait until the returned handle is notified.
    pub fn gate_context(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.context_gate.write() = Some(gate.clone());
        gate
    }

    /// Push an event to registered listeners immediately.
    pub fn dispatch(&self, event: &HostEvent) -> usize {
        tracing::debug!("Simulated host dispatching {}", event.kind());
        self.listeners.dispatch(event)
    }

    /// Deliver queued confirmation events. Returns how many were delivered.
    pub fn flush(&self) -> usize {
        let pending = std::mem::take(&mut *self.deferred.lock());
        let count = pending.len();
        for event in &pending {
            self.dispatch(event);
        }
        count
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, call: &HostCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listener_count_for(&self, kind: HostEventKind) -> usize {
        self.listeners.count_for(kind)
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl FrameHost for SimulatedHost {
    async fn context(&self) -> std::result::Result<Option<SessionContext>, HostError> {
        self.record(HostCall::Context);
        let gate = self.context_gate.read().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.context.read().clone())
    }

    async fn ready(&self, options: ReadyOptions) -> std::result::Result<(), HostError> {
        self.record(HostCall::Ready(options));
        Ok(())
    }

    async fn add_frame(&self) -> std::result::Result<(), HostError> {
        self.record(HostCall::AddFrame);
        let outcome = self.add_frame_outcome.read().clone();
        match outcome {
            AddFrameOutcome::Added => {
                if *self.confirm_add.read() {
                    self.deferred.lock().push(HostEvent::FrameAdded {
                        notification_details: self.enable_confirmation.read().clone(),
                    });
                }
                Ok(())
            }
            AddFrameOutcome::RejectedByUser { message } => {
                Err(AddFrameError::rejected_by_user(message).into())
            }
            AddFrameOutcome::InvalidDomainManifest { message } => {
                Err(AddFrameError::invalid_domain_manifest(message).into())
            }
            AddFrameOutcome::Failed { message } => Err(HostError::Other(message)),
        }
    }

    async fn enable_notifications(&self) -> std::result::Result<(), HostError> {
        self.record(HostCall::EnableNotifications);
        if let Some(details) = self.enable_confirmation.read().clone() {
            self.deferred.lock().push(HostEvent::NotificationsEnabled {
                notification_details: details,
            });
        }
        Ok(())
    }

    async fn get_notification_status(
        &self,
    ) -> std::result::Result<HostNotificationStatus, HostError> {
        self.record(HostCall::GetNotificationStatus);
        match self.status_outcome.read().clone() {
            StatusOutcome::Enabled => Ok(HostNotificationStatus::Enabled),
            StatusOutcome::Disabled => Ok(HostNotificationStatus::Disabled),
            StatusOutcome::Failed { message } => Err(HostError::Rpc(message)),
        }
    }

    fn on(&self, kind: HostEventKind, listener: HostListener) -> ListenerId {
        self.record(HostCall::On(kind));
        self.listeners.add(kind, listener)
    }

    fn off(&self, id: ListenerId) -> bool {
        self.record(HostCall::Off(id));
        self.listeners.remove(id)
    }

    fn remove_all_listeners(&self) {
        self.record(HostCall::RemoveAllListeners);
        self.listeners.clear();
    }
}
