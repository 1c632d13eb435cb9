//! Host runtime abstraction.
//!
//! A frame runs inside a host application (the social client) that owns the
//! session context, the "add frame" and notification prompts, and a stream of
//! lifecycle events. The controller only ever talks to the host through the
//! [`FrameHost`] trait, so the same bootstrap logic runs against:
//! - [`WireHost`]: the JSON message protocol spoken with a real host
//! - [`SimulatedHost`]: a scripted in-process host for tests and scenario replay
//!
//! # Object Safety
//! `FrameHost` is object-safe and intended to be used as `Arc<dyn FrameHost>`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub mod listeners;
pub mod simulated;
pub mod wire;

pub use listeners::ListenerRegistry;
pub use simulated::{AddFrameOutcome, HostCall, Scenario, ScenarioStep, SimulatedHost, StatusOutcome};
pub use wire::{FrameMessage, HostMessage, HostMethod, WireError, WireHost};

// ============================================================================
// Session context
// ============================================================================

/// Snapshot of host state handed to the frame on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<FrameUser>,
    pub client: ClientContext,
}

impl SessionContext {
    /// Context for a client with the given `added` flag and nothing else set.
    pub fn with_added(added: bool) -> Self {
        Self {
            user: None,
            client: ClientContext {
                added,
                ..Default::default()
            },
        }
    }
}

/// The user the host is running the frame for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameUser {
    pub fid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfp_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    #[serde(default)]
    pub client_fid: u64,
    /// Whether the user has persisted this frame in their client
    pub added: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_details: Option<NotificationDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_area_insets: Option<SafeAreaInsets>,
}

/// Padding the host asks the frame to leave around its content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeAreaInsets {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Where and how the host delivers notifications for this frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDetails {
    pub url: Url,
    pub token: String,
}

/// Payload for the readiness signal. Serializes to `{}` by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyOptions {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable_native_gestures: bool,
}

/// Notification status as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostNotificationStatus {
    Enabled,
    Disabled,
}

// ============================================================================
// Events
// ============================================================================

/// Events pushed by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    /// The user confirmed adding the frame
    FrameAdded {
        #[serde(
            rename = "notificationDetails",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        notification_details: Option<NotificationDetails>,
    },

    /// The host rejected or the user declined an add
    FrameAddRejected { reason: String },

    /// The user removed the frame from their client
    FrameRemoved,

    NotificationsEnabled {
        #[serde(rename = "notificationDetails")]
        notification_details: NotificationDetails,
    },

    NotificationsDisabled,

    /// The host's primary button was pressed
    PrimaryButtonClicked,
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::FrameAdded { .. } => HostEventKind::FrameAdded,
            HostEvent::FrameAddRejected { .. } => HostEventKind::FrameAddRejected,
            HostEvent::FrameRemoved => HostEventKind::FrameRemoved,
            HostEvent::NotificationsEnabled { .. } => HostEventKind::NotificationsEnabled,
            HostEvent::NotificationsDisabled => HostEventKind::NotificationsDisabled,
            HostEvent::PrimaryButtonClicked => HostEventKind::PrimaryButtonClicked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostEventKind {
    FrameAdded,
    FrameAddRejected,
    FrameRemoved,
    NotificationsEnabled,
    NotificationsDisabled,
    PrimaryButtonClicked,
}

impl HostEventKind {
    pub const ALL: [HostEventKind; 6] = [
        HostEventKind::FrameAdded,
        HostEventKind::FrameAddRejected,
        HostEventKind::FrameRemoved,
        HostEventKind::NotificationsEnabled,
        HostEventKind::NotificationsDisabled,
        HostEventKind::PrimaryButtonClicked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HostEventKind::FrameAdded => "frameAdded",
            HostEventKind::FrameAddRejected => "frameAddRejected",
            HostEventKind::FrameRemoved => "frameRemoved",
            HostEventKind::NotificationsEnabled => "notificationsEnabled",
            HostEventKind::NotificationsDisabled => "notificationsDisabled",
            HostEventKind::PrimaryButtonClicked => "primaryButtonClicked",
        }
    }
}

impl fmt::Display for HostEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`FrameHost::on`], used to release the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

/// Callback invoked by the host for each matching event.
pub type HostListener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

// ============================================================================
// Errors
// ============================================================================

/// Why the host refused to add the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddFrameErrorKind {
    /// The user declined the prompt
    RejectedByUser,
    /// The app's domain manifest does not match its registration
    InvalidDomainManifest,
    Other,
}

impl AddFrameErrorKind {
    /// Map a wire error kind onto an add-frame failure kind.
    pub fn from_wire(kind: Option<&str>) -> Self {
        match kind {
            Some("rejected_by_user") => AddFrameErrorKind::RejectedByUser,
            Some("invalid_domain_manifest") => AddFrameErrorKind::InvalidDomainManifest,
            _ => AddFrameErrorKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AddFrameError {
    pub kind: AddFrameErrorKind,
    pub message: String,
}

impl AddFrameError {
    pub fn new(kind: AddFrameErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rejected_by_user(message: impl Into<String>) -> Self {
        Self::new(AddFrameErrorKind::RejectedByUser, message)
    }

    pub fn invalid_domain_manifest(message: impl Into<String>) -> Self {
        Self::new(AddFrameErrorKind::InvalidDomainManifest, message)
    }
}

/// Host-call errors
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("Add frame failed: {0}")]
    AddFrame(#[from] AddFrameError),

    #[error("Host request timed out after {0}s")]
    Timeout(u64),

    #[error("Host connection closed")]
    Disconnected,

    #[error("Host rejected request: {0}")]
    Rpc(String),

    #[error("Malformed host message: {0}")]
    Codec(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for HostError {
    fn from(e: serde_json::Error) -> Self {
        HostError::Codec(e.to_string())
    }
}

// ============================================================================
// FrameHost trait
// ============================================================================

/// Capability handed to the controller at construction.
///
/// Actions are asynchronous and may suspend for as long as the host shows UI
/// (e.g. the add prompt). Listener registration is local bookkeeping and
/// therefore synchronous.
#[async_trait]
pub trait FrameHost: Send + Sync + 'static {
    /// Fetch the session context. `Ok(None)` means the frame is not running
    /// inside a host (or the host is not ready yet).
    async fn context(&self) -> Result<Option<SessionContext>, HostError>;

    /// Tell the host the frame has finished loading and its splash can go.
    async fn ready(&self, options: ReadyOptions) -> Result<(), HostError>;

    /// Ask the host to persist this frame in the user's client.
    ///
    /// # Errors
    /// Returns `HostError::AddFrame` with a classified kind when the host
    /// (or the user) refuses.
    async fn add_frame(&self) -> Result<(), HostError>;

    /// Ask the host to prompt the user to enable notifications.
    async fn enable_notifications(&self) -> Result<(), HostError>;

    async fn get_notification_status(&self) -> Result<HostNotificationStatus, HostError>;

    /// Register a listener for one event kind.
    fn on(&self, kind: HostEventKind, listener: HostListener) -> ListenerId;

    /// Release a listener. Returns `false` if it was not registered.
    fn off(&self, id: ListenerId) -> bool;

    /// Release every listener registered with this host.
    ///
    /// For the host's owner, e.g. when a session is replaced. The controller
    /// never calls this; it releases only its own listeners through `off`.
    fn remove_all_listeners(&self);
}
