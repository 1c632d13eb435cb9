//! Controller state and its transitions.
//!
//! Every write to `FrameState` goes through one of the methods here. Each
//! returns the runtime events the change should produce; the controller emits
//! them after releasing its lock.

use serde::{Deserialize, Serialize};

use crate::host::{HostError, HostEvent, HostNotificationStatus, SessionContext};
use crate::runtime::{RuntimeEvent, Toast};

pub const NOTIFICATIONS_ENABLED_TITLE: &str = "Notifications Enabled";
pub const NOTIFICATIONS_ENABLED_DESCRIPTION: &str = "You'll receive updates from this frame";
pub const NOTIFICATIONS_DISABLED_TITLE: &str = "Notifications Disabled";
pub const NOTIFICATIONS_DISABLED_DESCRIPTION: &str = "You won't receive updates from this frame";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Unknown,
    Enabled,
    Disabled,
}

impl From<HostNotificationStatus> for NotificationStatus {
    fn from(status: HostNotificationStatus) -> Self {
        match status {
            HostNotificationStatus::Enabled => NotificationStatus::Enabled,
            HostNotificationStatus::Disabled => NotificationStatus::Disabled,
        }
    }
}

/// Guard around the one-shot bootstrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPhase {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameState {
    /// Captured once per load, replaced wholesale
    pub context: Option<SessionContext>,
    pub added: bool,
    pub notification_status: NotificationStatus,
    /// Message from the last add attempt; empty on success or before any attempt
    pub add_frame_result: String,
}

impl FrameState {
    /// Store a fresh context and seed `added` from it.
    pub fn capture_context(&mut self, context: SessionContext) -> Vec<RuntimeEvent> {
        let added = context.client.added;
        self.context = Some(context);
        self.set_added(added)
    }

    /// Apply a host-pushed event.
    pub fn apply_event(&mut self, event: &HostEvent) -> Vec<RuntimeEvent> {
        match event {
            HostEvent::FrameAdded {
                notification_details,
            } => {
                tracing::info!(
                    "Frame added (notification details attached: {})",
                    notification_details.is_some()
                );
                self.set_added(true)
            }
            HostEvent::FrameAddRejected { reason } => {
                tracing::info!("Frame add rejected: {}", reason);
                Vec::new()
            }
            HostEvent::FrameRemoved => {
                tracing::info!("Frame removed");
                self.set_added(false)
            }
            HostEvent::NotificationsEnabled {
                notification_details,
            } => {
                tracing::info!("Notifications enabled via {}", notification_details.url);
                let mut effects = self.set_status(NotificationStatus::Enabled);
                effects.push(RuntimeEvent::Toast(Toast::success(
                    NOTIFICATIONS_ENABLED_TITLE,
                    format!(
                        "{} (delivered via {})",
                        NOTIFICATIONS_ENABLED_DESCRIPTION,
                        notification_details.url.host_str().unwrap_or("host")
                    ),
                )));
                effects
            }
            HostEvent::NotificationsDisabled => {
                tracing::info!("Notifications disabled");
                let mut effects = self.set_status(NotificationStatus::Disabled);
                effects.push(RuntimeEvent::Toast(Toast::warning(
                    NOTIFICATIONS_DISABLED_TITLE,
                    NOTIFICATIONS_DISABLED_DESCRIPTION,
                )));
                effects
            }
            HostEvent::PrimaryButtonClicked => {
                tracing::info!("Primary button clicked");
                vec![RuntimeEvent::Custom {
                    name: "primary_button_clicked".to_string(),
                    payload: serde_json::Value::Null,
                }]
            }
        }
    }

    /// Apply the result of an explicit status query.
    ///
    /// A failed query leaves the status untouched.
    pub fn apply_status_query(
        &mut self,
        result: Result<HostNotificationStatus, &HostError>,
    ) -> Vec<RuntimeEvent> {
        let status = match result {
            Ok(status) => NotificationStatus::from(status),
            Err(e) => {
                tracing::error!("Failed to check notification status: {}", e);
                return Vec::new();
            }
        };

        let mut effects = self.set_status(status);
        if status == NotificationStatus::Enabled {
            effects.push(RuntimeEvent::Toast(Toast::success(
                NOTIFICATIONS_ENABLED_TITLE,
                NOTIFICATIONS_ENABLED_DESCRIPTION,
            )));
        }
        effects
    }

    fn set_added(&mut self, added: bool) -> Vec<RuntimeEvent> {
        if self.added == added {
            return Vec::new();
        }
        self.added = added;
        vec![RuntimeEvent::AddedChanged { added }]
    }

    fn set_status(&mut self, status: NotificationStatus) -> Vec<RuntimeEvent> {
        if self.notification_status == status {
            return Vec::new();
        }
        self.notification_status = status;
        vec![RuntimeEvent::NotificationStatusChanged { status }]
    }
}
