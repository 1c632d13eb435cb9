//! Presentation contract.
//!
//! `FrameView` is everything a renderer needs: the title, padding derived from
//! the host's safe-area insets, and the notification affordance. It is a pure
//! function of controller state.

use serde::Serialize;

use crate::controller::{BootstrapPhase, FrameState, NotificationStatus};
use crate::host::SafeAreaInsets;

pub const PROJECT_TITLE: &str = "Frame Template";
pub const ENABLE_NOTIFICATIONS_LABEL: &str = "Enable Notifications";

/// Options accepted from the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameOptions {
    pub title: String,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            title: PROJECT_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Padding {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Padding {
    /// Padding for the given insets; missing or negative insets become zero.
    pub fn from_insets(insets: Option<&SafeAreaInsets>) -> Self {
        let Some(insets) = insets else {
            return Self::default();
        };
        Self {
            top: insets.top.max(0.0),
            bottom: insets.bottom.max(0.0),
            left: insets.left.max(0.0),
            right: insets.right.max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonState {
    pub label: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameLayout {
    pub title: String,
    pub padding: Padding,
    pub notification_status: NotificationStatus,
    pub notification_label: String,
    pub enable_button: ButtonState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FrameView {
    /// Bootstrap has not started
    Loading,
    Ready(FrameLayout),
}

pub fn render(options: &FrameOptions, phase: BootstrapPhase, state: &FrameState) -> FrameView {
    if phase == BootstrapPhase::NotStarted {
        return FrameView::Loading;
    }

    let insets = state
        .context
        .as_ref()
        .and_then(|ctx| ctx.client.safe_area_insets.as_ref());
    let enabled = state.notification_status == NotificationStatus::Enabled;

    FrameView::Ready(FrameLayout {
        title: options.title.clone(),
        padding: Padding::from_insets(insets),
        notification_status: state.notification_status,
        notification_label: if enabled {
            "✅ Enabled".to_string()
        } else {
            "❌ Disabled".to_string()
        },
        enable_button: ButtonState {
            label: ENABLE_NOTIFICATIONS_LABEL.to_string(),
            disabled: enabled,
        },
    })
}
