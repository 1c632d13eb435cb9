// Runtime abstraction for the presentation side of a frame
//
// The controller never renders anything itself. Toasts, state changes and
// discovery records are emitted as `RuntimeEvent`s and the runtime decides how
// to show them (terminal output, JSON lines, a UI bridge).

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::controller::NotificationStatus;
use crate::discovery::ProviderDetail;

pub mod channel;

pub use channel::ChannelRuntime;

/// Runtime-specific errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to emit event: {0}")]
    EmitFailed(String),

    #[error("Event receiver closed")]
    ReceiverClosed,
}

/// Visual weight of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastVariant {
    Success,
    Warning,
    Destructive,
}

/// A short user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Success,
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Warning,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }
}

/// Events that can be emitted to the presentation layer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    Toast(Toast),

    /// The persisted ("added") flag changed
    AddedChanged { added: bool },

    NotificationStatusChanged { status: NotificationStatus },

    /// The host was told the frame is ready
    Ready,

    /// Wallet providers currently announced
    ProvidersDiscovered { providers: Vec<ProviderDetail> },

    /// The controller released its listeners; nothing more will follow
    TornDown,

    /// Generic extensibility
    Custom {
        name: String,
        payload: serde_json::Value,
    },
}

/// Runtime abstraction for the environment a frame is presented in
///
/// # Object Safety
/// This trait is object-safe and intended to be used as `Arc<dyn FrameRuntime>`.
#[async_trait]
pub trait FrameRuntime: Send + Sync + 'static {
    /// Emit an event to the presentation layer
    ///
    /// # Errors
    /// Returns `RuntimeError::ReceiverClosed` if the consumer has gone away.
    fn emit(&self, event: RuntimeEvent) -> Result<(), RuntimeError>;

    /// Check if a user is watching (TTY or UI)
    fn is_interactive(&self) -> bool;

    /// Graceful shutdown - flush events, close channels, etc.
    async fn shutdown(&self) -> Result<(), RuntimeError>;
}
