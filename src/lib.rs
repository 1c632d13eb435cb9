//! Framepilot: lifecycle and notification controller for apps embedded in a
//! frame host.
//!
//! The host is injected as [`host::FrameHost`]; [`controller::FrameController`]
//! runs the one-shot handshake, tracks the added flag and the notification
//! subscription, and reports everything user-visible through a
//! [`runtime::FrameRuntime`].
//!
//! ```rust,ignore
//! let host = Arc::new(SimulatedHost::new(Some(SessionContext::with_added(false))));
//! let (runtime, events) = ChannelRuntime::pair();
//! let controller = FrameController::new(host, Arc::new(runtime), FrameOptions::default());
//! controller.load().await;
//! ```

pub mod controller;
pub mod discovery;
pub mod error;
pub mod host;
pub mod runtime;
pub mod settings;
pub mod view;

#[cfg(feature = "cli")]
pub mod cli;

pub use controller::{EnableRequest, FrameController, LoadOutcome, NotificationStatus};
pub use error::{FrameError, Result};
pub use host::{FrameHost, HostError, HostEvent, SessionContext};
pub use runtime::{FrameRuntime, RuntimeEvent};
pub use view::{FrameOptions, FrameView};
