//! End-to-end tests for the frame controller against a simulated host.
//!
//! These drive the full bootstrap and event flow and check both the host call
//! sequence and what reaches the runtime.

#![cfg(test)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::*;
use crate::discovery::{ProviderDetail, ProviderInfo, ProviderStore};
use crate::host::{
    AddFrameOutcome, HostCall, NotificationDetails, SafeAreaInsets, SimulatedHost, StatusOutcome,
};
use crate::runtime::{ChannelRuntime, Toast, ToastVariant};
use crate::view::{FrameLayout, Padding};

struct Harness {
    host: Arc<SimulatedHost>,
    controller: FrameController,
    events: mpsc::UnboundedReceiver<RuntimeEvent>,
}

impl Harness {
    fn new(host: SimulatedHost) -> Self {
        let host = Arc::new(host);
        let (runtime, events) = ChannelRuntime::pair();
        let controller =
            FrameController::new(host.clone(), Arc::new(runtime), FrameOptions::default());
        Self {
            host,
            controller,
            events,
        }
    }

    fn with_context(added: bool) -> Self {
        Self::new(SimulatedHost::new(Some(SessionContext::with_added(added))))
    }

    /// Everything emitted so far.
    fn drain(&mut self) -> Vec<RuntimeEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    fn drain_toasts(&mut self) -> Vec<Toast> {
        self.drain()
            .into_iter()
            .filter_map(|e| match e {
                RuntimeEvent::Toast(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn layout(&self) -> FrameLayout {
        match self.controller.view() {
            FrameView::Ready(layout) => layout,
            FrameView::Loading => panic!("controller not loaded"),
        }
    }
}

fn details() -> NotificationDetails {
    NotificationDetails {
        url: "https://api.warpcast.com/v1/frame-notifications"
            .parse()
            .unwrap(),
        token: "a05059ef2415c67b08ecceb539201cbc6".to_string(),
    }
}

fn provider(name: &str) -> ProviderDetail {
    ProviderDetail {
        info: ProviderInfo {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            icon: "data:image/png;base64,".to_string(),
            rdns: format!("io.{}", name.to_lowercase()),
        },
    }
}

fn position(calls: &[HostCall], wanted: &HostCall) -> usize {
    calls
        .iter()
        .position(|c| c == wanted)
        .unwrap_or_else(|| panic!("{:?} never called", wanted))
}

#[tokio::test]
async fn test_already_added_skips_add_and_signals_ready() {
    let mut h = Harness::with_context(true);

    assert_eq!(h.controller.load().await, LoadOutcome::Loaded);

    assert_eq!(h.host.call_count(&HostCall::AddFrame), 0);
    assert_eq!(h.host.listener_count(), HostEventKind::ALL.len());
    assert_eq!(h.host.call_count(&HostCall::Ready(ReadyOptions::default())), 1);
    assert!(h.controller.added());
    assert!(h.drain().iter().any(|e| matches!(e, RuntimeEvent::Ready)));
}

#[tokio::test]
async fn test_added_waits_for_host_confirmation() {
    let host = SimulatedHost::new(Some(SessionContext::with_added(false)));
    host.set_confirm_add(true);
    let mut h = Harness::new(host);

    h.controller.load().await;

    assert_eq!(h.host.call_count(&HostCall::AddFrame), 1);
    assert!(!h.controller.added(), "success response alone must not mark added");
    assert_eq!(h.controller.add_frame_result(), "");
    let toasts = h.drain_toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, FRAME_ADDED_TITLE);

    assert_eq!(h.host.flush(), 1);
    assert!(h.controller.added());
    assert!(h
        .drain()
        .iter()
        .any(|e| matches!(e, RuntimeEvent::AddedChanged { added: true })));
}

#[tokio::test]
async fn test_rejected_add_reports_and_continues() {
    let host = SimulatedHost::new(Some(SessionContext::with_added(false)));
    host.set_add_frame_outcome(AddFrameOutcome::RejectedByUser {
        message: "user cancelled".to_string(),
    });
    let mut h = Harness::new(host);

    assert_eq!(h.controller.load().await, LoadOutcome::Loaded);

    assert_eq!(h.controller.add_frame_result(), "Not added: user cancelled");
    assert!(!h.controller.added());
    let toasts = h.drain_toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, FRAME_ADD_FAILED_TITLE);
    assert_eq!(toasts[0].variant, ToastVariant::Destructive);

    // Bootstrap carried on regardless
    assert_eq!(h.host.listener_count(), 6);
    assert_eq!(h.host.call_count(&HostCall::Ready(ReadyOptions::default())), 1);
}

#[tokio::test]
async fn test_unclassified_add_failure_is_generic() {
    let host = SimulatedHost::new(Some(SessionContext::with_added(false)));
    host.set_add_frame_outcome(AddFrameOutcome::Failed {
        message: "internal".to_string(),
    });
    let h = Harness::new(host);

    h.controller.load().await;
    assert_eq!(h.controller.add_frame_result(), UNCLASSIFIED_FAILURE);
}

#[tokio::test]
async fn test_enabled_status_toasts_once_and_disables_affordance() {
    let host = SimulatedHost::new(Some(SessionContext::with_added(true)));
    host.set_status_outcome(StatusOutcome::Enabled);
    let mut h = Harness::new(host);

    h.controller.load().await;

    assert_eq!(h.controller.notification_status(), NotificationStatus::Enabled);
    let toasts = h.drain_toasts();
    assert_eq!(
        toasts
            .iter()
            .filter(|t| t.title == NOTIFICATIONS_ENABLED_TITLE)
            .count(),
        1
    );

    let layout = h.layout();
    assert!(layout.enable_button.disabled);
    assert_eq!(layout.notification_label, "✅ Enabled");

    assert_eq!(
        h.controller.request_enable_notifications().await,
        EnableRequest::AlreadyEnabled
    );
    assert_eq!(h.host.call_count(&HostCall::EnableNotifications), 0);
}

#[tokio::test]
async fn test_disabled_push_after_enabled() {
    let host = SimulatedHost::new(Some(SessionContext::with_added(true)));
    host.set_status_outcome(StatusOutcome::Enabled);
    let mut h = Harness::new(host);
    h.controller.load().await;
    h.drain();

    h.host.dispatch(&HostEvent::NotificationsDisabled);

    assert_eq!(h.controller.notification_status(), NotificationStatus::Disabled);
    let toasts = h.drain_toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, NOTIFICATIONS_DISABLED_TITLE);
    assert_eq!(toasts[0].variant, ToastVariant::Warning);
    assert!(!h.layout().enable_button.disabled);
}

#[tokio::test]
async fn test_empty_context_registers_nothing() {
    let mut h = Harness::new(SimulatedHost::new(None));

    assert_eq!(h.controller.load().await, LoadOutcome::NoContext);
    assert_eq!(h.controller.load().await, LoadOutcome::AlreadyStarted);

    assert_eq!(h.host.calls(), vec![HostCall::Context]);
    assert_eq!(h.controller.listener_count(), 0);
    assert!(h.controller.context().is_none());
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_auto_add_happens_once() {
    let h = Harness::with_context(false);

    h.controller.load().await;
    h.controller.load().await;
    h.controller.load().await;

    assert_eq!(h.host.call_count(&HostCall::AddFrame), 1);
}

#[tokio::test]
async fn test_listeners_and_status_before_ready() {
    let h = Harness::with_context(false);
    h.controller.load().await;

    let calls = h.host.calls();
    let ready = position(&calls, &HostCall::Ready(ReadyOptions::default()));
    for kind in HostEventKind::ALL {
        assert!(position(&calls, &HostCall::On(kind)) < ready, "{} after ready", kind);
    }
    let context = position(&calls, &HostCall::Context);
    let status = position(&calls, &HostCall::GetNotificationStatus);
    assert!(context < status && status < ready);
    // Add is issued before listeners go in
    let first_on = position(&calls, &HostCall::On(HostEventKind::FrameAdded));
    assert!(position(&calls, &HostCall::AddFrame) < first_on);
}

#[tokio::test]
async fn test_failed_status_query_keeps_unknown() {
    let host = SimulatedHost::new(Some(SessionContext::with_added(true)));
    host.set_status_outcome(StatusOutcome::Failed {
        message: "unavailable".to_string(),
    });
    let h = Harness::new(host);

    assert_eq!(h.controller.load().await, LoadOutcome::Loaded);
    assert_eq!(h.controller.notification_status(), NotificationStatus::Unknown);
    assert_eq!(h.layout().notification_label, "❌ Disabled");
}

#[tokio::test]
async fn test_enable_request_confirmed_by_push() {
    let host = SimulatedHost::new(Some(SessionContext::with_added(true)));
    host.set_enable_confirmation(Some(details()));
    let mut h = Harness::new(host);
    h.controller.load().await;
    h.drain();

    assert_eq!(
        h.controller.request_enable_notifications().await,
        EnableRequest::Requested
    );
    assert_eq!(h.controller.notification_status(), NotificationStatus::Disabled);

    h.host.flush();
    assert_eq!(h.controller.notification_status(), NotificationStatus::Enabled);
    let toasts = h.drain_toasts();
    assert_eq!(toasts.len(), 1);
    assert!(toasts[0].description.contains("api.warpcast.com"));
}

#[tokio::test]
async fn test_removed_event_clears_added() {
    let h = Harness::with_context(true);
    h.controller.load().await;

    h.host.dispatch(&HostEvent::FrameRemoved);
    assert!(!h.controller.added());

    h.host.dispatch(&HostEvent::FrameAddRejected {
        reason: "rejected_by_user".to_string(),
    });
    assert!(!h.controller.added());

    h.host.dispatch(&HostEvent::FrameAdded {
        notification_details: Some(details()),
    });
    assert!(h.controller.added());
}

#[tokio::test]
async fn test_teardown_releases_everything_once() {
    let mut h = Harness::with_context(true);
    h.controller.load().await;
    h.drain();

    h.controller.teardown();
    h.controller.teardown();

    assert_eq!(h.host.listener_count(), 0);
    assert!(h.controller.is_torn_down());
    let torn_down = h
        .drain()
        .into_iter()
        .filter(|e| matches!(e, RuntimeEvent::TornDown))
        .count();
    assert_eq!(torn_down, 1);

    // Events after teardown reach nobody and change nothing
    assert_eq!(h.host.dispatch(&HostEvent::FrameRemoved), 0);
    assert!(h.controller.added());
}

#[tokio::test]
async fn test_teardown_before_load() {
    let h = Harness::with_context(true);
    h.controller.teardown();

    assert_eq!(h.controller.load().await, LoadOutcome::TornDown);
    assert!(h.host.calls().is_empty());
    assert_eq!(h.controller.listener_count(), 0);
}

#[tokio::test]
async fn test_teardown_during_load() {
    let h = Harness::with_context(false);
    let gate = h.host.gate_context();

    let (outcome, ()) = tokio::join!(h.controller.load(), async {
        // load() is parked on the gated context call by now
        h.controller.teardown();
        gate.notify_one();
    });

    assert_eq!(outcome, LoadOutcome::TornDown);
    assert_eq!(h.host.calls(), vec![HostCall::Context]);
    assert_eq!(h.host.listener_count(), 0);
    assert!(h.controller.context().is_none());
    assert_eq!(h.controller.phase(), BootstrapPhase::Done);
}

#[tokio::test]
async fn test_handlers_ignore_events_after_teardown() {
    let h = Harness::with_context(true);
    h.controller.load().await;

    let state_before = h.controller.state();
    h.controller.teardown();
    h.host.dispatch(&HostEvent::NotificationsEnabled {
        notification_details: details(),
    });
    assert_eq!(h.controller.state(), state_before);

    h.controller.check_notifications().await;
    h.controller.add_frame().await;
    assert_eq!(h.controller.state(), state_before);
    assert_eq!(h.host.call_count(&HostCall::AddFrame), 0);
}

#[tokio::test]
async fn test_providers_discovered_after_bootstrap() {
    let host = Arc::new(SimulatedHost::new(Some(SessionContext::with_added(true))));
    let store = Arc::new(ProviderStore::new());
    let (runtime, mut events) = ChannelRuntime::pair();
    let controller = FrameController::with_providers(
        host.clone(),
        Arc::new(runtime),
        FrameOptions::default(),
        store.clone(),
    );

    controller.load().await;
    store.announce(provider("MetaMask"));

    let providers = loop {
        match tokio::time::timeout(Duration::from_secs(1), events.recv()).await {
            Ok(Some(RuntimeEvent::ProvidersDiscovered { providers })) => break providers,
            Ok(Some(_)) => continue,
            other => panic!("no discovery event: {:?}", other),
        }
    };
    assert_eq!(providers.len(), 1);
    assert_eq!(controller.discovered_providers().len(), 1);
    assert_eq!(controller.discovered_providers()[0].detail.info.name, "MetaMask");

    controller.teardown();
    store.announce(provider("Rabby"));
    tokio::task::yield_now().await;
    assert!(controller.discovered_providers().is_empty());
}

#[tokio::test]
async fn test_view_uses_safe_area_insets() {
    let mut context = SessionContext::with_added(true);
    context.client.safe_area_insets = Some(SafeAreaInsets {
        top: 47.0,
        bottom: 34.0,
        left: 0.0,
        right: 0.0,
    });
    let host = Arc::new(SimulatedHost::new(Some(context)));
    let (runtime, _events) = ChannelRuntime::pair();
    let controller = FrameController::new(
        host,
        Arc::new(runtime),
        FrameOptions {
            title: "Counter".to_string(),
        },
    );

    controller.load().await;
    match controller.view() {
        FrameView::Ready(layout) => {
            assert_eq!(layout.title, "Counter");
            assert_eq!(
                layout.padding,
                Padding {
                    top: 47.0,
                    bottom: 34.0,
                    left: 0.0,
                    right: 0.0
                }
            );
        }
        FrameView::Loading => panic!("expected ready view"),
    }
}
