//! JSON message protocol spoken with a real host.
//!
//! The frame sends `request` messages; the host answers each with a
//! `response` carrying the same id, and pushes `event` messages at any time:
//!
//! ```text
//! frame -> host  {"type":"request","id":1,"method":"addFrame","params":{}}
//! host  -> frame {"type":"response","id":1,"error":{"kind":"rejected_by_user","message":"user cancelled"}}
//! host  -> frame {"type":"event","payload":{"event":"frameRemoved"}}
//! ```
//!
//! The transport is a pair of tokio channels, so the same host works over
//! stdio, a socket, or an in-memory pipe in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::listeners::ListenerRegistry;
use super::{
    AddFrameError, AddFrameErrorKind, FrameHost, HostError, HostEvent, HostEventKind,
    HostListener, HostNotificationStatus, ListenerId, ReadyOptions, SessionContext,
};

/// Messages sent from the frame to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameMessage {
    Request {
        id: u64,
        method: HostMethod,
        #[serde(default)]
        params: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostMethod {
    Context,
    Ready,
    AddFrame,
    EnableNotifications,
    GetNotificationStatus,
}

impl HostMethod {
    /// Methods answered only after the user acts on a host prompt.
    ///
    /// These are not bounded by the request timeout; a lost host still fails
    /// them through the pending map when the transport closes.
    pub fn awaits_user(self) -> bool {
        matches!(self, HostMethod::AddFrame | HostMethod::EnableNotifications)
    }
}

/// Messages sent from the host to the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Response {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<WireError>,
    },
    Event {
        payload: HostEvent,
    },
}

/// Error body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    /// Machine-readable cause, e.g. `rejected_by_user`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub message: String,
}

type PendingMap = HashMap<u64, oneshot::Sender<Result<Value, WireError>>>;

pub struct WireHost {
    outbound: mpsc::UnboundedSender<FrameMessage>,
    pending: Arc<Mutex<PendingMap>>,
    /// Set by the reader once the inbound side is gone
    closed: Arc<AtomicBool>,
    listeners: Arc<ListenerRegistry>,
    next_id: AtomicU64,
    timeout: Duration,
    reader: JoinHandle<()>,
}

impl WireHost {
    /// Connect to a host over a message channel pair.
    ///
    /// Spawns the reader task, so this must be called within a tokio runtime.
    pub fn connect(
        outbound: mpsc::UnboundedSender<FrameMessage>,
        inbound: mpsc::UnboundedReceiver<HostMessage>,
        timeout: Duration,
    ) -> Self {
        let pending: Arc<Mutex<PendingMap>> = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let listeners = Arc::new(ListenerRegistry::new());

        let reader = tokio::spawn(run_reader(
            inbound,
            pending.clone(),
            closed.clone(),
            listeners.clone(),
        ));

        Self {
            outbound,
            pending,
            closed,
            listeners,
            next_id: AtomicU64::new(1),
            timeout,
            reader,
        }
    }

    /// Whether the host side of the transport has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn request(&self, method: HostMethod, params: Value) -> Result<Value, RequestFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        // Insert under the same lock the reader takes when closing
        {
            let mut pending = self.pending.lock();
            if self.closed.load(Ordering::SeqCst) {
                return Err(RequestFailure::Local(HostError::Disconnected));
            }
            pending.insert(id, tx);
        }

        tracing::debug!("Host request {} {:?}", id, method);
        if self
            .outbound
            .send(FrameMessage::Request { id, method, params })
            .is_err()
        {
            self.pending.lock().remove(&id);
            return Err(RequestFailure::Local(HostError::Disconnected));
        }

        let reply = if method.awaits_user() {
            rx.await
        } else {
            match tokio::time::timeout(self.timeout, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.pending.lock().remove(&id);
                    return Err(RequestFailure::Local(HostError::Timeout(
                        self.timeout.as_secs(),
                    )));
                }
            }
        };

        match reply {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(RequestFailure::Remote(error)),
            // Sender dropped: reader shut down
            Err(_) => Err(RequestFailure::Local(HostError::Disconnected)),
        }
    }

    /// Request where a remote error is not specially classified.
    async fn call(&self, method: HostMethod, params: Value) -> Result<Value, HostError> {
        self.request(method, params).await.map_err(|e| match e {
            RequestFailure::Local(e) => e,
            RequestFailure::Remote(e) => HostError::Rpc(e.message),
        })
    }
}

/// Failure of a single request before classification.
enum RequestFailure {
    Local(HostError),
    Remote(WireError),
}

impl Drop for WireHost {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn run_reader(
    mut inbound: mpsc::UnboundedReceiver<HostMessage>,
    pending: Arc<Mutex<PendingMap>>,
    closed: Arc<AtomicBool>,
    listeners: Arc<ListenerRegistry>,
) {
    while let Some(message) = inbound.recv().await {
        match message {
            HostMessage::Response { id, result, error } => {
                let Some(tx) = pending.lock().remove(&id) else {
                    tracing::warn!("Dropping host response for unknown request {}", id);
                    continue;
                };
                let outcome = match error {
                    Some(error) => Err(error),
                    None => Ok(result.unwrap_or(Value::Null)),
                };
                // Receiver gone means the request already timed out
                let _ = tx.send(outcome);
            }
            HostMessage::Event { payload } => {
                listeners.dispatch(&payload);
            }
        }
    }

    tracing::info!("Host transport closed");
    let mut pending = pending.lock();
    closed.store(true, Ordering::SeqCst);
    // Dropping the senders fails every outstanding request
    pending.clear();
}

#[async_trait]
impl FrameHost for WireHost {
    async fn context(&self) -> Result<Option<SessionContext>, HostError> {
        let value = self.call(HostMethod::Context, Value::Object(Default::default())).await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn ready(&self, options: ReadyOptions) -> Result<(), HostError> {
        self.call(HostMethod::Ready, serde_json::to_value(options)?)
            .await
            .map(|_| ())
    }

    async fn add_frame(&self) -> Result<(), HostError> {
        match self
            .request(HostMethod::AddFrame, Value::Object(Default::default()))
            .await
        {
            Ok(_) => Ok(()),
            Err(RequestFailure::Local(e)) => Err(e),
            Err(RequestFailure::Remote(e)) => Err(AddFrameError::new(
                AddFrameErrorKind::from_wire(e.kind.as_deref()),
                e.message,
            )
            .into()),
        }
    }

    async fn enable_notifications(&self) -> Result<(), HostError> {
        self.call(
            HostMethod::EnableNotifications,
            Value::Object(Default::default()),
        )
        .await
        .map(|_| ())
    }

    async fn get_notification_status(&self) -> Result<HostNotificationStatus, HostError> {
        let value = self
            .call(
                HostMethod::GetNotificationStatus,
                Value::Object(Default::default()),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    fn on(&self, kind: HostEventKind, listener: HostListener) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn off(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn remove_all_listeners(&self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        host: WireHost,
        requests: mpsc::UnboundedReceiver<FrameMessage>,
        replies: mpsc::UnboundedSender<HostMessage>,
    }

    fn harness(timeout: Duration) -> Harness {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        Harness {
            host: WireHost::connect(out_tx, in_rx, timeout),
            requests: out_rx,
            replies: in_tx,
        }
    }

    /// Answer the next request with `reply(method)`.
    fn answer_next(
        mut requests: mpsc::UnboundedReceiver<FrameMessage>,
        replies: mpsc::UnboundedSender<HostMessage>,
        reply: impl FnOnce(HostMethod, Value) -> (Option<Value>, Option<WireError>) + Send + 'static,
    ) -> JoinHandle<mpsc::UnboundedReceiver<FrameMessage>> {
        tokio::spawn(async move {
            let FrameMessage::Request { id, method, params } = requests.recv().await.unwrap();
            let (result, error) = reply(method, params);
            replies
                .send(HostMessage::Response { id, result, error })
                .unwrap();
            requests
        })
    }

    #[test]
    fn test_request_wire_shape() {
        let json = serde_json::to_value(FrameMessage::Request {
            id: 7,
            method: HostMethod::GetNotificationStatus,
            params: serde_json::json!({}),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "request",
                "id": 7,
                "method": "getNotificationStatus",
                "params": {}
            })
        );
    }

    #[test]
    fn test_event_message_parses() {
        let msg: HostMessage =
            serde_json::from_str(r#"{"type":"event","payload":{"event":"primaryButtonClicked"}}"#)
                .unwrap();
        assert_eq!(
            msg,
            HostMessage::Event {
                payload: HostEvent::PrimaryButtonClicked
            }
        );
    }

    #[tokio::test]
    async fn test_context_round_trip() {
        let h = harness(Duration::from_secs(5));
        let responder = answer_next(h.requests, h.replies.clone(), |method, _| {
            assert_eq!(method, HostMethod::Context);
            (
                Some(serde_json::json!({"client": {"added": true, "clientFid": 9152}})),
                None,
            )
        });

        let ctx = h.host.context().await.unwrap().unwrap();
        assert!(ctx.client.added);
        assert_eq!(ctx.client.client_fid, 9152);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_null_context_is_none() {
        let h = harness(Duration::from_secs(5));
        let responder = answer_next(h.requests, h.replies.clone(), |_, _| (None, None));

        assert!(h.host.context().await.unwrap().is_none());
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_ready_sends_empty_payload() {
        let h = harness(Duration::from_secs(5));
        let responder = answer_next(h.requests, h.replies.clone(), |method, params| {
            assert_eq!(method, HostMethod::Ready);
            assert_eq!(params, serde_json::json!({}));
            (None, None)
        });

        h.host.ready(ReadyOptions::default()).await.unwrap();
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_add_frame_error_is_classified() {
        let h = harness(Duration::from_secs(5));
        let responder = answer_next(h.requests, h.replies.clone(), |_, _| {
            (
                None,
                Some(WireError {
                    kind: Some("invalid_domain_manifest".to_string()),
                    message: "domain mismatch".to_string(),
                }),
            )
        });

        match h.host.add_frame().await {
            Err(HostError::AddFrame(e)) => {
                assert_eq!(e.kind, AddFrameErrorKind::InvalidDomainManifest);
                assert_eq!(e.message, "domain mismatch");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_status_error_is_rpc() {
        let h = harness(Duration::from_secs(5));
        let responder = answer_next(h.requests, h.replies.clone(), |_, _| {
            (
                None,
                Some(WireError {
                    kind: None,
                    message: "not supported".to_string(),
                }),
            )
        });

        assert!(matches!(
            h.host.get_notification_status().await,
            Err(HostError::Rpc(msg)) if msg == "not supported"
        ));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let h = harness(Duration::from_millis(50));
        let result = h.host.get_notification_status().await;
        assert!(matches!(result, Err(HostError::Timeout(_))));
        assert!(h.host.pending.lock().is_empty());
        drop(h.requests);
    }

    #[tokio::test]
    async fn test_prompts_outlive_request_timeout() {
        let h = harness(Duration::from_millis(50));
        let mut requests = h.requests;
        let replies = h.replies;
        let responder = tokio::spawn(async move {
            let FrameMessage::Request { id, method, .. } = requests.recv().await.unwrap();
            assert_eq!(method, HostMethod::EnableNotifications);
            tokio::time::sleep(Duration::from_millis(200)).await;
            replies
                .send(HostMessage::Response {
                    id,
                    result: None,
                    error: None,
                })
                .unwrap();
            requests
        });

        h.host.enable_notifications().await.unwrap();
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_prompt_fails_when_host_leaves() {
        let h = harness(Duration::from_millis(50));
        let mut requests = h.requests;
        let replies = h.replies;
        let leaver = tokio::spawn(async move {
            let _ = requests.recv().await.unwrap();
            tokio::time::sleep(Duration::from_millis(150)).await;
            drop(replies);
            requests
        });

        let result = h.host.add_frame().await;
        assert!(matches!(result, Err(HostError::Disconnected)));
        assert!(h.host.pending.lock().is_empty());
        leaver.await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_add_prompt_is_not_reported_as_failure() {
        use crate::controller::FrameController;
        use crate::runtime::{ChannelRuntime, RuntimeEvent, ToastVariant};
        use crate::view::FrameOptions;

        let Harness {
            host,
            mut requests,
            replies,
        } = harness(Duration::from_millis(100));

        // The user takes longer than the request timeout to confirm the add
        let responder = tokio::spawn(async move {
            while let Some(FrameMessage::Request { id, method, .. }) = requests.recv().await {
                let result = match method {
                    HostMethod::Context => Some(serde_json::json!({"client": {"added": false}})),
                    HostMethod::GetNotificationStatus => Some(serde_json::json!("disabled")),
                    HostMethod::AddFrame => {
                        let replies = replies.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_millis(300)).await;
                            let _ = replies.send(HostMessage::Response {
                                id,
                                result: None,
                                error: None,
                            });
                            let _ = replies.send(HostMessage::Event {
                                payload: HostEvent::FrameAdded {
                                    notification_details: None,
                                },
                            });
                        });
                        continue;
                    }
                    _ => None,
                };
                let _ = replies.send(HostMessage::Response {
                    id,
                    result,
                    error: None,
                });
            }
        });

        let (runtime, mut events) = ChannelRuntime::pair();
        let controller =
            FrameController::new(Arc::new(host), Arc::new(runtime), FrameOptions::default());
        controller.load().await;

        assert_eq!(controller.add_frame_result(), "");
        tokio::time::timeout(Duration::from_secs(1), async {
            while !controller.added() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        while let Ok(event) = events.try_recv() {
            if let RuntimeEvent::Toast(toast) = event {
                assert_ne!(toast.variant, ToastVariant::Destructive, "{:?}", toast);
            }
        }

        controller.teardown();
        drop(controller);
        responder.abort();
    }

    #[tokio::test]
    async fn test_closed_transport_fails_requests() {
        let h = harness(Duration::from_secs(5));
        drop(h.replies);

        let result = h.host.get_notification_status().await;
        assert!(matches!(result, Err(HostError::Disconnected)));
        assert!(h.host.is_closed());
    }

    #[tokio::test]
    async fn test_events_reach_listeners() {
        let h = harness(Duration::from_secs(5));
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        h.host.on(
            HostEventKind::FrameRemoved,
            Arc::new(move |event: &HostEvent| {
                let _ = seen_tx.send(event.clone());
            }),
        );

        h.replies
            .send(HostMessage::Event {
                payload: HostEvent::FrameRemoved,
            })
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, HostEvent::FrameRemoved);
    }
}
