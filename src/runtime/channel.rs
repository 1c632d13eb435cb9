use super::{FrameRuntime, RuntimeError, RuntimeEvent};
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

/// Runtime that forwards every event into a channel.
///
/// The CLI output loop and the tests sit on the receiving end.
pub struct ChannelRuntime {
    event_tx: RwLock<Option<mpsc::UnboundedSender<RuntimeEvent>>>,
    interactive: bool,
}

impl ChannelRuntime {
    pub fn new(event_tx: mpsc::UnboundedSender<RuntimeEvent>, interactive: bool) -> Self {
        Self {
            event_tx: RwLock::new(Some(event_tx)),
            interactive,
        }
    }

    /// Runtime plus its receiving end, for headless use.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<RuntimeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, false), rx)
    }
}

#[async_trait]
impl FrameRuntime for ChannelRuntime {
    fn emit(&self, event: RuntimeEvent) -> Result<(), RuntimeError> {
        let guard = self.event_tx.read();
        let tx = guard
            .as_ref()
            .ok_or_else(|| RuntimeError::EmitFailed("runtime is shut down".to_string()))?;
        tx.send(event).map_err(|_| RuntimeError::ReceiverClosed)?;
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn shutdown(&self) -> Result<(), RuntimeError> {
        // Dropping the sender lets the consumer drain and exit
        self.event_tx.write().take();
        Ok(())
    }
}
