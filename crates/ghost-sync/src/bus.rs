//! The broadcast bus between cooperating processes.

use async_trait::async_trait;
use ghost_core::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of the loopback broadcast channel.
const BUS_CHANNEL_CAPACITY: usize = 1024;

/// One invalidation on the wire.
///
/// `key` is the canonical `{kind}::{path}` cache key spelling; `origin`
/// identifies the publishing process so receivers can treat their own
/// messages as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationMessage {
    /// Identity of the publishing process.
    pub origin: Uuid,
    /// Wire-level cache key.
    pub key: String,
}

/// A reliable broadcast primitive between cooperating processes.
///
/// Any pub/sub transport (message queue, RPC fan-out) slots in behind this
/// trait; the workspace ships [`LoopbackBus`] for single-host deployments
/// and tests.
#[async_trait]
pub trait ProcessBus: Send + Sync {
    /// Publishes a message to every cooperating process, the sender
    /// included.
    ///
    /// # Errors
    ///
    /// Transport-specific delivery failures.
    async fn publish(&self, message: InvalidationMessage) -> Result<()>;

    /// Subscribes to the message stream.
    fn subscribe(&self) -> broadcast::Receiver<InvalidationMessage>;
}

/// In-memory bus: the multi-process topology in miniature.
///
/// Every subscriber (including the publisher's own process) receives every
/// message, which is exactly the delivery contract a networked transport
/// must provide.
///
/// # Examples
///
/// ```
/// use ghost_sync::{InvalidationMessage, LoopbackBus, ProcessBus};
/// use uuid::Uuid;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ghost_core::Result<()> {
/// let bus = LoopbackBus::new();
/// let mut rx = bus.subscribe();
///
/// let message = InvalidationMessage {
///     origin: Uuid::new_v4(),
///     key: "buffer::bots/bot-7/bot.config.json".to_string(),
/// };
/// bus.publish(message.clone()).await?;
/// assert_eq!(rx.recv().await.unwrap(), message);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LoopbackBus {
    channel: broadcast::Sender<InvalidationMessage>,
}

impl LoopbackBus {
    /// Creates a new bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (channel, _) = broadcast::channel(BUS_CHANNEL_CAPACITY);
        Self { channel }
    }
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessBus for LoopbackBus {
    async fn publish(&self, message: InvalidationMessage) -> Result<()> {
        // No subscribers is a valid state, not a delivery failure.
        let _ = self.channel.send(message);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<InvalidationMessage> {
        self.channel.subscribe()
    }
}
