//! Realtime order-change notifications for the admin board.
//!
//! A database trigger raises `NOTIFY orders_changed` on every insert,
//! update, or delete of an order row. A background task listens on that
//! channel and fans each notification out over a broadcast channel. The
//! board only needs the abstract capability "tell me when an order
//! changed"; consumers call [`OrderEvents::subscribe`] and refetch on each
//! event instead of polling.

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;

/// Postgres NOTIFY channel raised by the orders trigger.
pub const ORDERS_CHANNEL: &str = "orders_changed";

/// Buffered events per subscriber; a lagging subscriber just refetches.
const EVENT_BUFFER: usize = 64;

/// One order-change notification.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    /// Trigger payload: `"<op>:<order id>"`, e.g. `"UPDATE:17"`.
    pub payload: String,
}

/// Fan-out handle for order-change events.
///
/// Cheaply cloneable; every clone shares the same broadcast channel.
#[derive(Clone)]
pub struct OrderEvents {
    tx: broadcast::Sender<OrderEvent>,
}

impl OrderEvents {
    /// Create a new, initially silent event hub.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Subscribe to order changes. The receiver yields every event
    /// published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// Send errors only mean "no subscribers right now" and are ignored.
    pub fn publish(&self, event: OrderEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for OrderEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Listen on the database NOTIFY channel and republish into `events`.
///
/// Runs until the process shuts down. `PgListener` reconnects on its own;
/// a failed `recv` is logged and retried.
///
/// # Errors
///
/// Returns `sqlx::Error` only if the initial LISTEN cannot be established.
pub async fn run_listener(pool: PgPool, events: OrderEvents) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(&pool).await?;
    listener.listen(ORDERS_CHANNEL).await?;
    tracing::info!(channel = ORDERS_CHANNEL, "Order change listener started");

    loop {
        match listener.recv().await {
            Ok(notification) => {
                events.publish(OrderEvent {
                    payload: notification.payload().to_owned(),
                });
            }
            Err(e) => {
                // recv re-establishes the connection on the next call
                tracing::warn!("Order listener recv failed: {e}");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let events = OrderEvents::new();
        let mut rx_a = events.subscribe();
        let mut rx_b = events.subscribe();

        events.publish(OrderEvent {
            payload: "INSERT:1".to_owned(),
        });

        assert_eq!(rx_a.recv().await.unwrap().payload, "INSERT:1");
        assert_eq!(rx_b.recv().await.unwrap().payload, "INSERT:1");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_fine() {
        let events = OrderEvents::new();
        events.publish(OrderEvent {
            payload: "UPDATE:2".to_owned(),
        });

        // A later subscriber does not see past events
        let mut rx = events.subscribe();
        events.publish(OrderEvent {
            payload: "UPDATE:3".to_owned(),
        });
        assert_eq!(rx.recv().await.unwrap().payload, "UPDATE:3");
    }
}
