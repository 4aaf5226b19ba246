//! In-process publish/subscribe used to tell report views a dataset changed
//! without polling the cache.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

/// Single-process broadcast bus. Publishing is synchronous and never blocks;
/// subscribers that fall behind the channel capacity observe a lag error and
/// simply miss the oldest notifications, which is acceptable for cache
/// refresh signals.
pub struct NotificationBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> NotificationBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    /// Delivers `event` to every live subscriber, in publish order for a
    /// given subscriber. Returns how many subscribers received it; zero when
    /// nobody is listening, which is not an error.
    pub fn publish(&self, event: E) -> usize {
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                trace!("event published with no subscribers");
                0
            }
        }
    }

    /// New subscription; dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_publish_order() {
        let bus: Arc<NotificationBus<u32>> = NotificationBus::new(8);
        let mut rx = bus.subscribe();

        assert_eq!(bus.publish(1), 1);
        assert_eq!(bus.publish(2), 1);

        assert_eq!(rx.recv().await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus: Arc<NotificationBus<&'static str>> = NotificationBus::new(4);
        assert_eq!(bus.publish("updated"), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn each_subscriber_sees_every_event() {
        let bus: Arc<NotificationBus<u8>> = NotificationBus::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.publish(7), 2);
        assert_eq!(a.recv().await.unwrap(), 7);
        assert_eq!(b.recv().await.unwrap(), 7);
    }
}
