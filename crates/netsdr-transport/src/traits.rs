use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Callback receiving every inbound message, raw and whole.
///
/// Invoked from the transport's receive task; implementations must not block
/// for long and must not call back into the transport.
pub type MessageHandler = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Connection-oriented command/reply channel.
#[async_trait]
pub trait ControlTransport: Send + Sync {
    /// Open the connection. Inbound messages flow to the handler afterwards.
    async fn connect(&self) -> Result<()>;

    /// Close the connection. Safe to call when already disconnected.
    fn disconnect(&self);

    /// Whether the connection is currently open.
    fn is_connected(&self) -> bool;

    /// Write one message. Returns once the bytes are handed to the socket,
    /// not when a reply arrives.
    async fn send_message(&self, message: &[u8]) -> Result<()>;

    /// Install or clear the inbound message handler.
    fn set_message_handler(&self, handler: Option<MessageHandler>);
}

/// Connectionless sample feed.
#[async_trait]
pub trait DataTransport: Send + Sync {
    /// Start the receive loop. Returns once the loop is running; it keeps
    /// delivering datagrams until [`stop_listening`](Self::stop_listening).
    async fn start_listening(&self) -> Result<()>;

    /// Stop the receive loop. Safe to call when not listening.
    fn stop_listening(&self);

    /// Whether the receive loop is running.
    fn is_listening(&self) -> bool;

    /// Install or clear the inbound datagram handler.
    fn set_message_handler(&self, handler: Option<MessageHandler>);
}

/// Shared slot holding the current handler.
#[derive(Default)]
pub(crate) struct HandlerSlot {
    inner: std::sync::Mutex<Option<MessageHandler>>,
}

impl HandlerSlot {
    pub(crate) fn set(&self, handler: Option<MessageHandler>) {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = handler;
    }

    /// Deliver a message to the current handler, outside the lock.
    pub(crate) fn dispatch(&self, message: Bytes) -> bool {
        let handler = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        match handler {
            Some(handler) => {
                handler(message);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn dispatch_without_handler_drops_message() {
        let slot = HandlerSlot::default();
        assert!(!slot.dispatch(Bytes::from_static(b"x")));
    }

    #[test]
    fn dispatch_reaches_installed_handler_until_cleared() {
        let slot = HandlerSlot::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        slot.set(Some(Arc::new(move |msg: Bytes| {
            counter.fetch_add(msg.len(), Ordering::SeqCst);
        })));

        assert!(slot.dispatch(Bytes::from_static(b"abc")));
        slot.set(None);
        assert!(!slot.dispatch(Bytes::from_static(b"abc")));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
