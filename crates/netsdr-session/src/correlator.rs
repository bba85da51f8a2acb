//! Single-slot request/reply rendezvous.
//!
//! The control channel carries replies and unsolicited messages alike, and
//! NetSDR replies carry no request identifier. The correlator therefore
//! holds at most one pending waiter: the next inbound control message
//! resolves it, whatever that message is. A reply that arrives after its
//! request timed out finds the slot empty and is reported as unmatched.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use netsdr_transport::ControlTransport;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

/// Default reply window.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// At most one outstanding command awaiting its reply.
#[derive(Debug)]
pub struct Correlator {
    slot: Mutex<Option<oneshot::Sender<Bytes>>>,
    timeout: Duration,
}

impl Correlator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            timeout,
        }
    }

    /// Reply window applied to every request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a request is currently waiting for its reply.
    pub fn is_pending(&self) -> bool {
        self.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Send `message` through `transport` and wait for the next inbound
    /// control message.
    ///
    /// The slot is armed before transmitting so a reply delivered during
    /// the send itself is not missed. It is cleared on every outcome.
    pub async fn request<T>(&self, transport: &T, message: &[u8]) -> Result<Bytes>
    where
        T: ControlTransport + ?Sized,
    {
        let reply = self.arm()?;

        if let Err(err) = transport.send_message(message).await {
            self.clear();
            return Err(err.into());
        }

        match tokio::time::timeout(self.timeout, reply).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(SessionError::Cancelled),
            Err(_) => {
                self.clear();
                warn!(timeout = ?self.timeout, "no reply to control command");
                Err(SessionError::RequestTimeout(self.timeout))
            }
        }
    }

    /// Offer an inbound control message to the pending request.
    ///
    /// Returns `false` when nothing was waiting (unsolicited or late reply).
    pub fn resolve(&self, message: Bytes) -> bool {
        let pending = self.lock().take();
        match pending {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    /// Abandon the pending request, if any. Its caller sees `Cancelled`.
    pub fn cancel(&self) -> bool {
        let cancelled = self.lock().take().is_some();
        if cancelled {
            debug!("pending request cancelled");
        }
        cancelled
    }

    fn arm(&self) -> Result<oneshot::Receiver<Bytes>> {
        let mut slot = self.lock();
        // A closed sender belongs to a request whose future was dropped.
        if slot.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(SessionError::CommandInFlight);
        }
        let (tx, rx) = oneshot::channel();
        *slot = Some(tx);
        Ok(rx)
    }

    fn clear(&self) {
        let _ = self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<oneshot::Sender<Bytes>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY_TIMEOUT)
    }
}
