use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::traits::{DataTransport, HandlerSlot, MessageHandler};

/// UDP port a NetSDR receiver streams IQ data to.
pub const DEFAULT_DATA_PORT: u16 = 60000;

const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Sample feed over a UDP socket.
///
/// The socket is bound when listening starts and released when it stops.
/// A restart waits for the previous receive loop to drop its socket before
/// binding again, so a fixed port can be reused.
pub struct UdpDataTransport {
    bind_addr: String,
    listening: Arc<AtomicBool>,
    cancel: Mutex<Option<CancellationToken>>,
    task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
    handler: Arc<HandlerSlot>,
}

impl UdpDataTransport {
    /// Create a transport that will bind `bind_addr` (e.g. `0.0.0.0:60000`).
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            listening: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(None),
            task: Mutex::new(None),
            local_addr: Mutex::new(None),
            handler: Arc::new(HandlerSlot::default()),
        }
    }

    /// Configured bind address.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Address actually bound by the most recent `start_listening`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.local_addr)
    }
}

impl Default for UdpDataTransport {
    fn default() -> Self {
        Self::new(format!("0.0.0.0:{DEFAULT_DATA_PORT}"))
    }
}

impl Drop for UdpDataTransport {
    fn drop(&mut self) {
        if let Some(cancel) = lock(&self.cancel).take() {
            cancel.cancel();
        }
    }
}

impl std::fmt::Debug for UdpDataTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpDataTransport")
            .field("bind_addr", &self.bind_addr)
            .field("listening", &self.listening.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl DataTransport for UdpDataTransport {
    async fn start_listening(&self) -> Result<()> {
        if self.is_listening() {
            debug!(addr = %self.bind_addr, "data channel already listening");
            return Ok(());
        }

        let previous = lock(&self.task).take();
        if let Some(previous) = previous {
            if let Some(cancel) = lock(&self.cancel).take() {
                cancel.cancel();
            }
            if let Err(err) = previous.await {
                warn!(error = %err, "previous data receive loop failed");
            }
        }

        let socket =
            UdpSocket::bind(&self.bind_addr)
                .await
                .map_err(|source| TransportError::Bind {
                    addr: self.bind_addr.clone(),
                    source,
                })?;
        let local = socket.local_addr()?;
        let cancel = CancellationToken::new();

        if let Some(previous) = lock(&self.cancel).replace(cancel.clone()) {
            previous.cancel();
        }
        *lock(&self.local_addr) = Some(local);
        self.listening.store(true, Ordering::SeqCst);

        let task = tokio::spawn(receive_loop(
            socket,
            Arc::clone(&self.handler),
            Arc::clone(&self.listening),
            cancel,
        ));
        *lock(&self.task) = Some(task);

        info!(%local, "data channel listening");
        Ok(())
    }

    fn stop_listening(&self) {
        if let Some(cancel) = lock(&self.cancel).take() {
            cancel.cancel();
            info!(addr = %self.bind_addr, "data channel stopped");
        }
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    fn set_message_handler(&self, handler: Option<MessageHandler>) {
        self.handler.set(handler);
    }
}

async fn receive_loop(
    socket: UdpSocket,
    handler: Arc<HandlerSlot>,
    listening: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => received,
        };

        match received {
            Ok((len, peer)) => {
                trace!(len, %peer, "datagram received");
                handler.dispatch(Bytes::copy_from_slice(&buf[..len]));
            }
            Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::ConnectionReset) => {
                debug!(error = %err, "transient data socket error");
            }
            Err(err) => {
                warn!(error = %err, "data socket receive failed");
                if !cancel.is_cancelled() {
                    listening.store(false, Ordering::SeqCst);
                }
                break;
            }
        }
    }
    debug!("data receive loop finished");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn datagrams_reach_handler() {
        let transport = UdpDataTransport::new("127.0.0.1:0");
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.set_message_handler(Some(Arc::new(move |msg: Bytes| {
            let _ = tx.send(msg);
        })));

        transport.start_listening().await.unwrap();
        assert!(transport.is_listening());
        let target = transport.local_addr().expect("bound address");

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(&[0x08, 0x80, 0x00, 0x00, 1, 2, 3, 4], target)
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("datagram should arrive")
            .expect("channel open");
        assert_eq!(received.len(), 8);

        transport.stop_listening();
        assert!(!transport.is_listening());
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_is_safe_twice() {
        let transport = UdpDataTransport::new("127.0.0.1:0");
        transport.start_listening().await.unwrap();
        let first = transport.local_addr();
        transport.start_listening().await.unwrap();
        assert_eq!(transport.local_addr(), first);

        transport.stop_listening();
        transport.stop_listening();
        assert!(!transport.is_listening());
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let holder = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let taken = holder.local_addr().unwrap().to_string();

        let transport = UdpDataTransport::new(taken.clone());
        let err = transport.start_listening().await.unwrap_err();
        match err {
            TransportError::Bind { addr, .. } => assert_eq!(addr, taken),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!transport.is_listening());
    }

    #[tokio::test]
    async fn restart_rebinds_fixed_port() {
        let fixed = {
            let vacant = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
            vacant.local_addr().unwrap()
        };
        let transport = UdpDataTransport::new(fixed.to_string());

        for _ in 0..3 {
            transport.start_listening().await.unwrap();
            assert!(transport.is_listening());
            assert_eq!(transport.local_addr(), Some(fixed));
            transport.stop_listening();
            assert!(!transport.is_listening());
        }

        transport.start_listening().await.unwrap();
        assert_eq!(transport.local_addr().map(|a| a.port()), Some(fixed.port()));
        transport.stop_listening();
    }

    #[test]
    fn default_binds_standard_data_port() {
        let transport = UdpDataTransport::default();
        assert_eq!(transport.bind_addr(), "0.0.0.0:60000");
        assert!(transport.local_addr().is_none());
    }
}
