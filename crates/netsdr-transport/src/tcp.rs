use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::traits::{ControlTransport, HandlerSlot, MessageHandler};

/// TCP port a NetSDR receiver listens on for control connections.
pub const DEFAULT_CONTROL_PORT: u16 = 50000;

/// Configuration for the TCP control channel.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// `host:port` of the receiver.
    pub addr: String,
    /// Upper bound on establishing the connection.
    pub connect_timeout: Duration,
}

impl TcpConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            ..Self::default()
        }
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{DEFAULT_CONTROL_PORT}"),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

type SharedWriter = Arc<tokio::sync::Mutex<OwnedWriteHalf>>;

/// Control channel over a TCP stream.
///
/// Inbound bytes are split into whole messages by the decoder `D` and handed
/// to the registered [`MessageHandler`] from a background reader task.
pub struct TcpControlTransport<D> {
    config: TcpConfig,
    codec: D,
    connected: Arc<AtomicBool>,
    writer: Mutex<Option<SharedWriter>>,
    reader_cancel: Mutex<Option<CancellationToken>>,
    handler: Arc<HandlerSlot>,
}

impl<D> TcpControlTransport<D> {
    /// Create a disconnected transport.
    pub fn new(config: TcpConfig, codec: D) -> Self {
        Self {
            config,
            codec,
            connected: Arc::new(AtomicBool::new(false)),
            writer: Mutex::new(None),
            reader_cancel: Mutex::new(None),
            handler: Arc::new(HandlerSlot::default()),
        }
    }

    /// Transport configuration.
    pub fn config(&self) -> &TcpConfig {
        &self.config
    }
}

impl<D> Drop for TcpControlTransport<D> {
    fn drop(&mut self) {
        if let Some(cancel) = lock(&self.reader_cancel).take() {
            cancel.cancel();
        }
    }
}

impl<D> fmt::Debug for TcpControlTransport<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpControlTransport")
            .field("addr", &self.config.addr)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl<D> ControlTransport for TcpControlTransport<D>
where
    D: Decoder<Item = Bytes> + Clone + Send + Sync + 'static,
    D::Error: fmt::Display + Send,
{
    async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let addr = self.config.addr.clone();
        let timeout = self.config.connect_timeout;
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(TransportError::Connect { addr, source }),
            Err(_) => return Err(TransportError::Timeout { addr, timeout }),
        };
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        let cancel = CancellationToken::new();

        *lock(&self.writer) = Some(Arc::new(tokio::sync::Mutex::new(write_half)));
        if let Some(previous) = lock(&self.reader_cancel).replace(cancel.clone()) {
            previous.cancel();
        }
        self.connected.store(true, Ordering::SeqCst);

        tokio::spawn(read_loop(
            FramedRead::new(read_half, self.codec.clone()),
            Arc::clone(&self.handler),
            Arc::clone(&self.connected),
            cancel,
        ));

        info!(%addr, "control channel connected");
        Ok(())
    }

    fn disconnect(&self) {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        if let Some(cancel) = lock(&self.reader_cancel).take() {
            cancel.cancel();
        }
        let _ = lock(&self.writer).take();
        if was_connected {
            info!(addr = %self.config.addr, "control channel disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_message(&self, message: &[u8]) -> Result<()> {
        let writer = {
            let guard = lock(&self.writer);
            guard.clone()
        };
        let writer = writer.ok_or(TransportError::NotConnected)?;

        let mut stream = writer.lock().await;
        stream.write_all(message).await?;
        stream.flush().await?;
        trace!(len = message.len(), "control message sent");
        Ok(())
    }

    fn set_message_handler(&self, handler: Option<MessageHandler>) {
        self.handler.set(handler);
    }
}

async fn read_loop<D>(
    mut framed: FramedRead<OwnedReadHalf, D>,
    handler: Arc<HandlerSlot>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
) where
    D: Decoder<Item = Bytes>,
    D::Error: fmt::Display,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = framed.next() => next,
        };

        match next {
            Some(Ok(message)) => {
                trace!(len = message.len(), "control message received");
                if !handler.dispatch(message) {
                    debug!("control message dropped (no handler)");
                }
            }
            Some(Err(err)) => {
                warn!(error = %err, "control stream error");
                break;
            }
            None => {
                info!("control connection closed by peer");
                break;
            }
        }
    }

    if !cancel.is_cancelled() {
        connected.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
