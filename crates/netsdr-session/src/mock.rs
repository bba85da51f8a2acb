//! In-memory transports for session tests.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use netsdr_frame::{encode_data_item, MessageType};
use netsdr_transport::{ControlTransport, DataTransport, MessageHandler, Result, TransportError};

#[derive(Default)]
struct ControlInner {
    connected: AtomicBool,
    echo: AtomicBool,
    fail_sends: AtomicBool,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    sent: Mutex<Vec<Bytes>>,
    canned_reply: Mutex<Option<Bytes>>,
    handler: Mutex<Option<MessageHandler>>,
}

/// Control transport that records what it sends.
///
/// An echoing mock hands every sent message straight back to the handler,
/// which is how a NetSDR acknowledges a set command.
#[derive(Clone, Default)]
pub(crate) struct MockControl {
    inner: Arc<ControlInner>,
}

impl MockControl {
    pub(crate) fn echoing() -> Self {
        let mock = Self::default();
        mock.set_echo(true);
        mock
    }

    pub(crate) fn silent() -> Self {
        Self::default()
    }

    pub(crate) fn set_echo(&self, echo: bool) {
        self.inner.echo.store(echo, Ordering::SeqCst);
    }

    pub(crate) fn fail_sends(&self, fail: bool) {
        self.inner.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    /// Answer every command with `reply` instead of echoing.
    pub(crate) fn reply_with(&self, reply: Bytes) {
        *self.inner.canned_reply.lock().unwrap() = Some(reply);
    }

    pub(crate) fn install(&self, handler: MessageHandler) {
        self.set_message_handler(Some(handler));
    }

    pub(crate) fn has_handler(&self) -> bool {
        self.inner.handler.lock().unwrap().is_some()
    }

    /// Push an inbound control message as if the device sent it.
    pub(crate) fn deliver(&self, message: Bytes) {
        let handler = self.inner.handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(message);
        }
    }

    pub(crate) fn sent(&self) -> Vec<Bytes> {
        self.inner.sent.lock().unwrap().clone()
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.inner.connect_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnect_calls(&self) -> usize {
        self.inner.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlTransport for MockControl {
    async fn connect(&self) -> Result<()> {
        self.inner.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        self.inner.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    async fn send_message(&self, message: &[u8]) -> Result<()> {
        if self.inner.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Io(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        let message = Bytes::copy_from_slice(message);
        self.inner.sent.lock().unwrap().push(message.clone());

        let canned = self.inner.canned_reply.lock().unwrap().clone();
        if let Some(reply) = canned {
            self.deliver(reply);
        } else if self.inner.echo.load(Ordering::SeqCst) {
            self.deliver(message);
        }
        Ok(())
    }

    fn set_message_handler(&self, handler: Option<MessageHandler>) {
        *self.inner.handler.lock().unwrap() = handler;
    }
}

#[derive(Default)]
struct DataInner {
    listening: AtomicBool,
    fail_start: AtomicBool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    handler: Mutex<Option<MessageHandler>>,
}

/// Data transport driven by the test through [`MockData::deliver`].
#[derive(Clone, Default)]
pub(crate) struct MockData {
    inner: Arc<DataInner>,
}

impl MockData {
    pub(crate) fn fail_start(&self, fail: bool) {
        self.inner.fail_start.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn has_handler(&self) -> bool {
        self.inner.handler.lock().unwrap().is_some()
    }

    pub(crate) fn deliver(&self, datagram: Bytes) {
        let handler = self.inner.handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(datagram);
        }
    }

    pub(crate) fn start_calls(&self) -> usize {
        self.inner.start_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_calls(&self) -> usize {
        self.inner.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataTransport for MockData {
    async fn start_listening(&self) -> Result<()> {
        self.inner.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_start.load(Ordering::SeqCst) {
            return Err(TransportError::Bind {
                addr: "0.0.0.0:60000".to_string(),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            });
        }
        self.inner.listening.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_listening(&self) {
        self.inner.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::SeqCst)
    }

    fn set_message_handler(&self, handler: Option<MessageHandler>) {
        *self.inner.handler.lock().unwrap() = handler;
    }
}

/// A DataItem0 datagram carrying 16-bit samples.
pub(crate) fn data_frame(sequence: u16, samples: &[i16]) -> Bytes {
    let body: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    let mut buf = BytesMut::new();
    encode_data_item(MessageType::DataItem0, sequence, &body, &mut buf).unwrap();
    buf.freeze()
}

pub(crate) fn unique_temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "netsdr-session-{tag}-{}-{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
