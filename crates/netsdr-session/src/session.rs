//! Receiver session: connect and set up, tune, start and stop IQ capture.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use netsdr_frame::{
    decode_data_frame, decode_message, ControlCommand, ControlItem, Message, ReceiverState,
    SampleWidth,
};
use netsdr_transport::{ControlTransport, DataTransport, MessageHandler};
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::correlator::Correlator;
use crate::error::{Result, SessionError};
use crate::sink::SampleSink;

/// Coarse session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Streaming,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Streaming => "streaming",
        })
    }
}

/// Client session for one NetSDR receiver.
///
/// Operations take `&mut self`, so at most one command is in flight per
/// session. Inbound traffic is handled on the transports' tasks: control
/// messages resolve the pending command, data datagrams are decoded and
/// appended to the sample sink.
pub struct Session<C, D>
where
    C: ControlTransport,
    D: DataTransport,
{
    control: Arc<C>,
    data: Arc<D>,
    config: SessionConfig,
    correlator: Arc<Correlator>,
    sink: Arc<SampleSink>,
    streaming: bool,
}

impl<C, D> Session<C, D>
where
    C: ControlTransport,
    D: DataTransport,
{
    /// Build a session over the given transports and install its handlers.
    pub fn new(control: Arc<C>, data: Arc<D>, config: SessionConfig) -> Self {
        let correlator = Arc::new(Correlator::new(config.reply_timeout));
        let sink = Arc::new(SampleSink::new(config.sample_width));

        control.set_message_handler(Some(control_handler(Arc::clone(&correlator))));
        data.set_message_handler(Some(data_handler(
            Arc::clone(&sink),
            config.sample_width,
        )));

        Self {
            control,
            data,
            config,
            correlator,
            sink,
            streaming: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn is_connected(&self) -> bool {
        self.control.is_connected()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn state(&self) -> SessionState {
        if !self.control.is_connected() {
            SessionState::Disconnected
        } else if self.streaming {
            SessionState::Streaming
        } else {
            SessionState::Connected
        }
    }

    /// Samples written to the sink since acquisition last started.
    pub fn samples_written(&self) -> u64 {
        self.sink.samples_written()
    }

    /// Connect the control channel and push the receiver setup.
    ///
    /// A no-op when already connected. A setup command that fails aborts
    /// the remaining setup and is returned; the channel stays connected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.control.is_connected() {
            debug!("control channel already connected");
            return Ok(());
        }

        self.control.connect().await?;
        info!("connected; configuring receiver");

        for command in setup_commands(&self.config) {
            self.send(&command).await?;
        }
        debug!(
            sample_rate = self.config.sample_rate,
            rf_filter = self.config.rf_filter,
            "receiver configured"
        );
        Ok(())
    }

    /// Drop the control connection. Safe in any state.
    ///
    /// Any capture in progress is torn down locally; the receiver is not
    /// told to stop since the channel is gone.
    pub fn disconnect(&mut self) {
        self.correlator.cancel();
        if self.streaming {
            self.data.stop_listening();
            self.close_sink();
            self.streaming = false;
        }
        self.control.disconnect();
        info!("disconnected");
    }

    /// Tell the receiver to start streaming and begin recording samples.
    ///
    /// A missing or garbled reply to the start command is logged and
    /// capture proceeds. If the sink cannot be opened, datagrams are still
    /// received but dropped.
    pub async fn start_acquisition(&mut self) -> Result<()> {
        self.ensure_connected()?;

        let state = ReceiverState::start(self.config.sample_width, self.config.channel_count);
        self.send_unchecked(&ControlCommand::receiver_state(state), "start")
            .await?;

        if let Err(err) = self.sink.open(&self.config.sink_path) {
            warn!(error = %err, "samples will not be recorded");
        }
        if let Err(err) = self.data.start_listening().await {
            self.close_sink();
            return Err(err.into());
        }

        self.streaming = true;
        info!(
            path = %self.config.sink_path.display(),
            width = self.config.sample_width.bits(),
            "IQ acquisition started"
        );
        Ok(())
    }

    /// Tell the receiver to stop and close the sample file.
    ///
    /// Local capture resources are released even when the stop command
    /// cannot be sent; that error is returned afterwards.
    pub async fn stop_acquisition(&mut self) -> Result<()> {
        self.ensure_connected()?;

        let sent = self
            .send_unchecked(&ControlCommand::receiver_state(ReceiverState::stop()), "stop")
            .await;

        self.data.stop_listening();
        self.close_sink();
        self.streaming = false;
        info!(samples = self.sink.samples_written(), "IQ acquisition stopped");
        sent
    }

    /// Tune `channel` to `hz`. Frequencies above 40 bits are truncated.
    pub async fn change_frequency(&mut self, hz: u64, channel: u8) -> Result<Message> {
        let reply = self.send(&ControlCommand::frequency(channel, hz)).await?;
        info!(hz, channel, "frequency changed");
        Ok(reply)
    }

    /// Ask the receiver for the current value of `item`.
    pub async fn query(&mut self, item: ControlItem, params: &[u8]) -> Result<Message> {
        self.send(&ControlCommand::get(item, Bytes::copy_from_slice(params)))
            .await
    }

    /// Send one command and wait for its reply.
    ///
    /// A NAK is a valid reply and is returned as such.
    pub async fn send(&mut self, command: &ControlCommand) -> Result<Message> {
        self.ensure_connected()?;

        let wire = command.encode()?;
        debug!(
            item = %command.item(),
            op = ?command.operation(),
            bytes = %Hex(&wire),
            "sending control command"
        );

        let raw = self.correlator.request(self.control.as_ref(), &wire).await?;
        let reply = decode_message(&raw)?;
        if reply.is_nak() {
            warn!(item = %command.item(), "receiver rejected command");
        }
        Ok(reply)
    }

    /// Send, tolerating reply failures.
    async fn send_unchecked(&mut self, command: &ControlCommand, what: &str) -> Result<()> {
        match self.send(command).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_reply_failure() => {
                warn!(error = %err, command = what, "no usable reply; continuing");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.control.is_connected() {
            Ok(())
        } else {
            warn!("no active connection");
            Err(SessionError::NotConnected)
        }
    }

    fn close_sink(&self) {
        if let Err(err) = self.sink.close() {
            warn!(error = %err, "failed to close sample sink");
        }
    }
}

impl<C, D> Drop for Session<C, D>
where
    C: ControlTransport,
    D: DataTransport,
{
    fn drop(&mut self) {
        self.control.set_message_handler(None);
        self.data.set_message_handler(None);
        self.correlator.cancel();
        if self.streaming {
            self.data.stop_listening();
        }
        self.close_sink();
    }
}

impl<C, D> fmt::Debug for Session<C, D>
where
    C: ControlTransport,
    D: DataTransport,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("sink", &self.sink)
            .finish()
    }
}

fn setup_commands(config: &SessionConfig) -> [ControlCommand; 3] {
    [
        ControlCommand::sample_rate(config.sample_rate),
        ControlCommand::rf_filter(config.rf_filter),
        ControlCommand::ad_modes(config.ad_mode),
    ]
}

fn control_handler(correlator: Arc<Correlator>) -> MessageHandler {
    Arc::new(move |message: Bytes| {
        trace!(bytes = %Hex(&message), "control message received");
        if correlator.resolve(message.clone()) {
            return;
        }
        match decode_message(&message) {
            Ok(msg) => debug!(
                msg_type = ?msg.msg_type,
                item = ?msg.item,
                "unsolicited control message"
            ),
            Err(err) => warn!(error = %err, "malformed unsolicited control message"),
        }
    })
}

fn data_handler(sink: Arc<SampleSink>, width: SampleWidth) -> MessageHandler {
    Arc::new(move |datagram: Bytes| {
        let frame = match decode_data_frame(&datagram) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, len = datagram.len(), "dropping data datagram");
                return;
            }
        };
        trace!(
            sequence = frame.sequence,
            body = %Hex(&frame.body),
            "samples received"
        );

        let samples = frame.samples(width);
        if let Err(err) = sink.append(&samples) {
            warn!(error = %err, "failed to record samples");
        }
    })
}

struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}
