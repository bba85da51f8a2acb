//! Session over the real network transports.

use std::sync::Arc;

use netsdr_frame::MessageCodec;
use netsdr_transport::{TcpConfig, TcpControlTransport, UdpDataTransport};
use tracing::debug;

use crate::config::{NetworkConfig, SessionConfig};
use crate::error::Result;
use crate::session::Session;

/// A session talking TCP for control and UDP for samples.
pub type NetSdrSession = Session<TcpControlTransport<MessageCodec>, UdpDataTransport>;

/// Build an unconnected session for the receiver described by `network`.
pub fn new_session(network: &NetworkConfig, config: SessionConfig) -> NetSdrSession {
    let tcp = TcpConfig {
        connect_timeout: network.connect_timeout,
        ..TcpConfig::new(&network.host, network.control_port)
    };
    debug!(
        control = %tcp.addr,
        data = %network.data_bind,
        "building receiver session"
    );
    let control = TcpControlTransport::new(tcp, MessageCodec::new());
    let data = UdpDataTransport::new(network.data_bind.clone());
    Session::new(Arc::new(control), Arc::new(data), config)
}

/// Build a session and connect it, running the receiver setup.
pub async fn connect(network: &NetworkConfig, config: SessionConfig) -> Result<NetSdrSession> {
    let mut session = new_session(network, config);
    session.connect().await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use netsdr_transport::TransportError;
    use tokio::net::{TcpListener, UdpSocket};

    use super::*;
    use crate::error::SessionError;
    use crate::mock::{data_frame, unique_temp_dir};
    use crate::session::SessionState;

    /// A receiver stand-in that acknowledges every command by echoing it.
    async fn echo_receiver() -> (u16, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            let _ = tokio::io::copy(&mut reader, &mut writer).await;
        });
        (port, task)
    }

    fn network(port: u16) -> NetworkConfig {
        NetworkConfig {
            control_port: port,
            data_bind: "127.0.0.1:0".to_string(),
            connect_timeout: Duration::from_secs(2),
            ..NetworkConfig::new("127.0.0.1")
        }
    }

    #[tokio::test]
    async fn capture_against_echo_receiver() {
        let (port, _receiver) = echo_receiver().await;
        let dir = unique_temp_dir("e2e");
        let config = SessionConfig {
            sink_path: dir.join("samples.bin"),
            ..SessionConfig::default()
        };

        let mut session = connect(&network(port), config).await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);

        session.change_frequency(14_250_000, 0).await.unwrap();
        session.start_acquisition().await.unwrap();

        let target = session.data().local_addr().expect("data socket bound");
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        for seq in 0..3u16 {
            let base = (seq * 4) as i16;
            let frame = data_frame(seq, &[base, base + 1, base + 2, base + 3]);
            device.send_to(&frame, target).await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while session.samples_written() < 12 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("all samples recorded");

        session.stop_acquisition().await.unwrap();
        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);

        let bytes = std::fs::read(dir.join("samples.bin")).unwrap();
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(samples, (0..12).collect::<Vec<i16>>());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let port = {
            let vacant = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            vacant.local_addr().unwrap().port()
        };

        let err = connect(&network(port), SessionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::Connect { .. })
        ));
    }
}
