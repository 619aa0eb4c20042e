//! Connection lifecycle: `Disconnected -> Connecting -> Open -> Closed | Error`.
//!
//! [`TransportClient`] is a thin handle over a background task that owns the
//! socket. Outbound commands go through an unbounded channel; inbound frames
//! are decoded in the task and delivered as [`Inbound`] events on a bounded
//! channel. Sends are fire-and-forget with no retry. `Closed` and `Error` are
//! terminal: there is no reconnect.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{ProtocolError, TransportError};
use crate::protocol::{decode_frame, Command, Payload};

pub mod ws;

pub use ws::WsTransport;

/// Capacity of the inbound event channel.
const INBOUND_CHANNEL_CAPACITY: usize = 256;

/// A connected, message-oriented, bidirectional text channel.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame. `None` means the peer closed the channel.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Anything commands can be handed to.
pub trait CommandSink {
    fn send_command(&self, cmd: Command) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
    Error,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Error)
    }
}

/// Event delivered from the transport task.
#[derive(Debug)]
pub enum Inbound {
    Payload(Payload),
    /// A frame that failed to decode.
    Malformed(ProtocolError),
    /// The peer closed the connection.
    Closed,
    /// The connection failed.
    Failed(TransportError),
}

pub struct TransportClient {
    outbound: Option<mpsc::UnboundedSender<String>>,
    state: Arc<watch::Sender<ConnectionState>>,
    task: Option<JoinHandle<()>>,
}

impl Default for TransportClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClient {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            outbound: None,
            state: Arc::new(state),
            task: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Open a websocket to `url`. Resolves once the handshake has completed;
    /// commands sent before that fail with [`TransportError::NotConnected`].
    pub async fn connect(&mut self, url: &str) -> Result<mpsc::Receiver<Inbound>, TransportError> {
        self.state.send_replace(ConnectionState::Connecting);
        info!(url, "connecting");
        match WsTransport::connect(url).await {
            Ok(transport) => Ok(self.attach(transport)),
            Err(e) => {
                error!(url, error = %e, "connect failed");
                self.state.send_replace(ConnectionState::Error);
                Err(e)
            }
        }
    }

    /// Take ownership of an already-connected transport and start the I/O task.
    #[must_use = "the inbound receiver carries every server frame"]
    pub fn attach(&mut self, transport: impl Transport) -> mpsc::Receiver<Inbound> {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);

        self.state.send_replace(ConnectionState::Open);
        info!("connection open");

        self.outbound = Some(out_tx);
        self.task = Some(tokio::spawn(transport_loop(
            transport,
            out_rx,
            in_tx,
            Arc::clone(&self.state),
        )));
        in_rx
    }

    /// Serialize and queue a command. At most once, no acknowledgement.
    pub fn send(&self, cmd: Command) -> Result<(), TransportError> {
        if self.state() != ConnectionState::Open {
            return Err(TransportError::NotConnected);
        }
        let outbound = self.outbound.as_ref().ok_or(TransportError::NotConnected)?;
        let text = cmd.encode()?;
        debug!(%text, "send");
        outbound
            .send(text)
            .map_err(|_| TransportError::NotConnected)
    }

    /// Close the channel and wait for the I/O task to finish.
    pub async fn shutdown(&mut self) {
        self.outbound = None;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "transport task ended abnormally");
            }
        }
    }
}

impl CommandSink for TransportClient {
    fn send_command(&self, cmd: Command) -> Result<(), TransportError> {
        self.send(cmd)
    }
}

async fn transport_loop(
    mut transport: impl Transport,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::Sender<Inbound>,
    state: Arc<watch::Sender<ConnectionState>>,
) {
    loop {
        tokio::select! {
            msg = outbound.recv() => match msg {
                Some(text) => {
                    if let Err(e) = transport.send(text).await {
                        error!(error = %e, "send failed");
                        state.send_replace(ConnectionState::Error);
                        let _ = inbound.send(Inbound::Failed(e)).await;
                        break;
                    }
                }
                None => {
                    debug!("client handle dropped, closing");
                    if let Err(e) = transport.close().await {
                        debug!(error = %e, "close failed");
                    }
                    state.send_replace(ConnectionState::Closed);
                    break;
                }
            },
            frame = transport.recv() => match frame {
                Some(Ok(text)) => {
                    let event = match decode_frame(&text) {
                        Ok(payload) => Inbound::Payload(payload),
                        Err(e) => Inbound::Malformed(e),
                    };
                    if inbound.send(event).await.is_err() {
                        debug!("inbound receiver dropped, closing");
                        if let Err(e) = transport.close().await {
                            debug!(error = %e, "close failed");
                        }
                        state.send_replace(ConnectionState::Closed);
                        break;
                    }
                }
                Some(Err(e)) => {
                    error!(error = %e, "receive failed");
                    state.send_replace(ConnectionState::Error);
                    let _ = inbound.send(Inbound::Failed(e)).await;
                    break;
                }
                None => {
                    warn!("connection closed by server");
                    state.send_replace(ConnectionState::Closed);
                    let _ = inbound.send(Inbound::Closed).await;
                    break;
                }
            },
        }
    }
    debug!("transport loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::GridSize;
    use crate::testing::MockTransport;

    #[tokio::test]
    async fn send_before_open_is_not_connected() {
        let client = TransportClient::new();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(matches!(
            client.send(Command::Play),
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn commands_reach_the_wire_in_order() {
        let (transport, mut remote) = MockTransport::pair();
        let mut client = TransportClient::new();
        let _inbound = client.attach(transport);
        assert_eq!(client.state(), ConnectionState::Open);

        client.send(Command::Init(GridSize::new(4, 3))).unwrap();
        client.send(Command::Play).unwrap();

        assert_eq!(
            remote.next_sent().await.as_deref(),
            Some(r#"{"cmd":"init","options":{"w":4,"h":3}}"#)
        );
        assert_eq!(remote.next_sent().await.as_deref(), Some(r#"{"cmd":"play"}"#));
    }

    #[tokio::test]
    async fn frames_are_decoded_into_events() {
        let (transport, remote) = MockTransport::pair();
        let mut client = TransportClient::new();
        let mut inbound = client.attach(transport);

        remote.push(r#"{"type":"init","w":1,"h":1,"state":[[true]],"pause":false}"#);
        remote.push("{oops");

        assert!(matches!(
            inbound.recv().await,
            Some(Inbound::Payload(Payload::Full(_)))
        ));
        assert!(matches!(
            inbound.recv().await,
            Some(Inbound::Malformed(ProtocolError::Json(_)))
        ));
    }

    #[tokio::test]
    async fn server_close_is_terminal() {
        let (transport, remote) = MockTransport::pair();
        let mut client = TransportClient::new();
        let mut state = client.subscribe();
        let mut inbound = client.attach(transport);

        remote.close();
        assert!(matches!(inbound.recv().await, Some(Inbound::Closed)));
        state
            .wait_for(|s| s.is_terminal())
            .await
            .unwrap();
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(matches!(
            client.send(Command::Pause),
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn receive_error_moves_to_error_state() {
        let (transport, remote) = MockTransport::pair();
        let mut client = TransportClient::new();
        let mut inbound = client.attach(transport);

        remote.fail(TransportError::NotConnected);
        assert!(matches!(inbound.recv().await, Some(Inbound::Failed(_))));
        assert_eq!(client.state(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn dropped_receiver_closes_the_connection() {
        let (transport, remote) = MockTransport::pair();
        let mut client = TransportClient::new();
        let mut state = client.subscribe();
        drop(client.attach(transport));

        remote.push(r#"{"changes":[]}"#);
        state
            .wait_for(|s| s.is_terminal())
            .await
            .unwrap();
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(remote.was_closed());
    }

    #[tokio::test]
    async fn shutdown_closes_the_channel() {
        let (transport, _remote) = MockTransport::pair();
        let mut client = TransportClient::new();
        let _inbound = client.attach(transport);

        client.shutdown().await;
        assert_eq!(client.state(), ConnectionState::Closed);
    }
}
