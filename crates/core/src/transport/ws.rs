//! Websocket [`Transport`] over `tokio-tungstenite`.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::Transport;
use crate::error::TransportError;

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Connect and complete the upgrade handshake.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (stream, response) = connect_async(url).await?;
        debug!(status = %response.status(), "websocket handshake complete");
        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                // Binary frames must still carry UTF-8 JSON.
                Ok(Message::Binary(bytes)) => {
                    return Some(String::from_utf8(bytes).map_err(TransportError::from))
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "close frame received");
                    return None;
                }
                Ok(other) => trace!(?other, "control frame ignored"),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn binary_frames_must_be_utf8() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Binary(vec![0xff, 0xfe])).await.unwrap();
            ws.send(Message::Binary(br#"{"changes":[]}"#.to_vec()))
                .await
                .unwrap();
            // Hold the socket open until the client hangs up.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut client = WsTransport::connect(&format!("ws://{addr}/ws"))
            .await
            .unwrap();
        assert!(matches!(
            client.recv().await,
            Some(Err(TransportError::InvalidUtf8(_)))
        ));
        assert_eq!(
            client.recv().await.unwrap().unwrap(),
            r#"{"changes":[]}"#
        );

        client.close().await.unwrap();
        server.await.unwrap();
    }
}
