//! Generic WebSocket transport for venue book feeds.
//!
//! The transport owns the socket, ping/pong upkeep, and subscription
//! bookkeeping; a [`BookCodec`] supplies the venue-specific frames. Venue
//! plug-ins therefore only implement the codec.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::core::domain::{MarketId, VenueId};
use crate::core::venue::{BookStream, VenueEvent};
use crate::error::VenueError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Venue-specific framing for a book feed.
///
/// Implementations translate between the venue's wire messages and the
/// canonical schema. They must stamp `received_at` on decoded snapshots.
pub trait BookCodec: Send + Sync {
    /// Text frames that subscribe to the given markets.
    fn subscribe_frames(&self, markets: &[MarketId]) -> Vec<String>;

    /// Text frames that unsubscribe from the given markets.
    fn unsubscribe_frames(&self, markets: &[MarketId]) -> Vec<String>;

    /// Decode one inbound text frame. `Ok(None)` means a frame the engine
    /// does not care about (heartbeats, acknowledgements).
    fn decode(&self, text: &str) -> Result<Option<VenueEvent>, VenueError>;
}

/// WebSocket-backed [`BookStream`] generic over a venue codec.
pub struct WsBookStream<C: BookCodec> {
    venue: VenueId,
    url: Url,
    codec: C,
    socket: Option<WsStream>,
}

impl<C: BookCodec> WsBookStream<C> {
    /// Create a stream for `venue` at `url` with the given codec.
    #[must_use]
    pub fn new(venue: impl Into<VenueId>, url: Url, codec: C) -> Self {
        Self {
            venue: venue.into(),
            url,
            codec,
            socket: None,
        }
    }

    async fn send_frames(&mut self, frames: Vec<String>) -> Result<(), VenueError> {
        let socket = self
            .socket
            .as_mut()
            .ok_or(VenueError::NotConnected)?;
        for frame in frames {
            socket
                .send(Message::Text(frame))
                .await
                .map_err(|e| VenueError::Transport(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl<C: BookCodec> BookStream for WsBookStream<C> {
    async fn connect(&mut self) -> Result<(), VenueError> {
        info!(venue = %self.venue, url = %self.url, "Connecting book stream");
        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| VenueError::Transport(e.to_string()))?;
        self.socket = Some(socket);
        Ok(())
    }

    async fn subscribe(&mut self, markets: &[MarketId]) -> Result<(), VenueError> {
        debug!(venue = %self.venue, markets = markets.len(), "Subscribing");
        let frames = self.codec.subscribe_frames(markets);
        self.send_frames(frames).await
    }

    async fn unsubscribe(&mut self, markets: &[MarketId]) -> Result<(), VenueError> {
        debug!(venue = %self.venue, markets = markets.len(), "Unsubscribing");
        let frames = self.codec.unsubscribe_frames(markets);
        self.send_frames(frames).await
    }

    async fn next_event(&mut self) -> Option<VenueEvent> {
        loop {
            let socket = self.socket.as_mut()?;
            match socket.next().await {
                Some(Ok(Message::Text(text))) => match self.codec.decode(&text) {
                    Ok(Some(event)) => return Some(event),
                    Ok(None) => trace!(venue = %self.venue, "Ignored frame"),
                    Err(e) => {
                        warn!(venue = %self.venue, error = %e, "Failed to decode frame");
                    }
                },
                Some(Ok(Message::Ping(payload))) => {
                    if socket.send(Message::Pong(payload)).await.is_err() {
                        self.socket = None;
                        return Some(VenueEvent::Disconnected {
                            reason: "pong send failed".to_string(),
                        });
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    self.socket = None;
                    return Some(VenueEvent::Disconnected {
                        reason: frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "close frame".to_string()),
                    });
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.socket = None;
                    return Some(VenueEvent::Disconnected {
                        reason: e.to_string(),
                    });
                }
                None => {
                    self.socket = None;
                    return Some(VenueEvent::Disconnected {
                        reason: "socket closed".to_string(),
                    });
                }
            }
        }
    }

    fn venue(&self) -> &VenueId {
        &self.venue
    }
}
