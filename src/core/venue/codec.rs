//! Canonical JSON book codec.
//!
//! Venues whose bridge already speaks the normalised schema (or an
//! operator-run feed gateway) stream frames this codec decodes directly.
//! Venue-native encodings live in their own plug-in codecs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::core::domain::{BookSnapshot, MarketId, MarketRef, PriceLevel, VenueId};
use crate::core::venue::{BookCodec, VenueEvent};
use crate::error::VenueError;

/// Codec for the canonical frame schema.
///
/// Inbound book frames:
/// ```json
/// {"type":"book","market":"mkt-1","venue_ts":1712345678901,
///  "seq":42,"bids":[["47",100]],"asks":[["49",80]]}
/// ```
pub struct CanonicalJsonCodec {
    venue: VenueId,
}

impl CanonicalJsonCodec {
    /// Create a codec stamping snapshots with the given venue.
    #[must_use]
    pub fn new(venue: impl Into<VenueId>) -> Self {
        Self {
            venue: venue.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Frame {
    Book(BookFrame),
    Heartbeat {},
    Subscribed {},
}

#[derive(Deserialize)]
struct BookFrame {
    market: String,
    venue_ts: i64,
    seq: u64,
    bids: Vec<(Decimal, u64)>,
    asks: Vec<(Decimal, u64)>,
}

impl BookCodec for CanonicalJsonCodec {
    fn subscribe_frames(&self, markets: &[MarketId]) -> Vec<String> {
        let ids: Vec<&str> = markets.iter().map(MarketId::as_str).collect();
        vec![json!({"op": "subscribe", "markets": ids}).to_string()]
    }

    fn unsubscribe_frames(&self, markets: &[MarketId]) -> Vec<String> {
        let ids: Vec<&str> = markets.iter().map(MarketId::as_str).collect();
        vec![json!({"op": "unsubscribe", "markets": ids}).to_string()]
    }

    fn decode(&self, text: &str) -> Result<Option<VenueEvent>, VenueError> {
        let frame: Frame = serde_json::from_str(text)
            .map_err(|e| VenueError::Transport(format!("bad frame: {e}")))?;
        match frame {
            Frame::Book(book) => {
                let venue_ts: DateTime<Utc> = DateTime::from_timestamp_millis(book.venue_ts)
                    .ok_or_else(|| {
                        VenueError::Transport(format!("bad venue_ts {}", book.venue_ts))
                    })?;
                let to_levels = |levels: Vec<(Decimal, u64)>| {
                    levels
                        .into_iter()
                        .map(|(px, size)| PriceLevel::new(px, size))
                        .collect()
                };
                Ok(Some(VenueEvent::Snapshot(BookSnapshot::new(
                    MarketRef::new(self.venue.clone(), book.market),
                    Utc::now(),
                    venue_ts,
                    to_levels(book.bids),
                    to_levels(book.asks),
                    book.seq,
                ))))
            }
            Frame::Heartbeat {} | Frame::Subscribed {} => Ok(None),
        }
    }
}
