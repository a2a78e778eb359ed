//! Venue adapter layer.
//!
//! ## Adding a New Venue
//!
//! 1. Implement [`BookCodec`] for the venue's feed frames
//! 2. Wrap it in [`WsBookStream`] + [`ReconnectingBookStream`]
//! 3. Implement [`OrderGateway`] over the venue's order API
//!    (a [`RestClient`] handles the HTTP plumbing)
//!
//! The engine depends only on the [`BookStream`] / [`OrderGateway`]
//! capabilities; wire encodings never leak past the codec.

mod codec;
mod health;
mod paper;
mod reconnecting;
mod rest;
mod traits;
mod ws;

pub use codec::CanonicalJsonCodec;
pub use health::{HealthTransition, VenueHealthBoard, VenueStatus};
pub use paper::PaperGateway;
pub use reconnecting::{ReconnectPolicy, ReconnectingBookStream};
pub use rest::RestClient;
pub use traits::{BookStream, OrderGateway, VenueEvent};
pub use ws::{BookCodec, WsBookStream};
