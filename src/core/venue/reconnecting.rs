//! Reconnecting wrapper for book streams.
//!
//! Adds automatic reconnection with capped exponential backoff and jitter
//! to any [`BookStream`] implementation. Subscriptions are replayed after a
//! successful reconnect.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::core::domain::{MarketId, VenueId};
use crate::core::venue::{BookStream, VenueEvent};
use crate::error::VenueError;

/// Reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// First retry delay.
    pub initial_delay_ms: u64,
    /// Backoff cap.
    pub max_delay_ms: u64,
    /// Multiplier applied after each failed attempt.
    pub backoff_multiplier: f64,
    /// Uniform jitter fraction applied to each delay (0.1 = ±10%).
    pub jitter: f64,
    /// Consecutive failures before the wrapper reports the venue down.
    pub down_after_failures: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: 0.1,
            down_after_failures: 3,
        }
    }
}

/// Wrapper that adds reconnection logic to any [`BookStream`].
pub struct ReconnectingBookStream<S: BookStream> {
    inner: S,
    policy: ReconnectPolicy,
    subscribed: Vec<MarketId>,
    consecutive_failures: u32,
    current_delay_ms: u64,
    connected: bool,
}

impl<S: BookStream> ReconnectingBookStream<S> {
    /// Create a new reconnecting wrapper.
    pub fn new(inner: S, policy: ReconnectPolicy) -> Self {
        let initial = policy.initial_delay_ms;
        Self {
            inner,
            policy,
            subscribed: Vec::new(),
            consecutive_failures: 0,
            current_delay_ms: initial,
            connected: false,
        }
    }

    /// Consecutive failed reconnect attempts so far.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn reset_backoff(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.policy.initial_delay_ms;
    }

    fn next_delay(&mut self) -> Duration {
        let jitter_span = self.current_delay_ms as f64 * self.policy.jitter;
        let jittered = self.current_delay_ms as f64
            + rand::thread_rng().gen_range(-jitter_span..=jitter_span);
        let delay = Duration::from_millis(jittered.max(0.0) as u64);

        let next = (self.current_delay_ms as f64 * self.policy.backoff_multiplier) as u64;
        self.current_delay_ms = next.min(self.policy.max_delay_ms);
        delay
    }

    async fn reconnect(&mut self) -> Result<(), VenueError> {
        let delay = self.next_delay();
        info!(
            venue = %self.inner.venue(),
            delay_ms = delay.as_millis(),
            attempt = self.consecutive_failures + 1,
            "Reconnecting after delay"
        );
        sleep(delay).await;

        match self.inner.connect().await {
            Ok(()) => {
                info!(venue = %self.inner.venue(), "Reconnected");
                self.connected = true;
                if !self.subscribed.is_empty() {
                    debug!(
                        venue = %self.inner.venue(),
                        markets = self.subscribed.len(),
                        "Resubscribing"
                    );
                    self.inner.subscribe(&self.subscribed).await?;
                }
                self.reset_backoff();
                Ok(())
            }
            Err(e) => {
                error!(venue = %self.inner.venue(), error = %e, "Reconnection failed");
                self.consecutive_failures += 1;
                self.connected = false;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<S: BookStream + Send> BookStream for ReconnectingBookStream<S> {
    async fn connect(&mut self) -> Result<(), VenueError> {
        let result = self.inner.connect().await;
        if result.is_ok() {
            self.connected = true;
            self.reset_backoff();
        }
        result
    }

    async fn subscribe(&mut self, markets: &[MarketId]) -> Result<(), VenueError> {
        for market in markets {
            if !self.subscribed.contains(market) {
                self.subscribed.push(market.clone());
            }
        }
        self.inner.subscribe(markets).await
    }

    async fn unsubscribe(&mut self, markets: &[MarketId]) -> Result<(), VenueError> {
        self.subscribed.retain(|m| !markets.contains(m));
        self.inner.unsubscribe(markets).await
    }

    async fn next_event(&mut self) -> Option<VenueEvent> {
        loop {
            if !self.connected {
                if let Err(e) = self.reconnect().await {
                    // Surface the failure so the health board can flag the
                    // venue; the loop keeps retrying.
                    if self.consecutive_failures == self.policy.down_after_failures {
                        warn!(
                            venue = %self.inner.venue(),
                            failures = self.consecutive_failures,
                            "Repeated reconnect failures"
                        );
                    }
                    return Some(VenueEvent::Disconnected {
                        reason: e.to_string(),
                    });
                }
                return Some(VenueEvent::Connected);
            }

            match self.inner.next_event().await {
                Some(VenueEvent::Disconnected { reason }) => {
                    warn!(venue = %self.inner.venue(), reason = %reason, "Stream disconnected");
                    self.connected = false;
                    return Some(VenueEvent::Disconnected { reason });
                }
                Some(event) => return Some(event),
                None => {
                    // Inner stream closed; treat as a disconnect and retry.
                    self.connected = false;
                    return Some(VenueEvent::Disconnected {
                        reason: "stream closed".to_string(),
                    });
                }
            }
        }
    }

    fn venue(&self) -> &VenueId {
        self.inner.venue()
    }
}
