//! Mock venue implementations for testing.
//!
//! - [`ScriptedBookStream`] — pre-loaded connect/subscribe results and
//!   events. Best for: reconnection logic, orchestrator plumbing.
//! - [`MockOrderGateway`] — scripted order behaviours with delayed fills.
//!   Best for: execution state machine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::core::domain::{
    CancelOutcome, Cents, Fill, MarketId, OrderAck, OrderId, OrderIntent, OrderRejection,
    VenueId,
};
use crate::core::venue::{BookStream, OrderGateway, VenueEvent};
use crate::error::VenueError;

// ---------------------------------------------------------------------------
// ScriptedBookStream
// ---------------------------------------------------------------------------

/// A mock stream with scripted connect/subscribe results and a fixed event
/// queue. Each `connect()`/`subscribe()` pops the next scripted result
/// (defaults to `Ok(())` when exhausted).
pub struct ScriptedBookStream {
    venue: VenueId,
    connect_results: VecDeque<Result<(), VenueError>>,
    subscribe_results: VecDeque<Result<(), VenueError>>,
    events: VecDeque<Option<VenueEvent>>,
    connect_count: Arc<AtomicU32>,
    subscribe_count: Arc<AtomicU32>,
}

impl ScriptedBookStream {
    pub fn new(venue: impl Into<VenueId>) -> Self {
        Self {
            venue: venue.into(),
            connect_results: VecDeque::new(),
            subscribe_results: VecDeque::new(),
            events: VecDeque::new(),
            connect_count: Arc::new(AtomicU32::new(0)),
            subscribe_count: Arc::new(AtomicU32::new(0)),
        }
    }

    #[must_use]
    pub fn with_connect_results(mut self, results: Vec<Result<(), VenueError>>) -> Self {
        self.connect_results = results.into();
        self
    }

    #[must_use]
    pub fn with_subscribe_results(mut self, results: Vec<Result<(), VenueError>>) -> Self {
        self.subscribe_results = results.into();
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Vec<Option<VenueEvent>>) -> Self {
        self.events = events.into();
        self
    }

    /// Shared counters for asserting connect/subscribe call counts.
    #[must_use]
    pub fn counts(&self) -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        (self.connect_count.clone(), self.subscribe_count.clone())
    }
}

#[async_trait]
impl BookStream for ScriptedBookStream {
    async fn connect(&mut self) -> Result<(), VenueError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn subscribe(&mut self, _markets: &[MarketId]) -> Result<(), VenueError> {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        self.subscribe_results.pop_front().unwrap_or(Ok(()))
    }

    async fn unsubscribe(&mut self, _markets: &[MarketId]) -> Result<(), VenueError> {
        Ok(())
    }

    async fn next_event(&mut self) -> Option<VenueEvent> {
        self.events.pop_front().flatten()
    }

    fn venue(&self) -> &VenueId {
        &self.venue
    }
}

// ---------------------------------------------------------------------------
// MockOrderGateway
// ---------------------------------------------------------------------------

/// What the gateway should do with the next `place_taker` call.
#[derive(Debug, Clone)]
pub enum PlaceBehavior {
    /// Ack immediately, then emit a full fill after `delay_ms`. `px` of
    /// `None` fills at the order's limit.
    Fill { delay_ms: u64, px: Option<Cents> },
    /// Ack immediately, fill `qty` contracts after `delay_ms`.
    PartialFill {
        delay_ms: u64,
        qty: u64,
        px: Option<Cents>,
    },
    /// Ack after `delay_ms` with no fills (stalls the deadline).
    SlowAck { delay_ms: u64 },
    /// Ack immediately, never fill.
    AckOnly,
    /// Refuse the order synchronously.
    Reject(OrderRejection),
}

/// A scripted order gateway.
///
/// Behaviours pop per placement; when the script is exhausted the default
/// behaviour applies (instant full fill at the limit).
pub struct MockOrderGateway {
    venue: VenueId,
    behaviors: Mutex<VecDeque<PlaceBehavior>>,
    default_behavior: Mutex<PlaceBehavior>,
    fills_tx: broadcast::Sender<Fill>,
    placed: Mutex<Vec<OrderIntent>>,
    cancelled: Mutex<Vec<OrderId>>,
    next_order: AtomicU64,
    fee_per_contract: Mutex<Cents>,
}

impl MockOrderGateway {
    #[must_use]
    pub fn new(venue: impl Into<VenueId>) -> Arc<Self> {
        let (fills_tx, _rx) = broadcast::channel(256);
        Arc::new(Self {
            venue: venue.into(),
            behaviors: Mutex::new(VecDeque::new()),
            default_behavior: Mutex::new(PlaceBehavior::Fill {
                delay_ms: 0,
                px: None,
            }),
            fills_tx,
            placed: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            next_order: AtomicU64::new(1),
            fee_per_contract: Mutex::new(Cents::ZERO),
        })
    }

    /// Charge this fee (cents per contract) on every emitted fill.
    pub fn set_fee(&self, fee_per_contract: Cents) {
        *self.fee_per_contract.lock() = fee_per_contract;
    }

    /// Queue a behaviour for the next placement.
    pub fn script(&self, behavior: PlaceBehavior) {
        self.behaviors.lock().push_back(behavior);
    }

    /// Replace the default behaviour applied when the script is exhausted.
    pub fn set_default(&self, behavior: PlaceBehavior) {
        *self.default_behavior.lock() = behavior;
    }

    /// Orders placed so far, in placement order.
    #[must_use]
    pub fn placed(&self) -> Vec<OrderIntent> {
        self.placed.lock().clone()
    }

    /// Number of orders placed.
    #[must_use]
    pub fn place_count(&self) -> usize {
        self.placed.lock().len()
    }

    /// Orders cancelled so far.
    #[must_use]
    pub fn cancelled(&self) -> Vec<OrderId> {
        self.cancelled.lock().clone()
    }

    /// Manually emit a fill (for tests driving fills by hand).
    pub fn emit_fill(&self, fill: Fill) {
        let _ = self.fills_tx.send(fill);
    }

    fn next_order_id(&self) -> OrderId {
        let n = self.next_order.fetch_add(1, Ordering::Relaxed);
        OrderId::from(format!("mock-{}-{n}", self.venue))
    }

    fn schedule_fill(&self, order_id: OrderId, px: Cents, qty: u64, delay_ms: u64) {
        let tx = self.fills_tx.clone();
        let fee = *self.fee_per_contract.lock();
        tokio::spawn(async move {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            let _ = tx.send(Fill::new(order_id, px, qty, Utc::now(), fee));
        });
    }
}

#[async_trait]
impl OrderGateway for MockOrderGateway {
    async fn place_taker(&self, intent: &OrderIntent) -> Result<OrderAck, VenueError> {
        self.placed.lock().push(intent.clone());
        let behavior = self
            .behaviors
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_behavior.lock().clone());

        match behavior {
            PlaceBehavior::Reject(rejection) => Err(VenueError::Rejected(rejection)),
            PlaceBehavior::SlowAck { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let order_id = self.next_order_id();
                Ok(OrderAck::new(
                    intent.intent_id().clone(),
                    order_id,
                    Utc::now(),
                ))
            }
            PlaceBehavior::AckOnly => {
                let order_id = self.next_order_id();
                Ok(OrderAck::new(
                    intent.intent_id().clone(),
                    order_id,
                    Utc::now(),
                ))
            }
            PlaceBehavior::Fill { delay_ms, px } => {
                let order_id = self.next_order_id();
                self.schedule_fill(
                    order_id.clone(),
                    px.unwrap_or_else(|| intent.limit_px()),
                    intent.qty(),
                    delay_ms,
                );
                Ok(OrderAck::new(
                    intent.intent_id().clone(),
                    order_id,
                    Utc::now(),
                ))
            }
            PlaceBehavior::PartialFill { delay_ms, qty, px } => {
                let order_id = self.next_order_id();
                self.schedule_fill(
                    order_id.clone(),
                    px.unwrap_or_else(|| intent.limit_px()),
                    qty.min(intent.qty()),
                    delay_ms,
                );
                Ok(OrderAck::new(
                    intent.intent_id().clone(),
                    order_id,
                    Utc::now(),
                ))
            }
        }
    }

    async fn cancel(&self, order_id: &OrderId) -> Result<CancelOutcome, VenueError> {
        self.cancelled.lock().push(order_id.clone());
        Ok(CancelOutcome::Cancelled)
    }

    fn fills(&self) -> broadcast::Receiver<Fill> {
        self.fills_tx.subscribe()
    }

    fn venue(&self) -> &VenueId {
        &self.venue
    }
}
