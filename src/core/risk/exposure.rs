//! Derived exposure view fed by position deltas.
//!
//! Execution owns positions; risk never reads them directly. Instead it
//! maintains this view from the `PositionDelta` events execution publishes,
//! keeping the data flow unidirectional.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;

use crate::core::domain::{MarketRef, Notional, PositionDelta, VenueId};
use crate::core::service::{Event, EventStream};

/// Rolling USD notional per venue and per contract.
#[derive(Default)]
pub struct ExposureView {
    per_venue: DashMap<VenueId, Notional>,
    per_contract: DashMap<MarketRef, Notional>,
}

impl ExposureView {
    /// Create an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a published position delta.
    pub fn apply(&self, delta: &PositionDelta) {
        *self
            .per_venue
            .entry(delta.market().venue().clone())
            .or_insert(Decimal::ZERO) += delta.notional_delta();
        *self
            .per_contract
            .entry(delta.market().clone())
            .or_insert(Decimal::ZERO) += delta.notional_delta();
    }

    /// Current USD notional on a venue.
    #[must_use]
    pub fn venue_notional(&self, venue: &VenueId) -> Notional {
        self.per_venue
            .get(venue)
            .map(|v| *v)
            .unwrap_or(Decimal::ZERO)
    }

    /// Current USD notional on a contract.
    #[must_use]
    pub fn contract_notional(&self, market: &MarketRef) -> Notional {
        self.per_contract
            .get(market)
            .map(|v| *v)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Pump position-change events from the bus into the view.
///
/// This is the subscription leg of the execution-to-risk data flow; the
/// task ends when the bus closes.
pub fn spawn_exposure_task(view: Arc<ExposureView>, mut events: EventStream) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Event::PositionChanged { delta } = event {
                view.apply(&delta);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::Side;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apply_accumulates_by_venue_and_contract() {
        let view = ExposureView::new();
        let market = MarketRef::new("alpha", "mkt-1");
        view.apply(&PositionDelta::new(market.clone(), Side::BuyYes, dec!(50), 100));
        view.apply(&PositionDelta::new(market.clone(), Side::BuyNo, dec!(50), 100));

        assert_eq!(view.venue_notional(&VenueId::from("alpha")), dec!(100));
        assert_eq!(view.contract_notional(&market), dec!(100));
        assert_eq!(view.venue_notional(&VenueId::from("beta")), dec!(0));
    }
}
