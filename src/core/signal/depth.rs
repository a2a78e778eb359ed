//! Depth walking: executable prices at size.

use rust_decimal::Decimal;

use crate::core::domain::{BookSnapshot, Cents, PriceLevel, CONTRACT_PAYOUT_CENTS};

/// Executable pricing of one leg after walking the book to size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthQuote {
    /// Size-weighted average executable price, cents.
    pub vwap: Cents,
    /// Worst level touched, cents; the natural limit price.
    pub worst: Cents,
    /// Top-of-book price, cents.
    pub top: Cents,
}

impl DepthQuote {
    /// Cost of walking depth past the top of book, cents per contract.
    #[must_use]
    pub fn slippage(&self) -> Cents {
        self.vwap - self.top
    }
}

fn walk(levels: impl Iterator<Item = (Cents, u64)>, qty: u64) -> Option<DepthQuote> {
    if qty == 0 {
        return None;
    }
    let mut remaining = qty;
    let mut cost = Decimal::ZERO;
    let mut top = None;
    let mut worst = Decimal::ZERO;

    for (px, size) in levels {
        if top.is_none() {
            top = Some(px);
        }
        let take = remaining.min(size);
        cost += px * Decimal::from(take);
        worst = px;
        remaining -= take;
        if remaining == 0 {
            break;
        }
    }

    if remaining > 0 {
        // Cumulative available size is short of the intended quantity.
        return None;
    }

    Some(DepthQuote {
        vwap: cost / Decimal::from(qty),
        worst,
        top: top?,
    })
}

/// Walk the asks to price a YES purchase of `qty` contracts.
///
/// Returns `None` when the book cannot fill the quantity (infeasible).
#[must_use]
pub fn walk_yes(book: &BookSnapshot, qty: u64) -> Option<DepthQuote> {
    walk(
        book.asks().iter().map(|l: &PriceLevel| (l.price(), l.size())),
        qty,
    )
}

/// Walk the bids to price a NO purchase of `qty` contracts.
///
/// Buying NO executes against the YES bids at `100 - bid`, best bid first.
#[must_use]
pub fn walk_no(book: &BookSnapshot, qty: u64) -> Option<DepthQuote> {
    walk(
        book.bids()
            .iter()
            .map(|l: &PriceLevel| (CONTRACT_PAYOUT_CENTS - l.price(), l.size())),
        qty,
    )
}
