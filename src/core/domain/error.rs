//! Domain validation errors for core domain types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Validation errors raised by domain constructors and invariants.
///
/// These are programmer or upstream-data errors: the offending pair is
/// deactivated and an event emitted, never silently dropped.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("pair legs must sit on different venues, both on {venue}")]
    SameVenuePair { venue: String },

    #[error("similarity {similarity} below acceptance score {accept_score}")]
    SimilarityBelowAcceptance {
        similarity: Decimal,
        accept_score: Decimal,
    },

    #[error("hard-rule predicates failed at ingestion")]
    HardRulesFailed,

    #[error("market {market} is not binary")]
    NotBinary { market: String },

    #[error("price {price} outside [0, 100] cents")]
    PriceOutOfRange { price: Decimal },

    #[error("quantity must be positive")]
    ZeroQuantity,
}
