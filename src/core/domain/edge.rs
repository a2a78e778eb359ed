//! Edge quote types produced by the signal engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{PairId, VenueId};
use super::money::Cents;

/// One of the two directions a pair can be traded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Package {
    /// Buy YES on venue A, buy NO on venue B.
    AYesBNo,
    /// Buy YES on venue B, buy NO on venue A.
    BYesANo,
}

impl Package {
    /// The opposite direction.
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            Self::AYesBNo => Self::BYesANo,
            Self::BYesANo => Self::AYesBNo,
        }
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AYesBNo => write!(f, "a_yes_b_no"),
            Self::BYesANo => write!(f, "b_yes_a_no"),
        }
    }
}

/// A priced, fee- and friction-adjusted cross-venue edge.
///
/// Invariant: `net_edge_cents = gross - fees - friction - slippage`, enforced
/// by the constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeQuote {
    pair_id: PairId,
    ts: DateTime<Utc>,
    package: Package,
    qty: u64,
    gross_edge_cents: Cents,
    fees_cents: Cents,
    friction_cents: Cents,
    slippage_cents: Cents,
    net_edge_cents: Cents,
    leader: Option<VenueId>,
    leader_confidence: f64,
    fee_version_hash: String,
    book_a_seq: u64,
    book_b_seq: u64,
}

/// Everything except the derived net edge; used by the constructor.
#[derive(Debug, Clone)]
pub struct EdgeQuoteParts {
    pub pair_id: PairId,
    pub ts: DateTime<Utc>,
    pub package: Package,
    pub qty: u64,
    pub gross_edge_cents: Cents,
    pub fees_cents: Cents,
    pub friction_cents: Cents,
    pub slippage_cents: Cents,
    pub leader: Option<VenueId>,
    pub leader_confidence: f64,
    pub fee_version_hash: String,
    pub book_a_seq: u64,
    pub book_b_seq: u64,
}

impl EdgeQuote {
    /// Assemble a quote; the net edge is derived, never supplied.
    #[must_use]
    pub fn from_parts(parts: EdgeQuoteParts) -> Self {
        let net_edge_cents = parts.gross_edge_cents
            - parts.fees_cents
            - parts.friction_cents
            - parts.slippage_cents;
        Self {
            pair_id: parts.pair_id,
            ts: parts.ts,
            package: parts.package,
            qty: parts.qty,
            gross_edge_cents: parts.gross_edge_cents,
            fees_cents: parts.fees_cents,
            friction_cents: parts.friction_cents,
            slippage_cents: parts.slippage_cents,
            net_edge_cents,
            leader: parts.leader,
            leader_confidence: parts.leader_confidence,
            fee_version_hash: parts.fee_version_hash,
            book_a_seq: parts.book_a_seq,
            book_b_seq: parts.book_b_seq,
        }
    }

    /// Get the pair ID.
    #[must_use]
    pub const fn pair_id(&self) -> &PairId {
        &self.pair_id
    }

    /// Computation timestamp.
    #[must_use]
    pub const fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    /// The winning package direction.
    #[must_use]
    pub const fn package(&self) -> Package {
        self.package
    }

    /// Intended size in contracts.
    #[must_use]
    pub const fn qty(&self) -> u64 {
        self.qty
    }

    /// Gross edge before costs, cents per contract.
    #[must_use]
    pub const fn gross_edge_cents(&self) -> Cents {
        self.gross_edge_cents
    }

    /// Venue fees, cents per contract.
    #[must_use]
    pub const fn fees_cents(&self) -> Cents {
        self.fees_cents
    }

    /// Frictions, cents per contract.
    #[must_use]
    pub const fn friction_cents(&self) -> Cents {
        self.friction_cents
    }

    /// Depth-walk slippage, cents per contract.
    #[must_use]
    pub const fn slippage_cents(&self) -> Cents {
        self.slippage_cents
    }

    /// Net edge after all costs, cents per contract.
    #[must_use]
    pub const fn net_edge_cents(&self) -> Cents {
        self.net_edge_cents
    }

    /// The venue whose prices currently lead, if any.
    #[must_use]
    pub const fn leader(&self) -> Option<&VenueId> {
        self.leader.as_ref()
    }

    /// Confidence of the leader hint (peak cross-correlation).
    #[must_use]
    pub const fn leader_confidence(&self) -> f64 {
        self.leader_confidence
    }

    /// Version hash of the fee schedule used for this computation.
    #[must_use]
    pub fn fee_version_hash(&self) -> &str {
        &self.fee_version_hash
    }

    /// Sequence number of the venue-A book used.
    #[must_use]
    pub const fn book_a_seq(&self) -> u64 {
        self.book_a_seq
    }

    /// Sequence number of the venue-B book used.
    #[must_use]
    pub const fn book_b_seq(&self) -> u64 {
        self.book_b_seq
    }
}
