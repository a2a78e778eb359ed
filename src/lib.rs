//! pairtaker - cross-venue binary-market hedged taker engine.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── core/             # Reusable library components
//! │   ├── domain/       # Pure domain types
//! │   ├── venue/        # Venue ports + transports
//! │   ├── registry/     # Pair store + fee registry
//! │   ├── cache/        # Book cache + mid-price bars
//! │   ├── signal/       # Edge pricing + lead-lag hints
//! │   ├── risk/         # Admission controller
//! │   ├── execution/    # Hedged two-leg state machine
//! │   └── service/      # Event bus, trade store, operator control
//! ├── app/              # Configuration + orchestration
//! └── cli/              # Command-line interface
//! ```

pub mod app;
pub mod cli;
pub mod core;
pub mod error;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
