//! Horse racing for the Anketnica casino.
//!
//! # Modules
//!
//! - [`race`] -- Finish times, ranking and stable earnings
//! - [`betting`] -- Odds and payouts
//! - [`field`] -- Random field selection
//! - [`stable`] -- The house stable
//! - [`store`] -- Persistence boundary
//! - [`service`] -- Race runs with record keeping
//! - [`error`] -- Casino errors

pub mod betting;
pub mod error;
pub mod field;
pub mod race;
pub mod service;
pub mod stable;
pub mod store;

pub use betting::{MIN_ODDS, Odds, odds, payout};
pub use error::CasinoError;
pub use field::random_field;
pub use race::{MIN_FINISH_TIME, PLACE_EARNINGS, RaceEntry, earnings_for, finish_time, simulate};
pub use service::{RaceResult, RaceService};
pub use stable::house_stable;
pub use store::StableStore;
