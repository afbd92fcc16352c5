//! Stock and cryptocurrency price engines for the Anketnica game economy.
//!
//! Prices drift with a per-instrument trend, active market events and
//! uniform noise; cryptocurrencies add rare shocks. Each market is driven
//! by its own [`PriceEngine`] ticked by the core scheduler.
//!
//! # Modules
//!
//! - [`profile`] -- Per-market parameters
//! - [`price`] -- One price step
//! - [`engine`] -- The periodic tick job
//! - [`store`] -- Persistence boundary
//! - [`error`] -- Tick errors

pub mod engine;
pub mod error;
pub mod price;
pub mod profile;
pub mod store;

pub use engine::{PriceEngine, TickReport};
pub use error::MarketError;
pub use price::{MIN_PRICE, PriceMove, apply_change, draw_move, event_impact, market_cap};
pub use profile::{CRYPTO_DECIMALS, PriceProfile, STOCK_DECIMALS, ShockProfile};
pub use store::MarketStore;
