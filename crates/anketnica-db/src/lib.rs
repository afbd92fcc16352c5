//! Persistence for the Anketnica game economy (`SQLite` + in-memory).
//!
//! Every engine crate defines the store trait it needs. This crate
//! implements all of them twice: once over a `SQLite` pool for the running
//! bot, and once over plain collections for tests and local runs.
//!
//! # Architecture
//!
//! ```text
//! HuntingService  --HuntingStore-->  +
//! CraftingService --CraftingStore--> +--> SqliteStore (sqlx, one file)
//! PriceEngine     --MarketStore-->   +    MemoryStore (Mutex<State>)
//! RaceService     --StableStore-->   +
//! ```
//!
//! # Modules
//!
//! - [`sqlite`] -- connection pool, configuration and migrations
//! - [`hunting`] -- bestiary, Echo Zones and loot grants
//! - [`crafting`] -- recipes, material stacks and the craft transaction
//! - [`market`] -- stocks, cryptocurrencies, events and price history
//! - [`stable`] -- race horses and their records
//! - [`catalog`] -- inserts used to seed catalogs and fixtures
//! - [`memory`] -- the in-memory store
//! - [`codec`] -- column encodings shared by the `SQLite` modules
//! - [`error`] -- the data layer error type

pub mod catalog;
pub mod codec;
pub mod crafting;
pub mod error;
pub mod hunting;
pub mod market;
pub mod memory;
pub mod sqlite;
pub mod stable;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::MemoryStore;
pub use sqlite::{MEMORY_URL, SqliteConfig, SqliteStore};
