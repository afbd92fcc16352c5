//! Shared type definitions for the Anketnica game economy.
//!
//! This crate is the single source of truth for the data model used by the
//! hunting, crafting, market and casino engines and by the persistence
//! adapter. Types flow to `TypeScript` via `ts-rs` for the web frontends.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for row identifiers
//! - [`enums`] -- Ranks, mutation classes, habitats and other enumerations
//! - [`structs`] -- Catalog and gameplay entities
//! - [`error`] -- The store error every engine sees
//! - [`json`] -- Parse-or-default handling of stored JSON text
//! - [`calc`] -- Clamped float-to-integer conversions for the formulas

pub mod calc;
pub mod enums;
pub mod error;
pub mod ids;
pub mod json;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BetType, HabitatType, InstrumentKind, MaterialType, MutationClass, Rank};
pub use error::{ParseLabelError, StoreError};
pub use ids::{
    CharacterId, HorseId, InstrumentId, LocationId, MarketEventId, MaterialId, RecipeId,
    SpeciesId, StackId, ZoneId,
};
pub use structs::{
    CraftRecord, CraftedItem, EchoZone, Horse, HorseRecord, Instrument, MarketEvent,
    MaterialRef, MaterialRequirement, MaterialStack, PricePoint, Recipe, Species, UsedMaterial,
};
