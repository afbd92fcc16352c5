//! Hunting and fishing rewards for the Anketnica game economy.
//!
//! Creatures met in the field carry a mutation class rolled from the
//! hunter's rank and the local Echo Zone. The class then shapes the loot
//! cut from the creature.
//!
//! # Modules
//!
//! - [`mutation`] -- Class availability, probabilities, selection and Aura drift
//! - [`loot`] -- Material generation and valuation
//! - [`store`] -- Persistence boundary
//! - [`service`] -- End-to-end encounter resolution
//! - [`error`] -- Hunt errors

pub mod error;
pub mod loot;
pub mod mutation;
pub mod service;
pub mod store;

pub use error::HuntError;
pub use loot::{
    Element, LootContext, LootMaterial, LootResult, MaterialCategory, generate_loot,
    harvest_quality, material_value, rank_tier,
};
pub use mutation::{
    AuraUpdate, ClassProbabilities, LootModifiers, TemporaryMutation, available_classes,
    beast_spawn_chance, class_probabilities, loot_modifiers, residual_mutations, select_class,
    update_residual_aura,
};
pub use service::{HuntOutcome, HuntRequest, HuntingService};
pub use store::HuntingStore;
