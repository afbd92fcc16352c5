//! Type-safe identifier wrappers around `SQLite` row ids.
//!
//! Every catalog and gameplay record has a strongly-typed ID so a species id
//! can never be passed where a material id is expected. The database assigns
//! ids with `INTEGER PRIMARY KEY AUTOINCREMENT`; the constructors here wrap
//! ids read back from the store or chosen by tests and seed data.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around an `i64` row id with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw row id.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner row id.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a character (anketa) that hunts, crafts and trades.
    CharacterId
}

define_id! {
    /// Unique identifier for a bestiary species.
    SpeciesId
}

define_id! {
    /// Unique identifier for a hunting or fishing location.
    LocationId
}

define_id! {
    /// Unique identifier for a transient Echo Zone.
    ZoneId
}

define_id! {
    /// Unique identifier for a crafting material catalog entry.
    MaterialId
}

define_id! {
    /// Unique identifier for one material stack owned by a character.
    ///
    /// Stacks created in memory but not yet written carry a negative
    /// provisional id (see [`StackId::provisional`]).
    StackId
}

define_id! {
    /// Unique identifier for a crafting recipe.
    RecipeId
}

define_id! {
    /// Unique identifier for a stock or cryptocurrency.
    InstrumentId
}

define_id! {
    /// Unique identifier for a time-boxed market event.
    MarketEventId
}

define_id! {
    /// Unique identifier for a race horse.
    HorseId
}

impl StackId {
    /// Build the provisional id for the `n`-th stack created in memory.
    ///
    /// Provisional ids count down from `-1` and never collide with ids
    /// assigned by the database.
    pub const fn provisional(n: i64) -> Self {
        Self((-1_i64).saturating_sub(n))
    }

    /// Whether this id was assigned by the store.
    pub const fn is_persisted(self) -> bool {
        self.0 > 0
    }
}
