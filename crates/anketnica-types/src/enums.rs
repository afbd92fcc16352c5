//! Enumeration types for the Anketnica game economy.
//!
//! Ordered enums (ranks, mutation classes) derive their total order from
//! declaration order. Comparisons go through that order or through
//! [`Rank::index`], never through the string labels.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ParseLabelError;

// ---------------------------------------------------------------------------
// Rank
// ---------------------------------------------------------------------------

/// Power rank shared by characters, species danger ratings, and recipes.
///
/// Declared weakest to strongest: `F < E < D < C < B < A < S < SS < SSS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Rank {
    /// Lowest rank.
    F,
    /// Second rank.
    E,
    /// Third rank.
    D,
    /// Fourth rank.
    C,
    /// Fifth rank.
    B,
    /// Sixth rank.
    A,
    /// Seventh rank.
    S,
    /// Eighth rank.
    SS,
    /// Highest rank.
    SSS,
}

impl Rank {
    /// Every rank, weakest first.
    pub const ALL: [Self; 9] = [
        Self::F,
        Self::E,
        Self::D,
        Self::C,
        Self::B,
        Self::A,
        Self::S,
        Self::SS,
        Self::SSS,
    ];

    /// Ordinal position in the rank ladder (`F` = 0, `SSS` = 8).
    pub const fn index(self) -> u8 {
        match self {
            Self::F => 0,
            Self::E => 1,
            Self::D => 2,
            Self::C => 3,
            Self::B => 4,
            Self::A => 5,
            Self::S => 6,
            Self::SS => 7,
            Self::SSS => 8,
        }
    }

    /// Rank at the given ordinal, if any.
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::F),
            1 => Some(Self::E),
            2 => Some(Self::D),
            3 => Some(Self::C),
            4 => Some(Self::B),
            5 => Some(Self::A),
            6 => Some(Self::S),
            7 => Some(Self::SS),
            8 => Some(Self::SSS),
            _ => None,
        }
    }

    /// The label used in character sheets and the database.
    pub const fn label(self) -> &'static str {
        match self {
            Self::F => "F",
            Self::E => "E",
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::S => "S",
            Self::SS => "SS",
            Self::SSS => "SSS",
        }
    }

    /// How many ranks `self` sits above `other` (zero when at or below).
    pub const fn ranks_above(self, other: Self) -> u8 {
        self.index().saturating_sub(other.index())
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rank {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rank| rank.label() == s.trim())
            .ok_or_else(|| ParseLabelError::new("rank", s))
    }
}

// ---------------------------------------------------------------------------
// MutationClass
// ---------------------------------------------------------------------------

/// Mutation class of a creature met while hunting or fishing.
///
/// Not stored as an entity; it is rolled per encounter. Declared from the
/// most common (and weakest) to the rarest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MutationClass {
    /// Lightly touched by the Aura. Always obtainable.
    Affected,
    /// Visibly warped, carrying an elemental charge.
    Distorted,
    /// Full Aura beasts, found only in strong Echo Zones.
    Beast,
}

impl MutationClass {
    /// Every class, in selection order.
    pub const ALL: [Self; 3] = [Self::Affected, Self::Distorted, Self::Beast];

    /// The in-game label (also the database value).
    pub const fn label(self) -> &'static str {
        match self {
            Self::Affected => "Затронутые",
            Self::Distorted => "Искажённые",
            Self::Beast => "Бестии",
        }
    }
}

impl fmt::Display for MutationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MutationClass {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.label() == s.trim())
            .ok_or_else(|| ParseLabelError::new("mutation class", s))
    }
}

// ---------------------------------------------------------------------------
// HabitatType
// ---------------------------------------------------------------------------

/// Where a species lives; decides which body parts it yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum HabitatType {
    /// Ground dwellers.
    Land,
    /// Fish and other water creatures.
    Water,
    /// Birds and flyers.
    Air,
    /// Burrowers and cave dwellers.
    Underground,
    /// Creatures of both land and water.
    Amphibian,
}

impl HabitatType {
    /// Every habitat.
    pub const ALL: [Self; 5] = [
        Self::Land,
        Self::Water,
        Self::Air,
        Self::Underground,
        Self::Amphibian,
    ];

    /// The in-game label (also the database value).
    pub const fn label(self) -> &'static str {
        match self {
            Self::Land => "Наземные",
            Self::Water => "Водные",
            Self::Air => "Воздушные",
            Self::Underground => "Подземные",
            Self::Amphibian => "Амфибии",
        }
    }
}

impl FromStr for HabitatType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|habitat| habitat.label() == s.trim())
            .ok_or_else(|| ParseLabelError::new("habitat type", s))
    }
}

// ---------------------------------------------------------------------------
// MaterialType
// ---------------------------------------------------------------------------

/// Broad family of a crafting material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MaterialType {
    /// Hides, meat, bones, scales.
    Organic,
    /// Condensed Aura.
    Essence,
    /// Crystallised Aura or elemental crystal.
    Crystal,
    /// Mineral or metallic parts.
    Metal,
    /// Anything unusual (reinforced parts, hearts).
    Special,
}

impl MaterialType {
    /// Every material type.
    pub const ALL: [Self; 5] = [
        Self::Organic,
        Self::Essence,
        Self::Crystal,
        Self::Metal,
        Self::Special,
    ];

    /// Database value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organic => "organic",
            Self::Essence => "essence",
            Self::Crystal => "crystal",
            Self::Metal => "metal",
            Self::Special => "special",
        }
    }
}

impl FromStr for MaterialType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| ParseLabelError::new("material type", s))
    }
}

// ---------------------------------------------------------------------------
// InstrumentKind
// ---------------------------------------------------------------------------

/// Which price engine owns an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum InstrumentKind {
    /// Exchange-listed company share.
    Stock,
    /// In-universe cryptocurrency.
    Crypto,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stock => f.write_str("stock"),
            Self::Crypto => f.write_str("crypto"),
        }
    }
}

// ---------------------------------------------------------------------------
// BetType
// ---------------------------------------------------------------------------

/// Horse race bet kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BetType {
    /// Pays full odds if the horse finishes first.
    Win,
    /// Pays 60% of the odds if the horse finishes first or second.
    Place,
    /// Pays 40% of the odds if the horse finishes in the top three.
    Show,
}

impl FromStr for BetType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "win" => Ok(Self::Win),
            "place" => Ok(Self::Place),
            "show" => Ok(Self::Show),
            other => Err(ParseLabelError::new("bet type", other)),
        }
    }
}
