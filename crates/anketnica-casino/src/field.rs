//! Random race fields.

use rand::Rng;
use rand::seq::index;

use anketnica_types::Horse;

/// Smallest field drawn.
pub const MIN_FIELD: usize = 3;

/// Largest field drawn.
pub const MAX_FIELD: usize = 6;

/// Draw 3 to 6 distinct horses from `roster`, fewer if the roster is
/// smaller.
pub fn random_field(roster: &[Horse], rng: &mut impl Rng) -> Vec<Horse> {
    let size = rng.random_range(MIN_FIELD..=MAX_FIELD).min(roster.len());
    index::sample(rng, roster.len(), size)
        .into_iter()
        .filter_map(|i| roster.get(i).cloned())
        .collect()
}
