//! In-memory working set of a crafter's material stacks.
//!
//! A craft runs against a [`Stockpile`] loaded from the store: materials are
//! consumed oldest first and refunds are merged back, all in memory. The
//! net difference to the loaded stacks is then read off with
//! [`Stockpile::changes`] and written by the store in one transaction, so
//! consumption and refund can never be persisted apart.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use anketnica_types::{
    CharacterId, MaterialId, MaterialRef, MaterialRequirement, MaterialStack, StackId,
    UsedMaterial,
};

use crate::error::CraftError;

/// Two qualities closer than this are the same quality.
const QUALITY_EPSILON: f64 = 1e-9;

/// A single write needed to bring the store in line with a stockpile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StackChange {
    /// Remove a stack that was consumed entirely.
    Delete {
        /// The stack to remove.
        stack_id: StackId,
        /// Units the stack held when it was loaded.
        expected: u32,
    },
    /// Change a stack's quantity by `delta`.
    Adjust {
        /// The stack to change.
        stack_id: StackId,
        /// Units the stack held when it was loaded.
        expected: u32,
        /// Signed change in quantity.
        delta: i64,
    },
    /// Add a new stack.
    Create {
        /// Material of the new stack.
        material_id: MaterialId,
        /// Units in the new stack.
        quantity: u32,
        /// Quality of the new stack.
        quality_modifier: f64,
        /// Acquisition time of the new stack.
        obtained_at: DateTime<Utc>,
    },
}

/// Mutable view of one character's stacks, ordered oldest first.
#[derive(Debug, Clone)]
pub struct Stockpile {
    owner: CharacterId,
    stacks: Vec<MaterialStack>,
    original: BTreeMap<StackId, u32>,
    names: BTreeMap<MaterialId, String>,
    created: i64,
}

impl Stockpile {
    /// Build a working set from stacks loaded from the store.
    ///
    /// Stacks of other owners and empty stacks are ignored.
    pub fn new(owner: CharacterId, stacks: Vec<MaterialStack>) -> Self {
        let mut stacks: Vec<MaterialStack> = stacks
            .into_iter()
            .filter(|s| s.owner_id == owner && s.quantity > 0)
            .collect();
        stacks.sort_by(|a, b| a.obtained_at.cmp(&b.obtained_at).then(a.id.cmp(&b.id)));

        let original = stacks.iter().map(|s| (s.id, s.quantity)).collect();
        let names = stacks
            .iter()
            .map(|s| (s.material_id, s.material_name.clone()))
            .collect();

        Self {
            owner,
            stacks,
            original,
            names,
            created: 0,
        }
    }

    /// The owning character.
    pub const fn owner(&self) -> CharacterId {
        self.owner
    }

    /// Current stacks, oldest first.
    pub fn stacks(&self) -> &[MaterialStack] {
        &self.stacks
    }

    /// Units held of the referenced material across all stacks.
    pub fn available(&self, material: &MaterialRef) -> u32 {
        self.stacks
            .iter()
            .filter(|s| material.matches(s))
            .fold(0_u32, |sum, s| sum.saturating_add(s.quantity))
    }

    /// Requirements the stockpile cannot cover, each with the shortfall.
    pub fn shortfall(&self, requirements: &[MaterialRequirement]) -> Vec<MaterialRequirement> {
        requirements
            .iter()
            .filter_map(|req| {
                let missing = req.quantity.saturating_sub(self.available(&req.material));
                (missing > 0).then(|| MaterialRequirement {
                    material: req.material.clone(),
                    quantity: missing,
                })
            })
            .collect()
    }

    /// Take `quantity` units of a material, oldest stacks first.
    ///
    /// Partially used stacks are decremented and emptied stacks removed.
    /// Returns one entry per stack touched. Nothing is taken when the
    /// stockpile holds too little.
    pub fn consume(
        &mut self,
        material: &MaterialRef,
        quantity: u32,
    ) -> Result<Vec<UsedMaterial>, CraftError> {
        let available = self.available(material);
        if available < quantity {
            return Err(CraftError::InsufficientMaterials {
                missing: vec![MaterialRequirement {
                    material: material.clone(),
                    quantity: quantity.saturating_sub(available),
                }],
            });
        }

        let mut remaining = quantity;
        let mut used = Vec::new();
        for stack in self.stacks.iter_mut().filter(|s| material.matches(s)) {
            if remaining == 0 {
                break;
            }
            let take = stack.quantity.min(remaining);
            stack.quantity = stack.quantity.saturating_sub(take);
            remaining = remaining.saturating_sub(take);
            used.push(UsedMaterial {
                material_id: stack.material_id,
                quantity: take,
                quality_modifier: stack.quality_modifier,
            });
        }
        self.stacks.retain(|s| s.quantity > 0);

        Ok(used)
    }

    /// Return units of a material at the given quality.
    ///
    /// Units merge into a stack of the same material and quality when one
    /// exists; otherwise a new stack is opened.
    pub fn refund(
        &mut self,
        material_id: MaterialId,
        quantity: u32,
        quality_modifier: f64,
        now: DateTime<Utc>,
    ) -> Result<StackId, CraftError> {
        if let Some(stack) = self.stacks.iter_mut().find(|s| {
            s.material_id == material_id
                && (s.quality_modifier - quality_modifier).abs() < QUALITY_EPSILON
        }) {
            stack.quantity =
                stack
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| CraftError::ArithmeticOverflow {
                        context: format!("refund into stack {}", stack.id),
                    })?;
            return Ok(stack.id);
        }

        let id = StackId::provisional(self.created);
        self.created = self.created.saturating_add(1);
        self.stacks.push(MaterialStack {
            id,
            owner_id: self.owner,
            material_id,
            material_name: self.names.get(&material_id).cloned().unwrap_or_default(),
            quantity,
            quality_modifier,
            obtained_at: now,
        });
        Ok(id)
    }

    /// Writes that turn the loaded stacks into the current ones.
    ///
    /// Deletions and adjustments come first in stack id order, then
    /// creations in the order they happened. Each deletion and adjustment
    /// carries the quantity it was loaded with; the store rejects it when
    /// the stack no longer holds exactly that.
    pub fn changes(&self) -> Vec<StackChange> {
        let mut changes = Vec::new();

        for (&stack_id, &before) in &self.original {
            match self.stacks.iter().find(|s| s.id == stack_id) {
                None => changes.push(StackChange::Delete {
                    stack_id,
                    expected: before,
                }),
                Some(stack) if stack.quantity != before => changes.push(StackChange::Adjust {
                    stack_id,
                    expected: before,
                    delta: i64::from(stack.quantity).saturating_sub(i64::from(before)),
                }),
                Some(_) => {}
            }
        }

        changes.extend(
            self.stacks
                .iter()
                .filter(|s| !self.original.contains_key(&s.id))
                .map(|s| StackChange::Create {
                    material_id: s.material_id,
                    quantity: s.quantity,
                    quality_modifier: s.quality_modifier,
                    obtained_at: s.obtained_at,
                }),
        );

        changes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()
    }

    fn stack(id: i64, material: i64, name: &str, quantity: u32, quality: f64, age_h: i64) -> MaterialStack {
        MaterialStack {
            id: StackId::new(id),
            owner_id: CharacterId::new(1),
            material_id: MaterialId::new(material),
            material_name: name.to_owned(),
            quantity,
            quality_modifier: quality,
            obtained_at: t0() - Duration::hours(age_h),
        }
    }

    fn pile() -> Stockpile {
        Stockpile::new(
            CharacterId::new(1),
            vec![
                stack(11, 1, "Шкура Волка", 3, 1.2, 1),
                stack(10, 1, "Шкура Волка", 2, 0.9, 5),
                stack(12, 2, "Кости Волка", 4, 1.0, 2),
            ],
        )
    }

    #[test]
    fn stacks_are_ordered_oldest_first() {
        let ids: Vec<i64> = pile().stacks().iter().map(|s| s.id.into_inner()).collect();
        assert_eq!(ids, vec![10, 12, 11]);
    }

    #[test]
    fn available_matches_id_or_name() {
        let pile = pile();
        assert_eq!(pile.available(&MaterialRef::by_id(MaterialId::new(1))), 5);
        assert_eq!(pile.available(&MaterialRef::by_name("Кости Волка")), 4);
        assert_eq!(pile.available(&MaterialRef::by_name("Перья Ворона")), 0);
    }

    #[test]
    fn consume_takes_oldest_stack_first() {
        let mut pile = pile();
        let used = pile.consume(&MaterialRef::by_name("Шкура Волка"), 3).unwrap();

        assert_eq!(used.len(), 2);
        assert_eq!(used.first().map(|u| u.quantity), Some(2));
        assert_eq!(used.get(1).map(|u| u.quantity), Some(1));
        assert!((used.first().unwrap().quality_modifier - 0.9).abs() < 1e-12);

        assert_eq!(
            pile.changes(),
            vec![
                StackChange::Delete {
                    stack_id: StackId::new(10),
                    expected: 2
                },
                StackChange::Adjust {
                    stack_id: StackId::new(11),
                    expected: 3,
                    delta: -1
                },
            ]
        );
    }

    #[test]
    fn consume_insufficient_touches_nothing() {
        let mut pile = pile();
        let err = pile.consume(&MaterialRef::by_id(MaterialId::new(2)), 9);
        assert!(matches!(
            err,
            Err(CraftError::InsufficientMaterials { ref missing }) if missing.first().map(|m| m.quantity) == Some(5)
        ));
        assert!(pile.changes().is_empty());
    }

    #[test]
    fn shortfall_lists_only_missing_quantities() {
        let pile = pile();
        let missing = pile.shortfall(&[
            MaterialRequirement {
                material: MaterialRef::by_name("Шкура Волка"),
                quantity: 4,
            },
            MaterialRequirement {
                material: MaterialRef::by_name("Кости Волка"),
                quantity: 6,
            },
        ]);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing.first().map(|m| m.quantity), Some(2));
    }

    #[test]
    fn refund_opens_degraded_stack() {
        let mut pile = pile();
        pile.consume(&MaterialRef::by_id(MaterialId::new(2)), 4).unwrap();
        let id = pile.refund(MaterialId::new(2), 1, 0.8, t0()).unwrap();
        assert!(!id.is_persisted());

        let changes = pile.changes();
        assert!(changes.contains(&StackChange::Delete {
            stack_id: StackId::new(12),
            expected: 4
        }));
        assert!(changes.iter().any(|c| matches!(
            c,
            StackChange::Create { material_id, quantity: 1, .. } if *material_id == MaterialId::new(2)
        )));
        let refunded = pile.stacks().iter().find(|s| s.id == id).unwrap();
        assert_eq!(refunded.material_name, "Кости Волка");
    }

    #[test]
    fn refund_merges_into_same_quality_stack() {
        let mut pile = pile();
        let id = pile.refund(MaterialId::new(1), 2, 1.2, t0()).unwrap();
        assert_eq!(id, StackId::new(11));
        assert_eq!(
            pile.changes(),
            vec![StackChange::Adjust {
                stack_id: StackId::new(11),
                expected: 3,
                delta: 2
            }]
        );
    }

    #[test]
    fn repeated_refunds_share_a_provisional_stack() {
        let mut pile = pile();
        let first = pile.refund(MaterialId::new(3), 1, 0.64, t0()).unwrap();
        let second = pile.refund(MaterialId::new(3), 2, 0.64, t0()).unwrap();
        assert_eq!(first, second);
        assert_eq!(pile.changes().len(), 1);
    }
}
