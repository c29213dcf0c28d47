use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ingredient::{Ingredient, Nutrient};

/// Nutrient levels achieved by a percentage allocation, same axes and units
/// as `NutritionalRequirement`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct NutrientTotals {
    pub pk: f32,
    pub lk: f32,
    pub sk: f32,
    pub tdn: f32,
    pub em: f32,
    pub calcium: f32,
}

impl NutrientTotals {
    pub fn nutrient(&self, axis: Nutrient) -> f32 {
        match axis {
            Nutrient::Pk => self.pk,
            Nutrient::Lk => self.lk,
            Nutrient::Sk => self.sk,
            Nutrient::Tdn => self.tdn,
            Nutrient::Em => self.em,
            Nutrient::Calcium => self.calcium,
        }
    }

    fn nutrient_mut(&mut self, axis: Nutrient) -> &mut f32 {
        match axis {
            Nutrient::Pk => &mut self.pk,
            Nutrient::Lk => &mut self.lk,
            Nutrient::Sk => &mut self.sk,
            Nutrient::Tdn => &mut self.tdn,
            Nutrient::Em => &mut self.em,
            Nutrient::Calcium => &mut self.calcium,
        }
    }

    /// Add one ingredient's contribution at the given inclusion percentage.
    pub(crate) fn add_contribution(&mut self, ingredient: &Ingredient, percentage: f32) {
        for axis in Nutrient::ALL {
            *self.nutrient_mut(axis) += ingredient.nutrient(axis) * percentage / 100.0;
        }
    }
}

/// Total nutrient levels for an ingredient set under a percentage allocation.
///
/// Per axis: sum of `ingredient.axis * percentage / 100` over ingredients
/// present in the map. Ingredients absent from the map contribute nothing.
/// Pure and idempotent; called after every formula mutation to keep displayed
/// levels current. Non-finite percentages are treated as 0 so a malformed
/// entry can never poison the totals.
pub fn aggregate(
    ingredients: &[Ingredient],
    percentages: &HashMap<String, f32>,
) -> NutrientTotals {
    let mut totals = NutrientTotals::default();
    for ingredient in ingredients {
        let percentage = percentages
            .get(&ingredient.name)
            .copied()
            .filter(|p| p.is_finite())
            .unwrap_or(0.0);
        if percentage != 0.0 {
            totals.add_contribution(ingredient, percentage);
        }
    }
    totals
}
