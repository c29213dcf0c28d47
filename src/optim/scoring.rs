use crate::ingredient::{Ingredient, Nutrient};
use crate::requirements::NutritionalRequirement;

use super::config::AllocatorConfig;

/// Per-axis ratio of an ingredient's content to the requirement. A zero
/// requirement yields a zero ratio so no axis ever contributes an infinite
/// score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientRatios {
    pub pk: f32,
    pub lk: f32,
    pub sk: f32,
    pub tdn: f32,
    pub em: f32,
    pub calcium: f32,
}

impl NutrientRatios {
    fn compute(ingredient: &Ingredient, requirements: &NutritionalRequirement) -> Self {
        let ratio = |axis: Nutrient| {
            let requirement = requirements.nutrient(axis);
            if requirement > 0.0 {
                ingredient.nutrient(axis) / requirement
            } else {
                0.0
            }
        };
        NutrientRatios {
            pk: ratio(Nutrient::Pk),
            lk: ratio(Nutrient::Lk),
            sk: ratio(Nutrient::Sk),
            tdn: ratio(Nutrient::Tdn),
            em: ratio(Nutrient::Em),
            calcium: ratio(Nutrient::Calcium),
        }
    }
}

/// Scoring output for one ingredient: its cost-adjusted composite score and
/// the share the heuristic would ideally give it.
#[derive(Debug, Clone)]
pub struct IngredientScore<'a> {
    pub ingredient: &'a Ingredient,
    pub score: f32,
    pub optimal_percentage: f32,
    pub ratios: NutrientRatios,
}

/// Score every ingredient against the requirement.
///
/// The score weighs capped nutrient ratios (protein heaviest, then the energy
/// axes), penalizes fiber-heavy ingredients, and divides through by price so
/// a cheaper ingredient that covers the same needs ranks higher. The optimal
/// share starts from the protein requirement, shrinks with the same fiber and
/// cost factors, and is clamped so no single ingredient is planned at zero or
/// at the whole mix.
pub fn score_ingredients<'a>(
    ingredients: &'a [Ingredient],
    requirements: &NutritionalRequirement,
    config: &AllocatorConfig,
) -> Vec<IngredientScore<'a>> {
    ingredients
        .iter()
        .map(|ingredient| score_ingredient(ingredient, requirements, config))
        .collect()
}

pub fn score_ingredient<'a>(
    ingredient: &'a Ingredient,
    requirements: &NutritionalRequirement,
    config: &AllocatorConfig,
) -> IngredientScore<'a> {
    let ratios = NutrientRatios::compute(ingredient, requirements);
    let cap = config.ratio_cap;
    let price = ingredient.price_per_kg.max(config.price_floor);
    let fiber_factor = config.fiber_penalty.factor(ratios.sk);

    // Protein-derived starting share; either side at zero falls back to the
    // share floor instead of dividing by zero.
    let mut optimal = if ingredient.pk > 0.0 && requirements.pk > 0.0 {
        (requirements.pk / ingredient.pk) * config.protein_share_constant
    } else {
        config.share_bounds.0
    };

    let balance = ratios.pk.min(cap) * config.balance_weights.pk
        + ratios.tdn.min(cap) * config.balance_weights.tdn
        + ratios.em.min(cap) * config.balance_weights.em
        + ratios.calcium.min(cap) * config.balance_weights.calcium;
    optimal *= balance;
    optimal *= fiber_factor;
    optimal *= (config.reference_price / price).min(1.0);
    let optimal_percentage = optimal.clamp(config.share_bounds.0, config.share_bounds.1);

    let nutrient_score = ratios.pk.min(cap) * config.score_weights.pk
        + ratios.tdn.min(cap) * config.score_weights.tdn
        + ratios.em.min(cap) * config.score_weights.em
        + ratios.lk.min(cap) * config.score_weights.lk
        + ratios.calcium.min(cap) * config.score_weights.calcium;
    let cost_efficiency = (config.reference_price / price).min(config.max_cost_multiplier);
    let score = nutrient_score * fiber_factor * cost_efficiency;

    IngredientScore {
        ingredient,
        score,
        optimal_percentage,
        ratios,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(name: &str, pk: f32, sk: f32, price_per_kg: f32) -> Ingredient {
        Ingredient {
            name: name.to_string(),
            bk: 88.0,
            pk,
            lk: 3.0,
            sk,
            tdn: 70.0,
            em: 2600.0,
            calcium: 0.3,
            price_per_kg,
            max_sk: None,
        }
    }

    fn requirements() -> NutritionalRequirement {
        NutritionalRequirement {
            pk: 18.0,
            lk: 3.0,
            sk: 8.0,
            tdn: 70.0,
            em: 2800.0,
            calcium: 0.5,
        }
    }

    #[test]
    fn test_zero_requirement_axis_gives_zero_ratio() {
        let mut reqs = requirements();
        reqs.em = 0.0;
        let ing = ingredient("Dedak", 12.0, 10.0, 3000.0);
        let scored = score_ingredient(&ing, &reqs, &AllocatorConfig::default());
        assert_eq!(scored.ratios.em, 0.0);
        assert!(scored.score.is_finite());
    }

    #[test]
    fn test_cheaper_ingredient_outscores_identical_expensive_one() {
        let config = AllocatorConfig::default();
        let reqs = requirements();
        let cheap = ingredient("Murah", 18.0, 6.0, 2000.0);
        let costly = ingredient("Mahal", 18.0, 6.0, 8000.0);
        let cheap_score = score_ingredient(&cheap, &reqs, &config).score;
        let costly_score = score_ingredient(&costly, &reqs, &config).score;
        assert!(cheap_score > costly_score);
    }

    #[test]
    fn test_fiber_heavy_ingredient_is_penalized() {
        let config = AllocatorConfig::default();
        let reqs = requirements();
        let lean_ing = ingredient("Halus", 18.0, 6.0, 4000.0);
        let coarse_ing = ingredient("Kasar", 18.0, 12.0, 4000.0);
        let lean = score_ingredient(&lean_ing, &reqs, &config);
        let coarse = score_ingredient(&coarse_ing, &reqs, &config);
        // sk ratio 12/8 = 1.5 -> heavy penalty tier
        assert!((coarse.score / lean.score - 0.6).abs() < 1e-3);
        assert!(coarse.optimal_percentage < lean.optimal_percentage);
    }

    #[test]
    fn test_optimal_percentage_stays_in_bounds() {
        let config = AllocatorConfig::default();
        let reqs = requirements();
        // very high protein -> tiny raw share, clamped up to the floor
        let dense_ing = ingredient("Tepung Ikan", 60.0, 1.0, 9000.0);
        let dense = score_ingredient(&dense_ing, &reqs, &config);
        assert!(dense.optimal_percentage >= config.share_bounds.0);
        // very low protein -> huge raw share, clamped down to the ceiling
        let weak_ing = ingredient("Onggok", 2.0, 10.0, 1000.0);
        let weak = score_ingredient(&weak_ing, &reqs, &config);
        assert!(weak.optimal_percentage <= config.share_bounds.1);
    }

    #[test]
    fn test_zero_protein_ingredient_falls_back_to_share_floor() {
        let config = AllocatorConfig::default();
        let reqs = requirements();
        let minyak = ingredient("Minyak", 0.0, 0.0, 6000.0);
        let scored = score_ingredient(&minyak, &reqs, &config);
        assert!(scored.optimal_percentage >= config.share_bounds.0);
        assert!(scored.optimal_percentage.is_finite());
    }

    #[test]
    fn test_zero_price_does_not_run_away() {
        let config = AllocatorConfig::default();
        let reqs = requirements();
        let free_ing = ingredient("Gratis", 18.0, 6.0, 0.0);
        let cheap_ing = ingredient("Murah", 18.0, 6.0, 500.0);
        let free = score_ingredient(&free_ing, &reqs, &config);
        let cheap = score_ingredient(&cheap_ing, &reqs, &config);
        // both hit the capped multiplier; free must not dwarf merely-cheap
        assert!((free.score - cheap.score).abs() < 1e-3);
        assert!(free.score.is_finite());
    }
}
