use crate::ingredient::Nutrient;

/// Per-axis weight of the composite ingredient score. The sum is 100; protein
/// dominates, then the two energy axes.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub pk: f32,
    pub tdn: f32,
    pub em: f32,
    pub lk: f32,
    pub calcium: f32,
}

/// Weights used when shrinking an ingredient's protein-derived share by how
/// well its other axes line up with the requirement.
#[derive(Debug, Clone)]
pub struct BalanceWeights {
    pub pk: f32,
    pub tdn: f32,
    pub em: f32,
    pub calcium: f32,
}

/// Acceptance band for one axis, as multiples of the requirement value.
#[derive(Debug, Clone, Copy)]
pub struct NutrientBand {
    pub min: f32,
    pub max: f32,
}

/// Two-tier penalty for fiber-heavy ingredients.
#[derive(Debug, Clone)]
pub struct FiberPenalty {
    pub moderate_ratio: f32,
    pub moderate_factor: f32,
    pub heavy_ratio: f32,
    pub heavy_factor: f32,
}

impl FiberPenalty {
    pub fn factor(&self, sk_ratio: f32) -> f32 {
        if sk_ratio > self.heavy_ratio {
            self.heavy_factor
        } else if sk_ratio > self.moderate_ratio {
            self.moderate_factor
        } else {
            1.0
        }
    }
}

/// Every tunable of the allocation heuristic in one injectable struct. The
/// source application hard-coded these and its revisions disagreed on the
/// exact numbers; `Default` reproduces the most widely used set.
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    pub score_weights: ScoreWeights,
    pub balance_weights: BalanceWeights,
    /// Cap applied to each nutrient ratio before weighting, so one
    /// super-abundant axis cannot dominate a score.
    pub ratio_cap: f32,
    pub fiber_penalty: FiberPenalty,
    /// K in `(requirement.pk / ingredient.pk) * K`, the protein-derived
    /// starting share.
    pub protein_share_constant: f32,
    /// Price of a "reasonably priced" ingredient; cheaper ingredients get a
    /// cost-efficiency boost relative to it.
    pub reference_price: f32,
    /// Prices at or below zero are lifted to this before any division.
    pub price_floor: f32,
    /// Ceiling on the cost-efficiency multiplier, so a near-free ingredient
    /// cannot run away with the ranking.
    pub max_cost_multiplier: f32,
    /// Clamp range for a single ingredient's optimal share (%).
    pub share_bounds: (f32, f32),
    /// Hard per-ingredient cap during the greedy walk (%).
    pub hard_cap: f32,
    /// Maximum number of formula lines, keeps mixes practical to batch.
    pub max_lines: usize,
    /// Greedy walk stops once the unallocated share drops below this (%).
    pub min_remaining: f32,
    /// Shrink factor applied when a tentative share would push an axis past
    /// its ceiling, and the floor the shrunk share may not go below (%).
    pub backoff_factor: f32,
    pub backoff_floor: f32,
    /// How many top contributors share a deficit fill (1 or 2).
    pub top_deficit_contributors: usize,
    bands: [NutrientBand; 6],
}

impl AllocatorConfig {
    /// Acceptance band for an axis, in requirement multiples.
    pub fn band(&self, axis: Nutrient) -> NutrientBand {
        let index = Nutrient::ALL
            .iter()
            .position(|a| *a == axis)
            .expect("axis present in Nutrient::ALL");
        self.bands[index]
    }

    pub fn set_band(&mut self, axis: Nutrient, band: NutrientBand) {
        let index = Nutrient::ALL
            .iter()
            .position(|a| *a == axis)
            .expect("axis present in Nutrient::ALL");
        self.bands[index] = band;
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        AllocatorConfig {
            score_weights: ScoreWeights {
                pk: 35.0,
                tdn: 25.0,
                em: 20.0,
                lk: 10.0,
                calcium: 10.0,
            },
            balance_weights: BalanceWeights {
                pk: 0.4,
                tdn: 0.3,
                em: 0.2,
                calcium: 0.1,
            },
            ratio_cap: 1.2,
            fiber_penalty: FiberPenalty {
                moderate_ratio: 1.1,
                moderate_factor: 0.8,
                heavy_ratio: 1.2,
                heavy_factor: 0.6,
            },
            protein_share_constant: 30.0,
            reference_price: 10_000.0,
            price_floor: 1.0,
            max_cost_multiplier: 10.0,
            share_bounds: (5.0, 45.0),
            hard_cap: 40.0,
            max_lines: 8,
            min_remaining: 2.0,
            backoff_factor: 0.8,
            backoff_floor: 2.0,
            top_deficit_contributors: 1,
            // order follows Nutrient::ALL: pk, lk, sk, tdn, em, calcium
            bands: [
                NutrientBand { min: 0.85, max: 1.15 },
                NutrientBand { min: 0.80, max: 1.20 },
                NutrientBand { min: 0.90, max: 1.10 },
                NutrientBand { min: 0.90, max: 1.10 },
                NutrientBand { min: 0.90, max: 1.10 },
                NutrientBand { min: 0.80, max: 1.20 },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands_by_axis() {
        let config = AllocatorConfig::default();
        assert_eq!(config.band(Nutrient::Pk).min, 0.85);
        assert_eq!(config.band(Nutrient::Pk).max, 1.15);
        assert_eq!(config.band(Nutrient::Sk).max, 1.10);
        assert_eq!(config.band(Nutrient::Calcium).min, 0.80);
    }

    #[test]
    fn test_set_band_overrides_one_axis() {
        let mut config = AllocatorConfig::default();
        config.set_band(Nutrient::Pk, NutrientBand { min: 0.97, max: 1.03 });
        assert_eq!(config.band(Nutrient::Pk).min, 0.97);
        // the others keep their defaults
        assert_eq!(config.band(Nutrient::Lk).min, 0.80);
    }

    #[test]
    fn test_fiber_penalty_tiers() {
        let penalty = AllocatorConfig::default().fiber_penalty;
        assert_eq!(penalty.factor(0.9), 1.0);
        assert_eq!(penalty.factor(1.15), 0.8);
        assert_eq!(penalty.factor(1.5), 0.6);
    }
}
