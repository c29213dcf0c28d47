use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::formula::{round2, Formula, FormulaLine};
use crate::ingredient::{Ingredient, Nutrient};
use crate::nutrient_aggregator::{aggregate, NutrientTotals};
use crate::requirements::NutritionalRequirement;

use super::config::AllocatorConfig;
use super::scoring::score_ingredients;

/// Axes the remainder distribution steers by. Protein and the two energy
/// axes drive palatability of the result; the others are only checked against
/// their bands afterwards.
const DRIVER_AXES: [Nutrient; 3] = [Nutrient::Pk, Nutrient::Tdn, Nutrient::Em];

/// Slack below a fill target under which an axis counts as reached, so a
/// rounding remnant cannot trigger another fill round.
const FILL_SLACK: f32 = 1e-3;

/// Full allocator output: the formula, its aggregate cost, the nutrient
/// levels it achieves, and any band-violation warnings. Re-derived on every
/// call, never mutated in place.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FormulationResult {
    pub formula: Formula,
    pub total_cost: f32,
    pub nutritional_values: NutrientTotals,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

/// Produce a full percentage allocation for the catalog against the
/// requirement.
///
/// Four phases: score and rank every ingredient (cost-adjusted nutrient
/// fit), walk the ranking greedily under per-axis ceilings, distribute the
/// unallocated remainder, then aggregate and compare against the acceptance
/// bands. An empty catalog yields an empty result rather than an error; the
/// UI reaches this state before the user has entered anything.
pub fn allocate(
    ingredients: &[Ingredient],
    requirements: &NutritionalRequirement,
    config: &AllocatorConfig,
) -> FormulationResult {
    if ingredients.is_empty() {
        return FormulationResult {
            formula: Formula::new(),
            total_cost: 0.0,
            nutritional_values: NutrientTotals::default(),
            warnings: Vec::new(),
        };
    }

    let mut scored = score_ingredients(ingredients, requirements, config);
    // Highest score first; ties fall back to name order so reruns are
    // bit-identical.
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.ingredient.name.cmp(&b.ingredient.name))
    });

    // Greedy walk over the ranking.
    let mut lines: Vec<FormulaLine> = Vec::new();
    let mut cumulative = NutrientTotals::default();
    let mut remaining = 100.0_f32;

    for entry in &scored {
        if remaining < config.min_remaining || lines.len() >= config.max_lines {
            break;
        }

        let mut percentage = entry
            .optimal_percentage
            .min(remaining)
            .min(config.hard_cap);

        let exceeds_ceiling = Nutrient::ALL.iter().any(|&axis| {
            let requirement = requirements.nutrient(axis);
            if requirement <= 0.0 {
                return false;
            }
            let contribution = entry.ingredient.nutrient(axis) * percentage / 100.0;
            cumulative.nutrient(axis) + contribution > requirement * config.band(axis).max
        });
        if exceeds_ceiling {
            // shrink rather than reject the ingredient outright
            percentage = (percentage * config.backoff_factor).max(config.backoff_floor);
        }

        cumulative.add_contribution(entry.ingredient, percentage);
        lines.push(FormulaLine::new(
            &entry.ingredient.name,
            percentage,
            entry.ingredient.price_per_kg,
        ));
        remaining -= percentage;
    }

    distribute(
        &mut lines,
        &mut cumulative,
        remaining,
        ingredients,
        requirements,
        config,
    );

    let formula = Formula::from_lines(lines);
    let percentages = formula.percentages();
    let nutritional_values = aggregate(ingredients, &percentages);
    let warnings = band_warnings(&nutritional_values, requirements, config);
    let total_cost = round2(formula.total_cost());

    FormulationResult {
        formula,
        total_cost,
        nutritional_values,
        warnings,
    }
}

/// Distribute whatever share of the mix a formula has not allocated yet,
/// using the same logic the allocator applies after its greedy walk. Exposed
/// so interactive adjustment can redistribute deliberately, e.g. after a
/// line was removed.
pub fn distribute_remainder(
    formula: &mut Formula,
    ingredients: &[Ingredient],
    requirements: &NutritionalRequirement,
    config: &AllocatorConfig,
) {
    let remaining = 100.0 - formula.total_percentage();
    if remaining <= 0.0 || formula.is_empty() {
        return;
    }
    let mut cumulative = aggregate(ingredients, &formula.percentages());
    distribute(
        formula.lines_mut(),
        &mut cumulative,
        remaining,
        ingredients,
        requirements,
        config,
    );
}

/// Remainder distribution. Deficit-targeted fills first: lift the most
/// deficient driver axis to the bottom of its acceptance band by topping up
/// the line(s) that supply that axis most strongly. Every later fill adds to
/// every axis, so each fill stops at the band floor rather than at the
/// requirement itself. The residual then goes to the cheapest line while any
/// driver axis is still short of its requirement, or is split evenly when
/// nothing is deficient.
fn distribute(
    lines: &mut Vec<FormulaLine>,
    cumulative: &mut NutrientTotals,
    mut remaining: f32,
    ingredients: &[Ingredient],
    requirements: &NutritionalRequirement,
    config: &AllocatorConfig,
) {
    if remaining <= 0.0 || lines.is_empty() {
        return;
    }

    let by_name: HashMap<&str, &Ingredient> = ingredients
        .iter()
        .map(|ingredient| (ingredient.name.as_str(), ingredient))
        .collect();

    // At most one fill round per driver axis; each round either reaches the
    // axis's band floor or uses up the remaining share.
    for _ in 0..DRIVER_AXES.len() {
        if remaining <= FILL_SLACK {
            break;
        }
        let Some(axis) = most_deficient_axis(cumulative, requirements, config) else {
            break;
        };
        let requirement = requirements.nutrient(axis);
        let floor_level = requirement * config.band(axis).min;
        let needed = floor_level - cumulative.nutrient(axis);

        // Rank lines by how strongly their ingredient supplies the axis.
        let mut ranked: Vec<(usize, f32)> = lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| {
                by_name
                    .get(line.ingredient.as_str())
                    .map(|ingredient| (index, ingredient.nutrient(axis) / requirement))
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| lines[a.0].ingredient.cmp(&lines[b.0].ingredient))
        });
        ranked.truncate(config.top_deficit_contributors.clamp(1, 2));

        let total_ratio: f32 = ranked.iter().map(|(_, ratio)| ratio).sum();
        if total_ratio <= 0.0 {
            // Nothing in the formula supplies this axis; leave the rest to
            // the residual step.
            break;
        }

        // Axis gain per percent of extra, blended over the chosen
        // contributors' proportional shares.
        let gain_per_percent: f32 = ranked
            .iter()
            .map(|(index, ratio)| {
                let share = ratio / total_ratio;
                let ingredient = by_name[lines[*index].ingredient.as_str()];
                share * ingredient.nutrient(axis) / 100.0
            })
            .sum();
        if gain_per_percent <= f32::EPSILON {
            break;
        }

        let extra_total = (needed / gain_per_percent).min(remaining);
        if extra_total <= 0.0 {
            break;
        }
        for (index, ratio) in &ranked {
            let extra = extra_total * (ratio / total_ratio);
            give(&mut lines[*index], cumulative, extra, &by_name);
        }
        remaining -= extra_total;
    }

    // Residual share.
    if remaining > FILL_SLACK {
        let driver_still_short = DRIVER_AXES.iter().any(|&axis| {
            let requirement = requirements.nutrient(axis);
            requirement > 0.0 && cumulative.nutrient(axis) < requirement
        });

        if driver_still_short {
            // Cheapest line absorbs the rest: the cost-minimizing filler.
            let cheapest = lines
                .iter()
                .enumerate()
                .min_by(|a, b| {
                    a.1.cost_per_kg
                        .total_cmp(&b.1.cost_per_kg)
                        .then_with(|| a.1.ingredient.cmp(&b.1.ingredient))
                })
                .map(|(index, _)| index)
                .expect("lines is non-empty");
            give(&mut lines[cheapest], cumulative, remaining, &by_name);
        } else {
            let share = remaining / lines.len() as f32;
            for line in lines.iter_mut() {
                if let Some(ingredient) = by_name.get(line.ingredient.as_str()) {
                    cumulative.add_contribution(ingredient, share);
                }
                line.add_percentage(share);
            }
        }
    }
}

/// The driver axis furthest below its requirement, among those still under
/// their band floor. None when every driver axis has reached its floor.
fn most_deficient_axis(
    cumulative: &NutrientTotals,
    requirements: &NutritionalRequirement,
    config: &AllocatorConfig,
) -> Option<Nutrient> {
    DRIVER_AXES
        .iter()
        .copied()
        .filter_map(|axis| {
            let requirement = requirements.nutrient(axis);
            if requirement <= 0.0 {
                return None;
            }
            let floor_level = requirement * config.band(axis).min;
            if cumulative.nutrient(axis) + FILL_SLACK >= floor_level {
                return None;
            }
            Some((axis, 1.0 - cumulative.nutrient(axis) / requirement))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(axis, _)| axis)
}

fn give(
    line: &mut FormulaLine,
    cumulative: &mut NutrientTotals,
    extra: f32,
    by_name: &HashMap<&str, &Ingredient>,
) {
    if let Some(ingredient) = by_name.get(line.ingredient.as_str()) {
        cumulative.add_contribution(ingredient, extra);
    }
    line.add_percentage(extra);
}

/// Compare achieved levels against the per-axis acceptance bands and produce
/// user-facing warnings. Axes with a zero requirement have no meaningful
/// band and stay silent. Warnings are advisory; the allocation is returned
/// either way.
pub fn band_warnings(
    values: &NutrientTotals,
    requirements: &NutritionalRequirement,
    config: &AllocatorConfig,
) -> Vec<String> {
    let mut warnings = Vec::new();
    for axis in Nutrient::ALL {
        let requirement = requirements.nutrient(axis);
        if requirement <= 0.0 {
            continue;
        }
        let value = values.nutrient(axis);
        let band = config.band(axis);
        let min_allowed = requirement * band.min;
        let max_allowed = requirement * band.max;
        if value < min_allowed {
            warnings.push(format!(
                "{} terlalu rendah: {:.2} (minimum: {:.2})",
                axis.label(),
                value,
                min_allowed
            ));
        } else if value > max_allowed {
            warnings.push(format!(
                "{} terlalu tinggi: {:.2} (maksimal: {:.2})",
                axis.label(),
                value,
                max_allowed
            ));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corn() -> Ingredient {
        Ingredient {
            name: "Corn".to_string(),
            bk: 86.0,
            pk: 9.0,
            lk: 4.0,
            sk: 2.0,
            tdn: 80.0,
            em: 3300.0,
            calcium: 0.02,
            price_per_kg: 4000.0,
            max_sk: None,
        }
    }

    fn soybean_meal() -> Ingredient {
        Ingredient {
            name: "Soybean Meal".to_string(),
            bk: 89.0,
            pk: 44.0,
            lk: 1.0,
            sk: 6.0,
            tdn: 75.0,
            em: 2200.0,
            calcium: 0.3,
            price_per_kg: 9000.0,
            max_sk: None,
        }
    }

    fn broiler_requirements() -> NutritionalRequirement {
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
    fn test_empty_catalog_yields_empty_result() {
        let result = allocate(&[], &broiler_requirements(), &AllocatorConfig::default());
        assert!(result.formula.is_empty());
        assert_eq!(result.total_cost, 0.0);
        assert_eq!(result.nutritional_values, NutrientTotals::default());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_single_ingredient_takes_whole_mix() {
        let ingredients = vec![corn()];
        let result = allocate(&ingredients, &broiler_requirements(), &AllocatorConfig::default());
        assert_eq!(result.formula.len(), 1);
        assert!((result.formula.total_percentage() - 100.0).abs() < 0.5);
        // all-corn cannot reach the protein target
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("PK") && w.contains("rendah")));
    }

    #[test]
    fn test_two_ingredient_scenario_hits_protein_band() {
        let ingredients = vec![corn(), soybean_meal()];
        let result = allocate(&ingredients, &broiler_requirements(), &AllocatorConfig::default());

        assert_eq!(result.formula.len(), 2);
        assert!((result.formula.total_percentage() - 100.0).abs() < 0.5);

        // soybean meal carries the protein; verify through the aggregator
        let achieved = aggregate(&ingredients, &result.formula.percentages());
        assert!(
            achieved.pk >= 17.0 && achieved.pk <= 19.0,
            "pk {} outside 17..19",
            achieved.pk
        );
        let soy = result.formula.line("Soybean Meal").unwrap();
        assert!(soy.percentage > 20.0 && soy.percentage < 35.0);
        // the cheaper corn absorbs the filler share
        let corn_line = result.formula.line("Corn").unwrap();
        assert!(corn_line.percentage > soy.percentage);
    }

    #[test]
    fn test_no_duplicate_lines() {
        let ingredients = vec![corn(), soybean_meal()];
        let result = allocate(&ingredients, &broiler_requirements(), &AllocatorConfig::default());
        let mut names: Vec<&str> = result
            .formula
            .lines()
            .iter()
            .map(|line| line.ingredient.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), result.formula.len());
    }

    #[test]
    fn test_total_cost_matches_line_sum() {
        let ingredients = vec![corn(), soybean_meal()];
        let result = allocate(&ingredients, &broiler_requirements(), &AllocatorConfig::default());
        let line_sum: f32 = result
            .formula
            .lines()
            .iter()
            .map(|line| line.total_cost)
            .sum();
        assert!((result.total_cost - line_sum).abs() < 0.01);
        for line in result.formula.lines() {
            let expected = round2(line.cost_per_kg * line.percentage / 100.0);
            assert!((line.total_cost - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_even_split_when_no_driver_deficient() {
        // tiny targets: two small greedy slices already satisfy every driver
        // axis, so the leftover is spread evenly
        let ingredients = vec![corn(), soybean_meal()];
        let requirements = NutritionalRequirement {
            pk: 1.0,
            lk: 1.0,
            sk: 10.0,
            tdn: 1.0,
            em: 1.0,
            calcium: 0.1,
        };
        let result = allocate(&ingredients, &requirements, &AllocatorConfig::default());
        assert_eq!(result.formula.len(), 2);
        assert!((result.formula.total_percentage() - 100.0).abs() < 0.5);
        let corn_line = result.formula.line("Corn").unwrap();
        let soy_line = result.formula.line("Soybean Meal").unwrap();
        assert!((corn_line.percentage - soy_line.percentage).abs() < 1.5);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("PK") && w.contains("tinggi")));
    }

    #[test]
    fn test_line_count_cap() {
        let mut ingredients = Vec::new();
        for i in 0..12 {
            let mut ing = corn();
            ing.name = format!("Bahan {}", i);
            ing.pk = 8.0 + i as f32;
            ing.price_per_kg = 3000.0 + 500.0 * i as f32;
            ingredients.push(ing);
        }
        let result = allocate(&ingredients, &broiler_requirements(), &AllocatorConfig::default());
        assert!(result.formula.len() <= 8);
        assert!((result.formula.total_percentage() - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_allocation_is_deterministic() {
        // identical twins force a score tie; name order must decide
        let mut twin = corn();
        twin.name = "Aorn".to_string();
        let ingredients = vec![corn(), twin, soybean_meal()];
        let config = AllocatorConfig::default();
        let requirements = broiler_requirements();
        let first = allocate(&ingredients, &requirements, &config);
        let second = allocate(&ingredients, &requirements, &config);
        assert_eq!(first.formula, second.formula);
        assert_eq!(first.warnings, second.warnings);
        assert_eq!(
            first.formula.lines()[0].ingredient,
            "Aorn",
            "tie must break on name order"
        );
    }

    #[test]
    fn test_zero_requirement_axis_emits_no_warning() {
        let ingredients = vec![corn()];
        let requirements = NutritionalRequirement {
            em: 0.0,
            ..broiler_requirements()
        };
        let result = allocate(&ingredients, &requirements, &AllocatorConfig::default());
        assert!(!result.warnings.iter().any(|w| w.contains("EM")));
    }

    #[test]
    fn test_distribute_remainder_completes_manual_formula() {
        let ingredients = vec![corn(), soybean_meal()];
        let requirements = broiler_requirements();
        let config = AllocatorConfig::default();

        let mut formula = Formula::new();
        formula.add_line(&ingredients[0], 30.0).unwrap();
        formula.add_line(&ingredients[1], 10.0).unwrap();

        distribute_remainder(&mut formula, &ingredients, &requirements, &config);
        assert!((formula.total_percentage() - 100.0).abs() < 0.5);
        for line in formula.lines() {
            let expected = round2(line.cost_per_kg * line.percentage / 100.0);
            assert!((line.total_cost - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_distribute_remainder_noop_on_full_or_empty_formula() {
        let ingredients = vec![corn()];
        let requirements = broiler_requirements();
        let config = AllocatorConfig::default();

        let mut empty = Formula::new();
        distribute_remainder(&mut empty, &ingredients, &requirements, &config);
        assert!(empty.is_empty());

        let mut full = Formula::new();
        full.add_line(&ingredients[0], 100.0).unwrap();
        distribute_remainder(&mut full, &ingredients, &requirements, &config);
        assert_eq!(full.line("Corn").unwrap().percentage, 100.0);
    }

    #[test]
    fn test_band_warnings_texts() {
        let requirements = broiler_requirements();
        let config = AllocatorConfig::default();
        let low = NutrientTotals {
            pk: 10.0,
            lk: 3.0,
            sk: 8.0,
            tdn: 70.0,
            em: 2800.0,
            calcium: 0.5,
        };
        let warnings = band_warnings(&low, &requirements, &config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("PK terlalu rendah: 10.00"));

        let high = NutrientTotals {
            sk: 12.0,
            ..low.clone()
        };
        let warnings = band_warnings(&high, &requirements, &config);
        assert!(warnings
            .iter()
            .any(|w| w.contains("SK terlalu tinggi: 12.00")));
    }
}
