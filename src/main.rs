use anyhow::{Context, Result};
use ration_optim::cli::parse_args;
use ration_optim::data_loader::load_ingredient_catalog;
use ration_optim::ingredient::Nutrient;
use ration_optim::optim::{allocate, AllocatorConfig};
use ration_optim::requirements::RequirementTable;
use std::path::Path;
use tokio::fs;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli_args = parse_args();
    println!(
        "Loading ingredient catalog from: {}",
        cli_args.ingredients_file
    );

    let ingredients = load_ingredient_catalog(Path::new(&cli_args.ingredients_file))
        .with_context(|| {
            format!(
                "Failed to load ingredient catalog from '{}'",
                cli_args.ingredients_file
            )
        })?;
    println!("Loaded {} ingredients.", ingredients.len());

    let mut table = RequirementTable::defaults();
    if let Some(path) = &cli_args.requirements_file {
        let overrides = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read requirements file '{}'", path))?;
        table
            .merge_json_str(&overrides)
            .with_context(|| format!("Failed to apply requirement overrides from '{}'", path))?;
        println!("Applied requirement overrides from {}.", path);
    }

    let requirements = table
        .get(&cli_args.animal, &cli_args.age)
        .with_context(|| {
            format!(
                "No requirement record for animal type '{}', age group '{}' (known animal types: {})",
                cli_args.animal,
                cli_args.age,
                table.animal_types().join(", ")
            )
        })?
        .clone();

    println!(
        "\nFormulating for {} / {} ...",
        cli_args.animal, cli_args.age
    );
    let config = AllocatorConfig::default();
    let result = allocate(&ingredients, &requirements, &config);

    if result.formula.is_empty() {
        println!("No formula could be produced from this catalog.");
        return Ok(());
    }

    println!("\nFormula:");
    for line in result.formula.lines() {
        println!(
            "  {:<24} {:>6.2} %   @ {:>9.2}/kg   -> {:>9.2}",
            line.ingredient, line.percentage, line.cost_per_kg, line.total_cost
        );
    }
    println!(
        "  {:<24} {:>6.2} %",
        "Total",
        result.formula.total_percentage()
    );
    println!("\nCost per kg of mix: {:.2}", result.total_cost);

    println!("\nNutritional values (target):");
    for axis in Nutrient::ALL {
        let unit = if axis == Nutrient::Em { "Kkal/kg" } else { "%" };
        println!(
            "  {:<8} {:>9.2} {:<8} (target {:.2})",
            axis.label(),
            result.nutritional_values.nutrient(axis),
            unit,
            requirements.nutrient(axis)
        );
    }

    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}
