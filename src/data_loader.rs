use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;

use crate::ingredient::Ingredient;

// Expected column headers of an ingredient catalog CSV.
const NAME_COL: &str = "Name";
const BK_COL: &str = "BK";
const PK_COL: &str = "PK";
const LK_COL: &str = "LK";
const SK_COL: &str = "SK";
const TDN_COL: &str = "TDN";
const EM_COL: &str = "EM";
const CALCIUM_COL: &str = "Calcium";
const PRICE_COL: &str = "PricePerKg";
const MAX_SK_COL: &str = "MaxSK";

fn parse_optional_f32(s: &str) -> Option<f32> {
    s.trim().parse::<f32>().ok()
}

fn parse_required_f32(record: &csv::StringRecord, index: usize, column: &str, row: usize) -> Result<f32> {
    let raw = record
        .get(index)
        .ok_or_else(|| anyhow!("Missing '{}' at row {}", column, row))?;
    let value = raw
        .trim()
        .parse::<f32>()
        .map_err(|_| anyhow!("Invalid '{}' value '{}' at row {}", column, raw.trim(), row))?;
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!(
            "Negative '{}' value {} at row {}",
            column,
            value,
            row
        ));
    }
    Ok(value)
}

/// Load an ingredient catalog from CSV. Every numeric column is required and
/// non-negative except `MaxSK`, which may be absent entirely or blank per
/// row. Rows with an empty name are skipped; duplicate names are rejected so
/// a later row can never silently overwrite an earlier one.
pub fn load_ingredient_catalog(csv_path: &Path) -> Result<Vec<Ingredient>> {
    if !csv_path.exists() {
        return Err(anyhow!("Ingredient CSV file not found at: {:?}", csv_path));
    }

    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open ingredient CSV file at {:?}", csv_path))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = rdr.headers()?.clone();

    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("Column '{}' not found", name))
    };
    let name_idx = column(NAME_COL)?;
    let bk_idx = column(BK_COL)?;
    let pk_idx = column(PK_COL)?;
    let lk_idx = column(LK_COL)?;
    let sk_idx = column(SK_COL)?;
    let tdn_idx = column(TDN_COL)?;
    let em_idx = column(EM_COL)?;
    let calcium_idx = column(CALCIUM_COL)?;
    let price_idx = column(PRICE_COL)?;
    let max_sk_idx = headers.iter().position(|h| h == MAX_SK_COL);

    let mut catalog = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    for (row_index, result) in rdr.records().enumerate() {
        let row = row_index + 2; // header is row 1
        let record =
            result.with_context(|| format!("Failed to read catalog record at row {}", row))?;

        let name = record
            .get(name_idx)
            .unwrap_or_default()
            .trim()
            .to_string();
        if name.is_empty() {
            continue;
        }
        if !seen_names.insert(name.clone()) {
            return Err(anyhow!("Duplicate ingredient name '{}' at row {}", name, row));
        }

        let ingredient = Ingredient {
            name,
            bk: parse_required_f32(&record, bk_idx, BK_COL, row)?,
            pk: parse_required_f32(&record, pk_idx, PK_COL, row)?,
            lk: parse_required_f32(&record, lk_idx, LK_COL, row)?,
            sk: parse_required_f32(&record, sk_idx, SK_COL, row)?,
            tdn: parse_required_f32(&record, tdn_idx, TDN_COL, row)?,
            em: parse_required_f32(&record, em_idx, EM_COL, row)?,
            calcium: parse_required_f32(&record, calcium_idx, CALCIUM_COL, row)?,
            price_per_kg: parse_required_f32(&record, price_idx, PRICE_COL, row)?,
            max_sk: max_sk_idx
                .and_then(|idx| record.get(idx))
                .and_then(parse_optional_f32)
                .filter(|v| *v >= 0.0),
        };
        ingredient.validate()?;
        catalog.push(ingredient);
    }

    if catalog.is_empty() {
        return Err(anyhow!(
            "No valid ingredient rows loaded from {:?}",
            csv_path
        ));
    }

    Ok(catalog)
}
