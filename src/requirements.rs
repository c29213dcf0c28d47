use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ingredient::Nutrient;

/// Target nutrient profile for one animal type / age group combination.
/// `em` is Kkal/kg; the stock tables ship without it, so it defaults to 0,
/// which disables the axis in scoring and warnings.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct NutritionalRequirement {
    pub pk: f32,
    pub lk: f32,
    pub sk: f32,
    pub tdn: f32,
    #[serde(default)]
    pub em: f32,
    pub calcium: f32,
}

impl NutritionalRequirement {
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

    pub fn validate(&self) -> Result<()> {
        for axis in Nutrient::ALL {
            let value = self.nutrient(axis);
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!(
                    "Requirement has an invalid {} value: {}",
                    axis.label(),
                    value
                ));
            }
        }
        Ok(())
    }
}

/// Requirement repository: animal type -> age group -> requirement record.
/// The allocator never touches this type; callers fetch a snapshot with
/// `get` and pass the plain record in. Persistence of edited tables is the
/// host application's concern, this type only merges what it is handed.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RequirementTable {
    entries: HashMap<String, HashMap<String, NutritionalRequirement>>,
}

fn req(pk: f32, lk: f32, sk: f32, tdn: f32, calcium: f32) -> NutritionalRequirement {
    NutritionalRequirement {
        pk,
        lk,
        sk,
        tdn,
        em: 0.0,
        calcium,
    }
}

impl RequirementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in requirement table (percent values, EM unset).
    pub fn defaults() -> Self {
        let mut table = Self::new();
        let groups = [
            (
                "dairy-cattle",
                vec![
                    ("calf", req(18.0, 3.0, 8.0, 75.0, 0.7)),
                    ("heifer", req(14.0, 3.0, 15.0, 65.0, 0.6)),
                    ("adult", req(16.0, 4.0, 17.0, 70.0, 0.5)),
                ],
            ),
            (
                "beef-cattle",
                vec![
                    ("calf", req(17.0, 3.0, 10.0, 70.0, 0.6)),
                    ("yearling", req(13.0, 3.0, 15.0, 65.0, 0.5)),
                    ("adult", req(12.0, 3.0, 18.0, 60.0, 0.4)),
                ],
            ),
            (
                "broiler-chicken",
                vec![
                    ("starter", req(23.0, 5.0, 4.0, 75.0, 1.0)),
                    ("grower", req(20.0, 6.0, 4.0, 70.0, 0.9)),
                    ("finisher", req(18.0, 7.0, 4.0, 70.0, 0.8)),
                ],
            ),
            (
                "layer-chicken",
                vec![
                    ("chick", req(20.0, 4.0, 4.0, 75.0, 1.0)),
                    ("pullet", req(16.0, 4.0, 5.0, 70.0, 1.2)),
                    ("layer", req(18.0, 5.0, 6.0, 70.0, 4.0)),
                ],
            ),
        ];

        for (animal, ages) in groups {
            for (age, requirement) in ages {
                table
                    .upsert(animal, age, requirement)
                    .expect("built-in requirement table is valid");
            }
        }
        table
    }

    pub fn get(&self, animal: &str, age: &str) -> Option<&NutritionalRequirement> {
        self.entries.get(animal).and_then(|ages| ages.get(age))
    }

    /// Insert or replace one record. Rejects negative values without touching
    /// the table.
    pub fn upsert(
        &mut self,
        animal: &str,
        age: &str,
        requirement: NutritionalRequirement,
    ) -> Result<()> {
        requirement
            .validate()
            .with_context(|| format!("Invalid requirement for '{}' / '{}'", animal, age))?;
        self.entries
            .entry(animal.to_string())
            .or_default()
            .insert(age.to_string(), requirement);
        Ok(())
    }

    pub fn remove_animal_type(&mut self, animal: &str) -> bool {
        self.entries.remove(animal).is_some()
    }

    pub fn remove_age_group(&mut self, animal: &str, age: &str) -> bool {
        self.entries
            .get_mut(animal)
            .map_or(false, |ages| ages.remove(age).is_some())
    }

    /// Animal type keys in sorted order, for stable display.
    pub fn animal_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn age_groups(&self, animal: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .entries
            .get(animal)
            .map(|ages| ages.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    /// Merge `{animal: {age: {pk, lk, sk, tdn, em, calcium}}}` overrides on
    /// top of the current table. Nothing is applied if any record is invalid.
    pub fn merge_json_str(&mut self, json: &str) -> Result<()> {
        let overrides: HashMap<String, HashMap<String, NutritionalRequirement>> =
            serde_json::from_str(json).context("Failed to parse requirement overrides JSON")?;
        for (animal, ages) in &overrides {
            for (age, requirement) in ages {
                requirement
                    .validate()
                    .with_context(|| format!("Invalid override for '{}' / '{}'", animal, age))?;
            }
        }
        for (animal, ages) in overrides {
            for (age, requirement) in ages {
                self.upsert(&animal, &age, requirement)?;
            }
        }
        Ok(())
    }
}
