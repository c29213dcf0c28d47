use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// The six nutrient axes tracked throughout formulation.
/// EM is an absolute value (Kkal/kg); every other axis is a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Pk,
    Lk,
    Sk,
    Tdn,
    Em,
    Calcium,
}

impl Nutrient {
    /// Fixed iteration order. Every per-axis loop walks this array so repeated
    /// runs accumulate floating-point sums in the same order.
    pub const ALL: [Nutrient; 6] = [
        Nutrient::Pk,
        Nutrient::Lk,
        Nutrient::Sk,
        Nutrient::Tdn,
        Nutrient::Em,
        Nutrient::Calcium,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Nutrient::Pk => "PK",
            Nutrient::Lk => "LK",
            Nutrient::Sk => "SK",
            Nutrient::Tdn => "TDN",
            Nutrient::Em => "EM",
            Nutrient::Calcium => "CALCIUM",
        }
    }
}

/// One feed ingredient from the catalog. `name` is the join key used by
/// formulas and percentage maps; the catalog loader enforces uniqueness.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ingredient {
    pub name: String,
    /// Dry matter content (%).
    pub bk: f32,
    pub pk: f32,
    pub lk: f32,
    pub sk: f32,
    pub tdn: f32,
    pub em: f32,
    pub calcium: f32,
    pub price_per_kg: f32,
    /// Optional crude-fiber ceiling for this ingredient (%).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sk: Option<f32>,
}

impl Ingredient {
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

    /// All numeric fields must be non-negative; the name must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("Ingredient name must not be empty"));
        }
        for axis in Nutrient::ALL {
            let value = self.nutrient(axis);
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!(
                    "Ingredient '{}' has an invalid {} value: {}",
                    self.name,
                    axis.label(),
                    value
                ));
            }
        }
        if !self.bk.is_finite() || self.bk < 0.0 {
            return Err(anyhow!(
                "Ingredient '{}' has an invalid BK value: {}",
                self.name,
                self.bk
            ));
        }
        if !self.price_per_kg.is_finite() || self.price_per_kg < 0.0 {
            return Err(anyhow!(
                "Ingredient '{}' has an invalid price: {}",
                self.name,
                self.price_per_kg
            ));
        }
        if let Some(max_sk) = self.max_sk {
            if !max_sk.is_finite() || max_sk < 0.0 {
                return Err(anyhow!(
                    "Ingredient '{}' has an invalid MaxSK value: {}",
                    self.name,
                    max_sk
                ));
            }
        }
        Ok(())
    }
}
